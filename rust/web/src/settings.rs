use baccarat_ai::{is_known_model, RetrainPolicy, MODEL_KINDS};
use baccarat_engine::shoe::{ShoeSettings, DEFAULT_CARDS_PER_ROUND, DEFAULT_DECKS, DEFAULT_WARMUP};
use baccarat_engine::TableConfig;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use warp::http::StatusCode;

use crate::errors::{ErrorSeverity, IntoErrorResponse};

pub const MAX_DECKS: usize = 8;
pub const MAX_WARMUP: usize = 100;
pub const MAX_CARDS_PER_ROUND: usize = 6;

/// Defaults applied to every table created after they are set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub deck_count: usize,
    pub warmup_size: usize,
    pub auto_detect: bool,
    pub cards_per_round: usize,
    pub max_rounds: Option<usize>,
    pub warmup_after_reshuffle: bool,
    pub suppress_warmup_predictions: bool,
    /// Sequence model kind handed to `baccarat_ai::create_model`
    pub model: String,
    pub auto_retrain: bool,
    pub retrain: RetrainPolicy,
    pub seed: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            deck_count: DEFAULT_DECKS,
            warmup_size: DEFAULT_WARMUP,
            auto_detect: true,
            cards_per_round: DEFAULT_CARDS_PER_ROUND,
            max_rounds: None,
            warmup_after_reshuffle: true,
            suppress_warmup_predictions: false,
            model: "forest".to_string(),
            auto_retrain: true,
            retrain: RetrainPolicy::default(),
            seed: None,
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=MAX_DECKS).contains(&self.deck_count) {
            return Err(SettingsError::InvalidValue(format!(
                "deck_count must be between 1 and {MAX_DECKS}"
            )));
        }
        validate_warmup(self.warmup_size)?;
        if !(1..=MAX_CARDS_PER_ROUND).contains(&self.cards_per_round) {
            return Err(SettingsError::InvalidValue(format!(
                "cards_per_round must be between 1 and {MAX_CARDS_PER_ROUND}"
            )));
        }
        if self.max_rounds == Some(0) {
            return Err(SettingsError::InvalidValue(
                "max_rounds must be greater than 0".to_string(),
            ));
        }
        if !is_known_model(&self.model) {
            return Err(SettingsError::InvalidValue(format!(
                "model must be one of: {}",
                MODEL_KINDS.join(", ")
            )));
        }
        if self.retrain.window == 0 || self.retrain.min_samples == 0 {
            return Err(SettingsError::InvalidValue(
                "retrain window and min_samples must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrain.accuracy_threshold) {
            return Err(SettingsError::InvalidValue(
                "retrain accuracy_threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            shoe: ShoeSettings {
                deck_count: self.deck_count,
                warmup_size: self.warmup_size,
                auto_detect: self.auto_detect,
                cards_per_round: self.cards_per_round,
                max_rounds: self.max_rounds,
                warmup_after_reshuffle: self.warmup_after_reshuffle,
                seed: self.seed,
            },
            suppress_warmup_predictions: self.suppress_warmup_predictions,
        }
    }
}

pub fn validate_warmup(warmup_size: usize) -> Result<(), SettingsError> {
    if warmup_size > MAX_WARMUP {
        return Err(SettingsError::InvalidValue(format!(
            "warmup_size must be at most {MAX_WARMUP}"
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub struct SettingsStore {
    settings: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(AppSettings::default()),
        }
    }

    pub fn with_settings(settings: AppSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings: RwLock::new(settings),
        })
    }

    pub fn get(&self) -> Result<AppSettings, SettingsError> {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SettingsError::StoragePoisoned)
    }

    pub fn update(&self, new_settings: AppSettings) -> Result<AppSettings, SettingsError> {
        new_settings.validate()?;

        let mut guard = self
            .settings
            .write()
            .map_err(|_| SettingsError::StoragePoisoned)?;
        *guard = new_settings.clone();
        tracing::info!(
            deck_count = new_settings.deck_count,
            warmup_size = new_settings.warmup_size,
            model = %new_settings.model,
            "table defaults updated"
        );
        Ok(new_settings)
    }

    pub fn update_field(
        &self,
        field: &str,
        value: serde_json::Value,
    ) -> Result<AppSettings, SettingsError> {
        let mut current = self.get()?;

        match field {
            "deck_count" => current.deck_count = as_usize(field, &value)?,
            "warmup_size" => current.warmup_size = as_usize(field, &value)?,
            "cards_per_round" => current.cards_per_round = as_usize(field, &value)?,
            "max_rounds" => {
                current.max_rounds = if value.is_null() {
                    None
                } else {
                    Some(as_usize(field, &value)?)
                }
            }
            "auto_detect" => current.auto_detect = as_bool(field, &value)?,
            "warmup_after_reshuffle" => current.warmup_after_reshuffle = as_bool(field, &value)?,
            "suppress_warmup_predictions" => {
                current.suppress_warmup_predictions = as_bool(field, &value)?
            }
            "auto_retrain" => current.auto_retrain = as_bool(field, &value)?,
            "model" => {
                current.model = value
                    .as_str()
                    .ok_or_else(|| {
                        SettingsError::InvalidValue("model must be a string".to_string())
                    })?
                    .to_string();
            }
            "seed" => {
                current.seed = if value.is_null() {
                    None
                } else {
                    Some(value.as_u64().ok_or_else(|| {
                        SettingsError::InvalidValue("seed must be a number".to_string())
                    })?)
                }
            }
            "accuracy_threshold" => {
                current.retrain.accuracy_threshold = value.as_f64().ok_or_else(|| {
                    SettingsError::InvalidValue("accuracy_threshold must be a number".to_string())
                })?;
            }
            _ => {
                return Err(SettingsError::InvalidValue(format!(
                    "unknown field: {}",
                    field
                )))
            }
        }

        self.update(current)
    }

    pub fn reset(&self) -> Result<AppSettings, SettingsError> {
        self.update(AppSettings::default())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn as_usize(field: &str, value: &serde_json::Value) -> Result<usize, SettingsError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SettingsError::InvalidValue(format!("{field} must be a number")))
}

fn as_bool(field: &str, value: &serde_json::Value) -> Result<bool, SettingsError> {
    value
        .as_bool()
        .ok_or_else(|| SettingsError::InvalidValue(format!("{field} must be a boolean")))
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
    #[error("Settings storage poisoned")]
    StoragePoisoned,
}

impl IntoErrorResponse for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            SettingsError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            SettingsError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SettingsError::InvalidValue(_) => "invalid_settings",
            SettingsError::StoragePoisoned => "settings_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            SettingsError::InvalidValue(_) => ErrorSeverity::Client,
            SettingsError::StoragePoisoned => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_settings_are_valid() {
        let settings = AppSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.deck_count, 8);
        assert_eq!(settings.warmup_size, 15);
        assert_eq!(settings.model, "forest");
    }

    #[test]
    fn validates_deck_count_range() {
        for (decks, ok) in [(0, false), (1, true), (8, true), (9, false)] {
            let settings = AppSettings {
                deck_count: decks,
                ..Default::default()
            };
            assert_eq!(settings.validate().is_ok(), ok, "deck_count {decks}");
        }
    }

    #[test]
    fn validates_warmup_and_cards_per_round() {
        let too_long = AppSettings {
            warmup_size: 101,
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let no_warmup = AppSettings {
            warmup_size: 0,
            ..Default::default()
        };
        assert!(no_warmup.validate().is_ok());

        let no_cards = AppSettings {
            cards_per_round: 0,
            ..Default::default()
        };
        assert!(no_cards.validate().is_err());
    }

    #[test]
    fn rejects_unknown_model_kind() {
        let settings = AppSettings {
            model: "oracle".to_string(),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("forest"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut settings = AppSettings::default();
        settings.retrain.accuracy_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn table_config_carries_shoe_settings() {
        let settings = AppSettings {
            deck_count: 2,
            warmup_size: 5,
            max_rounds: Some(40),
            seed: Some(9),
            suppress_warmup_predictions: true,
            ..Default::default()
        };
        let config = settings.table_config();
        assert_eq!(config.shoe.deck_count, 2);
        assert_eq!(config.shoe.warmup_size, 5);
        assert_eq!(config.shoe.max_rounds, Some(40));
        assert_eq!(config.shoe.seed, Some(9));
        assert!(config.suppress_warmup_predictions);
    }

    #[test]
    fn store_rejects_invalid_updates() {
        let store = SettingsStore::new();
        let invalid = AppSettings {
            deck_count: 12,
            ..Default::default()
        };
        assert!(store.update(invalid).is_err());
        assert_eq!(store.get().expect("get").deck_count, 8);
    }

    #[test]
    fn store_updates_individual_fields() {
        let store = SettingsStore::new();

        store
            .update_field("deck_count", json!(6))
            .expect("update decks");
        store
            .update_field("auto_detect", json!(false))
            .expect("update auto detect");
        store
            .update_field("max_rounds", json!(60))
            .expect("update max rounds");
        store
            .update_field("accuracy_threshold", json!(0.5))
            .expect("update threshold");

        let settings = store.get().expect("get");
        assert_eq!(settings.deck_count, 6);
        assert!(!settings.auto_detect);
        assert_eq!(settings.max_rounds, Some(60));
        assert_eq!(settings.retrain.accuracy_threshold, 0.5);

        store
            .update_field("max_rounds", serde_json::Value::Null)
            .expect("clear max rounds");
        assert_eq!(store.get().expect("get").max_rounds, None);
    }

    #[test]
    fn store_validates_field_updates() {
        let store = SettingsStore::new();

        assert!(store.update_field("deck_count", json!(0)).is_err());
        assert!(store.update_field("deck_count", json!("eight")).is_err());
        assert!(store.update_field("auto_detect", json!(1)).is_err());
        assert!(store.update_field("model", json!("oracle")).is_err());
        assert!(store.update_field("dealer", json!(1)).is_err());

        assert_eq!(store.get().expect("get"), AppSettings::default());
    }

    #[test]
    fn store_resets_to_defaults() {
        let store = SettingsStore::new();
        store
            .update(AppSettings {
                deck_count: 1,
                warmup_size: 0,
                ..Default::default()
            })
            .expect("update");

        let reset = store.reset().expect("reset");
        assert_eq!(reset, AppSettings::default());
        assert_eq!(store.get().expect("get"), AppSettings::default());
    }

    #[test]
    fn settings_error_maps_to_http() {
        let err = SettingsError::InvalidValue("bad".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "invalid_settings");
        assert_eq!(
            SettingsError::StoragePoisoned.severity(),
            ErrorSeverity::Critical
        );
    }
}
