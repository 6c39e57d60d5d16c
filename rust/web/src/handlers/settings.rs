use crate::settings::SettingsStore;
use serde::Deserialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

use super::{error_response, success_response};

/// Partial update of the table defaults; omitted fields are kept.
///
/// `max_rounds` and `seed` can only be cleared through
/// [`UpdateFieldRequest`] with a `null` value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateSettingsRequest {
    pub deck_count: Option<usize>,
    pub warmup_size: Option<usize>,
    pub auto_detect: Option<bool>,
    pub cards_per_round: Option<usize>,
    pub max_rounds: Option<usize>,
    pub warmup_after_reshuffle: Option<bool>,
    pub suppress_warmup_predictions: Option<bool>,
    pub model: Option<String>,
    pub auto_retrain: Option<bool>,
    pub accuracy_threshold: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub field: String,
    pub value: serde_json::Value,
}

/// GET /api/settings
pub async fn get_settings(store: Arc<SettingsStore>) -> Response {
    match store.get() {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => error_response(err),
    }
}

/// PUT /api/settings
pub async fn update_settings(
    store: Arc<SettingsStore>,
    request: UpdateSettingsRequest,
) -> Response {
    let mut current = match store.get() {
        Ok(settings) => settings,
        Err(err) => return error_response(err),
    };

    if let Some(deck_count) = request.deck_count {
        current.deck_count = deck_count;
    }
    if let Some(warmup_size) = request.warmup_size {
        current.warmup_size = warmup_size;
    }
    if let Some(auto_detect) = request.auto_detect {
        current.auto_detect = auto_detect;
    }
    if let Some(cards_per_round) = request.cards_per_round {
        current.cards_per_round = cards_per_round;
    }
    if let Some(max_rounds) = request.max_rounds {
        current.max_rounds = Some(max_rounds);
    }
    if let Some(flag) = request.warmup_after_reshuffle {
        current.warmup_after_reshuffle = flag;
    }
    if let Some(flag) = request.suppress_warmup_predictions {
        current.suppress_warmup_predictions = flag;
    }
    if let Some(model) = request.model {
        current.model = model;
    }
    if let Some(auto_retrain) = request.auto_retrain {
        current.auto_retrain = auto_retrain;
    }
    if let Some(threshold) = request.accuracy_threshold {
        current.retrain.accuracy_threshold = threshold;
    }
    if let Some(seed) = request.seed {
        current.seed = Some(seed);
    }

    match store.update(current) {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => error_response(err),
    }
}

/// PATCH /api/settings
pub async fn update_field(store: Arc<SettingsStore>, request: UpdateFieldRequest) -> Response {
    match store.update_field(&request.field, request.value) {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => error_response(err),
    }
}

/// POST /api/settings/reset
pub async fn reset_settings(store: Arc<SettingsStore>) -> Response {
    match store.reset() {
        Ok(settings) => success_response(StatusCode::OK, settings),
        Err(err) => error_response(err),
    }
}
