//! Random forest sequence model.

use std::sync::atomic::AtomicBool;

use baccarat_engine::errors::{PredictError, TrainError};
use baccarat_engine::model::{Prediction, SequenceModel, TrainingReport};
use baccarat_engine::outcome::Outcome;

use crate::features::{WINDOW_SIZE, build_training_set, latest_window};
use crate::forest::{ForestConfig, ForestError, RandomForest, argmax};

/// Classifier predicting the next outcome from the last [`WINDOW_SIZE`].
///
/// # Example
///
/// ```rust
/// use baccarat_ai::model::ForestModel;
/// use baccarat_engine::model::SequenceModel;
/// use baccarat_engine::outcome::Outcome;
///
/// let mut model = ForestModel::default();
/// assert!(!model.is_trained());
///
/// let history: Vec<Outcome> = [Outcome::Banker, Outcome::Player]
///     .into_iter()
///     .cycle()
///     .take(30)
///     .collect();
/// model.train(&history).expect("30 rounds are enough");
/// let prediction = model.predict(&history).expect("trained");
/// assert_eq!(prediction.outcome, Outcome::Banker);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ForestModel {
    config: ForestConfig,
    forest: Option<RandomForest>,
}

impl ForestModel {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            forest: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    fn fit(
        &mut self,
        history: &[Outcome],
        cancel: Option<&AtomicBool>,
    ) -> Result<TrainingReport, TrainError> {
        if history.len() <= WINDOW_SIZE {
            return Err(TrainError::InsufficientData {
                required: WINDOW_SIZE,
                actual: history.len(),
            });
        }
        let set = build_training_set(history);
        let forest = RandomForest::fit_with_cancel(&set.features, &set.labels, &self.config, cancel)
            .map_err(|err| match err {
                ForestError::Cancelled { .. } => TrainError::Cancelled,
                other => TrainError::Model(other.to_string()),
            })?;

        let report = TrainingReport {
            model: self.name().to_string(),
            history_len: history.len(),
            samples: set.len(),
            trees: forest.n_trees(),
        };
        tracing::debug!(
            samples = report.samples,
            classes = ?forest.classes(),
            "forest fitted"
        );
        self.forest = Some(forest);
        Ok(report)
    }
}

impl SequenceModel for ForestModel {
    fn name(&self) -> &str {
        "forest"
    }

    fn is_trained(&self) -> bool {
        self.forest.is_some()
    }

    fn window(&self) -> usize {
        WINDOW_SIZE
    }

    fn train(&mut self, history: &[Outcome]) -> Result<TrainingReport, TrainError> {
        self.fit(history, None)
    }

    fn train_with_cancel(
        &mut self,
        history: &[Outcome],
        cancel: &AtomicBool,
    ) -> Result<TrainingReport, TrainError> {
        self.fit(history, Some(cancel))
    }

    fn predict(&self, history: &[Outcome]) -> Result<Prediction, PredictError> {
        let forest = self.forest.as_ref().ok_or(PredictError::NotTrained)?;
        let features = latest_window(history).ok_or(PredictError::InsufficientData {
            required: WINDOW_SIZE,
            actual: history.len(),
        })?;

        let proba = forest.predict_proba(&features);
        let index = argmax(&proba)
            .ok_or_else(|| PredictError::ModelFailure("forest has no classes".to_string()))?;
        let label = forest.classes()[index];
        let outcome = Outcome::from_code(label)
            .ok_or_else(|| PredictError::ModelFailure(format!("unknown class label {label}")))?;

        let mut confidence = proba[index] * 100.0;
        if confidence <= 0.0 {
            confidence = proba.iter().copied().fold(0.0, f64::max) * 100.0;
        }
        if !confidence.is_finite() {
            return Err(PredictError::ModelFailure(format!(
                "non-finite confidence {confidence}"
            )));
        }
        Ok(Prediction::new(outcome, confidence))
    }

    fn fresh(&self) -> Box<dyn SequenceModel> {
        Box::new(ForestModel::new(self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::{Banker as B, Player as P, Tie as T};

    fn periodic(pattern: &[Outcome], len: usize) -> Vec<Outcome> {
        pattern.iter().copied().cycle().take(len).collect()
    }

    #[test]
    fn nine_rounds_cannot_train() {
        let mut model = ForestModel::default();
        let err = model.train(&[B; 9]).unwrap_err();
        assert_eq!(
            err,
            TrainError::InsufficientData {
                required: 10,
                actual: 9
            }
        );
        assert!(!model.is_trained());
        // exactly the window is still too short
        assert!(model.train(&[B; 10]).is_err());
        assert!(model.train(&[B; 11]).is_ok());
    }

    #[test]
    fn untrained_model_reports_not_trained() {
        let model = ForestModel::default();
        assert_eq!(model.predict(&[B; 12]).unwrap_err(), PredictError::NotTrained);
    }

    #[test]
    fn short_history_cannot_predict() {
        let mut model = ForestModel::default();
        model.train(&periodic(&[B, P], 20)).unwrap();
        assert_eq!(
            model.predict(&[B; 9]).unwrap_err(),
            PredictError::InsufficientData {
                required: 10,
                actual: 9
            }
        );
    }

    #[test]
    fn learns_a_periodic_sequence() {
        let history = periodic(&[B, B, P, T], 60);
        let mut model = ForestModel::default();
        let report = model.train(&history).unwrap();
        assert_eq!(report.samples, 50);
        assert_eq!(report.trees, 100);

        for cut in 40..48 {
            let prediction = model.predict(&history[..cut]).unwrap();
            assert_eq!(prediction.outcome, history[cut], "after {cut} rounds");
            assert!((0.0..=100.0).contains(&prediction.confidence));
        }
    }

    #[test]
    fn constant_history_predicts_with_full_confidence() {
        let mut model = ForestModel::default();
        model.train(&[P; 15]).unwrap();
        let prediction = model.predict(&[P; 10]).unwrap();
        assert_eq!(prediction.outcome, P);
        assert_eq!(prediction.confidence, 100.0);
    }

    #[test]
    fn training_is_reproducible() {
        let history = periodic(&[B, P, P, B, T, B, P], 50);
        let mut a = ForestModel::default();
        let mut b = ForestModel::default();
        a.train(&history).unwrap();
        b.train(&history).unwrap();
        for cut in 10..history.len() {
            assert_eq!(a.predict(&history[..cut]), b.predict(&history[..cut]));
        }
    }

    #[test]
    fn cancelled_training_keeps_previous_state() {
        let mut model = ForestModel::default();
        let cancel = AtomicBool::new(true);
        let err = model
            .train_with_cancel(&periodic(&[B, P], 30), &cancel)
            .unwrap_err();
        assert_eq!(err, TrainError::Cancelled);
        assert!(!model.is_trained());
    }

    #[test]
    fn fresh_model_is_untrained_with_same_config() {
        let config = ForestConfig {
            n_trees: 7,
            ..ForestConfig::default()
        };
        let mut model = ForestModel::new(config);
        model.train(&[B; 12]).unwrap();
        let fresh = model.fresh();
        assert!(!fresh.is_trained());
        assert_eq!(fresh.name(), "forest");
    }
}
