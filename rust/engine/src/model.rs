//! Seam between the table and a trainable outcome classifier.

use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;

use crate::errors::{PredictError, TrainError};
use crate::outcome::Outcome;

/// A predicted outcome with a confidence in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: Outcome,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(outcome: Outcome, confidence: f64) -> Self {
        Self {
            outcome,
            confidence: confidence.clamp(0.0, 100.0),
        }
    }
}

/// Summary of a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model: String,
    pub history_len: usize,
    pub samples: usize,
    pub trees: usize,
}

/// Classifier over the outcome sequence.
///
/// Implementations must leave their trained state untouched when training
/// fails so a failed run never degrades a working model.
pub trait SequenceModel: Send + Sync {
    fn name(&self) -> &str;

    fn is_trained(&self) -> bool;

    /// Minimum history length accepted by [`SequenceModel::predict`].
    fn window(&self) -> usize;

    fn train(&mut self, history: &[Outcome]) -> Result<TrainingReport, TrainError>;

    /// Train while polling `cancel`. The default ignores the flag.
    fn train_with_cancel(
        &mut self,
        history: &[Outcome],
        cancel: &AtomicBool,
    ) -> Result<TrainingReport, TrainError> {
        let _ = cancel;
        self.train(history)
    }

    fn predict(&self, history: &[Outcome]) -> Result<Prediction, PredictError>;

    /// An untrained model of the same kind and parameters.
    fn fresh(&self) -> Box<dyn SequenceModel>;
}

/// Model that never trains; used where no classifier is configured.
#[derive(Debug, Default, Clone)]
pub struct UntrainedModel;

impl SequenceModel for UntrainedModel {
    fn name(&self) -> &str {
        "none"
    }

    fn is_trained(&self) -> bool {
        false
    }

    fn window(&self) -> usize {
        10
    }

    fn train(&mut self, _history: &[Outcome]) -> Result<TrainingReport, TrainError> {
        Err(TrainError::Model("no classifier configured".to_string()))
    }

    fn predict(&self, _history: &[Outcome]) -> Result<Prediction, PredictError> {
        Err(PredictError::NotTrained)
    }

    fn fresh(&self) -> Box<dyn SequenceModel> {
        Box::new(UntrainedModel)
    }
}
