//! Rolling-window encoding of the outcome history.

use baccarat_engine::outcome::Outcome;

/// Outcomes per feature vector.
pub const WINDOW_SIZE: usize = 10;

pub type FeatureVector = [u8; WINDOW_SIZE];

/// Feature vectors paired with the code of the outcome that followed each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<u8>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Encode exactly [`WINDOW_SIZE`] outcomes, oldest first.
pub fn encode(window: &[Outcome]) -> Option<FeatureVector> {
    if window.len() != WINDOW_SIZE {
        return None;
    }
    let mut features = [0u8; WINDOW_SIZE];
    for (slot, outcome) in features.iter_mut().zip(window) {
        *slot = outcome.code();
    }
    Some(features)
}

/// Features for the most recent window, `None` when history is too short.
pub fn latest_window(history: &[Outcome]) -> Option<FeatureVector> {
    history
        .len()
        .checked_sub(WINDOW_SIZE)
        .and_then(|start| encode(&history[start..]))
}

/// One sample per position preceded by a full window.
pub fn build_training_set(history: &[Outcome]) -> TrainingSet {
    let mut set = TrainingSet::default();
    for (i, next) in history.iter().enumerate().skip(WINDOW_SIZE) {
        if let Some(features) = encode(&history[i - WINDOW_SIZE..i]) {
            set.features.push(features);
            set.labels.push(next.code());
        }
    }
    set
}
