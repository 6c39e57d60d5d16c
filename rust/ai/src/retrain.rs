//! When to retrain the sequence model automatically.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainPolicy {
    /// Most recent rounds with a real AI prediction to score.
    pub window: usize,
    /// Fewer scored rounds than this never trigger a retrain.
    pub min_samples: usize,
    /// Retrain when accuracy over the window drops below this (0..=1).
    pub accuracy_threshold: f64,
    /// Operator inactivity required before training starts.
    pub idle_secs: u64,
    /// Grace period during which a scheduled retrain can be cancelled.
    pub delay_secs: u64,
}

impl Default for RetrainPolicy {
    fn default() -> Self {
        Self {
            window: 20,
            min_samples: 10,
            accuracy_threshold: 0.7,
            idle_secs: 30,
            delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainDecision {
    /// Accuracy is fine or there is too little data to judge.
    NotDue,
    /// A training run is already running or scheduled.
    Busy,
    /// Due, but the operator was active too recently.
    AwaitIdle,
    Start,
}

impl RetrainPolicy {
    pub fn idle_window(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// `accuracy` is the share in `0..=1` of correct predictions among
    /// `scored` recent rounds.
    pub fn is_due(&self, accuracy: f64, scored: usize) -> bool {
        scored >= self.min_samples && accuracy < self.accuracy_threshold
    }

    pub fn decide(
        &self,
        accuracy: f64,
        scored: usize,
        busy: bool,
        idle_for: Duration,
    ) -> RetrainDecision {
        if busy {
            RetrainDecision::Busy
        } else if !self.is_due(accuracy, scored) {
            RetrainDecision::NotDue
        } else if idle_for < self.idle_window() {
            RetrainDecision::AwaitIdle
        } else {
            RetrainDecision::Start
        }
    }
}
