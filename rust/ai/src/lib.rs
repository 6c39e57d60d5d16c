//! # baccarat-ai: Sequence Predictor for Baccarat Outcomes
//!
//! Learns the next outcome of a baccarat shoe from the previous ten, and
//! decides when a model whose recent accuracy slipped should be retrained.
//!
//! ## Core Components
//!
//! - [`features`] - Rolling-window encoding (TIE=0, BANKER=1, PLAYER=2)
//! - [`forest`] - Random forest classifier with Gini splits and bootstrap sampling
//! - [`model`] - [`model::ForestModel`], the [`SequenceModel`] implementation
//! - [`retrain`] - Accuracy-driven retrain policy
//! - [`create_model`] - Factory for models by kind
//!
//! ## Quick Start
//!
//! ```rust
//! use baccarat_ai::create_model;
//! use baccarat_engine::outcome::Outcome;
//!
//! let mut model = create_model("forest").expect("known kind");
//! let history = vec![Outcome::Banker; 12];
//! model.train(&history).expect("enough history");
//! let prediction = model.predict(&history).expect("trained");
//! assert_eq!(prediction.outcome, Outcome::Banker);
//! ```
//!
//! ## Model Kinds
//!
//! - `"forest"` - 100-tree random forest seeded with 42

use baccarat_engine::model::SequenceModel;
use thiserror::Error;

pub mod features;
pub mod forest;
pub mod model;
pub mod retrain;

pub use features::WINDOW_SIZE;
pub use model::ForestModel;
pub use retrain::{RetrainDecision, RetrainPolicy};

/// Kinds accepted by [`create_model`].
pub const MODEL_KINDS: &[&str] = &["forest"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Unknown model kind: {0}")]
    UnknownModel(String),
}

pub fn is_known_model(kind: &str) -> bool {
    MODEL_KINDS.contains(&kind)
}

/// Create an untrained sequence model by kind.
///
/// # Example
///
/// ```rust
/// use baccarat_ai::create_model;
///
/// let model = create_model("forest").unwrap();
/// assert_eq!(model.name(), "forest");
/// assert!(create_model("oracle").is_err());
/// ```
pub fn create_model(kind: &str) -> Result<Box<dyn SequenceModel>, AiError> {
    match kind {
        "forest" => Ok(Box::new(ForestModel::default())),
        other => Err(AiError::UnknownModel(other.to_string())),
    }
}
