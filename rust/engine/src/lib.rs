//! # baccarat-engine: Baccarat Table Core
//!
//! Tracks baccarat rounds, the state of a multi-deck shoe and the two
//! predictors that annotate every round: a card formula with a streak
//! heuristic, and a pluggable sequence classifier.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card representation, baccarat point values and card input parsing
//! - [`outcome`] - Round outcomes and the prediction labels stored on records
//! - [`formula`] - Frequency and advantage tables, card and streak predictions
//! - [`shoe`] - Shoe state machine with warm-up, reshuffle detection and exact undo
//! - [`ledger`] - Round records and the undo-able history
//! - [`stats`] - Statistics derived from the history
//! - [`model`] - The [`model::SequenceModel`] seam implemented by classifiers
//! - [`table`] - The context object tying everything together
//! - [`export`] - CSV and JSON renderings of the history
//! - [`errors`] - Error types
//!
//! ## Quick Start
//!
//! ```rust
//! use baccarat_engine::formula::predict_from_cards;
//! use baccarat_engine::outcome::Outcome;
//!
//! let result = predict_from_cards(&[1, 1], &[9, 9]);
//! assert_eq!(result.prediction, Outcome::Player);
//! assert_eq!(result.confidence, 70.0);
//! ```
//!
//! ## Deterministic Shoes
//!
//! Shoes are shuffled with a seeded ChaCha20 generator:
//!
//! ```rust
//! use baccarat_engine::shoe::{Shoe, ShoeSettings};
//!
//! let settings = ShoeSettings { seed: Some(42), ..ShoeSettings::default() };
//! let shoe = Shoe::new(settings);
//! assert_eq!(shoe.remaining(), 416);
//! ```

pub mod cards;
pub mod errors;
pub mod export;
pub mod formula;
pub mod ledger;
pub mod model;
pub mod outcome;
pub mod shoe;
pub mod stats;
pub mod table;

pub use errors::{GameError, PredictError, TrainError};
pub use model::{Prediction, SequenceModel, TrainingReport};
pub use outcome::{Forecast, Outcome};
pub use table::{Table, TableConfig};
