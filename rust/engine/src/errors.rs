use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid card value: {value} (cards must be digits 0-9)")]
    InvalidCardValue { value: String },
    #[error("No cards supplied for the {side} hand")]
    EmptyHand { side: &'static str },
    #[error("Invalid outcome: {0} (expected BANKER, PLAYER or TIE)")]
    InvalidOutcome(String),
    #[error("No recorded round to undo")]
    NothingToUndo,
    #[error("Import contains no records")]
    EmptyImport,
}

/// Why a predictor could not produce a label.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredictError {
    #[error("Need at least {required} rounds of history, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("Model has not been trained")]
    NotTrained,
    #[error("Model failure: {0}")]
    ModelFailure(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrainError {
    #[error("Need more than {required} rounds to train, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("Training failed: {0}")]
    Model(String),
    #[error("Training was cancelled")]
    Cancelled,
}
