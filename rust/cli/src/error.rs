//! Error types for the CLI application.
//!
//! ## Batch Validation Errors
//!
//! `BatchValidationError<T>` records which entry of an input file failed and
//! why, so a loader can report the exact line or array index.

use baccarat_engine::errors::{GameError, PredictError, TrainError};
use std::fmt;

/// Custom error type for CLI operations.
///
/// Every variant maps to exit code `2`.
#[derive(Debug)]
pub enum CliError {
    /// I/O error (file operations, stdout/stderr writes, etc.)
    Io(std::io::Error),

    /// Invalid user input or command-line arguments
    InvalidInput(String),

    /// Configuration error
    Config(String),

    /// Table or model error
    Engine(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        CliError::Io(error)
    }
}

// Card and outcome parsing failures are the user's input
impl From<GameError> for CliError {
    fn from(error: GameError) -> Self {
        match error {
            GameError::InvalidCardValue { .. }
            | GameError::EmptyHand { .. }
            | GameError::InvalidOutcome(_)
            | GameError::EmptyImport => CliError::InvalidInput(error.to_string()),
            GameError::NothingToUndo => CliError::Engine(error.to_string()),
        }
    }
}

impl From<TrainError> for CliError {
    fn from(error: TrainError) -> Self {
        CliError::Engine(error.to_string())
    }
}

impl From<PredictError> for CliError {
    fn from(error: PredictError) -> Self {
        CliError::Engine(error.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        CliError::Engine(format!("JSON encoding failed: {}", error))
    }
}

/// Failure of one entry in a batch input, with the entry it came from.
///
/// # Examples
///
/// ```rust
/// use baccarat_cli::BatchValidationError;
///
/// let error = BatchValidationError {
///     item_context: "line 5".to_string(),
///     message: "Invalid outcome: X".to_string(),
/// };
/// assert_eq!(error.to_string(), "line 5: Invalid outcome: X");
/// ```
#[derive(Debug)]
pub struct BatchValidationError<T> {
    /// Context identifying the entry that failed validation
    pub item_context: T,
    pub message: String,
}

impl<T: std::fmt::Display> std::fmt::Display for BatchValidationError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item_context, self.message)
    }
}

impl<T: std::fmt::Display> From<BatchValidationError<T>> for CliError {
    fn from(error: BatchValidationError<T>) -> Self {
        CliError::InvalidInput(error.to_string())
    }
}
