//! Validation of command-line values before they reach the engine.
//!
//! Card and outcome parsing is shared with the web shell through
//! `baccarat_engine`; this module only adds the CLI's own rules (both
//! hands are required, a history must not be empty).

use crate::error::CliError;
use baccarat_engine::cards::CardInput;
use baccarat_engine::outcome::{Outcome, parse_history};

/// Parse a hand given on the command line (`"34"`, `"3 4"`, `"3,4"`).
///
/// # Example
///
/// ```rust
/// # use baccarat_cli::validation::parse_hand;
/// assert_eq!(parse_hand("banker", "3 4").unwrap(), vec![3, 4]);
/// assert!(parse_hand("player", "").is_err());
/// assert!(parse_hand("player", "1A").is_err());
/// ```
pub fn parse_hand(side: &'static str, text: &str) -> Result<Vec<u8>, CliError> {
    Ok(CardInput::Text(text.to_string()).parse_required(side)?)
}

/// Parse a `--history` value into outcomes. An empty history is rejected.
pub fn parse_history_arg(text: &str) -> Result<Vec<Outcome>, CliError> {
    let history = parse_history(text)?;
    if history.is_empty() {
        return Err(CliError::InvalidInput(
            "history must contain at least one outcome".to_string(),
        ));
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_accept_every_text_layout() {
        assert_eq!(parse_hand("banker", "34").unwrap(), vec![3, 4]);
        assert_eq!(parse_hand("banker", "3,4,0").unwrap(), vec![3, 4, 0]);
    }

    #[test]
    fn empty_hand_names_its_side() {
        let err = parse_hand("player", "  ").unwrap_err();
        assert!(err.to_string().contains("player"), "{}", err);
    }

    #[test]
    fn out_of_range_card_is_rejected() {
        let err = parse_hand("banker", "3 10").unwrap_err();
        assert!(err.to_string().contains("10"), "{}", err);
    }

    #[test]
    fn history_must_not_be_empty() {
        assert!(parse_history_arg(" , ").is_err());
        assert_eq!(parse_history_arg("B P").unwrap().len(), 2);
        assert!(parse_history_arg("BQ").is_err());
    }
}
