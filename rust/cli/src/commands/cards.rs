//! `cards`: formula prediction from the two hands of the last round.

use crate::error::CliError;
use crate::formatters::format_card_prediction;
use crate::validation::parse_hand;
use baccarat_engine::formula::predict_from_cards;
use std::io::Write;

pub fn handle_cards_command(
    banker: &str,
    player: &str,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let banker = parse_hand("banker", banker)?;
    let player = parse_hand("player", player)?;
    let result = predict_from_cards(&banker, &player);

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        writeln!(out, "{}", format_card_prediction(&result))?;
    }
    Ok(())
}
