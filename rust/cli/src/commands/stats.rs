//! `stats`: statistics of a recorded history.
//!
//! Predictions stored in the file are scored as recorded; a plain outcome
//! string carries none, so only the outcome shares are meaningful for it.

use crate::error::CliError;
use crate::formatters::format_statistics;
use crate::io_utils::load_records;
use crate::ui;
use baccarat_engine::stats::compute_statistics;
use std::io::Write;

pub fn handle_stats_command(
    input: &str,
    json: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    let records = load_records(input)?;
    if records.is_empty() {
        ui::display_warning(err, &format!("No rounds found in {}", input))?;
    }
    let stats = compute_statistics(&records);

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        writeln!(out, "{}", format_statistics(&stats))?;
    }
    Ok(())
}
