//! File I/O helpers shared by the commands.
//!
//! - Reading text files with automatic .zst decompression
//! - Loading round histories in any of the accepted layouts
//! - Ensuring parent directories exist before file writes
//!
//! ## History Layouts
//!
//! [`load_records`] accepts three layouts, detected from the first
//! non-blank character:
//!
//! - a JSON array of round records, as written by `export --format json`
//!   or `GET /api/export/json`
//! - JSONL, one round record per line
//! - a plain outcome string such as `BBPTB` or `banker, player, tie`
//!
//! Records only need a `result`; missing predictions load as
//! `CANNOT_PREDICT`.

use crate::error::{BatchValidationError, CliError};
use baccarat_engine::ledger::RoundRecord;
use baccarat_engine::outcome::{Forecast, parse_history};

/// Read text file with automatic .zst decompression detection.
///
/// A UTF-8 BOM is stripped if present.
///
/// # Example
///
/// ```rust,no_run
/// # use baccarat_cli::io_utils::read_text_auto;
///
/// let plain = read_text_auto("history.jsonl").unwrap();
/// let compressed = read_text_auto("history.jsonl.zst").unwrap();
/// ```
pub fn read_text_auto(path: &str) -> Result<String, String> {
    let mut content = if path.ends_with(".zst") {
        let comp = std::fs::read(path).map_err(|e| e.to_string())?;
        let dec = zstd::bulk::decompress(&comp, 8 * 1024 * 1024).map_err(|e| e.to_string())?;
        String::from_utf8(dec).map_err(|e| e.to_string())?
    } else {
        std::fs::read_to_string(path).map_err(|e| e.to_string())?
    };
    strip_utf8_bom(&mut content);
    Ok(content)
}

/// Ensure parent directory exists for given path, creating if needed.
pub fn ensure_parent_dir(path: &std::path::Path) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    Ok(())
}

/// Read and parse a history file. See the module docs for the layouts.
pub fn load_records(path: &str) -> Result<Vec<RoundRecord>, CliError> {
    let content = read_text_auto(path)
        .map_err(|e| CliError::InvalidInput(format!("Failed to read {}: {}", path, e)))?;
    parse_records(&content)
}

pub fn parse_records(content: &str) -> Result<Vec<RoundRecord>, CliError> {
    let trimmed = content.trim_start();
    match trimmed.chars().next() {
        None => Ok(Vec::new()),
        Some('[') => {
            let records: Vec<RoundRecord> = serde_json::from_str(trimmed)
                .map_err(|e| CliError::InvalidInput(format!("Invalid history array: {}", e)))?;
            for (idx, record) in records.iter().enumerate() {
                record.validate_cards().map_err(|e| BatchValidationError {
                    item_context: format!("record {}", idx + 1),
                    message: e.to_string(),
                })?;
            }
            Ok(records)
        }
        Some('{') => parse_jsonl(content),
        Some(_) => {
            let outcomes = parse_history(content)?;
            Ok(outcomes
                .into_iter()
                .enumerate()
                .map(|(i, result)| RoundRecord {
                    round: i + 1,
                    result,
                    time: String::new(),
                    ai_prediction: Forecast::CannotPredict,
                    formula_prediction: Forecast::CannotPredict,
                    banker_cards: None,
                    player_cards: None,
                })
                .collect())
        }
    }
}

fn parse_jsonl(content: &str) -> Result<Vec<RoundRecord>, CliError> {
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<RoundRecord>(line)
            .map_err(|e| e.to_string())
            .and_then(|r| r.validate_cards().map(|()| r).map_err(|e| e.to_string()))
            .map_err(|message| BatchValidationError {
                item_context: format!("line {}", idx + 1),
                message,
            })?;
        records.push(record);
    }
    Ok(records)
}

fn strip_utf8_bom(s: &mut String) {
    const UTF8_BOM: &str = "\u{feff}";
    if s.starts_with(UTF8_BOM) {
        s.drain(..UTF8_BOM.len());
    }
}
