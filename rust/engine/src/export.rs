//! CSV and JSON renderings of the round ledger.

use std::borrow::Cow;

use chrono::Local;

use crate::ledger::RoundRecord;

pub const CSV_HEADER: &str =
    "round,result,time,ai_prediction,formula_prediction,ai_correct,formula_correct";

fn correctness(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "",
    }
}

// RFC 4180: quote fields holding a separator, quote or line break
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// One line per round. The correctness columns stay empty for rounds whose
/// predictor could not predict.
pub fn to_csv(records: &[RoundRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            record.round,
            record.result,
            csv_field(&record.time),
            record.ai_prediction,
            record.formula_prediction,
            correctness(record.ai_correct()),
            correctness(record.formula_correct()),
        ));
    }
    out
}

pub fn to_json(records: &[RoundRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.<extension>`
pub fn export_filename(prefix: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        Local::now().format("%Y%m%d_%H%M%S"),
        extension
    )
}
