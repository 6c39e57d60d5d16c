//! `export`: convert a recorded history to CSV or JSON.
//!
//! Records are renumbered from 1 and missing timestamps are filled in, the
//! same normalisation an import into a table applies.

use crate::cli::ExportFormat;
use crate::error::CliError;
use crate::io_utils::{ensure_parent_dir, load_records};
use baccarat_engine::export::{to_csv, to_json};
use baccarat_engine::ledger::Ledger;
use std::io::Write;
use std::path::Path;

pub fn handle_export_command(
    input: &str,
    format: ExportFormat,
    output: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let records = load_records(input)?;
    if records.is_empty() {
        return Err(CliError::InvalidInput(format!("No rounds found in {}", input)));
    }
    let mut ledger = Ledger::new();
    ledger.replace(records);

    let content = match format {
        ExportFormat::Csv => to_csv(ledger.records()),
        ExportFormat::Json => {
            let mut json = to_json(ledger.records())?;
            json.push('\n');
            json
        }
    };

    match output {
        Some(path) => {
            ensure_parent_dir(Path::new(path)).map_err(CliError::InvalidInput)?;
            std::fs::write(path, content)?;
            writeln!(
                out,
                "Exported {} rounds to {} ({})",
                ledger.len(),
                path,
                format.as_str()
            )?;
        }
        None => out.write_all(content.as_bytes())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use baccarat_engine::export::CSV_HEADER;
    use std::fs;

    #[test]
    fn csv_to_stdout_renumbers_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("h.jsonl");
        fs::write(
            &input,
            "{\"round\":7,\"result\":\"BANKER\",\"ai_prediction\":\"BANKER\"}\n{\"round\":9,\"result\":\"TIE\"}\n",
        )
        .unwrap();

        let mut out = Vec::new();
        handle_export_command(input.to_str().unwrap(), ExportFormat::Csv, None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,BANKER,"), "{}", lines[1]);
        assert!(lines[1].ends_with(",BANKER,CANNOT_PREDICT,yes,"), "{}", lines[1]);
        assert!(lines[2].starts_with("2,TIE,"));
    }

    #[test]
    fn json_to_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("h.txt");
        fs::write(&input, "BPT").unwrap();
        let output = dir.path().join("out").join("history.json");

        let mut out = Vec::new();
        handle_export_command(
            input.to_str().unwrap(),
            ExportFormat::Json,
            Some(output.to_str().unwrap()),
            &mut out,
        )
        .unwrap();

        assert!(String::from_utf8(out).unwrap().starts_with("Exported 3 rounds"));
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 3);
        assert_eq!(v[2]["result"], "TIE");
        assert!(!v[0]["time"].as_str().unwrap().is_empty());
    }

    #[test]
    fn empty_history_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.json");
        fs::write(&input, "[]").unwrap();
        let mut out = Vec::new();
        let err = handle_export_command(input.to_str().unwrap(), ExportFormat::Csv, None, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("No rounds found"));
    }
}
