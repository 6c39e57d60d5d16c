//! Replay command handler.
//!
//! Feeds a recorded history, round by round, through a fresh table built
//! from the resolved configuration. Every round is predicted again from the
//! rounds before it, so the output shows what the predictors would have said
//! live; predictions stored in the file are ignored.
//!
//! ## Training
//!
//! With `--train` the forest is trained once the history first exceeds the
//! model window, and retrained whenever the retrain policy finds its recent
//! accuracy too low. At least `min_samples` rounds separate two trainings.

use super::configured_table;
use crate::error::CliError;
use crate::formatters::{format_record, format_statistics};
use crate::io_utils::load_records;
use crate::ui;
use baccarat_ai::{RetrainPolicy, WINDOW_SIZE};
use baccarat_engine::Table;
use std::io::Write;

pub fn handle_replay_command(
    input: &str,
    train: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    let records = load_records(input)?;
    if records.is_empty() {
        writeln!(out, "No rounds found in {}.", input)?;
        return Ok(());
    }

    let mut table = configured_table()?;
    let policy = RetrainPolicy::default();
    let mut trainings = 0usize;
    let mut since_training = 0usize;

    for record in records {
        let update = table.add_result(record.result, record.banker_cards, record.player_cards);
        writeln!(out, "{}", format_record(&update.record))?;
        if update.is_new_shoe {
            writeln!(out, "-- new shoe #{} --", update.shoe.shoe_id)?;
        }

        if !train {
            continue;
        }
        since_training += 1;
        if should_train(&table, &policy, since_training) {
            let outcomes = table.outcomes();
            match table.train_classifier(&outcomes) {
                Ok(report) => {
                    trainings += 1;
                    since_training = 0;
                    writeln!(
                        out,
                        "   trained on {} rounds ({} samples)",
                        report.history_len, report.samples
                    )?;
                }
                Err(e) => ui::display_warning(err, &format!("training failed: {}", e))?,
            }
        }
    }

    let shoe = table.shoe_status();
    writeln!(out)?;
    writeln!(out, "{}", format_statistics(&table.statistics()))?;
    writeln!(
        out,
        "Shoe #{}: {} cards remaining, {} rounds",
        shoe.shoe_id, shoe.cards_remaining, shoe.rounds_in_shoe
    )?;
    if train {
        writeln!(out, "Trainings: {}", trainings)?;
    }
    Ok(())
}

fn should_train(table: &Table, policy: &RetrainPolicy, since_training: usize) -> bool {
    if !table.is_trained() {
        return table.history().len() > WINDOW_SIZE;
    }
    if since_training < policy.min_samples {
        return false;
    }
    let (accuracy, scored) = table.recent_ai_accuracy(policy.window);
    policy.is_due(accuracy, scored)
}
