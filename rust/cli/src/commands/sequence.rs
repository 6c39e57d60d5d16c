//! `sequence`: predictions for the round after a given history.
//!
//! The streak heuristic always runs. With `--ai` a forest is trained on the
//! history first; a history too short to train on is reported, not failed.

use crate::error::CliError;
use crate::formatters::format_prediction;
use crate::validation::parse_history_arg;
use baccarat_engine::errors::{PredictError, TrainError};
use baccarat_engine::model::{Prediction, TrainingReport};
use baccarat_engine::outcome::{Forecast, Outcome};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct PredictionView {
    prediction: Forecast,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<&Result<Prediction, PredictError>> for PredictionView {
    fn from(result: &Result<Prediction, PredictError>) -> Self {
        match result {
            Ok(p) => PredictionView {
                prediction: p.outcome.into(),
                confidence: p.confidence,
                reason: None,
            },
            Err(err) => PredictionView {
                prediction: Forecast::from_result(result),
                confidence: 0.0,
                reason: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SequenceReport {
    history_len: usize,
    formula: PredictionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai: Option<PredictionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    training: Option<TrainingReport>,
}

pub fn handle_sequence_command(
    history: &str,
    ai: bool,
    json: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    let history = parse_history_arg(history)?;
    let formula = baccarat_engine::formula::predict_from_sequence(&history);

    let (ai_result, training) = if ai {
        let (result, report) = train_and_predict(&history, err)?;
        (Some(result), report)
    } else {
        (None, None)
    };

    if json {
        let report = SequenceReport {
            history_len: history.len(),
            formula: PredictionView::from(&formula),
            ai: ai_result.as_ref().map(PredictionView::from),
            training,
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(out, "History: {} rounds", history.len())?;
        writeln!(out, "{}", format_prediction("Formula", &formula))?;
        if let Some(result) = &ai_result {
            writeln!(out, "{}", format_prediction("AI", result))?;
        }
    }
    Ok(())
}

fn train_and_predict(
    history: &[Outcome],
    err: &mut dyn Write,
) -> Result<(Result<Prediction, PredictError>, Option<TrainingReport>), CliError> {
    let mut model =
        baccarat_ai::create_model("forest").map_err(|e| CliError::Engine(e.to_string()))?;
    match model.train(history) {
        Ok(report) => Ok((model.predict(history), Some(report))),
        Err(TrainError::InsufficientData { required, actual }) => {
            writeln!(
                err,
                "Training skipped: need more than {} rounds, got {}",
                required, actual
            )?;
            Ok((Err(PredictError::NotTrained), None))
        }
        Err(e) => Err(e.into()),
    }
}
