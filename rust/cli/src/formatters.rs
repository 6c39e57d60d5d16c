//! Plain-text renderings of predictions, records and statistics.
//!
//! Pure functions returning `String`s; commands decide where they go.
//!
//! ## Example
//!
//! ```rust
//! use baccarat_engine::formula::predict_from_cards;
//! use baccarat_cli::formatters::format_card_prediction;
//!
//! let text = format_card_prediction(&predict_from_cards(&[1, 1], &[9, 9]));
//! assert!(text.starts_with("Prediction: PLAYER (70.0%)"));
//! ```

use baccarat_engine::errors::PredictError;
use baccarat_engine::formula::CardPrediction;
use baccarat_engine::ledger::RoundRecord;
use baccarat_engine::model::Prediction;
use baccarat_engine::stats::Statistics;

pub fn format_card_prediction(result: &CardPrediction) -> String {
    let a = &result.analysis;
    format!(
        "Prediction: {} ({:.1}%)\n\
         Banker: points {} frequency {} advantage {}\n\
         Player: points {} frequency {} advantage {}",
        result.prediction,
        result.confidence,
        a.banker_points,
        a.banker_frequency,
        a.banker_advantage,
        a.player_points,
        a.player_frequency,
        a.player_advantage,
    )
}

/// One line for a predictor: the outcome and confidence, or why there is
/// none.
pub fn format_prediction(label: &str, result: &Result<Prediction, PredictError>) -> String {
    match result {
        Ok(p) => format!("{}: {} ({:.1}%)", label, p.outcome, p.confidence),
        Err(PredictError::InsufficientData { required, actual }) => format!(
            "{}: CANNOT_PREDICT (needs {} rounds, have {})",
            label, required, actual
        ),
        Err(PredictError::NotTrained) => format!("{}: CANNOT_PREDICT (model not trained)", label),
        Err(PredictError::ModelFailure(reason)) => {
            format!("{}: PREDICTION_ERROR ({})", label, reason)
        }
    }
}

/// `Round 12: BANKER | ai PLAYER x | formula BANKER ok`
pub fn format_record(record: &RoundRecord) -> String {
    format!(
        "Round {}: {} | ai {} {} | formula {} {}",
        record.round,
        record.result,
        record.ai_prediction,
        mark(record.ai_correct()),
        record.formula_prediction,
        mark(record.formula_correct()),
    )
}

fn mark(correct: Option<bool>) -> &'static str {
    match correct {
        Some(true) => "ok",
        Some(false) => "x",
        None => "-",
    }
}

pub fn format_statistics(stats: &Statistics) -> String {
    let mut lines = vec![
        format!("Rounds: {}", stats.total_rounds),
        format!(
            "Banker: {} ({:.1}%)  Player: {} ({:.1}%)  Tie: {} ({:.1}%)",
            stats.banker_count,
            stats.banker_percentage,
            stats.player_count,
            stats.player_percentage,
            stats.tie_count,
            stats.tie_percentage,
        ),
        format!(
            "AI accuracy: {:.1}% ({}/{})",
            stats.ai_accuracy, stats.ai_correct, stats.ai_predictions
        ),
        format!(
            "Formula accuracy: {:.1}% ({}/{})",
            stats.formula_accuracy, stats.formula_correct, stats.formula_predictions
        ),
        format!(
            "Predictors agree: {:.1}% ({}/{})",
            stats.match_rate, stats.match_count, stats.comparable_predictions
        ),
    ];
    if let Some(streak) = stats.longest_streak {
        lines.push(format!(
            "Longest streak: {} x{}",
            streak.outcome, streak.length
        ));
    }
    lines.join("\n")
}
