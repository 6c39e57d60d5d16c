use serde::{Deserialize, Serialize};

use crate::ledger::RoundRecord;
use crate::outcome::Outcome;

/// Aggregate view of a ledger. Always derived, never stored.
///
/// Accuracy and match rates use the number of rounds that carried a real
/// prediction as denominator; every percentage is 0 when that is 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_rounds: usize,
    pub banker_count: usize,
    pub player_count: usize,
    pub tie_count: usize,
    pub banker_percentage: f64,
    pub player_percentage: f64,
    pub tie_percentage: f64,
    pub ai_correct: usize,
    pub ai_predictions: usize,
    pub ai_accuracy: f64,
    pub formula_correct: usize,
    pub formula_predictions: usize,
    pub formula_accuracy: f64,
    pub match_count: usize,
    pub comparable_predictions: usize,
    pub match_rate: f64,
    pub longest_streak: Option<Streak>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub outcome: Outcome,
    pub length: usize,
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn compute_statistics(records: &[RoundRecord]) -> Statistics {
    let mut stats = Statistics {
        total_rounds: records.len(),
        ..Statistics::default()
    };

    for record in records {
        match record.result {
            Outcome::Banker => stats.banker_count += 1,
            Outcome::Player => stats.player_count += 1,
            Outcome::Tie => stats.tie_count += 1,
        }

        if let Some(correct) = record.ai_correct() {
            stats.ai_predictions += 1;
            stats.ai_correct += correct as usize;
        }
        if let Some(correct) = record.formula_correct() {
            stats.formula_predictions += 1;
            stats.formula_correct += correct as usize;
        }
        if let (Some(ai), Some(formula)) = (
            record.ai_prediction.outcome(),
            record.formula_prediction.outcome(),
        ) {
            stats.comparable_predictions += 1;
            stats.match_count += (ai == formula) as usize;
        }
    }

    stats.banker_percentage = percentage(stats.banker_count, stats.total_rounds);
    stats.player_percentage = percentage(stats.player_count, stats.total_rounds);
    stats.tie_percentage = percentage(stats.tie_count, stats.total_rounds);
    stats.ai_accuracy = percentage(stats.ai_correct, stats.ai_predictions);
    stats.formula_accuracy = percentage(stats.formula_correct, stats.formula_predictions);
    stats.match_rate = percentage(stats.match_count, stats.comparable_predictions);
    stats.longest_streak = longest_streak(records.iter().map(|r| r.result));
    stats
}

/// Longest run of one outcome; the earliest wins a draw.
pub fn longest_streak(outcomes: impl IntoIterator<Item = Outcome>) -> Option<Streak> {
    let mut best: Option<Streak> = None;
    let mut current: Option<Streak> = None;
    for outcome in outcomes {
        current = match current {
            Some(s) if s.outcome == outcome => Some(Streak {
                outcome,
                length: s.length + 1,
            }),
            _ => Some(Streak { outcome, length: 1 }),
        };
        if let Some(run) = current {
            if best.map_or(true, |b| run.length > b.length) {
                best = Some(run);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Forecast;

    fn record(result: Outcome, ai: Forecast, formula: Forecast) -> RoundRecord {
        RoundRecord {
            round: 0,
            result,
            time: String::new(),
            ai_prediction: ai,
            formula_prediction: formula,
            banker_cards: None,
            player_cards: None,
        }
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats, Statistics::default());
        assert_eq!(stats.ai_accuracy, 0.0);
        assert_eq!(stats.match_rate, 0.0);
        assert!(stats.longest_streak.is_none());
    }

    #[test]
    fn sentinels_are_excluded_from_denominators() {
        let records = vec![
            record(Outcome::Banker, Forecast::Banker, Forecast::Player),
            record(Outcome::Player, Forecast::CannotPredict, Forecast::Player),
            record(Outcome::Tie, Forecast::PredictionError, Forecast::Banker),
            record(Outcome::Banker, Forecast::Player, Forecast::Player),
        ];
        let stats = compute_statistics(&records);
        assert_eq!(stats.total_rounds, 4);
        assert_eq!(stats.banker_percentage, 50.0);
        assert_eq!(stats.ai_predictions, 2);
        assert_eq!(stats.ai_correct, 1);
        assert_eq!(stats.ai_accuracy, 50.0);
        assert_eq!(stats.formula_predictions, 4);
        assert_eq!(stats.formula_accuracy, 25.0);
        assert_eq!(stats.comparable_predictions, 2);
        assert_eq!(stats.match_count, 1);
        assert_eq!(stats.match_rate, 50.0);
    }

    #[test]
    fn percentages_stay_in_range() {
        let records: Vec<RoundRecord> = (0..7)
            .map(|_| record(Outcome::Tie, Forecast::Tie, Forecast::Tie))
            .collect();
        let stats = compute_statistics(&records);
        for value in [
            stats.tie_percentage,
            stats.ai_accuracy,
            stats.formula_accuracy,
            stats.match_rate,
        ] {
            assert!((0.0..=100.0).contains(&value));
        }
        assert_eq!(stats.ai_accuracy, 100.0);
    }

    #[test]
    fn streak_picks_first_longest_run() {
        use Outcome::*;
        let streak = longest_streak([Banker, Banker, Player, Player, Tie]).unwrap();
        assert_eq!(streak, Streak { outcome: Banker, length: 2 });
        let streak = longest_streak([Player, Tie, Tie, Tie, Banker]).unwrap();
        assert_eq!(streak, Streak { outcome: Tie, length: 3 });
    }
}
