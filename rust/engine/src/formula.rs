//! Card formula and streak heuristics.
//!
//! Everything here is a pure function over point values in `0..=9`.

use serde::{Deserialize, Serialize};

use crate::errors::PredictError;
use crate::model::Prediction;
use crate::outcome::Outcome;

/// Outcomes needed by [`predict_from_sequence`].
pub const SEQUENCE_WINDOW: usize = 5;

fn point_sum(cards: &[u8]) -> u32 {
    cards.iter().map(|&c| c as u32).sum::<u32>() % 10
}

/// Baccarat points of a hand.
pub fn hand_points(cards: &[u8]) -> u8 {
    point_sum(cards) as u8
}

pub fn player_frequency(cards: &[u8]) -> i32 {
    match point_sum(cards) {
        7..=9 => 2,
        0 | 1 | 3 | 4 => 1,
        2 | 5 | 6 => -5,
        _ => 0,
    }
}

pub fn banker_frequency(cards: &[u8]) -> i32 {
    match point_sum(cards) {
        7..=9 => 3,
        0 | 1 | 3 | 4 | 6 => 2,
        2 | 5 => -5,
        _ => 0,
    }
}

pub fn advantage_value(cards: &[u8]) -> i32 {
    cards
        .iter()
        .map(|&card| match card {
            1 | 4 | 5 | 7 | 8 => 2,
            2 | 3 => -3,
            6 | 9 => -5,
            _ => 0,
        })
        .sum()
}

/// Scores of both hands without a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAnalysis {
    pub banker_points: u8,
    pub player_points: u8,
    pub banker_frequency: i32,
    pub player_frequency: i32,
    pub banker_advantage: i32,
    pub player_advantage: i32,
}

pub fn analyze_cards(banker: &[u8], player: &[u8]) -> CardAnalysis {
    CardAnalysis {
        banker_points: hand_points(banker),
        player_points: hand_points(player),
        banker_frequency: banker_frequency(banker),
        player_frequency: player_frequency(player),
        banker_advantage: advantage_value(banker),
        player_advantage: advantage_value(player),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardPrediction {
    pub prediction: Outcome,
    pub confidence: f64,
    #[serde(flatten)]
    pub analysis: CardAnalysis,
}

/// Frequencies decide first, advantages break a frequency tie, a full tie
/// predicts TIE.
pub fn predict_from_cards(banker: &[u8], player: &[u8]) -> CardPrediction {
    let analysis = analyze_cards(banker, player);
    let freq_diff = analysis.banker_frequency - analysis.player_frequency;
    let adv_diff = analysis.banker_advantage - analysis.player_advantage;

    let (prediction, confidence) = if freq_diff != 0 {
        let side = if freq_diff > 0 {
            Outcome::Banker
        } else {
            Outcome::Player
        };
        (side, (freq_diff.abs() * 10).min(100))
    } else if adv_diff != 0 {
        let side = if adv_diff > 0 {
            Outcome::Banker
        } else {
            Outcome::Player
        };
        (side, (adv_diff.abs() * 5).min(100))
    } else {
        (Outcome::Tie, 50)
    };

    CardPrediction {
        prediction,
        confidence: confidence as f64,
        analysis,
    }
}

/// Streak and alternation heuristic over the last five outcomes.
pub fn predict_from_sequence(history: &[Outcome]) -> Result<Prediction, PredictError> {
    if history.len() < SEQUENCE_WINDOW {
        return Err(PredictError::InsufficientData {
            required: SEQUENCE_WINDOW,
            actual: history.len(),
        });
    }
    let recent = &history[history.len() - SEQUENCE_WINDOW..];
    let latest = recent[SEQUENCE_WINDOW - 1];

    let repeats = recent.windows(2).filter(|w| w[0] == w[1]).count() as u32;
    let alternations = (SEQUENCE_WINDOW as u32 - 1) - repeats;
    let bankers = recent.iter().filter(|o| **o == Outcome::Banker).count();
    let players = recent.iter().filter(|o| **o == Outcome::Player).count();

    let (outcome, confidence) = if repeats >= 3 {
        (latest, 60 + 5 * repeats)
    } else if alternations >= 3 {
        (latest.opposite(), 60 + 5 * alternations)
    } else if bankers > players + 1 {
        (Outcome::Player, 55)
    } else if players > bankers + 1 {
        (Outcome::Banker, 55)
    } else {
        (latest, 50)
    };

    Ok(Prediction::new(outcome, confidence.min(100) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::{Banker as B, Player as P, Tie as T};

    #[test]
    fn frequency_tables_match_every_point_total() {
        let player: Vec<i32> = (0..10u8).map(|p| player_frequency(&[p])).collect();
        assert_eq!(player, vec![1, 1, -5, 1, 1, -5, -5, 2, 2, 2]);
        let banker: Vec<i32> = (0..10u8).map(|p| banker_frequency(&[p])).collect();
        assert_eq!(banker, vec![2, 2, -5, 2, 2, -5, 2, 3, 3, 3]);
    }

    #[test]
    fn frequency_uses_sum_mod_ten() {
        assert_eq!(player_frequency(&[9, 9]), player_frequency(&[8]));
        assert_eq!(banker_frequency(&[5, 5, 5]), banker_frequency(&[5]));
    }

    #[test]
    fn advantage_is_order_independent() {
        assert_eq!(advantage_value(&[1, 2, 6]), advantage_value(&[6, 1, 2]));
        assert_eq!(advantage_value(&[1, 2, 6]), 2 - 3 - 5);
        assert_eq!(advantage_value(&[0]), 0);
    }

    #[test]
    fn three_four_against_nine_nine() {
        let result = predict_from_cards(&[3, 4], &[9, 9]);
        assert_eq!(result.analysis.banker_points, 7);
        assert_eq!(result.analysis.player_points, 8);
        assert_eq!(result.analysis.banker_frequency, 3);
        assert_eq!(result.analysis.player_frequency, 2);
        assert_eq!(result.prediction, Outcome::Banker);
        assert_eq!(result.confidence, 10.0);
    }

    #[test]
    fn low_banker_total_favours_player() {
        let result = predict_from_cards(&[1, 1], &[9, 9]);
        assert_eq!(result.prediction, Outcome::Player);
        assert_eq!(result.confidence, 70.0);
    }

    #[test]
    fn advantage_breaks_frequency_tie() {
        // both frequencies 2, advantages +2 vs -1
        let result = predict_from_cards(&[0, 1], &[3, 4]);
        assert_eq!(result.analysis.banker_frequency, 2);
        assert_eq!(result.analysis.player_frequency, 2);
        assert_eq!(result.prediction, Outcome::Banker);
        assert_eq!(result.confidence, 15.0);
    }

    #[test]
    fn full_tie_predicts_tie() {
        let result = predict_from_cards(&[0], &[0]);
        assert_eq!(result.prediction, Outcome::Tie);
        assert_eq!(result.confidence, 50.0);
    }

    #[test]
    fn streak_repeats_latest() {
        let p = predict_from_sequence(&[B, B, B, B, B]).unwrap();
        assert_eq!(p.outcome, B);
        assert_eq!(p.confidence, 80.0);

        let p = predict_from_sequence(&[P, B, B, B, B]).unwrap();
        assert_eq!(p.outcome, B);
        assert_eq!(p.confidence, 75.0);
    }

    #[test]
    fn alternation_flips_but_keeps_tie() {
        let p = predict_from_sequence(&[B, P, B, P, B]).unwrap();
        assert_eq!(p.outcome, P);
        assert_eq!(p.confidence, 80.0);

        let p = predict_from_sequence(&[B, T, P, B, T]).unwrap();
        assert_eq!(p.outcome, T);
    }

    #[test]
    fn reversion_and_fallback() {
        // two repeats, two alternations: counts decide
        let p = predict_from_sequence(&[B, B, P, B, B]).unwrap();
        assert_eq!(p.outcome, P);
        assert_eq!(p.confidence, 55.0);

        let p = predict_from_sequence(&[P, P, B, P, P]).unwrap();
        assert_eq!(p.outcome, B);

        let p = predict_from_sequence(&[B, B, T, T, P]).unwrap();
        assert_eq!(p.outcome, P);
        assert_eq!(p.confidence, 50.0);
    }

    #[test]
    fn short_history_cannot_predict() {
        let err = predict_from_sequence(&[B, B, B, B]).unwrap_err();
        assert_eq!(
            err,
            PredictError::InsufficientData {
                required: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn only_last_five_matter() {
        let long = [P, P, P, P, P, P, B, P, B, P, B];
        let short = [B, P, B, P, B];
        assert_eq!(
            predict_from_sequence(&long).unwrap(),
            predict_from_sequence(&short).unwrap()
        );
    }
}
