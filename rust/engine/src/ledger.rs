use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::outcome::{Forecast, Outcome};

/// Timestamp layout stored on every record.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One dealt round together with the predictions made before it.
///
/// Predictions are frozen when the record is appended and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based position in the ledger
    #[serde(default)]
    pub round: usize,
    pub result: Outcome,
    /// Local time the round was recorded (`%Y-%m-%d %H:%M:%S`)
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub ai_prediction: Forecast,
    #[serde(default)]
    pub formula_prediction: Forecast,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banker_cards: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_cards: Option<Vec<u8>>,
}

impl RoundRecord {
    pub fn ai_correct(&self) -> Option<bool> {
        self.ai_prediction.outcome().map(|p| p == self.result)
    }

    pub fn formula_correct(&self) -> Option<bool> {
        self.formula_prediction.outcome().map(|p| p == self.result)
    }

    /// Rejects any stored card outside the 0-9 point range.
    pub fn validate_cards(&self) -> Result<(), GameError> {
        let cards = self.banker_cards.iter().chain(&self.player_cards).flatten();
        match cards.copied().find(|&value| value > 9) {
            Some(value) => Err(GameError::InvalidCardValue {
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Both hands' cards concatenated, if any were recorded.
    pub fn dealt_cards(&self) -> Option<Vec<u8>> {
        match (&self.banker_cards, &self.player_cards) {
            (None, None) => None,
            (banker, player) => {
                let mut cards = banker.clone().unwrap_or_default();
                cards.extend(player.iter().flatten());
                Some(cards)
            }
        }
    }
}

pub fn now_timestamp() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

/// Append-only, undo-able log of rounds.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    records: Vec<RoundRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&RoundRecord> {
        self.records.last()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.records.iter().map(|r| r.result).collect()
    }

    pub fn append(
        &mut self,
        result: Outcome,
        ai_prediction: Forecast,
        formula_prediction: Forecast,
        banker_cards: Option<Vec<u8>>,
        player_cards: Option<Vec<u8>>,
    ) -> &RoundRecord {
        let record = RoundRecord {
            round: self.records.len() + 1,
            result,
            time: now_timestamp(),
            ai_prediction,
            formula_prediction,
            banker_cards,
            player_cards,
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn pop(&mut self) -> Option<RoundRecord> {
        self.records.pop()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Replace the whole ledger. Records are renumbered from 1 and a
    /// missing timestamp is filled with the current time.
    pub fn replace(&mut self, records: Vec<RoundRecord>) {
        self.records = records
            .into_iter()
            .enumerate()
            .map(|(i, mut record)| {
                record.round = i + 1;
                if record.time.is_empty() {
                    record.time = now_timestamp();
                }
                record
            })
            .collect();
    }

    /// Share of correct AI predictions among the last `window` rounds that
    /// carried one, with the number of such rounds.
    pub fn recent_ai_accuracy(&self, window: usize) -> (f64, usize) {
        let scored: Vec<bool> = self
            .records
            .iter()
            .rev()
            .filter_map(RoundRecord::ai_correct)
            .take(window)
            .collect();
        if scored.is_empty() {
            return (0.0, 0);
        }
        let correct = scored.iter().filter(|c| **c).count();
        (correct as f64 / scored.len() as f64, scored.len())
    }
}
