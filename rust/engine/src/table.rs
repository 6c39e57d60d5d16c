//! A single baccarat table: ledger, shoe and sequence model behind one API.

use serde::{Deserialize, Serialize};

use crate::errors::{GameError, PredictError, TrainError};
use crate::formula::{self, CardPrediction};
use crate::ledger::{Ledger, RoundRecord};
use crate::model::{Prediction, SequenceModel, TrainingReport};
use crate::outcome::{Forecast, Outcome};
use crate::shoe::{Shoe, ShoeSettings, ShoeSnapshot};
use crate::stats::{compute_statistics, Statistics};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub shoe: ShoeSettings,
    /// Store CANNOT_PREDICT for both predictors while the shoe warms up.
    pub suppress_warmup_predictions: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundUpdate {
    pub record: RoundRecord,
    pub statistics: Statistics,
    pub is_new_shoe: bool,
    pub shoe: ShoeSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoUpdate {
    pub removed: RoundRecord,
    pub statistics: Statistics,
    pub shoe: ShoeSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub statistics: Statistics,
    pub shoe: ShoeSnapshot,
}

pub struct Table {
    config: TableConfig,
    ledger: Ledger,
    shoe: Shoe,
    model: Box<dyn SequenceModel>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("rounds", &self.ledger.len())
            .field("shoe_id", &self.shoe.id())
            .field("model", &self.model.name())
            .field("trained", &self.model.is_trained())
            .finish()
    }
}

impl Table {
    pub fn new(config: TableConfig, model: Box<dyn SequenceModel>) -> Self {
        let shoe = Shoe::new(config.shoe.clone());
        Self {
            config,
            ledger: Ledger::new(),
            shoe,
            model,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn shoe_status(&self) -> ShoeSnapshot {
        self.shoe.snapshot()
    }

    pub fn start_new_shoe(&mut self) -> u64 {
        self.shoe.start_new_shoe()
    }

    pub fn reset_current_shoe(&mut self) -> u64 {
        self.shoe.reset_current_shoe()
    }

    pub fn update_shoe_settings(&mut self, auto_detect: bool, warmup_size: usize) {
        self.config.shoe.auto_detect = auto_detect;
        self.config.shoe.warmup_size = warmup_size;
        self.shoe.update_settings(auto_detect, warmup_size);
    }

    pub fn model(&self) -> &dyn SequenceModel {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Swap in a model trained elsewhere.
    pub fn replace_model(&mut self, model: Box<dyn SequenceModel>) {
        tracing::info!(model = model.name(), trained = model.is_trained(), "model replaced");
        self.model = model;
    }

    /// Train the table's model in place. A failure leaves the previous
    /// model untouched.
    pub fn train_classifier(&mut self, history: &[Outcome]) -> Result<TrainingReport, TrainError> {
        match self.model.train(history) {
            Ok(report) => {
                tracing::info!(
                    model = %report.model,
                    samples = report.samples,
                    history = report.history_len,
                    "training complete"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(error = %err, history = history.len(), "training failed");
                Err(err)
            }
        }
    }

    pub fn predict_sequence(&self, history: &[Outcome]) -> Result<Prediction, PredictError> {
        let result = self.model.predict(history);
        if let Err(PredictError::ModelFailure(reason)) = &result {
            tracing::warn!(%reason, "sequence model failed to predict");
        }
        result
    }

    pub fn predict_from_cards(&self, banker: &[u8], player: &[u8]) -> CardPrediction {
        formula::predict_from_cards(banker, player)
    }

    pub fn predict_formula_sequence(
        &self,
        history: &[Outcome],
    ) -> Result<Prediction, PredictError> {
        formula::predict_from_sequence(history)
    }

    /// Record a round. Predictions for it are made from the prior history
    /// and frozen into the record before the shoe consumes the round.
    pub fn add_result(
        &mut self,
        outcome: Outcome,
        banker_cards: Option<Vec<u8>>,
        player_cards: Option<Vec<u8>>,
    ) -> RoundUpdate {
        let banker_cards = banker_cards.filter(|c| !c.is_empty());
        let player_cards = player_cards.filter(|c| !c.is_empty());

        let (ai_prediction, formula_prediction) =
            if self.config.suppress_warmup_predictions && self.shoe.is_in_warmup_period() {
                (Forecast::CannotPredict, Forecast::CannotPredict)
            } else {
                let prior = self.ledger.outcomes();
                let ai = Forecast::from_result(&self.predict_sequence(&prior));
                // the card formula needs both hands
                let formula = match (banker_cards.as_deref(), player_cards.as_deref()) {
                    (Some(banker), Some(player)) => {
                        formula::predict_from_cards(banker, player).prediction.into()
                    }
                    _ => Forecast::from_result(&formula::predict_from_sequence(&prior)),
                };
                (ai, formula)
            };

        let record = self
            .ledger
            .append(
                outcome,
                ai_prediction,
                formula_prediction,
                banker_cards,
                player_cards,
            )
            .clone();
        let is_new_shoe = self
            .shoe
            .add_result(outcome, record.dealt_cards().as_deref());

        tracing::debug!(
            round = record.round,
            result = %outcome,
            ai = %record.ai_prediction,
            formula = %record.formula_prediction,
            is_new_shoe,
            "round recorded"
        );

        RoundUpdate {
            record,
            statistics: self.statistics(),
            is_new_shoe,
            shoe: self.shoe.snapshot(),
        }
    }

    pub fn undo_last_result(&mut self) -> Result<UndoUpdate, GameError> {
        let removed = self.ledger.pop().ok_or(GameError::NothingToUndo)?;
        if !self.shoe.undo_last_result() {
            // the round predates the current shoe or the undo depth
            tracing::warn!(
                round = removed.round,
                shoe_id = self.shoe.id(),
                "round removed from the ledger, shoe left unchanged"
            );
        }
        tracing::info!(round = removed.round, result = %removed.result, "round undone");
        Ok(UndoUpdate {
            removed,
            statistics: self.statistics(),
            shoe: self.shoe.snapshot(),
        })
    }

    /// Empty the ledger and open a fresh shoe. The model is kept.
    pub fn clear_history(&mut self) {
        self.ledger.clear();
        let shoe_id = self.shoe.reset_all();
        tracing::info!(shoe_id, "history cleared");
    }

    /// Replace the ledger and replay every outcome through a fresh shoe.
    /// Stored predictions are taken as given.
    pub fn import_history(&mut self, records: Vec<RoundRecord>) -> Result<ImportSummary, GameError> {
        if records.is_empty() {
            return Err(GameError::EmptyImport);
        }
        for record in &records {
            record.validate_cards()?;
        }
        self.ledger.replace(records);
        self.shoe.reset_all();
        for record in self.ledger.records() {
            self.shoe
                .add_result(record.result, record.dealt_cards().as_deref());
        }
        tracing::info!(
            imported = self.ledger.len(),
            shoe_id = self.shoe.id(),
            "history imported"
        );
        Ok(ImportSummary {
            imported: self.ledger.len(),
            statistics: self.statistics(),
            shoe: self.shoe.snapshot(),
        })
    }

    pub fn history(&self) -> &[RoundRecord] {
        self.ledger.records()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.ledger.outcomes()
    }

    pub fn statistics(&self) -> Statistics {
        compute_statistics(self.ledger.records())
    }

    pub fn recent_ai_accuracy(&self, window: usize) -> (f64, usize) {
        self.ledger.recent_ai_accuracy(window)
    }
}
