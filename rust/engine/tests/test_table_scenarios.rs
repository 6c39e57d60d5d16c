use std::sync::atomic::{AtomicBool, Ordering};

use baccarat_engine::errors::{GameError, PredictError, TrainError};
use baccarat_engine::ledger::RoundRecord;
use baccarat_engine::model::{Prediction, SequenceModel, TrainingReport, UntrainedModel};
use baccarat_engine::outcome::{Forecast, Outcome};
use baccarat_engine::shoe::ShoeSettings;
use baccarat_engine::table::{Table, TableConfig};

/// Predicts the last outcome once trained; fails on demand.
#[derive(Default)]
struct EchoModel {
    trained: bool,
    broken: bool,
}

impl SequenceModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn window(&self) -> usize {
        3
    }

    fn train(&mut self, history: &[Outcome]) -> Result<TrainingReport, TrainError> {
        if history.len() <= 3 {
            return Err(TrainError::InsufficientData {
                required: 3,
                actual: history.len(),
            });
        }
        self.trained = true;
        Ok(TrainingReport {
            model: "echo".into(),
            history_len: history.len(),
            samples: history.len() - 3,
            trees: 0,
        })
    }

    fn predict(&self, history: &[Outcome]) -> Result<Prediction, PredictError> {
        if self.broken {
            return Err(PredictError::ModelFailure("broken on purpose".into()));
        }
        if !self.trained {
            return Err(PredictError::NotTrained);
        }
        match history.last() {
            Some(last) if history.len() >= 3 => Ok(Prediction::new(*last, 90.0)),
            _ => Err(PredictError::InsufficientData {
                required: 3,
                actual: history.len(),
            }),
        }
    }

    fn fresh(&self) -> Box<dyn SequenceModel> {
        Box::new(EchoModel::default())
    }
}

fn seeded_config() -> TableConfig {
    TableConfig {
        shoe: ShoeSettings {
            seed: Some(2024),
            ..ShoeSettings::default()
        },
        ..TableConfig::default()
    }
}

fn table() -> Table {
    Table::new(seeded_config(), Box::new(UntrainedModel))
}

#[test]
fn undo_is_a_left_inverse_of_add() {
    let mut table = table();
    for outcome in [Outcome::Banker, Outcome::Player, Outcome::Tie] {
        table.add_result(outcome, None, None);
    }
    let len_before = table.history().len();
    let shoe_before = table.shoe_status();

    table.add_result(Outcome::Player, Some(vec![2, 0]), Some(vec![8]));
    let undo = table.undo_last_result().expect("undo should succeed");

    assert_eq!(undo.removed.round, 4);
    assert_eq!(table.history().len(), len_before);
    assert_eq!(table.shoe_status(), shoe_before);
    assert_eq!(undo.statistics.total_rounds, 3);
}

#[test]
fn import_replays_exactly_the_imported_rounds() {
    let mut table = table();
    for _ in 0..40 {
        table.add_result(Outcome::Banker, None, None);
    }
    let records: Vec<RoundRecord> = (0..20)
        .map(|i| RoundRecord {
            round: i + 1,
            result: if i % 3 == 0 { Outcome::Player } else { Outcome::Banker },
            time: "2024-05-01 12:00:00".into(),
            ai_prediction: Forecast::CannotPredict,
            formula_prediction: Forecast::Banker,
            banker_cards: None,
            player_cards: None,
        })
        .collect();

    let summary = table.import_history(records).expect("import should succeed");
    assert_eq!(summary.imported, 20);

    let shoe = table.shoe_status();
    assert_eq!(shoe.cards_used, 60);
    assert_eq!(shoe.cards_remaining, 416 - 60);
    assert_eq!(shoe.rounds_in_shoe, 20);
    assert_eq!(shoe.statistics.player, 7);
    assert_eq!(table.history().len(), 20);
    // predictions are taken as given
    assert_eq!(table.statistics().formula_predictions, 20);
}

#[test]
fn import_with_cards_consumes_those_cards() {
    let mut table = table();
    let record: RoundRecord = serde_json::from_str(
        r#"{"result": "BANKER", "banker_cards": [3, 4], "player_cards": [9, 9, 1]}"#,
    )
    .unwrap();
    table.import_history(vec![record]).unwrap();
    assert_eq!(table.shoe_status().cards_used, 5);
    assert_eq!(table.history()[0].round, 1);
}

#[test]
fn reshuffle_then_undo_restores_previous_shoe() {
    let config = TableConfig {
        shoe: ShoeSettings {
            deck_count: 1,
            seed: Some(5),
            ..ShoeSettings::default()
        },
        ..TableConfig::default()
    };
    let mut table = Table::new(config, Box::new(UntrainedModel));
    // 17 rounds of 3 cards leave a single card
    for _ in 0..17 {
        assert!(!table.add_result(Outcome::Banker, None, None).is_new_shoe);
    }
    let before = table.shoe_status();
    assert_eq!(before.cards_remaining, 1);

    let update = table.add_result(Outcome::Player, None, None);
    assert!(update.is_new_shoe);
    assert_eq!(update.shoe.shoe_id, before.shoe_id + 1);
    assert_eq!(update.shoe.cards_remaining, 52);

    table.undo_last_result().unwrap();
    assert_eq!(table.shoe_status(), before);
}

#[test]
fn ai_predictions_are_frozen_when_appended() {
    let mut table = Table::new(seeded_config(), Box::new(EchoModel::default()));
    for outcome in [Outcome::Banker, Outcome::Banker, Outcome::Player, Outcome::Player] {
        table.add_result(outcome, None, None);
    }
    let history = table.outcomes();
    table.train_classifier(&history).expect("echo trains on 4 rounds");
    assert!(table.is_trained());

    let update = table.add_result(Outcome::Tie, None, None);
    assert_eq!(update.record.ai_prediction, Forecast::Player);
    assert_eq!(update.statistics.ai_predictions, 1);
    assert_eq!(update.statistics.ai_correct, 0);

    // retraining later does not rewrite stored labels
    table.replace_model(Box::new(EchoModel::default()));
    assert_eq!(table.history()[4].ai_prediction, Forecast::Player);
}

#[test]
fn model_failure_is_stored_as_prediction_error() {
    let model = EchoModel {
        trained: true,
        broken: true,
    };
    let mut table = Table::new(seeded_config(), Box::new(model));
    let update = table.add_result(Outcome::Banker, None, None);
    assert_eq!(update.record.ai_prediction, Forecast::PredictionError);
    assert_eq!(update.statistics.ai_predictions, 0);
}

#[test]
fn failed_training_keeps_model_untrained() {
    let mut table = Table::new(seeded_config(), Box::new(EchoModel::default()));
    let err = table
        .train_classifier(&[Outcome::Banker, Outcome::Player])
        .unwrap_err();
    assert!(matches!(err, TrainError::InsufficientData { .. }));
    assert!(!table.is_trained());
}

#[test]
fn default_cancel_hook_delegates_to_train() {
    let mut model = EchoModel::default();
    let cancel = AtomicBool::new(true);
    let history = [Outcome::Banker; 5];
    assert!(model.train_with_cancel(&history, &cancel).is_ok());
    assert!(cancel.load(Ordering::SeqCst));
}

#[test]
fn undo_after_clear_reports_nothing_to_undo() {
    let mut table = table();
    table.add_result(Outcome::Banker, None, None);
    table.clear_history();
    assert_eq!(
        table.undo_last_result().unwrap_err(),
        GameError::NothingToUndo
    );
}
