//! Tables owned by the server and the background training around them.
//!
//! The [`SessionManager`] always holds a default table; extra tables are
//! created on demand under UUID keys. A [`GameSession`] wraps one
//! [`Table`] behind a read/write lock and trains fresh models off the async
//! runtime, swapping them in only when training completes.

use baccarat_ai::{create_model, RetrainDecision, RetrainPolicy};
use baccarat_engine::errors::{GameError, TrainError};
use baccarat_engine::ledger::TIME_FORMAT;
use baccarat_engine::model::TrainingReport;
use baccarat_engine::outcome::Outcome;
use baccarat_engine::{SequenceModel, Table};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;
use warp::http::StatusCode;

use crate::errors::{ErrorSeverity, IntoErrorResponse};
use crate::settings::{AppSettings, SettingsStore};

pub type SessionId = String;

pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub created_at: String,
    pub rounds: usize,
    pub shoe_id: u64,
    pub model: String,
    pub trained: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingStatus {
    pub model: String,
    pub trained: bool,
    pub in_progress: bool,
    pub retrain_scheduled: bool,
    pub auto_retrain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<TrainingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// What a cancel request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    pub running_cancelled: bool,
    pub scheduled_cancelled: bool,
}

#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<GameSession>>>,
    settings: Arc<SettingsStore>,
}

impl SessionManager {
    pub fn new(settings: Arc<SettingsStore>) -> Result<Self, SessionError> {
        let defaults = settings.get().map_err(|_| SessionError::StoragePoisoned)?;
        let default = Arc::new(GameSession::from_settings(DEFAULT_SESSION_ID, &defaults)?);

        let mut sessions = HashMap::new();
        sessions.insert(DEFAULT_SESSION_ID.to_string(), default);
        Ok(Self {
            sessions: RwLock::new(sessions),
            settings,
        })
    }

    pub fn settings(&self) -> Arc<SettingsStore> {
        Arc::clone(&self.settings)
    }

    /// Open an extra table with the current default settings.
    pub fn create_session(&self) -> Result<SessionId, SessionError> {
        let id = Uuid::new_v4().to_string();
        let defaults = self
            .settings
            .get()
            .map_err(|_| SessionError::StoragePoisoned)?;
        let session = Arc::new(GameSession::from_settings(&id, &defaults)?);

        self.sessions
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?
            .insert(id.clone(), session);

        tracing::info!(
            session_id = %id,
            deck_count = defaults.deck_count,
            model = %defaults.model,
            "table session created"
        );
        Ok(id)
    }

    pub fn get_session(&self, id: &str) -> Result<Arc<GameSession>, SessionError> {
        let guard = self
            .sessions
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Session named by the `x-session-id` header, the default one otherwise.
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<GameSession>, SessionError> {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.get_session(id),
            None => self.default_session(),
        }
    }

    pub fn default_session(&self) -> Result<Arc<GameSession>, SessionError> {
        self.get_session(DEFAULT_SESSION_ID)
    }

    pub fn delete_session(&self, id: &str) -> Result<(), SessionError> {
        if id == DEFAULT_SESSION_ID {
            return Err(SessionError::DefaultSessionProtected);
        }
        let removed = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?
            .remove(id);

        match removed {
            Some(session) => {
                session.cancel_training();
                tracing::info!(session_id = %id, "table session deleted");
                Ok(())
            }
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    pub fn active_sessions(&self) -> Vec<SessionId> {
        match self.sessions.read() {
            Ok(guard) => {
                let mut ids: Vec<SessionId> = guard.keys().cloned().collect();
                ids.sort();
                ids
            }
            Err(_) => Vec::new(),
        }
    }
}

/// Flags shared between a session and its training tasks.
#[derive(Debug, Default)]
struct TrainingState {
    in_progress: AtomicBool,
    cancel: Mutex<Option<Arc<AtomicBool>>>,
    scheduled: Mutex<Option<JoinHandle<()>>>,
    last_report: Mutex<Option<TrainingReport>>,
    last_error: Mutex<Option<String>>,
}

pub struct GameSession {
    id: SessionId,
    created_at: String,
    table: RwLock<Table>,
    retrain: RetrainPolicy,
    auto_retrain: bool,
    training: TrainingState,
    last_active: Mutex<Instant>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("auto_retrain", &self.auto_retrain)
            .field("training", &self.training)
            .finish()
    }
}

impl GameSession {
    pub fn from_settings(id: &str, settings: &AppSettings) -> Result<Self, SessionError> {
        let model = create_model(&settings.model)
            .map_err(|_| SessionError::UnknownModel(settings.model.clone()))?;
        let table = Table::new(settings.table_config(), model);
        Ok(Self::new(
            id,
            table,
            settings.retrain.clone(),
            settings.auto_retrain,
        ))
    }

    pub fn new(id: &str, table: Table, retrain: RetrainPolicy, auto_retrain: bool) -> Self {
        Self {
            id: id.to_string(),
            created_at: chrono::Local::now().format(TIME_FORMAT).to_string(),
            table: RwLock::new(table),
            retrain,
            auto_retrain,
            training: TrainingState::default(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn retrain_policy(&self) -> &RetrainPolicy {
        &self.retrain
    }

    /// Run `f` under the table's read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Table) -> R) -> Result<R, SessionError> {
        let table = self
            .table
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        Ok(f(&table))
    }

    /// Run `f` under the table's write lock and mark the operator active.
    pub fn write<R>(&self, f: impl FnOnce(&mut Table) -> R) -> Result<R, SessionError> {
        let result = {
            let mut table = self
                .table
                .write()
                .map_err(|_| SessionError::StoragePoisoned)?;
            f(&mut table)
        };
        self.touch();
        Ok(result)
    }

    pub fn info(&self) -> Result<SessionInfo, SessionError> {
        self.read(|table| SessionInfo {
            session_id: self.id.clone(),
            created_at: self.created_at.clone(),
            rounds: table.history().len(),
            shoe_id: table.shoe_status().shoe_id,
            model: table.model().name().to_string(),
            trained: table.is_trained(),
        })
    }

    pub fn is_training(&self) -> bool {
        self.training.in_progress.load(Ordering::SeqCst)
    }

    pub fn retrain_scheduled(&self) -> bool {
        self.training
            .scheduled
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(false)
    }

    pub fn training_status(&self) -> Result<TrainingStatus, SessionError> {
        let (model, trained) =
            self.read(|table| (table.model().name().to_string(), table.is_trained()))?;
        Ok(TrainingStatus {
            model,
            trained,
            in_progress: self.is_training(),
            retrain_scheduled: self.retrain_scheduled(),
            auto_retrain: self.auto_retrain,
            last_report: self
                .training
                .last_report
                .lock()
                .map_err(|_| SessionError::StoragePoisoned)?
                .clone(),
            last_error: self
                .training
                .last_error
                .lock()
                .map_err(|_| SessionError::StoragePoisoned)?
                .clone(),
        })
    }

    /// Train a fresh model on `history` (the ledger when `None`) on the
    /// blocking pool. Only one run per session at a time.
    pub fn train_async(
        self: &Arc<Self>,
        history: Option<Vec<Outcome>>,
    ) -> Result<TrainingHandle, SessionError> {
        let (history, mut model) = self.read(|table| {
            (
                history.unwrap_or_else(|| table.outcomes()),
                table.model().fresh(),
            )
        })?;

        if history.len() <= model.window() {
            return Err(SessionError::Train(TrainError::InsufficientData {
                required: model.window(),
                actual: history.len(),
            }));
        }

        if self
            .training
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::TrainingInProgress);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        if let Ok(mut slot) = self.training.cancel.lock() {
            *slot = Some(Arc::clone(&cancel));
        }

        tracing::info!(
            session_id = %self.id,
            model = model.name(),
            history = history.len(),
            "training started"
        );

        let session = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || {
            let result = model.train_with_cancel(&history, &flag);
            session.finish_training(model, result, &flag)
        });

        Ok(TrainingHandle { cancel, task })
    }

    fn finish_training(
        &self,
        model: Box<dyn SequenceModel>,
        result: Result<TrainingReport, TrainError>,
        cancel: &AtomicBool,
    ) -> Result<TrainingReport, SessionError> {
        let result = match result {
            Ok(_) if cancel.load(Ordering::SeqCst) => Err(TrainError::Cancelled),
            other => other,
        };

        let outcome = match result {
            Ok(report) => self
                .table
                .write()
                .map_err(|_| SessionError::StoragePoisoned)
                .map(|mut table| {
                    table.replace_model(model);
                    report
                }),
            Err(err) => Err(SessionError::Train(err)),
        };

        match &outcome {
            Ok(report) => {
                tracing::info!(
                    session_id = %self.id,
                    samples = report.samples,
                    trees = report.trees,
                    "training complete"
                );
                if let Ok(mut slot) = self.training.last_report.lock() {
                    *slot = Some(report.clone());
                }
                if let Ok(mut slot) = self.training.last_error.lock() {
                    *slot = None;
                }
            }
            Err(SessionError::Train(TrainError::Cancelled)) => {
                tracing::info!(session_id = %self.id, "training cancelled");
            }
            Err(err) => {
                tracing::warn!(session_id = %self.id, error = %err, "training failed");
                if let Ok(mut slot) = self.training.last_error.lock() {
                    *slot = Some(err.to_string());
                }
            }
        }

        if let Ok(mut slot) = self.training.cancel.lock() {
            *slot = None;
        }
        self.training.in_progress.store(false, Ordering::SeqCst);
        outcome
    }

    /// Stop the running training and drop a scheduled retrain.
    pub fn cancel_training(&self) -> CancelOutcome {
        let running_cancelled = self
            .training
            .cancel
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|flag| flag.swap(true, Ordering::SeqCst)))
            .is_some();

        let scheduled_cancelled = self
            .training
            .scheduled
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|task| {
                let pending = !task.is_finished();
                task.abort();
                pending
            })
            .unwrap_or(false);

        if running_cancelled || scheduled_cancelled {
            tracing::info!(
                session_id = %self.id,
                running_cancelled,
                scheduled_cancelled,
                "training cancellation requested"
            );
        }
        CancelOutcome {
            running_cancelled,
            scheduled_cancelled,
        }
    }

    /// Consult the retrain policy after a round and, when retraining is
    /// due, schedule it after the configured delay.
    pub fn maybe_schedule_retrain(self: &Arc<Self>) -> Result<RetrainDecision, SessionError> {
        if !self.auto_retrain {
            return Ok(RetrainDecision::NotDue);
        }
        let (accuracy, scored) = self.read(|table| table.recent_ai_accuracy(self.retrain.window))?;
        let busy = self.is_training() || self.retrain_scheduled();
        // idleness is checked again by the scheduled task
        let decision = self
            .retrain
            .decide(accuracy, scored, busy, self.retrain.idle_window());

        if decision == RetrainDecision::Start {
            tracing::info!(
                session_id = %self.id,
                accuracy,
                scored,
                delay_secs = self.retrain.delay_secs,
                "retrain scheduled"
            );
            let mut slot = self
                .training
                .scheduled
                .lock()
                .map_err(|_| SessionError::StoragePoisoned)?;
            let session = Arc::clone(self);
            *slot = Some(tokio::spawn(async move {
                session.run_scheduled_retrain().await;
            }));
        }
        Ok(decision)
    }

    async fn run_scheduled_retrain(self: Arc<Self>) {
        tokio::time::sleep(self.retrain.delay()).await;

        loop {
            let idle_for = self.idle_for();
            let accuracy = self.read(|table| table.recent_ai_accuracy(self.retrain.window));
            let Ok((accuracy, scored)) = accuracy else {
                return;
            };
            match self
                .retrain
                .decide(accuracy, scored, self.is_training(), idle_for)
            {
                RetrainDecision::AwaitIdle => {
                    tokio::time::sleep(self.retrain.idle_window().saturating_sub(idle_for)).await;
                }
                RetrainDecision::Start => break,
                decision => {
                    tracing::debug!(session_id = %self.id, ?decision, "scheduled retrain dropped");
                    self.clear_scheduled();
                    return;
                }
            }
        }

        self.clear_scheduled();
        match self.train_async(None) {
            Ok(handle) => {
                if let Err(err) = handle.wait().await {
                    tracing::debug!(session_id = %self.id, error = %err, "automatic retrain ended");
                }
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %self.id,
                    error = %err,
                    "automatic retrain not started"
                );
            }
        }
    }

    fn clear_scheduled(&self) {
        if let Ok(mut slot) = self.training.scheduled.lock() {
            // dropping our own handle detaches, it does not abort
            slot.take();
        }
    }

    pub fn touch(&self) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        match self.last_active.lock() {
            Ok(last) => last.elapsed(),
            Err(_) => Duration::ZERO,
        }
    }
}

/// A training run started by [`GameSession::train_async`].
#[derive(Debug)]
pub struct TrainingHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<TrainingReport, SessionError>>,
}

impl TrainingHandle {
    /// Ask the run to stop; the forest checks between trees.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub async fn wait(self) -> Result<TrainingReport, SessionError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(SessionError::TrainingTask(err.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("The default session cannot be deleted")]
    DefaultSessionProtected,
    #[error("Training is already in progress")]
    TrainingInProgress,
    #[error("Unknown model kind: {0}")]
    UnknownModel(String),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error("Training task failed: {0}")]
    TrainingTask(String),
    #[error("Session storage poisoned")]
    StoragePoisoned,
}

impl IntoErrorResponse for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::DefaultSessionProtected => StatusCode::BAD_REQUEST,
            SessionError::TrainingInProgress => StatusCode::CONFLICT,
            SessionError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            SessionError::Game(err) => err.status_code(),
            SessionError::Train(TrainError::InsufficientData { .. }) => StatusCode::BAD_REQUEST,
            SessionError::Train(TrainError::Cancelled) => StatusCode::CONFLICT,
            SessionError::Train(TrainError::Model(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::TrainingTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "session_not_found",
            SessionError::DefaultSessionProtected => "default_session_protected",
            SessionError::TrainingInProgress => "training_in_progress",
            SessionError::UnknownModel(_) => "unknown_model",
            SessionError::Game(err) => err.error_code(),
            SessionError::Train(TrainError::InsufficientData { .. }) => "insufficient_data",
            SessionError::Train(TrainError::Cancelled) => "training_cancelled",
            SessionError::Train(TrainError::Model(_)) => "training_failed",
            SessionError::TrainingTask(_) => "training_task_failed",
            SessionError::StoragePoisoned => "session_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::NotFound(id) => Some(serde_json::json!({ "session_id": id })),
            SessionError::Game(err) => err.error_details(),
            SessionError::Train(TrainError::InsufficientData { required, actual }) => {
                Some(serde_json::json!({ "required": required, "actual": actual }))
            }
            _ => None,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            SessionError::StoragePoisoned => ErrorSeverity::Critical,
            _ if self.status_code().is_server_error() => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baccarat_engine::outcome::Outcome::{Banker as B, Player as P};

    fn manager() -> SessionManager {
        let settings = AppSettings {
            seed: Some(7),
            ..Default::default()
        };
        let store = SettingsStore::with_settings(settings).expect("valid settings");
        SessionManager::new(Arc::new(store)).expect("manager")
    }

    fn alternating(len: usize) -> Vec<Outcome> {
        [B, P].into_iter().cycle().take(len).collect()
    }

    #[test]
    fn manager_starts_with_default_session() {
        let manager = manager();
        assert_eq!(manager.active_sessions(), vec![DEFAULT_SESSION_ID.to_string()]);
        let session = manager.resolve(None).expect("default");
        assert_eq!(session.id(), DEFAULT_SESSION_ID);
        let blank = manager.resolve(Some("  ")).expect("blank header");
        assert_eq!(blank.id(), DEFAULT_SESSION_ID);
    }

    #[test]
    fn extra_sessions_are_independent() {
        let manager = manager();
        let id = manager.create_session().expect("create");
        let extra = manager.resolve(Some(id.as_str())).expect("extra");
        extra
            .write(|table| table.add_result(B, None, None))
            .expect("add");

        let default = manager.default_session().expect("default");
        assert_eq!(default.read(|t| t.history().len()).expect("read"), 0);
        assert_eq!(extra.info().expect("info").rounds, 1);
    }

    #[test]
    fn default_session_cannot_be_deleted() {
        let manager = manager();
        assert!(matches!(
            manager.delete_session(DEFAULT_SESSION_ID),
            Err(SessionError::DefaultSessionProtected)
        ));
        assert!(matches!(
            manager.delete_session("missing"),
            Err(SessionError::NotFound(_))
        ));

        let id = manager.create_session().expect("create");
        manager.delete_session(&id).expect("delete");
        assert!(matches!(
            manager.get_session(&id),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn sessions_use_current_default_settings() {
        let manager = manager();
        manager
            .settings()
            .update_field("deck_count", serde_json::json!(2))
            .expect("update");
        let id = manager.create_session().expect("create");
        let session = manager.get_session(&id).expect("get");
        let snapshot = session.read(|t| t.shoe_status()).expect("read");
        assert_eq!(snapshot.deck_count, 2);

        let default = manager.default_session().expect("default");
        assert_eq!(default.read(|t| t.shoe_status().deck_count).expect("read"), 8);
    }

    #[tokio::test]
    async fn train_async_swaps_in_trained_model() {
        let manager = manager();
        let session = manager.default_session().expect("default");
        assert!(!session.training_status().expect("status").trained);

        let handle = session
            .train_async(Some(alternating(30)))
            .expect("start training");
        let report = handle.wait().await.expect("training succeeds");
        assert_eq!(report.samples, 20);

        let status = session.training_status().expect("status");
        assert!(status.trained);
        assert!(!status.in_progress);
        assert_eq!(status.last_report.map(|r| r.samples), Some(20));
    }

    #[tokio::test]
    async fn short_history_fails_fast() {
        let manager = manager();
        let session = manager.default_session().expect("default");
        let err = session.train_async(Some(vec![B; 9])).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Train(TrainError::InsufficientData {
                required: 10,
                actual: 9
            })
        ));
        assert!(!session.is_training());
        assert!(!session.training_status().expect("status").trained);
    }

    #[tokio::test]
    async fn concurrent_training_is_rejected() {
        let manager = manager();
        let session = manager.default_session().expect("default");
        session.training.in_progress.store(true, Ordering::SeqCst);
        assert!(matches!(
            session.train_async(Some(alternating(30))),
            Err(SessionError::TrainingInProgress)
        ));
        session.training.in_progress.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn cancelled_training_is_discarded() {
        let manager = manager();
        let session = manager.default_session().expect("default");
        let handle = session
            .train_async(Some(alternating(200)))
            .expect("start training");
        handle.cancel();
        let result = handle.wait().await;

        // the run may finish its last tree before the flag is seen; the
        // result is dropped either way
        assert!(matches!(
            result,
            Err(SessionError::Train(TrainError::Cancelled))
        ));
        assert!(!session.training_status().expect("status").trained);
        assert!(!session.is_training());
    }

    #[tokio::test]
    async fn retrain_not_due_without_scored_rounds() {
        let manager = manager();
        let session = manager.default_session().expect("default");
        for _ in 0..12 {
            session
                .write(|table| table.add_result(B, None, None))
                .expect("add");
        }
        let decision = session.maybe_schedule_retrain().expect("decide");
        assert_eq!(decision, RetrainDecision::NotDue);
        assert!(!session.retrain_scheduled());
    }

    #[test]
    fn session_errors_map_to_statuses() {
        assert_eq!(
            SessionError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SessionError::TrainingInProgress.status_code(),
            StatusCode::CONFLICT
        );
        let game = SessionError::from(GameError::NothingToUndo);
        assert_eq!(game.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(game.error_code(), "nothing_to_undo");
        let failed = SessionError::from(TrainError::Model("boom".into()));
        assert_eq!(failed.severity(), ErrorSeverity::Server);
        assert_eq!(
            SessionError::StoragePoisoned.severity(),
            ErrorSeverity::Critical
        );
    }
}
