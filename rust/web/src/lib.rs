//! HTTP shell around the baccarat table.
//!
//! Routes are served by [`WebServer`]; each request works on the table of
//! the session named by the `x-session-id` header, or the default table.

pub mod errors;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod session;
pub mod settings;

pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use logging::{init_logging, init_test_logging, LogEntry, LogFormat, TestLogSubscriber};
pub use middleware::{log_response, with_request_logging};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{
    CancelOutcome, GameSession, SessionError, SessionId, SessionInfo, SessionManager,
    TrainingHandle, TrainingStatus, DEFAULT_SESSION_ID,
};
pub use settings::{AppSettings, SettingsError, SettingsStore};
