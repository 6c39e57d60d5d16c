use crate::session::{SessionInfo, SessionManager};
use serde::Serialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

use super::{error_response, success_response};

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct SessionDeleted {
    deleted: String,
}

/// POST /api/sessions
pub async fn create_session(sessions: Arc<SessionManager>) -> Response {
    match sessions.create_session() {
        Ok(session_id) => success_response(StatusCode::CREATED, SessionCreated { session_id }),
        Err(err) => error_response(err),
    }
}

/// GET /api/sessions
pub async fn list_sessions(sessions: Arc<SessionManager>) -> Response {
    let infos: Result<Vec<SessionInfo>, _> = sessions
        .active_sessions()
        .iter()
        .map(|id| sessions.get_session(id).and_then(|session| session.info()))
        .collect();

    match infos {
        Ok(infos) => success_response(StatusCode::OK, infos),
        Err(err) => error_response(err),
    }
}

/// DELETE /api/sessions/{id}
pub async fn delete_session(sessions: Arc<SessionManager>, session_id: String) -> Response {
    match sessions.delete_session(&session_id) {
        Ok(()) => success_response(StatusCode::OK, SessionDeleted { deleted: session_id }),
        Err(err) => error_response(err),
    }
}
