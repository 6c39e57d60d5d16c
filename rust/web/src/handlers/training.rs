use crate::session::{SessionManager, TrainingStatus};
use baccarat_engine::model::TrainingReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;

use super::predict::HistoryInput;
use super::{error_response, parse_optional_body, success_response};

/// Body of `POST /api/train`; without `history` the ledger is used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrainRequest {
    pub history: Option<HistoryInput>,
}

#[derive(Debug, Serialize)]
struct TrainResponse {
    report: TrainingReport,
    status: TrainingStatus,
}

/// POST /api/train
///
/// Training runs on the blocking pool; the handler awaits it so the
/// response carries the report.
pub async fn train(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    body: Bytes,
) -> Response {
    let request: TrainRequest = match parse_optional_body(&body) {
        Ok(request) => request,
        Err(err) => return error_response(err),
    };
    let history = match request.history.as_ref().map(HistoryInput::parse).transpose() {
        Ok(history) => history,
        Err(err) => return error_response(err),
    };

    let session = match sessions.resolve(session_id.as_deref()) {
        Ok(session) => session,
        Err(err) => return error_response(err),
    };
    let handle = match session.train_async(history) {
        Ok(handle) => handle,
        Err(err) => return error_response(err),
    };

    let result = handle
        .wait()
        .await
        .and_then(|report| {
            Ok(TrainResponse {
                report,
                status: session.training_status()?,
            })
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/train/cancel
pub async fn cancel_training(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
) -> Response {
    match sessions.resolve(session_id.as_deref()) {
        Ok(session) => success_response(StatusCode::OK, session.cancel_training()),
        Err(err) => error_response(err),
    }
}

/// GET /api/train/status
pub async fn training_status(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.training_status());

    match result {
        Ok(status) => success_response(StatusCode::OK, status),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{body_json, manager};

    fn periodic(len: usize) -> String {
        "BP".repeat(len / 2)
    }

    #[tokio::test]
    async fn trains_on_request_history() {
        let sessions = manager();
        let body = format!(r#"{{"history": "{}"}}"#, periodic(30));
        let response = train(Arc::clone(&sessions), None, Bytes::from(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["report"]["samples"], 20);
        assert_eq!(body["status"]["trained"], true);
        assert_eq!(body["status"]["in_progress"], false);

        let status = body_json(training_status(sessions, None).await).await;
        assert_eq!(status["trained"], true);
        assert_eq!(status["last_report"]["samples"], 20);
    }

    #[tokio::test]
    async fn empty_body_trains_on_ledger() {
        let sessions = manager();
        let response = train(Arc::clone(&sessions), None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "insufficient_data");
        assert_eq!(body["details"]["actual"], 0);

        let status = body_json(training_status(sessions, None).await).await;
        assert_eq!(status["trained"], false);
    }

    #[tokio::test]
    async fn nine_entries_are_not_enough() {
        let response = train(manager(), None, Bytes::from(r#"{"history":"BBBBBBBBB"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["details"]["required"], 10);
        assert_eq!(body["details"]["actual"], 9);
    }

    #[tokio::test]
    async fn invalid_history_is_rejected() {
        let response = train(manager(), None, Bytes::from(r#"{"history":"BBX"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_outcome");

        let response = train(manager(), None, Bytes::from("{history")).await;
        assert_eq!(body_json(response).await["error"], "malformed_body");
    }

    #[tokio::test]
    async fn cancel_without_training_reaches_nothing() {
        let body = body_json(cancel_training(manager(), None).await).await;
        assert_eq!(body["running_cancelled"], false);
        assert_eq!(body["scheduled_cancelled"], false);
    }
}
