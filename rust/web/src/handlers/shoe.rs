use crate::session::SessionManager;
use crate::settings::validate_warmup;
use baccarat_engine::shoe::ShoeSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

use super::{error_response, success_response};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShoeSettingsRequest {
    pub auto_detect: Option<bool>,
    pub warmup_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ShoeChanged {
    shoe_id: u64,
    shoe: ShoeSnapshot,
}

/// GET /api/shoe
pub async fn shoe_status(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.read(|table| table.shoe_status()));

    match result {
        Ok(snapshot) => success_response(StatusCode::OK, snapshot),
        Err(err) => error_response(err),
    }
}

/// POST /api/shoe/new
pub async fn new_shoe(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            session.write(|table| {
                let shoe_id = table.start_new_shoe();
                ShoeChanged {
                    shoe_id,
                    shoe: table.shoe_status(),
                }
            })
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/shoe/reset
pub async fn reset_shoe(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            session.write(|table| {
                let shoe_id = table.reset_current_shoe();
                ShoeChanged {
                    shoe_id,
                    shoe: table.shoe_status(),
                }
            })
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/shoe/settings
///
/// Omitted fields keep the table's current value.
pub async fn update_shoe_settings(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: ShoeSettingsRequest,
) -> Response {
    if let Some(warmup_size) = request.warmup_size {
        if let Err(err) = validate_warmup(warmup_size) {
            return error_response(err);
        }
    }

    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            session.write(|table| {
                let current = table.config().shoe.clone();
                table.update_shoe_settings(
                    request.auto_detect.unwrap_or(current.auto_detect),
                    request.warmup_size.unwrap_or(current.warmup_size),
                );
                table.shoe_status()
            })
        });

    match result {
        Ok(snapshot) => success_response(StatusCode::OK, snapshot),
        Err(err) => error_response(err),
    }
}
