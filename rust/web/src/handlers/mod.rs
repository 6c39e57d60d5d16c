pub mod health;
pub mod history;
pub mod predict;
pub mod sessions;
pub mod settings;
pub mod shoe;
pub mod training;

use crate::errors::{IntoErrorResponse, RequestError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

pub use health::health;
pub use history::{
    add_result, add_result_with_cards, clear_history, export_csv, export_json, get_history,
    get_statistics, import_history, undo_last_result, AddResultRequest, ImportRequest,
};
pub use predict::{
    analyze_formula, predict_ai, predict_both, predict_formula, CardsRequest, HistoryInput,
    PredictRequest, PredictionView,
};
pub use sessions::{create_session, delete_session, list_sessions};
pub use settings::{
    get_settings, reset_settings, update_field, update_settings, UpdateFieldRequest,
    UpdateSettingsRequest,
};
pub use shoe::{new_shoe, reset_shoe, shoe_status, update_shoe_settings, ShoeSettingsRequest};
pub use training::{cancel_training, train, training_status, TrainRequest};

pub(crate) fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

pub(crate) fn error_response<E: IntoErrorResponse>(err: E) -> Response {
    err.into_http_response()
}

/// Decode an optional JSON body; an empty body yields `T::default()`.
pub fn parse_optional_body<T>(body: &[u8]) -> Result<T, RequestError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| RequestError::MalformedBody(err.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::session::SessionManager;
    use crate::settings::{AppSettings, SettingsStore};
    use std::sync::Arc;
    use warp::reply::Response;

    pub fn manager() -> Arc<SessionManager> {
        let settings = AppSettings {
            seed: Some(11),
            ..Default::default()
        };
        let store = SettingsStore::with_settings(settings).expect("valid settings");
        Arc::new(SessionManager::new(Arc::new(store)).expect("manager"))
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = warp::hyper::body::to_bytes(response.into_body())
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }
}
