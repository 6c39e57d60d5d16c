use crate::errors::ExportError;
use crate::session::{GameSession, SessionError, SessionManager};
use baccarat_ai::RetrainDecision;
use baccarat_engine::cards::CardInput;
use baccarat_engine::errors::GameError;
use baccarat_engine::export;
use baccarat_engine::ledger::RoundRecord;
use baccarat_engine::outcome::Outcome;
use baccarat_engine::shoe::ShoeSnapshot;
use baccarat_engine::stats::Statistics;
use baccarat_engine::table::RoundUpdate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

use super::predict::required_cards;
use super::{error_response, success_response};

#[derive(Debug, Deserialize)]
pub struct AddResultRequest {
    pub result: String,
    #[serde(default)]
    pub banker_cards: Option<CardInput>,
    #[serde(default)]
    pub player_cards: Option<CardInput>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub records: Vec<RoundRecord>,
}

#[derive(Debug, Serialize)]
struct AddResultResponse {
    #[serde(flatten)]
    update: RoundUpdate,
    retrain: RetrainDecision,
}

#[derive(Debug, Serialize)]
struct ClearedResponse {
    cleared: bool,
    statistics: Statistics,
    shoe: ShoeSnapshot,
}

fn parse_cards(input: Option<&CardInput>) -> Result<Option<Vec<u8>>, SessionError> {
    match input {
        Some(cards) => Ok(Some(cards.parse()?).filter(|c| !c.is_empty())),
        None => Ok(None),
    }
}

fn record_round(
    session: &Arc<GameSession>,
    outcome: Outcome,
    banker: Option<Vec<u8>>,
    player: Option<Vec<u8>>,
) -> Result<AddResultResponse, SessionError> {
    let update = session.write(|table| table.add_result(outcome, banker, player))?;
    let retrain = session.maybe_schedule_retrain()?;
    Ok(AddResultResponse { update, retrain })
}

/// POST /api/history/add
pub async fn add_result(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: AddResultRequest,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            let outcome: Outcome = request.result.parse()?;
            let banker = parse_cards(request.banker_cards.as_ref())?;
            let player = parse_cards(request.player_cards.as_ref())?;
            let missing = match (&banker, &player) {
                (Some(_), None) => Some("player"),
                (None, Some(_)) => Some("banker"),
                _ => None,
            };
            if let Some(side) = missing {
                return Err(SessionError::from(GameError::EmptyHand { side }));
            }
            record_round(&session, outcome, banker, player)
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/history/add_with_cards
pub async fn add_result_with_cards(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: AddResultRequest,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            let outcome: Outcome = request.result.parse()?;
            let banker = required_cards(request.banker_cards.as_ref(), "banker")?;
            let player = required_cards(request.player_cards.as_ref(), "player")?;
            record_round(&session, outcome, Some(banker), Some(player))
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/history/undo
pub async fn undo_last_result(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.write(|table| table.undo_last_result())?.map_err(Into::into));

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/history/clear
pub async fn clear_history(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            session.write(|table| {
                table.clear_history();
                ClearedResponse {
                    cleared: true,
                    statistics: table.statistics(),
                    shoe: table.shoe_status(),
                }
            })
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/history/import
pub async fn import_history(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: ImportRequest,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            session
                .write(|table| table.import_history(request.records))?
                .map_err(Into::into)
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// GET /api/history
pub async fn get_history(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.read(|table| table.history().to_vec()));

    match result {
        Ok(records) => success_response(StatusCode::OK, records),
        Err(err) => error_response(err),
    }
}

/// GET /api/statistics
pub async fn get_statistics(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.read(|table| table.statistics()));

    match result {
        Ok(statistics) => success_response(StatusCode::OK, statistics),
        Err(err) => error_response(err),
    }
}

fn attachment(body: String, content_type: &'static str, extension: &str) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::export_filename("baccarat_history", extension)
    );
    let response = reply::with_header(body, CONTENT_TYPE, content_type);
    reply::with_header(response, CONTENT_DISPOSITION, disposition).into_response()
}

/// GET /api/export/csv
pub async fn export_csv(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.read(|table| export::to_csv(table.history())));

    match result {
        Ok(csv) => attachment(csv, "text/csv; charset=utf-8", "csv"),
        Err(err) => error_response(err),
    }
}

/// GET /api/export/json
pub async fn export_json(sessions: Arc<SessionManager>, session_id: Option<String>) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| session.read(|table| export::to_json(table.history())));

    match result {
        Ok(Ok(json)) => attachment(json, "application/json", "json"),
        Ok(Err(err)) => error_response(ExportError::from(err)),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{body_json, manager};
    use serde_json::json;

    fn add(result: &str) -> AddResultRequest {
        AddResultRequest {
            result: result.to_string(),
            banker_cards: None,
            player_cards: None,
        }
    }

    #[tokio::test]
    async fn add_records_round_with_frozen_predictions() {
        let sessions = manager();
        let response = add_result(Arc::clone(&sessions), None, add("banker")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["record"]["round"], 1);
        assert_eq!(body["record"]["result"], "BANKER");
        assert_eq!(body["record"]["ai_prediction"], "CANNOT_PREDICT");
        assert_eq!(body["record"]["formula_prediction"], "CANNOT_PREDICT");
        assert_eq!(body["statistics"]["total_rounds"], 1);
        assert_eq!(body["is_new_shoe"], false);
        assert_eq!(body["shoe"]["cards_used"], 3);
        assert_eq!(body["retrain"], "not_due");
    }

    #[tokio::test]
    async fn add_accepts_localized_outcome_and_cards() {
        let sessions = manager();
        let request = AddResultRequest {
            result: "莊".to_string(),
            banker_cards: Some(CardInput::Text("34".into())),
            player_cards: Some(serde_json::from_value(json!([9, 9])).unwrap()),
        };
        let body = body_json(add_result(sessions, None, request).await).await;
        assert_eq!(body["record"]["result"], "BANKER");
        assert_eq!(body["record"]["formula_prediction"], "BANKER");
        assert_eq!(body["record"]["banker_cards"], json!([3, 4]));
        assert_eq!(body["shoe"]["cards_used"], 4);
    }

    #[tokio::test]
    async fn invalid_outcome_is_rejected_without_change() {
        let sessions = manager();
        let response = add_result(Arc::clone(&sessions), None, add("dragon")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_outcome");

        let history = body_json(get_history(sessions, None).await).await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn add_rejects_a_single_hand_without_change() {
        let sessions = manager();
        let request = AddResultRequest {
            result: "P".to_string(),
            banker_cards: Some(CardInput::Text("0".into())),
            player_cards: None,
        };
        let response = add_result(Arc::clone(&sessions), None, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "empty_hand");
        assert_eq!(body["details"]["side"], "player");

        let request = AddResultRequest {
            result: "P".to_string(),
            banker_cards: Some(CardInput::Text("".into())),
            player_cards: Some(CardInput::Text("9".into())),
        };
        let body = body_json(add_result(Arc::clone(&sessions), None, request).await).await;
        assert_eq!(body["details"]["side"], "banker");

        let history = body_json(get_history(sessions, None).await).await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn add_with_cards_requires_both_hands() {
        let sessions = manager();
        let request = AddResultRequest {
            result: "P".to_string(),
            banker_cards: Some(CardInput::Text("".into())),
            player_cards: Some(CardInput::Text("99".into())),
        };
        let response = add_result_with_cards(Arc::clone(&sessions), None, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "empty_hand");
        assert_eq!(body["details"]["side"], "banker");

        let request = AddResultRequest {
            result: "P".to_string(),
            banker_cards: Some(CardInput::Text("1".into())),
            player_cards: None,
        };
        let response = add_result_with_cards(Arc::clone(&sessions), None, request).await;
        assert_eq!(body_json(response).await["details"]["side"], "player");

        let request = AddResultRequest {
            result: "P".to_string(),
            banker_cards: Some(CardInput::Text("1 1".into())),
            player_cards: Some(CardInput::Text("9 9".into())),
        };
        let body = body_json(add_result_with_cards(sessions, None, request).await).await;
        assert_eq!(body["record"]["formula_prediction"], "PLAYER");
    }

    #[tokio::test]
    async fn undo_on_empty_ledger_fails() {
        let response = undo_last_result(manager(), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "nothing_to_undo");
    }

    #[tokio::test]
    async fn undo_reverses_last_round() {
        let sessions = manager();
        add_result(Arc::clone(&sessions), None, add("B")).await;
        add_result(Arc::clone(&sessions), None, add("P")).await;

        let body = body_json(undo_last_result(Arc::clone(&sessions), None).await).await;
        assert_eq!(body["removed"]["result"], "PLAYER");
        assert_eq!(body["statistics"]["total_rounds"], 1);
        assert_eq!(body["shoe"]["cards_used"], 3);
    }

    #[tokio::test]
    async fn import_replaces_ledger_and_replays_shoe() {
        let sessions = manager();
        add_result(Arc::clone(&sessions), None, add("T")).await;

        let records: Vec<RoundRecord> = serde_json::from_value(json!([
            { "round": 1, "result": "BANKER", "ai_prediction": "PLAYER" },
            { "round": 2, "result": "PLAYER" },
            { "round": 3, "result": "BANKER", "banker_cards": [3, 4], "player_cards": [9, 9] }
        ]))
        .unwrap();
        let response =
            import_history(Arc::clone(&sessions), None, ImportRequest { records }).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["imported"], 3);
        assert_eq!(body["shoe"]["cards_used"], 3 + 3 + 4);
        assert_eq!(body["shoe"]["statistics"]["banker"], 2);
        assert_eq!(body["statistics"]["ai_predictions"], 1);

        let empty = import_history(sessions, None, ImportRequest { records: vec![] }).await;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(empty).await["error"], "empty_import");
    }

    #[tokio::test]
    async fn import_rejects_out_of_range_cards() {
        let sessions = manager();
        add_result(Arc::clone(&sessions), None, add("T")).await;

        let records: Vec<RoundRecord> = serde_json::from_value(json!([
            { "result": "BANKER", "banker_cards": [12, 200], "player_cards": [3] }
        ]))
        .unwrap();
        let response =
            import_history(Arc::clone(&sessions), None, ImportRequest { records }).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_card_value");
        assert_eq!(body["details"]["value"], "12");

        let history = body_json(get_history(sessions, None).await).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["result"], "TIE");
    }

    #[tokio::test]
    async fn clear_empties_ledger() {
        let sessions = manager();
        add_result(Arc::clone(&sessions), None, add("B")).await;
        let body = body_json(clear_history(Arc::clone(&sessions), None).await).await;
        assert_eq!(body["cleared"], true);
        assert_eq!(body["statistics"]["total_rounds"], 0);
        assert_eq!(body["shoe"]["cards_used"], 0);

        let stats = body_json(get_statistics(sessions, None).await).await;
        assert_eq!(stats["banker_percentage"], 0.0);
    }

    #[tokio::test]
    async fn csv_export_is_an_attachment() {
        let sessions = manager();
        add_result(Arc::clone(&sessions), None, add("B")).await;
        let response = export_csv(sessions, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("baccarat_history_"));
        assert!(disposition.ends_with(".csv\""));

        let bytes = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(export::CSV_HEADER));
        assert!(lines.next().unwrap().starts_with("1,BANKER,"));
    }

    #[tokio::test]
    async fn json_export_round_trips_records() {
        let sessions = manager();
        add_result(Arc::clone(&sessions), None, add("P")).await;
        let response = export_json(sessions, None).await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap();
        let records: Vec<RoundRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, Outcome::Player);
    }
}
