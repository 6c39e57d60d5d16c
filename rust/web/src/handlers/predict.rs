use crate::session::{GameSession, SessionError, SessionManager};
use baccarat_engine::cards::CardInput;
use baccarat_engine::errors::{GameError, PredictError};
use baccarat_engine::formula::{self, CardPrediction};
use baccarat_engine::model::Prediction;
use baccarat_engine::outcome::{parse_history, Forecast, Outcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

use super::{error_response, success_response};

/// Outcome history in a request: `["BANKER", "P", ...]` or `"BBPT"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryInput {
    List(Vec<String>),
    Text(String),
}

impl HistoryInput {
    pub fn parse(&self) -> Result<Vec<Outcome>, GameError> {
        match self {
            HistoryInput::List(items) => items.iter().map(|item| item.parse()).collect(),
            HistoryInput::Text(text) => parse_history(text),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PredictRequest {
    pub history: Option<HistoryInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CardsRequest {
    pub banker_cards: Option<CardInput>,
    pub player_cards: Option<CardInput>,
    pub history: Option<HistoryInput>,
}

/// A predictor's answer; sentinels carry confidence 0 and the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub prediction: Forecast,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PredictionView {
    pub fn from_result(result: &Result<Prediction, PredictError>) -> Self {
        match result {
            Ok(prediction) => Self {
                prediction: prediction.outcome.into(),
                confidence: prediction.confidence,
                reason: None,
            },
            Err(err) => Self {
                prediction: Forecast::from_result(result),
                confidence: 0.0,
                reason: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct BothPredictions {
    history_len: usize,
    ai: PredictionView,
    formula: PredictionView,
}

#[derive(Debug, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
enum FormulaView {
    Cards(CardPrediction),
    Sequence(PredictionView),
}

fn resolve_history(
    session: &GameSession,
    input: Option<&HistoryInput>,
) -> Result<Vec<Outcome>, SessionError> {
    match input {
        Some(history) => Ok(history.parse()?),
        None => session.read(|table| table.outcomes()),
    }
}

pub(crate) fn required_cards(
    input: Option<&CardInput>,
    side: &'static str,
) -> Result<Vec<u8>, GameError> {
    input
        .ok_or(GameError::EmptyHand { side })?
        .parse_required(side)
}

/// POST /api/predict
pub async fn predict_both(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: PredictRequest,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            let history = resolve_history(&session, request.history.as_ref())?;
            session.read(|table| BothPredictions {
                history_len: history.len(),
                ai: PredictionView::from_result(&table.predict_sequence(&history)),
                formula: PredictionView::from_result(&table.predict_formula_sequence(&history)),
            })
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/predict/ai
pub async fn predict_ai(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: PredictRequest,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            let history = resolve_history(&session, request.history.as_ref())?;
            session.read(|table| PredictionView::from_result(&table.predict_sequence(&history)))
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/predict/formula
///
/// Cards for both hands give the card formula; without cards the streak
/// heuristic runs over `history` or the ledger.
pub async fn predict_formula(
    sessions: Arc<SessionManager>,
    session_id: Option<String>,
    request: CardsRequest,
) -> Response {
    let result = sessions
        .resolve(session_id.as_deref())
        .and_then(|session| {
            if request.banker_cards.is_some() || request.player_cards.is_some() {
                let banker = required_cards(request.banker_cards.as_ref(), "banker")?;
                let player = required_cards(request.player_cards.as_ref(), "player")?;
                session.read(|table| FormulaView::Cards(table.predict_from_cards(&banker, &player)))
            } else {
                let history = resolve_history(&session, request.history.as_ref())?;
                session.read(|table| {
                    FormulaView::Sequence(PredictionView::from_result(
                        &table.predict_formula_sequence(&history),
                    ))
                })
            }
        });

    match result {
        Ok(body) => success_response(StatusCode::OK, body),
        Err(err) => error_response(err),
    }
}

/// POST /api/formula/analyze
pub async fn analyze_formula(request: CardsRequest) -> Response {
    let cards = required_cards(request.banker_cards.as_ref(), "banker").and_then(|banker| {
        required_cards(request.player_cards.as_ref(), "player").map(|player| (banker, player))
    });

    match cards {
        Ok((banker, player)) => {
            success_response(StatusCode::OK, formula::analyze_cards(&banker, &player))
        }
        Err(err) => error_response(err),
    }
}
