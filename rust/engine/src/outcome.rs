use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GameError;

/// Result of a single baccarat round.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Banker hand won
    Banker,
    /// Player hand won
    Player,
    /// Both hands finished on the same points
    Tie,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Tie, Outcome::Banker, Outcome::Player];

    /// Categorical code used by the sequence model: TIE=0, BANKER=1, PLAYER=2.
    pub fn code(self) -> u8 {
        match self {
            Outcome::Tie => 0,
            Outcome::Banker => 1,
            Outcome::Player => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Outcome> {
        match code {
            0 => Some(Outcome::Tie),
            1 => Some(Outcome::Banker),
            2 => Some(Outcome::Player),
            _ => None,
        }
    }

    /// Banker and player swap; a tie stays a tie.
    pub fn opposite(self) -> Outcome {
        match self {
            Outcome::Banker => Outcome::Player,
            Outcome::Player => Outcome::Banker,
            Outcome::Tie => Outcome::Tie,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Banker => "BANKER",
            Outcome::Player => "PLAYER",
            Outcome::Tie => "TIE",
        }
    }

    /// Single-letter form used by compact history strings (`BPTB...`).
    pub fn letter(self) -> char {
        match self {
            Outcome::Banker => 'B',
            Outcome::Player => 'P',
            Outcome::Tie => 'T',
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "banker" | "b" | "莊" | "莊家" => Ok(Outcome::Banker),
            "player" | "p" | "閒" | "閒家" => Ok(Outcome::Player),
            "tie" | "t" | "和" | "和局" => Ok(Outcome::Tie),
            _ => Err(GameError::InvalidOutcome(trimmed.to_string())),
        }
    }
}

/// Parse a compact history such as `"BBPT"` or `"banker, player tie"`.
///
/// Separators (whitespace, commas) are optional between single letters.
pub fn parse_history(input: &str) -> Result<Vec<Outcome>, GameError> {
    let tokens: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    let mut history = Vec::new();
    for token in tokens {
        match token.parse::<Outcome>() {
            Ok(outcome) => history.push(outcome),
            Err(err) => {
                // a run of letters like "BBPT" is accepted as one token
                if token.chars().all(|c| matches!(c, 'B' | 'P' | 'T' | 'b' | 'p' | 't')) {
                    for c in token.chars() {
                        history.push(c.to_string().parse()?);
                    }
                } else {
                    return Err(err);
                }
            }
        }
    }
    Ok(history)
}

/// Label frozen into a round record for one of the two predictors.
///
/// `CannotPredict` and `PredictionError` are sentinels: they never count as
/// a prediction in accuracy statistics.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Forecast {
    Banker,
    Player,
    Tie,
    #[default]
    CannotPredict,
    PredictionError,
}

impl Forecast {
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            Forecast::Banker => Some(Outcome::Banker),
            Forecast::Player => Some(Outcome::Player),
            Forecast::Tie => Some(Outcome::Tie),
            Forecast::CannotPredict | Forecast::PredictionError => None,
        }
    }

    pub fn is_sentinel(self) -> bool {
        self.outcome().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Forecast::Banker => "BANKER",
            Forecast::Player => "PLAYER",
            Forecast::Tie => "TIE",
            Forecast::CannotPredict => "CANNOT_PREDICT",
            Forecast::PredictionError => "PREDICTION_ERROR",
        }
    }

    /// Collapse a predictor result into the label stored on a record.
    pub fn from_result(
        result: &Result<crate::model::Prediction, crate::errors::PredictError>,
    ) -> Forecast {
        use crate::errors::PredictError;
        match result {
            Ok(prediction) => prediction.outcome.into(),
            Err(PredictError::ModelFailure(_)) => Forecast::PredictionError,
            Err(PredictError::InsufficientData { .. }) | Err(PredictError::NotTrained) => {
                Forecast::CannotPredict
            }
        }
    }
}

impl From<Outcome> for Forecast {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Banker => Forecast::Banker,
            Outcome::Player => Forecast::Player,
            Outcome::Tie => Forecast::Tie,
        }
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
