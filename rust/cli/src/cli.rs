//! Command-line argument definitions.
//!
//! Parsing lives here so [`crate::run`] only has to dispatch.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "baccarat",
    version,
    about = "Baccarat outcome tracker: card formula, streak heuristic and sequence model"
)]
pub struct BaccaratCli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict the next round from the cards of the last one
    Cards {
        /// Banker hand, e.g. "34" or "3 4"
        #[arg(long)]
        banker: String,
        /// Player hand, e.g. "99" or "9,9"
        #[arg(long)]
        player: String,
        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Predict the next round from a history such as "BBPBP"
    Sequence {
        #[arg(long)]
        history: String,
        /// Also train a sequence model on the history and ask it
        #[arg(long)]
        ai: bool,
        #[arg(long)]
        json: bool,
    },
    /// Statistics of a recorded history file
    Stats {
        /// JSON array, JSONL or plain outcome string (.zst accepted)
        #[arg(long)]
        input: String,
        #[arg(long)]
        json: bool,
    },
    /// Convert a recorded history to CSV or JSON
    Export {
        #[arg(long)]
        input: String,
        #[arg(long, value_enum)]
        format: ExportFormat,
        /// Destination file; stdout when omitted
        #[arg(long)]
        output: Option<String>,
    },
    /// Feed a history through a fresh table and show each round's predictions
    Replay {
        #[arg(long)]
        input: String,
        /// Train the sequence model as history accumulates
        #[arg(long)]
        train: bool,
    },
    /// Show the resolved configuration and where each value came from
    Cfg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}
