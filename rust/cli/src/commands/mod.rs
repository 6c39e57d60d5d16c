//! Command handler modules for the baccarat CLI.
//!
//! Each command lives in its own file with the same shape:
//!
//! - Public handler function: `pub fn handle_COMMAND_command(...) -> Result<(), CliError>`
//! - Output streams (`&mut dyn Write`) passed in by [`crate::run`]
//! - Errors propagated through [`crate::CliError`]

mod cards;
mod cfg;
mod export;
mod replay;
mod sequence;
mod stats;

pub use cards::handle_cards_command;
pub use cfg::handle_cfg_command;
pub use export::handle_export_command;
pub use replay::handle_replay_command;
pub use sequence::handle_sequence_command;
pub use stats::handle_stats_command;

use crate::config;
use crate::error::CliError;
use baccarat_engine::Table;

/// A table configured from the environment with a fresh forest model.
pub(crate) fn configured_table() -> Result<Table, CliError> {
    let cfg = config::load().map_err(|e| CliError::Config(e.to_string()))?;
    let model = baccarat_ai::create_model("forest").map_err(|e| CliError::Engine(e.to_string()))?;
    Ok(Table::new(cfg.table_config(), model))
}
