//! Configuration command handler.
//!
//! Prints the resolved configuration with the source of every value
//! (`default`, `file` or `env`):
//!
//! ```json
//! {
//!   "deck_count": {
//!     "value": 8,
//!     "source": "default"
//!   },
//!   ...
//! }
//! ```

use crate::config;
use crate::error::CliError;
use std::io::Write;

pub fn handle_cfg_command(out: &mut dyn Write) -> Result<(), CliError> {
    let resolved = config::load_with_sources().map_err(|e| CliError::Config(e.to_string()))?;

    let config::ConfigResolved { config, sources } = resolved;
    let display = serde_json::json!({
        "deck_count": {
            "value": config.deck_count,
            "source": sources.deck_count,
        },
        "warmup_size": {
            "value": config.warmup_size,
            "source": sources.warmup_size,
        },
        "seed": {
            "value": config.seed,
            "source": sources.seed,
        },
        "auto_detect": {
            "value": config.auto_detect,
            "source": sources.auto_detect,
        }
    });
    let json_str = serde_json::to_string_pretty(&display)?;
    writeln!(out, "{}", json_str)?;
    Ok(())
}
