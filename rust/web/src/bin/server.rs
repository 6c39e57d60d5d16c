//! Standalone web server binary
//!
//! Usage: cargo run -p baccarat-web --bin baccarat-web-server -- --port 8080

use baccarat_web::{init_logging, AppSettings, LogFormat, ServerConfig, WebServer};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "baccarat-web-server", about = "Baccarat outcome tracker over HTTP")]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind to
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Decks per shoe for new tables (1-8)
    #[arg(long)]
    decks: Option<usize>,
    /// Rounds of warm-up after a new shoe
    #[arg(long)]
    warmup_size: Option<usize>,
    /// Do not open a new shoe when the current one runs out
    #[arg(long)]
    no_auto_detect: bool,
    /// Seed for shoe shuffles
    #[arg(long)]
    seed: Option<u64>,
    /// Log one JSON object per line
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn table_defaults(&self) -> AppSettings {
        let mut settings = AppSettings::default();
        if let Some(decks) = self.decks {
            settings.deck_count = decks;
        }
        if let Some(warmup_size) = self.warmup_size {
            settings.warmup_size = warmup_size;
        }
        if self.no_auto_detect {
            settings.auto_detect = false;
        }
        settings.seed = self.seed;
        settings
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let format = if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(format)?;

    let defaults = args.table_defaults();
    defaults.validate()?;

    let config = ServerConfig::new(args.host.clone(), args.port);
    tracing::info!(
        host = config.host(),
        port = config.port(),
        deck_count = defaults.deck_count,
        warmup_size = defaults.warmup_size,
        auto_detect = defaults.auto_detect,
        "starting baccarat web server"
    );

    let server = WebServer::new(config, defaults)?;
    let handle = server.start().await?;
    println!("Server running at http://{}", handle.address());
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down server");
    handle.shutdown().await?;
    Ok(())
}
