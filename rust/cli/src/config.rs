use baccarat_engine::TableConfig;
use baccarat_engine::shoe::{DEFAULT_DECKS, DEFAULT_WARMUP, ShoeSettings};
use serde::{Deserialize, Serialize};
use std::fs;

pub const CONFIG_ENV: &str = "BACCARAT_CONFIG";
pub const DECKS_ENV: &str = "BACCARAT_DECKS";
pub const WARMUP_ENV: &str = "BACCARAT_WARMUP";
pub const SEED_ENV: &str = "BACCARAT_SEED";
pub const AUTO_DETECT_ENV: &str = "BACCARAT_AUTO_DETECT";

const MAX_DECKS: usize = 8;
const MAX_WARMUP: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub deck_count: usize,
    pub warmup_size: usize,
    pub seed: Option<u64>,
    pub auto_detect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfigSources {
    pub deck_count: ValueSource,
    pub warmup_size: ValueSource,
    pub seed: ValueSource,
    pub auto_detect: ValueSource,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            deck_count: ValueSource::Default,
            warmup_size: ValueSource::Default,
            seed: ValueSource::Default,
            auto_detect: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: Config,
    pub sources: ConfigSources,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck_count: DEFAULT_DECKS,
            warmup_size: DEFAULT_WARMUP,
            seed: None,
            auto_detect: true,
        }
    }
}

impl Config {
    /// Table settings for offline replays; everything not configurable
    /// here keeps the engine default.
    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            shoe: ShoeSettings {
                deck_count: self.deck_count,
                warmup_size: self.warmup_size,
                auto_detect: self.auto_detect,
                seed: self.seed,
                ..ShoeSettings::default()
            },
            ..TableConfig::default()
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "cannot parse config file: {}", e),
            ConfigError::Invalid(msg) => f.write_str(msg),
        }
    }
}

pub fn load() -> Result<Config, ConfigError> {
    load_with_sources().map(|resolved| resolved.config)
}

/// Defaults, then the TOML file named by `BACCARAT_CONFIG`, then the
/// `BACCARAT_*` environment variables.
pub fn load_with_sources() -> Result<ConfigResolved, ConfigError> {
    let mut cfg = Config::default();
    let mut sources = ConfigSources::default();

    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        let s = fs::read_to_string(path)?;
        let f: FileConfig = toml::from_str(&s)?;
        if let Some(v) = f.deck_count {
            cfg.deck_count = v;
            sources.deck_count = ValueSource::File;
        }
        if let Some(v) = f.warmup_size {
            cfg.warmup_size = v;
            sources.warmup_size = ValueSource::File;
        }
        if let Some(v) = f.seed {
            cfg.seed = Some(v);
            sources.seed = ValueSource::File;
        }
        if let Some(v) = f.auto_detect {
            cfg.auto_detect = v;
            sources.auto_detect = ValueSource::File;
        }
    }

    if let Ok(decks) = std::env::var(DECKS_ENV)
        && !decks.is_empty()
    {
        cfg.deck_count = decks
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid {DECKS_ENV}: {decks}")))?;
        sources.deck_count = ValueSource::Env;
    }
    if let Ok(warmup) = std::env::var(WARMUP_ENV)
        && !warmup.is_empty()
    {
        cfg.warmup_size = warmup
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid {WARMUP_ENV}: {warmup}")))?;
        sources.warmup_size = ValueSource::Env;
    }
    if let Ok(seed) = std::env::var(SEED_ENV)
        && !seed.is_empty()
    {
        cfg.seed = Some(
            seed.parse()
                .map_err(|_| ConfigError::Invalid(format!("Invalid {SEED_ENV}: {seed}")))?,
        );
        sources.seed = ValueSource::Env;
    }
    if let Ok(auto) = std::env::var(AUTO_DETECT_ENV)
        && !auto.is_empty()
    {
        cfg.auto_detect = parse_bool(&auto)
            .ok_or_else(|| ConfigError::Invalid(format!("Invalid {AUTO_DETECT_ENV}: {auto}")))?;
        sources.auto_detect = ValueSource::Env;
    }

    validate(&cfg)?;
    Ok(ConfigResolved {
        config: cfg,
        sources,
    })
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    deck_count: Option<usize>,
    #[serde(default)]
    warmup_size: Option<usize>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    auto_detect: Option<bool>,
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if !(1..=MAX_DECKS).contains(&cfg.deck_count) {
        return Err(ConfigError::Invalid(format!(
            "Invalid configuration: deck_count must be between 1 and {MAX_DECKS}"
        )));
    }
    if cfg.warmup_size > MAX_WARMUP {
        return Err(ConfigError::Invalid(format!(
            "Invalid configuration: warmup_size must be at most {MAX_WARMUP}"
        )));
    }
    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
