//! Deployment configuration from environment variables.

use crate::logic::DEFAULT_VARIETY_POOL_CAP;
use crate::models::{ChooserTieBreak, RotationStrategy, DEFAULT_COURTS};
use crate::service::{ServiceSettings, DEFAULT_MAX_WRITE_ATTEMPTS};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub courts: u8,
    pub strategy: RotationStrategy,
    pub variety_pool_cap: usize,
    pub max_write_attempts: u32,
    /// CSV roster merged into the directory at startup.
    pub roster_path: Option<PathBuf>,
    /// JSON snapshot of the session document and log.
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            courts: DEFAULT_COURTS,
            strategy: RotationStrategy::Recency,
            variety_pool_cap: DEFAULT_VARIETY_POOL_CAP,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            roster_path: None,
            snapshot_path: None,
            snapshot_interval: Duration::from_secs(30),
        }
    }
}

/// Parse `ROTATION` / `CHOOSER_TIE_BREAK` values.
pub fn parse_strategy(rotation: &str, tie_break: Option<&str>) -> Option<RotationStrategy> {
    let tie_break = match tie_break.map(|t| t.trim().to_ascii_lowercase()) {
        None => ChooserTieBreak::default(),
        Some(t) if t == "operator" => ChooserTieBreak::ActingOperator,
        Some(t) if t == "first-winner" => ChooserTieBreak::FirstWinner,
        Some(_) => return None,
    };
    match rotation.trim().to_ascii_lowercase().as_str() {
        "recency" => Some(RotationStrategy::Recency),
        "winner-chooses" => Some(RotationStrategy::WinnerChooses { tie_break }),
        "opponent-variety" => Some(RotationStrategy::OpponentVariety),
        _ => None,
    }
}

fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rotation = env::var("ROTATION").unwrap_or_else(|_| "recency".to_string());
        let tie_break = env::var("CHOOSER_TIE_BREAK").ok();
        let strategy = parse_strategy(&rotation, tie_break.as_deref()).unwrap_or_else(|| {
            log::warn!(
                "Ignoring invalid ROTATION={:?} / CHOOSER_TIE_BREAK={:?}",
                rotation,
                tie_break
            );
            defaults.strategy
        });

        let courts = match parsed_var("COURTS", defaults.courts) {
            0 => {
                log::warn!("COURTS must be at least 1; using {}", DEFAULT_COURTS);
                DEFAULT_COURTS
            }
            n => n,
        };

        let snapshot_interval = match parsed_var(
            "SNAPSHOT_INTERVAL_SECS",
            defaults.snapshot_interval.as_secs(),
        ) {
            0 => {
                log::warn!(
                    "SNAPSHOT_INTERVAL_SECS must be at least 1; using {}",
                    defaults.snapshot_interval.as_secs()
                );
                defaults.snapshot_interval
            }
            n => Duration::from_secs(n),
        };

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed_var("PORT", defaults.port),
            courts,
            strategy,
            variety_pool_cap: parsed_var("VARIETY_POOL_CAP", defaults.variety_pool_cap),
            max_write_attempts: parsed_var("MAX_WRITE_ATTEMPTS", defaults.max_write_attempts),
            roster_path: env::var("ROSTER_PATH").ok().map(PathBuf::from),
            snapshot_path: env::var("SNAPSHOT_PATH").ok().map(PathBuf::from),
            snapshot_interval,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            strategy: self.strategy,
            variety_pool_cap: self.variety_pool_cap,
            max_write_attempts: self.max_write_attempts,
        }
    }
}
