use crate::domain::NetTuning;
use std::{env, fmt, fs, io, path::Path, time::Duration};

// Runtime/client constants (not netcode tuning).

pub fn server_url() -> String {
    env::var("RACE_SERVER_URL").unwrap_or_else(|_| "ws://127.0.0.1:8000".to_string())
}

pub fn room() -> String {
    env::var("RACE_ROOM")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "brands-public".to_string())
}

pub fn player_name() -> String {
    env::var("RACE_PLAYER_NAME")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "Player".to_string())
}

pub fn tuning_path() -> Option<String> {
    env::var("RACE_TUNING_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub const DEVICE_CHANNEL_CAPACITY: usize = 256;

// 20 Hz forced input sends.
pub const INPUT_SEND_INTERVAL: Duration = Duration::from_millis(50);
pub const LATENCY_PROBE_INTERVAL: Duration = Duration::from_secs(1);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 60);

#[derive(Debug)]
pub enum ConfigError {
    Read(io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(err) => write!(f, "failed to read tuning file: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse tuning file: {err}"),
            ConfigError::Invalid(reason) => write!(f, "invalid tuning: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

pub fn parse_tuning(text: &str) -> Result<NetTuning, ConfigError> {
    let tuning: NetTuning = toml::from_str(text).map_err(ConfigError::Parse)?;
    tuning.validate().map_err(ConfigError::Invalid)?;
    Ok(tuning)
}

pub fn load_tuning(path: impl AsRef<Path>) -> Result<NetTuning, ConfigError> {
    let text = fs::read_to_string(path).map_err(ConfigError::Read)?;
    parse_tuning(&text)
}

/// Tuning from `RACE_TUNING_PATH`, or the defaults when it is unset.
pub fn tuning() -> Result<NetTuning, ConfigError> {
    match tuning_path() {
        Some(path) => load_tuning(path),
        None => Ok(NetTuning::default()),
    }
}
