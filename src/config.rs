use chrono::{FixedOffset, Local, Offset, Utc};
use std::{path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/moments.json";
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_LIST_LIMIT: usize = 1000;

#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(String);

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    /// Zone whose midnight separates calendar days.
    pub utc_offset: FixedOffset,
    pub refresh_interval: Duration,
    pub list_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;
        let data_path = get("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
        let utc_offset = match get("APP_UTC_OFFSET") {
            Some(raw) => parse_offset(&raw)?,
            None => Local::now().offset().fix(),
        };
        let refresh_secs: u64 =
            parse_or("REFRESH_INTERVAL_SECS", get("REFRESH_INTERVAL_SECS"), DEFAULT_REFRESH_SECS)?;
        if refresh_secs == 0 {
            return Err(ConfigError("REFRESH_INTERVAL_SECS must be at least 1".into()));
        }
        let list_limit =
            parse_or("RECORD_LIST_LIMIT", get("RECORD_LIST_LIMIT"), DEFAULT_LIST_LIMIT)?;

        Ok(Self {
            port,
            data_path,
            utc_offset,
            refresh_interval: Duration::from_secs(refresh_secs),
            list_limit,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError(format!("{key}={value} could not be parsed"))),
    }
}

/// Parses `+08:00`, `-0530` or `Z`.
fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let invalid = || ConfigError(format!("APP_UTC_OFFSET={raw} is not a +HH:MM offset"));
    let (sign, rest) = match value.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
