//! Run configuration.
//!
//! # Responsibility
//! - Deserialize the TOML configuration handed to services at construction.
//! - Validate sheet names, cell addresses, run dates and the time zone.
//!
//! # Invariants
//! - A validated config always names three non-empty sheets.
//! - Allowed dates are `MMDD` strings of real calendar days.

use crate::service::notification::CellAddress;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Static link appended to notification messages.
    #[serde(default)]
    pub reference_link: String,
    /// `MMDD` days a scheduled run may write on. Empty means every day.
    #[serde(default)]
    pub allowed_dates: Vec<String>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub sheets: SheetNames,
    pub notification: NotificationCells,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetNames {
    pub ledger: String,
    pub cancellations: String,
    pub notifications: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            ledger: "출결기록".to_string(),
            cancellations: "취소명단".to_string(),
            notifications: "알림".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationCells {
    pub morning: CellAddress,
    pub afternoon: CellAddress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub grade1: Option<PathBuf>,
    pub grade2: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<String>,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl AppConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        for (key, name) in [
            ("sheets.ledger", &self.sheets.ledger),
            ("sheets.cancellations", &self.sheets.cancellations),
            ("sheets.notifications", &self.sheets.notifications),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("`{key}` cannot be empty")));
            }
        }

        for (key, cell) in [
            ("notification.morning", self.notification.morning),
            ("notification.afternoon", self.notification.afternoon),
        ] {
            if cell.row == 0 || cell.col == 0 {
                return Err(ConfigError::Invalid(format!(
                    "`{key}` must use 1-based row/col, got ({}, {})",
                    cell.row, cell.col
                )));
            }
        }

        if let Some(bad) = self
            .allowed_dates
            .iter()
            .find(|value| !is_valid_month_day(value))
        {
            return Err(ConfigError::Invalid(format!(
                "allowed date `{bad}` is not an MMDD calendar day"
            )));
        }

        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown time zone `{}`", self.timezone)))
    }

    /// Today's date in the configured time zone.
    pub fn today(&self) -> Result<NaiveDate, ConfigError> {
        let tz = self.tz()?;
        Ok(tz.from_utc_datetime(&Utc::now().naive_utc()).date_naive())
    }

    /// Allowed `MMDD` days, or `None` when every day is allowed.
    pub fn allowed_dates(&self) -> Option<BTreeSet<String>> {
        if self.allowed_dates.is_empty() {
            return None;
        }
        Some(self.allowed_dates.iter().map(|value| value.trim().to_string()).collect())
    }
}

fn is_valid_month_day(value: &str) -> bool {
    let value = value.trim();
    if value.len() != 4 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return false;
    }
    let (Ok(month), Ok(day)) = (value[..2].parse::<u32>(), value[2..].parse::<u32>()) else {
        return false;
    };
    // Leap year so that 0229 is accepted.
    NaiveDate::from_ymd_opt(2024, month, day).is_some()
}
