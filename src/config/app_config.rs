use std::path::Path;

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

use crate::core::errors::{Result, VestigeError};

/// Top-level Vestige configuration read from `vestige.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vestige: VestigeSection,
    #[serde(default)]
    pub store: StoreSection,
}

impl AppConfig {
    /// Load the configuration from `{dir}/vestige.toml`.
    ///
    /// After parsing, validates the time zone and the store log
    /// filename to prevent path traversal from a compromised config
    /// file.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("vestige.toml");
        if !config_path.exists() {
            return Err(VestigeError::InvalidConfig {
                detail: format!("vestige.toml not found in {}", dir.display()),
            });
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content).map_err(|e| VestigeError::InvalidConfig {
            detail: format!("Failed to parse vestige.toml: {e}"),
        })?;

        config.vestige.time_zone_offset()?;
        validate_simple_filename(&config.store.log_file, "store log file")?;

        Ok(config)
    }

    /// Load from `{dir}/vestige.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        if dir.join("vestige.toml").exists() {
            Self::load(dir)
        } else {
            Ok(Self::default())
        }
    }
}

/// The `[vestige]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct VestigeSection {
    /// Consult the legacy text change format when structured changes
    /// are absent.
    #[serde(default)]
    pub use_text_changes_fallback: bool,
    /// Do not capture origin metadata at scope entry.
    #[serde(default)]
    pub disable_remote_address: bool,
    /// Display time zone: "UTC" or a fixed offset such as "+02:00".
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for VestigeSection {
    fn default() -> Self {
        Self {
            use_text_changes_fallback: false,
            disable_remote_address: false,
            time_zone: default_time_zone(),
        }
    }
}

impl VestigeSection {
    /// Parse the configured time zone into a fixed offset.
    pub fn time_zone_offset(&self) -> Result<FixedOffset> {
        parse_time_zone(&self.time_zone)
    }
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// The `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            log_file: default_log_file(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_log_file() -> String {
    "changes.log".to_string()
}

fn parse_time_zone(value: &str) -> Result<FixedOffset> {
    if value.eq_ignore_ascii_case("UTC") {
        return Ok(Utc.fix());
    }

    let invalid = || VestigeError::InvalidTimeZone {
        value: value.to_string(),
    };

    let (sign, rest) = match value.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn validate_simple_filename(name: &str, what: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && !name.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(VestigeError::InvalidConfig {
            detail: format!("Invalid {what} '{name}': expected a plain filename"),
        })
    }
}
