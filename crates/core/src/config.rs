use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables of the timeline synchronizer.
///
/// Every field has a default, so a config file only needs the values it
/// overrides:
///
/// ```toml
/// refresh_debounce_ms = 50
/// pixels_per_day = 20.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay between the first refresh request and the coalesced broadcast.
    pub refresh_debounce_ms: u64,
    /// Days added before the earliest tracked date.
    pub left_padding_days: u64,
    /// Multiple of the visible header width appended after the latest date.
    pub right_padding_factor: f64,
    /// Initial horizontal scale.
    pub pixels_per_day: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: 30,
            left_padding_days: 3,
            right_padding_factor: 1.5,
            pixels_per_day: 30.0,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pixels_per_day.is_finite() && self.pixels_per_day > 0.0) {
            return Err(ConfigError::Invalid {
                field: "pixels_per_day",
                reason: format!("must be positive, got {}", self.pixels_per_day),
            });
        }
        if !(self.right_padding_factor.is_finite() && self.right_padding_factor >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "right_padding_factor",
                reason: format!("must not be negative, got {}", self.right_padding_factor),
            });
        }
        Ok(())
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = SyncConfig::default();
        assert_eq!(config.refresh_debounce(), Duration::from_millis(30));
        assert_eq!(config.left_padding_days, 3);
        assert!((config.right_padding_factor - 1.5).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() -> Result<(), ConfigError> {
        let config = SyncConfig::from_toml_str("refresh_debounce_ms = 80\npixels_per_day = 12.5")?;
        assert_eq!(config.refresh_debounce_ms, 80);
        assert!((config.pixels_per_day - 12.5).abs() < f64::EPSILON);
        assert_eq!(config.left_padding_days, 3);
        Ok(())
    }

    #[test]
    fn rejects_non_positive_scale() {
        let err = SyncConfig::from_toml_str("pixels_per_day = 0.0");
        assert!(matches!(
            err,
            Err(ConfigError::Invalid {
                field: "pixels_per_day",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unparsable_toml() {
        assert!(matches!(
            SyncConfig::from_toml_str("refresh_debounce_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_nonexistent_returns_default() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let config = SyncConfig::load_from(&temp_dir.path().join("missing.toml"))?;
        assert_eq!(config, SyncConfig::default());
        Ok(())
    }

    #[test]
    fn load_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("timeline.toml");
        std::fs::write(&path, "left_padding_days = 7\n")?;

        let config = SyncConfig::load_from(&path)?;
        assert_eq!(config.left_padding_days, 7);
        Ok(())
    }
}
