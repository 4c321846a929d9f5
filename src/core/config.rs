use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::engine::{
    ForecastOptions, DEFAULT_CONFIDENCE_LEVELS, DEFAULT_HORIZON, DEFAULT_LOOKBACK_MONTHS,
    DEFAULT_SAMPLE_COUNT, DEFAULT_SEED,
};
use crate::core::series::MIN_HISTORICAL_MONTHS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_format() -> String {
    "text".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_color(),
        }
    }
}

/// Forecast engine defaults, overridable per run via CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_lookback")]
    pub lookback_months: usize,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default = "default_levels")]
    pub confidence_levels: Vec<f64>,
    #[serde(default = "default_samples")]
    pub sample_count: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_lookback() -> usize {
    DEFAULT_LOOKBACK_MONTHS
}
fn default_horizon() -> usize {
    DEFAULT_HORIZON
}
fn default_levels() -> Vec<f64> {
    DEFAULT_CONFIDENCE_LEVELS.to_vec()
}
fn default_samples() -> usize {
    DEFAULT_SAMPLE_COUNT
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback(),
            horizon: default_horizon(),
            confidence_levels: default_levels(),
            sample_count: default_samples(),
            seed: default_seed(),
        }
    }
}

impl ForecastConfig {
    pub fn to_options(&self) -> ForecastOptions {
        ForecastOptions {
            lookback_months: self.lookback_months,
            horizon: self.horizon,
            confidence_levels: self.confidence_levels.clone(),
            sample_count: self.sample_count,
            seed: self.seed,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("cct").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["text", "json"].contains(&self.settings.default_format.as_str()) {
            issues.push(format!(
                "Invalid default_format: '{}' (must be 'text' or 'json')",
                self.settings.default_format
            ));
        }
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        if self.forecast.lookback_months < MIN_HISTORICAL_MONTHS {
            issues.push(format!(
                "lookback_months must be at least {} (got {})",
                MIN_HISTORICAL_MONTHS, self.forecast.lookback_months
            ));
        }
        if self.forecast.horizon == 0 {
            issues.push("horizon must be at least 1".to_string());
        }
        if self.forecast.sample_count == 0 {
            issues.push("sample_count must be at least 1".to_string());
        }
        if self.forecast.confidence_levels.is_empty() {
            issues.push("confidence_levels must not be empty".to_string());
        }
        for level in &self.forecast.confidence_levels {
            if !(*level > 0.0 && *level <= 1.0) {
                issues.push(format!("confidence level {} is outside (0, 1]", level));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Default config should be valid, got: {:?}", issues);
    }

    #[test]
    fn default_forecast_settings() {
        let forecast = ForecastConfig::default();
        assert_eq!(forecast.lookback_months, 12);
        assert_eq!(forecast.horizon, 12);
        assert_eq!(forecast.confidence_levels, vec![0.95, 0.80, 0.50]);
        assert_eq!(forecast.sample_count, 100);
        assert_eq!(forecast.seed, 42);
    }

    #[test]
    fn validate_catches_invalid_format() {
        let mut config = AppConfig::default();
        config.settings.default_format = "xml".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("default_format")));
    }

    #[test]
    fn validate_catches_short_lookback() {
        let mut config = AppConfig::default();
        config.forecast.lookback_months = 3;
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("lookback_months")));
    }

    #[test]
    fn validate_catches_bad_confidence_level() {
        let mut config = AppConfig::default();
        config.forecast.confidence_levels = vec![0.95, 1.2];
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("confidence level")));
    }

    #[test]
    fn validate_catches_zero_horizon() {
        let mut config = AppConfig::default();
        config.forecast.horizon = 0;
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("horizon")));
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[settings]
default_format = "json"
color = "always"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.default_format, "json");
        assert_eq!(config.settings.color, "always");
        // Forecast section falls back to defaults entirely.
        assert_eq!(config.forecast.horizon, 12);
    }

    #[test]
    fn parse_forecast_overrides() {
        let toml = r#"
[forecast]
lookback_months = 24
horizon = 6
confidence_levels = [0.9]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.forecast.lookback_months, 24);
        assert_eq!(config.forecast.horizon, 6);
        assert_eq!(config.forecast.confidence_levels, vec![0.9]);
        assert_eq!(config.forecast.sample_count, 100);
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.default_format, "text");
        assert_eq!(config.forecast.seed, 42);
    }

    #[test]
    fn options_mirror_config() {
        let mut config = AppConfig::default();
        config.forecast.horizon = 6;
        config.forecast.seed = 7;
        let opts = config.forecast.to_options();
        assert_eq!(opts.horizon, 6);
        assert_eq!(opts.seed, 7);
        assert!(opts.cancel.is_none());
    }
}
