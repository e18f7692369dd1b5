use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::DEFAULT_CHART_LABEL_FORMAT;
pub use crate::ledger::is_valid_date_format;
use crate::utils::paths;

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// User preferences for display and storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "Config::default_currency_precision")]
    pub currency_precision: u8,
    /// strftime pattern used for chart day labels.
    #[serde(default = "Config::default_chart_label_format")]
    pub chart_label_format: String,
    #[serde(default = "Config::default_chart_width")]
    pub chart_width: usize,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency_symbol: Self::default_currency_symbol(),
            currency_precision: Self::default_currency_precision(),
            chart_label_format: Self::default_chart_label_format(),
            chart_width: Self::default_chart_width(),
            backup_retention: Self::default_backup_retention(),
        }
    }
}

impl Config {
    pub const KEYS: &'static [&'static str] = &[
        "currency_symbol",
        "currency_precision",
        "chart_label_format",
        "chart_width",
        "backup_retention",
    ];

    pub fn default_currency_symbol() -> String {
        "$".into()
    }

    pub fn default_currency_precision() -> u8 {
        2
    }

    pub fn default_chart_label_format() -> String {
        DEFAULT_CHART_LABEL_FORMAT.into()
    }

    pub fn default_chart_width() -> usize {
        40
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    /// Key/value pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("currency_symbol", self.currency_symbol.clone()),
            ("currency_precision", self.currency_precision.to_string()),
            ("chart_label_format", self.chart_label_format.clone()),
            ("chart_width", self.chart_width.to_string()),
            ("backup_retention", self.backup_retention.to_string()),
        ]
    }

    /// Parses and applies a single setting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "currency_symbol" => self.currency_symbol = value.to_string(),
            "currency_precision" => {
                let precision = parse_number::<u8>(key, value)?;
                if precision > 6 {
                    return Err(invalid(key, "precision must be between 0 and 6"));
                }
                self.currency_precision = precision;
            }
            "chart_label_format" => {
                if !is_valid_date_format(value) {
                    return Err(invalid(key, "not a valid strftime date pattern"));
                }
                self.chart_label_format = value.to_string();
            }
            "chart_width" => {
                let width = parse_number::<usize>(key, value)?;
                if width == 0 {
                    return Err(invalid(key, "width must be positive"));
                }
                self.chart_width = width;
            }
            "backup_retention" => {
                let retention = parse_number::<usize>(key, value)?;
                if retention == 0 {
                    return Err(invalid(key, "retention must be at least 1"));
                }
                self.backup_retention = retention;
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn format_amount(&self, amount: f64) -> String {
        format!(
            "{symbol}{amount:.prec$}",
            symbol = self.currency_symbol,
            amount = amount,
            prec = self.currency_precision as usize
        )
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| invalid(key, &format!("`{}` is not a valid number", value)))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Handles persistence for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = paths::config_dir_in(&base);
        fs::create_dir_all(&config_dir)?;
        Ok(Self {
            path: paths::config_file_in(&base),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored config. A chart label pattern that cannot render a
    /// date is replaced by the default.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let mut config: Config =
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))?;
        if !is_valid_date_format(&config.chart_label_format) {
            tracing::warn!(
                pattern = %config.chart_label_format,
                "invalid chart_label_format in config, using default"
            );
            config.chart_label_format = Config::default_chart_label_format();
        }
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        assert_eq!(manager.load().unwrap(), Config::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.set("currency_symbol", "€").unwrap();
        config.set("chart_width", "25").unwrap();
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(manager.path(), r#"{"currency_symbol":"£"}"#).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.currency_symbol, "£");
        assert_eq!(config.chart_label_format, DEFAULT_CHART_LABEL_FORMAT);
    }

    #[test]
    fn time_only_label_pattern_in_file_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(
            manager.path(),
            r#"{"currency_symbol":"£","chart_label_format":"%H:%M"}"#,
        )
        .unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.currency_symbol, "£");
        assert_eq!(config.chart_label_format, DEFAULT_CHART_LABEL_FORMAT);
    }

    #[test]
    fn set_validates_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("chart_width", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("currency_precision", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("chart_label_format", "%H:%M"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("colour", "blue"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn date_patterns_are_checked() {
        assert!(is_valid_date_format("%-m/%-d"));
        assert!(is_valid_date_format("%d %b"));
        assert!(!is_valid_date_format("%Q"));
        assert!(!is_valid_date_format(""));
    }

    #[test]
    fn amounts_use_symbol_and_precision() {
        let mut config = Config::default();
        assert_eq!(config.format_amount(15.5), "$15.50");
        config.set("currency_precision", "0").unwrap();
        assert_eq!(config.format_amount(15.5), "$16");
    }
}
