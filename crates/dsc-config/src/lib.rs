//! Configuration plumbing for the dsc collector.
//!
//! A configuration type implements [`Config`]: it is parsed from a TOML
//! document and then validated as a whole. Semantic errors (a zero interval,
//! a duplicate dataset) surface as [`ConfigError`] before anything starts.

pub mod manager;

pub use manager::ConfigManager;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Two entries that must be unique share a name.
    #[error("duplicate {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// A loadable, self-validating configuration.
pub trait Config: DeserializeOwned + Send + Sync + 'static {
    /// Build the configuration from a parsed TOML value.
    fn from_toml(value: &toml::Value) -> Result<Self, ConfigError> {
        Ok(value.clone().try_into()?)
    }

    /// Check cross-field constraints. The default accepts everything.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        interval: u64,
    }

    impl Config for Sample {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.interval == 0 {
                return Err(ConfigError::invalid("interval", "can not be zero"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_from_toml() {
        let value: toml::Value = "interval = 60".parse().unwrap();
        let cfg = Sample::from_toml(&value).unwrap();
        assert_eq!(cfg.interval, 60);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let value: toml::Value = "interval = 0".parse().unwrap();
        let cfg = Sample::from_toml(&value).unwrap();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid value for `interval`: can not be zero");
    }

    #[test]
    fn test_type_mismatch_is_parse_error() {
        let value: toml::Value = "interval = \"soon\"".parse().unwrap();
        assert!(matches!(Sample::from_toml(&value), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_duplicate_display() {
        let err = ConfigError::Duplicate {
            kind: "dataset",
            name: "qtype".into(),
        };
        assert_eq!(err.to_string(), "duplicate dataset `qtype`");
    }
}
