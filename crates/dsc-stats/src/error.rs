use thiserror::Error;

/// Errors raised by the statistics engine.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A dataset with this name (compared case-insensitively) already exists.
    #[error("dataset `{0}` already exists")]
    DuplicateDataset(String),

    /// The indexer name could not be resolved.
    #[error("unknown indexer `{0}`")]
    UnknownIndexer(String),

    /// The filter name could not be resolved.
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    /// A dataset option is out of range.
    #[error("dataset `{dataset}`: invalid option `{key}`: {reason}")]
    InvalidOption {
        dataset: String,
        key: &'static str,
        reason: String,
    },

    /// An index domain outgrew its allocation ceiling.
    #[error("index capacity exhausted for `{domain}`: limit is {limit}")]
    Capacity { domain: String, limit: usize },
}

impl StatsError {
    /// Whether this error aborts configuration rather than a single message.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, StatsError::Capacity { .. })
    }
}

/// Result type used throughout the statistics engine.
pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_duplicate() {
        let err = StatsError::DuplicateDataset("qtype".into());
        assert_eq!(err.to_string(), "dataset `qtype` already exists");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_display_capacity() {
        let err = StatsError::Capacity {
            domain: "ASN".into(),
            limit: 65536,
        };
        let s = err.to_string();
        assert!(s.contains("ASN"));
        assert!(s.contains("65536"));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_display_invalid_option() {
        let err = StatsError::InvalidOption {
            dataset: "client_subnet".into(),
            key: "max_cells",
            reason: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "dataset `client_subnet`: invalid option `max_cells`: must be positive"
        );
    }
}
