use std::path::PathBuf;

use thiserror::Error;

use dsc_classify::LookupError;
use dsc_stats::StatsError;

/// Errors raised while writing an interval report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while building a collector from configuration.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to load reference data: {0}")]
    Lookup(#[from] LookupError),

    #[error("failed to register dataset: {0}")]
    Dataset(#[from] StatsError),
}
