//! Configuration for the collector.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dsc_classify::CatalogSettings;
use dsc_config::{Config, ConfigError};
use dsc_logging::LogConfig;
use dsc_stats::{AxisSpec, DatasetOptions, DatasetSpec, DEFAULT_INDEX_CAPACITY};

/// Top-level collector configuration, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Interval length in seconds.
    #[serde(default = "default_statistics_interval")]
    pub statistics_interval: u64,

    /// Start counting immediately instead of waiting for the first interval
    /// boundary.
    #[serde(default)]
    pub no_wait_interval: bool,

    /// Export the in-progress interval on shutdown.
    #[serde(default)]
    pub dump_reports_on_exit: bool,

    #[serde(default)]
    pub asn_v4_db: Option<PathBuf>,
    #[serde(default)]
    pub asn_v6_db: Option<PathBuf>,
    #[serde(default)]
    pub country_v4_db: Option<PathBuf>,
    #[serde(default)]
    pub country_v6_db: Option<PathBuf>,

    /// Prefix length for IPv4 `client_subnet` keys.
    #[serde(default = "default_client_v4_mask")]
    pub client_v4_mask: u8,

    /// Prefix length for IPv6 `client_subnet` keys.
    #[serde(default = "default_client_v6_mask")]
    pub client_v6_mask: u8,

    /// Ceiling on distinct keys per dynamic axis and on any axis index.
    #[serde(default = "default_index_capacity")]
    pub index_capacity: usize,

    #[serde(default)]
    pub exporter: ExporterConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default, rename = "dataset")]
    pub datasets: Vec<DatasetConfig>,
}

fn default_statistics_interval() -> u64 {
    60
}

fn default_client_v4_mask() -> u8 {
    24
}

fn default_client_v6_mask() -> u8 {
    48
}

fn default_index_capacity() -> usize {
    DEFAULT_INDEX_CAPACITY
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            statistics_interval: default_statistics_interval(),
            no_wait_interval: false,
            dump_reports_on_exit: false,
            asn_v4_db: None,
            asn_v6_db: None,
            country_v4_db: None,
            country_v6_db: None,
            client_v4_mask: default_client_v4_mask(),
            client_v6_mask: default_client_v6_mask(),
            index_capacity: default_index_capacity(),
            exporter: ExporterConfig::default(),
            log: LogConfig::default(),
            datasets: Vec::new(),
        }
    }
}

impl CollectorConfig {
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            client_v4_prefix: self.client_v4_mask,
            client_v6_prefix: self.client_v6_mask,
            capacity: self.index_capacity,
        }
    }
}

impl Config for CollectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.statistics_interval == 0 {
            return Err(ConfigError::invalid(
                "statistics_interval",
                "can not be zero",
            ));
        }
        if self.index_capacity == 0 {
            return Err(ConfigError::invalid("index_capacity", "can not be zero"));
        }
        if self.client_v4_mask > 32 {
            return Err(ConfigError::invalid(
                "client_v4_mask",
                format!("{} exceeds 32", self.client_v4_mask),
            ));
        }
        if self.client_v6_mask > 128 {
            return Err(ConfigError::invalid(
                "client_v6_mask",
                format!("{} exceeds 128", self.client_v6_mask),
            ));
        }

        let mut seen = HashSet::new();
        for ds in &self.datasets {
            if ds.name.is_empty() {
                return Err(ConfigError::invalid("dataset.name", "can not be empty"));
            }
            if !seen.insert(ds.name.to_ascii_lowercase()) {
                return Err(ConfigError::Duplicate {
                    kind: "dataset",
                    name: ds.name.clone(),
                });
            }
            if ds.max_cells == Some(0) {
                return Err(ConfigError::invalid(
                    format!("dataset.{}.max_cells", ds.name),
                    "must be positive",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterType {
    #[default]
    Log,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub reporter_type: ReporterType,

    /// Output directory for the `file` reporter.
    #[serde(default = "default_export_path")]
    pub export_path: PathBuf,
}

fn default_export_path() -> PathBuf {
    PathBuf::from("./dsc_export")
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            reporter_type: ReporterType::default(),
            export_path: default_export_path(),
        }
    }
}

/// One `[[dataset]]` table.
///
/// ```toml
/// [[dataset]]
/// name = "qtype_vs_asn"
/// dim1 = ["Qtype", "qtype"]
/// dim2 = ["ASN", "asn"]
/// filters = ["queries-only"]
/// max_cells = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// `[type label, indexer name]`.
    pub dim1: (String, String),
    pub dim2: (String, String),
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default, alias = "min-count")]
    pub min_count: u64,
    #[serde(default, alias = "max-cells")]
    pub max_cells: Option<usize>,
}

impl DatasetConfig {
    pub fn to_spec(&self) -> DatasetSpec {
        DatasetSpec {
            name: self.name.clone(),
            dim1: AxisSpec::new(self.dim1.0.clone(), self.dim1.1.clone()),
            dim2: AxisSpec::new(self.dim2.0.clone(), self.dim2.1.clone()),
            filters: self.filters.clone(),
            options: DatasetOptions {
                min_count: self.min_count,
                max_cells: self.max_cells,
            },
        }
    }
}
