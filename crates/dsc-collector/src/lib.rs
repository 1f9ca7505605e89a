//! DNS statistics collector service.
//!
//! [`StatsCollector`] owns the configured datasets behind one lock. Capture
//! tasks feed decoded messages through [`StatsCollector::classify`]; the
//! interval loop periodically prints every dataset into an
//! [`IntervalReport`], resets counters and dynamic indices, and hands the
//! report to an [`Exporter`].

pub mod collector;
pub mod config;
pub mod error;
pub mod exporter;

pub use collector::{until_next_boundary, CollectorStats, IntervalSettings, StatsCollector};
pub use config::{CollectorConfig, DatasetConfig, ExporterConfig, ReporterType};
pub use error::{CollectorError, ExportError};
pub use exporter::{Exporter, FileExporter, InMemoryExporter, IntervalReport, LogExporter};
