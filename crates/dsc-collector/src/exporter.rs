//! Exporter backends for interval reports.
//!
//! - `LogExporter`: logs each array via `tracing`.
//! - `FileExporter`: writes one JSON-lines file per interval.
//! - `InMemoryExporter`: keeps reports in memory for tests.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use dsc_stats::ArrayReport;

use crate::config::{ExporterConfig, ReporterType};
use crate::error::ExportError;

/// Every dataset's printed contents for one interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalReport {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    /// One entry per dataset, in registration order.
    pub arrays: Vec<ArrayReport>,
}

impl IntervalReport {
    pub fn array(&self, name: &str) -> Option<&ArrayReport> {
        self.arrays.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// Sink for finished interval reports.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, report: &IntervalReport) -> Result<(), ExportError>;
}

/// Build the exporter selected in configuration.
pub fn from_config(config: &ExporterConfig) -> Arc<dyn Exporter> {
    match config.reporter_type {
        ReporterType::Log => Arc::new(LogExporter),
        ReporterType::File => Arc::new(FileExporter::new(&config.export_path)),
    }
}

pub struct LogExporter;

#[async_trait]
impl Exporter for LogExporter {
    async fn export(&self, report: &IntervalReport) -> Result<(), ExportError> {
        for array in &report.arrays {
            tracing::info!(
                dataset = %array.name,
                start = %report.start,
                stop = %report.stop,
                rows = array.rows.len(),
                "dataset report"
            );
            for (d1, d2, count) in array.cells() {
                tracing::debug!(dataset = %array.name, d1, d2, count, "cell");
            }
        }
        Ok(())
    }
}

/// One line of a file export: an array plus its interval bounds.
#[derive(Serialize)]
struct ArrayLine<'a> {
    start: i64,
    stop: i64,
    #[serde(flatten)]
    array: &'a ArrayReport,
}

/// Writes each interval to `<dir>/<stop unix seconds>.dscdata.jsonl`, one
/// JSON object per dataset.
///
/// The report is written to a hidden temporary file and then linked under
/// its final name, so readers never see a partial file. A second report with
/// the same `stop` second gets a `.1`, `.2`, ... suffix instead of being
/// merged into the first.
pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Return the export directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that receives the first report ending at `stop`.
    pub fn file_for(&self, stop: &DateTime<Utc>) -> PathBuf {
        self.file_for_seq(stop, 0)
    }

    fn file_for_seq(&self, stop: &DateTime<Utc>, seq: u32) -> PathBuf {
        match seq {
            0 => self.dir.join(format!("{}.dscdata.jsonl", stop.timestamp())),
            n => self
                .dir
                .join(format!("{}.{n}.dscdata.jsonl", stop.timestamp())),
        }
    }

    fn temp_for(&self, stop: &DateTime<Utc>) -> PathBuf {
        self.dir.join(format!(
            ".{}.{}.dscdata.tmp",
            stop.timestamp(),
            std::process::id()
        ))
    }

    /// Link `tmp` under the first free name for `stop`.
    fn publish(&self, tmp: &Path, stop: &DateTime<Utc>) -> Result<PathBuf, ExportError> {
        let mut seq = 0;
        loop {
            let path = self.file_for_seq(stop, seq);
            match fs::hard_link(tmp, &path) {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => seq += 1,
                Err(source) => return Err(ExportError::Io { path, source }),
            }
        }
    }
}

fn write_temp(path: &Path, buf: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(buf)?;
    file.sync_all()
}

#[async_trait]
impl Exporter for FileExporter {
    async fn export(&self, report: &IntervalReport) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut buf = Vec::new();
        for array in &report.arrays {
            let line = ArrayLine {
                start: report.start.timestamp(),
                stop: report.stop.timestamp(),
                array,
            };
            serde_json::to_writer(&mut buf, &line)?;
            buf.push(b'\n');
        }

        let tmp = self.temp_for(&report.stop);
        let published = write_temp(&tmp, &buf)
            .map_err(|source| ExportError::Io {
                path: tmp.clone(),
                source,
            })
            .and_then(|()| self.publish(&tmp, &report.stop));
        let _ = fs::remove_file(&tmp);
        let path = published?;

        tracing::debug!(path = %path.display(), arrays = report.arrays.len(), "Wrote report");
        Ok(())
    }
}

/// Stores exported reports in memory.
pub struct InMemoryExporter {
    reports: Mutex<Vec<IntervalReport>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
        }
    }

    /// Take all stored reports, leaving the buffer empty.
    pub fn take_reports(&self) -> Vec<IntervalReport> {
        std::mem::take(&mut *self.reports.lock())
    }

    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl Default for InMemoryExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exporter for InMemoryExporter {
    async fn export(&self, report: &IntervalReport) -> Result<(), ExportError> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}
