//! The lock-protected dataset registry and its interval loop.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};

use dsc_classify::{Catalog, ReferencePair};
use dsc_stats::{DatasetRegistry, ReportBuilder, StatsError};
use dsc_types::DnsMessage;

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::exporter::{Exporter, IntervalReport};

/// Interval timing and shutdown behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSettings {
    pub interval: Duration,
    pub no_wait: bool,
    pub dump_on_exit: bool,
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            no_wait: false,
            dump_on_exit: false,
        }
    }
}

impl From<&CollectorConfig> for IntervalSettings {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.statistics_interval),
            no_wait: config.no_wait_interval,
            dump_on_exit: config.dump_reports_on_exit,
        }
    }
}

struct Inner {
    registry: DatasetRegistry,
    interval_start: DateTime<Utc>,
    /// Capacity errors since `interval_start`.
    overflows: u64,
}

/// Point-in-time collector counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectorStats {
    pub messages_seen: u64,
    pub capacity_errors: u64,
    pub intervals_exported: u64,
    /// Messages counted per dataset since startup, in registration order.
    pub datasets: Vec<(String, u64)>,
}

/// Owns every dataset and serializes classification against dump/reset.
pub struct StatsCollector {
    inner: Mutex<Inner>,
    settings: IntervalSettings,
    messages_seen: AtomicU64,
    capacity_errors: AtomicU64,
    intervals_exported: AtomicU64,
}

impl StatsCollector {
    pub fn new(registry: DatasetRegistry, settings: IntervalSettings) -> Self {
        Self {
            inner: Mutex::new(Inner {
                registry,
                interval_start: Utc::now(),
                overflows: 0,
            }),
            settings,
            messages_seen: AtomicU64::new(0),
            capacity_errors: AtomicU64::new(0),
            intervals_exported: AtomicU64::new(0),
        }
    }

    /// Load reference tables and register every configured dataset.
    pub fn from_config(config: &CollectorConfig) -> Result<Self, CollectorError> {
        let asn = ReferencePair::open(
            "asn",
            config.asn_v4_db.as_deref(),
            config.asn_v6_db.as_deref(),
        )?;
        let country = ReferencePair::open(
            "country",
            config.country_v4_db.as_deref(),
            config.country_v6_db.as_deref(),
        )?;
        let catalog = Catalog::new(config.catalog_settings())
            .with_asn(asn)
            .with_country(country);

        let mut registry = DatasetRegistry::with_capacity(config.index_capacity);
        for ds in &config.datasets {
            registry.register(&ds.to_spec(), &catalog)?;
        }
        tracing::info!(
            datasets = registry.len(),
            interval = config.statistics_interval,
            "Collector configured"
        );
        Ok(Self::new(registry, IntervalSettings::from(config)))
    }

    /// Timing and shutdown behaviour of the interval loop.
    pub fn settings(&self) -> &IntervalSettings {
        &self.settings
    }

    /// Count `msg` in every dataset. Returns how many datasets counted it.
    ///
    /// A capacity overflow is counted and the other datasets still see the
    /// message. Only the first overflow of an interval is logged; the total
    /// is logged when the interval is reported.
    pub fn classify(&self, msg: &DnsMessage) -> usize {
        self.messages_seen.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();
        let out = inner.registry.classify_all(msg);
        match out.error {
            None => {}
            Some(e @ StatsError::Capacity { .. }) => {
                self.capacity_errors.fetch_add(1, Ordering::Relaxed);
                inner.overflows += 1;
                if inner.overflows == 1 {
                    tracing::warn!(
                        error = %e,
                        "Index capacity reached; further overflows this interval are not logged"
                    );
                }
            }
            Some(e) => tracing::error!(error = %e, "Classification failed"),
        }
        out.counted
    }

    /// Print every dataset, then reset counters and registries, all under
    /// one lock hold. The next interval starts at the returned `stop`.
    pub fn take_report(&self) -> IntervalReport {
        let mut inner = self.inner.lock();
        let stop = Utc::now();

        let mut builder = ReportBuilder::new();
        inner.registry.dump_all(&mut builder);
        inner.registry.reset_all();
        let start = std::mem::replace(&mut inner.interval_start, stop);
        let overflows = std::mem::take(&mut inner.overflows);
        if overflows > 0 {
            tracing::warn!(overflows, %start, %stop, "Messages dropped by full datasets");
        }

        IntervalReport {
            start,
            stop,
            arrays: builder.into_reports(),
        }
    }

    /// Snapshot of the collector counters.
    pub fn stats(&self) -> CollectorStats {
        let datasets = self
            .inner
            .lock()
            .registry
            .iter()
            .map(|ds| (ds.name().to_string(), ds.counted()))
            .collect();
        CollectorStats {
            messages_seen: self.messages_seen.load(Ordering::Relaxed),
            capacity_errors: self.capacity_errors.load(Ordering::Relaxed),
            intervals_exported: self.intervals_exported.load(Ordering::Relaxed),
            datasets,
        }
    }

    /// Export a finished report. Failures are logged, never retried.
    pub async fn export(&self, exporter: &dyn Exporter, report: &IntervalReport) {
        match exporter.export(report).await {
            Ok(()) => {
                self.intervals_exported.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    start = %report.start,
                    stop = %report.stop,
                    arrays = report.arrays.len(),
                    "Exported interval"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, stop = %report.stop, "Failed to export interval");
            }
        }
    }

    /// Dump, reset and export once per interval until `shutdown` resolves.
    ///
    /// The first tick lands on the next multiple of the interval length
    /// unless `no_wait` is set, in which case it comes one full interval
    /// after the loop starts.
    pub async fn run_intervals<F>(&self, exporter: &dyn Exporter, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = self.settings.interval;
        let first = if self.settings.no_wait {
            period
        } else {
            until_next_boundary(Utc::now(), period)
        };

        let mut ticker = tokio::time::interval_at(Instant::now() + first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = period.as_secs(),
            first_tick_ms = first.as_millis() as u64,
            "Interval loop started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.take_report();
                    self.export(exporter, &report).await;
                }
                _ = &mut shutdown => {
                    if self.settings.dump_on_exit {
                        tracing::info!("Dumping final interval on exit");
                        let report = self.take_report();
                        self.export(exporter, &report).await;
                    } else {
                        tracing::info!("Discarding in-progress interval");
                    }
                    break;
                }
            }
        }
    }
}

/// Time from `now` until the next wall-clock multiple of `period`.
pub fn until_next_boundary(now: DateTime<Utc>, period: Duration) -> Duration {
    let period_ms = (period.as_millis() as i64).max(1);
    let elapsed = now.timestamp_millis().rem_euclid(period_ms);
    Duration::from_millis((period_ms - elapsed) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::exporter::InMemoryExporter;
    use chrono::TimeZone;
    use dsc_types::RecordType;
    use std::sync::Arc;

    fn dataset(name: &str, d1: &str, d2: &str) -> DatasetConfig {
        DatasetConfig {
            name: name.into(),
            dim1: ("D1".into(), d1.into()),
            dim2: ("D2".into(), d2.into()),
            filters: Vec::new(),
            min_count: 0,
            max_cells: None,
        }
    }

    fn config(datasets: Vec<DatasetConfig>) -> CollectorConfig {
        CollectorConfig {
            datasets,
            ..Default::default()
        }
    }

    fn query(qtype: u16, qname: &str) -> DnsMessage {
        DnsMessage::query(qtype, qname).with_source("192.0.2.1".parse().unwrap())
    }

    #[test]
    fn test_until_next_boundary() {
        let period = Duration::from_secs(60);
        let at = |secs: i64, ms: u32| Utc.timestamp_opt(secs, ms * 1_000_000).unwrap();
        assert_eq!(until_next_boundary(at(120, 0), period), period);
        assert_eq!(until_next_boundary(at(150, 0), period), Duration::from_secs(30));
        assert_eq!(
            until_next_boundary(at(179, 250), period),
            Duration::from_millis(750)
        );
    }

    #[test]
    fn test_from_config_registers_datasets() {
        let cfg = config(vec![
            dataset("qtype", "null", "qtype"),
            dataset("asn", "null", "asn"),
        ]);
        let collector = StatsCollector::from_config(&cfg).unwrap();
        let stats = collector.stats();
        assert_eq!(stats.datasets.len(), 2);
        assert_eq!(stats.datasets[1].0, "asn");
    }

    #[test]
    fn test_from_config_unknown_indexer() {
        let cfg = config(vec![dataset("bad", "null", "nope")]);
        let err = StatsCollector::from_config(&cfg).err().unwrap();
        assert!(matches!(
            err,
            CollectorError::Dataset(StatsError::UnknownIndexer(_))
        ));
    }

    #[test]
    fn test_from_config_missing_table_is_fatal() {
        let cfg = CollectorConfig {
            asn_v4_db: Some("/nonexistent/dsc/asn-v4.txt".into()),
            ..Default::default()
        };
        assert!(matches!(
            StatsCollector::from_config(&cfg),
            Err(CollectorError::Lookup(_))
        ));
    }

    #[test]
    fn test_take_report_resets() {
        let cfg = config(vec![
            dataset("qtype", "null", "qtype"),
            dataset("asn", "null", "asn"),
        ]);
        let collector = StatsCollector::from_config(&cfg).unwrap();
        assert_eq!(collector.classify(&query(RecordType::A, "a.example")), 2);
        collector.classify(&query(RecordType::A, "b.example"));
        collector.classify(&query(RecordType::MX, "c.example"));

        let report = collector.take_report();
        assert!(report.start <= report.stop);
        let qtype = report.array("qtype").unwrap();
        assert_eq!(qtype.cell("ALL", "1"), Some(2));
        assert_eq!(qtype.cell("ALL", "15"), Some(1));
        // No ASN table is configured, so every IPv4 source maps to NODB.
        let asn = report.array("asn").unwrap();
        assert_eq!(asn.cell("ALL", "NODB"), Some(3));

        let next = collector.take_report();
        assert_eq!(next.start, report.stop);
        assert!(next.arrays.iter().all(|a| a.is_empty()));

        let stats = collector.stats();
        assert_eq!(stats.messages_seen, 3);
        assert_eq!(stats.datasets[0], ("qtype".to_string(), 3));
    }

    #[test]
    fn test_capacity_errors_counted() {
        let mut cfg = config(vec![dataset("qname", "null", "qname")]);
        cfg.index_capacity = 2;
        let collector = StatsCollector::from_config(&cfg).unwrap();
        collector.classify(&query(RecordType::A, "a.example"));
        collector.classify(&query(RecordType::A, "b.example"));
        assert_eq!(collector.classify(&query(RecordType::A, "c.example")), 0);
        assert_eq!(collector.stats().capacity_errors, 1);

        let report = collector.take_report();
        assert_eq!(report.arrays[0].cells().count(), 2);

        // A fresh interval has room again.
        assert_eq!(collector.classify(&query(RecordType::A, "c.example")), 1);
    }

    #[test]
    fn test_classify_counts_survivors_of_overflow() {
        let mut cfg = config(vec![
            dataset("qtype", "null", "qtype"),
            dataset("qname", "null", "qname"),
        ]);
        cfg.index_capacity = 4;
        let collector = StatsCollector::from_config(&cfg).unwrap();

        // AAAA (28) does not fit the qtype axis; qname still counts it.
        assert_eq!(collector.classify(&query(RecordType::AAAA, "x.example")), 1);
        assert_eq!(collector.classify(&query(RecordType::AAAA, "x.example")), 1);
        let stats = collector.stats();
        assert_eq!(stats.capacity_errors, 2);
        assert_eq!(
            stats.datasets,
            vec![("qtype".to_string(), 0), ("qname".to_string(), 2)]
        );
        assert_eq!(collector.inner.lock().overflows, 2);

        // Reporting closes the interval's overflow tally.
        let report = collector.take_report();
        assert_eq!(report.array("qname").unwrap().cell("ALL", "x.example"), Some(2));
        assert_eq!(collector.inner.lock().overflows, 0);
        assert_eq!(collector.stats().capacity_errors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_intervals_exports_each_tick() {
        let mut cfg = config(vec![dataset("qtype", "null", "qtype")]);
        cfg.statistics_interval = 10;
        cfg.no_wait_interval = true;
        let collector = Arc::new(StatsCollector::from_config(&cfg).unwrap());
        let exporter = Arc::new(InMemoryExporter::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let task = {
            let collector = collector.clone();
            let exporter = exporter.clone();
            tokio::spawn(async move {
                collector
                    .run_intervals(&*exporter, async {
                        let _ = rx.await;
                    })
                    .await;
            })
        };

        tokio::task::yield_now().await;
        collector.classify(&query(RecordType::AAAA, "x.example"));
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(exporter.count(), 1);

        collector.classify(&query(RecordType::A, "x.example"));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(exporter.count(), 2);

        tx.send(()).unwrap();
        task.await.unwrap();

        let reports = exporter.take_reports();
        assert_eq!(reports[0].arrays[0].cell("ALL", "28"), Some(1));
        assert_eq!(reports[1].arrays[0].cell("ALL", "1"), Some(1));
        assert_eq!(reports[1].arrays[0].cell("ALL", "28"), None);
        assert_eq!(collector.stats().intervals_exported, 2);
    }

    #[tokio::test]
    async fn test_dump_on_exit() {
        let mut cfg = config(vec![dataset("qtype", "null", "qtype")]);
        cfg.statistics_interval = 3600;
        cfg.dump_reports_on_exit = true;
        let collector = StatsCollector::from_config(&cfg).unwrap();
        let exporter = InMemoryExporter::new();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let run = collector.run_intervals(&exporter, async {
            let _ = rx.await;
        });
        let feed = async {
            tokio::task::yield_now().await;
            collector.classify(&query(RecordType::NS, "example"));
            tx.send(()).unwrap();
        };
        tokio::join!(run, feed);

        let reports = exporter.take_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].arrays[0].cell("ALL", "2"), Some(1));
    }

    #[tokio::test]
    async fn test_discard_on_exit() {
        let cfg = config(vec![dataset("qtype", "null", "qtype")]);
        let collector = StatsCollector::from_config(&cfg).unwrap();
        let exporter = InMemoryExporter::new();
        collector.run_intervals(&exporter, async {}).await;
        assert_eq!(exporter.count(), 0);
        assert_eq!(collector.stats().intervals_exported, 0);
    }
}
