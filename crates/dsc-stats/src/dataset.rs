//! Named datasets and the registration protocol.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use dsc_types::DnsMessage;

use crate::array::{CountingArray, DatasetOptions, Dimension};
use crate::error::{Result, StatsError};
use crate::index_registry::DEFAULT_INDEX_CAPACITY;
use crate::indexer::{AllOf, Filter, Indexer};
use crate::printer::ArrayPrinter;

/// Resolves configuration names to classifier instances.
///
/// Every call returns a fresh instance, so per-interval state is never
/// shared between datasets.
pub trait SymbolResolver {
    fn indexer(&self, name: &str) -> Option<Box<dyn Indexer>>;
    fn filter(&self, name: &str) -> Option<Box<dyn Filter>>;
}

/// One axis as named in configuration: `[type label, indexer name]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub type_label: String,
    pub indexer: String,
}

impl AxisSpec {
    pub fn new(type_label: impl Into<String>, indexer: impl Into<String>) -> Self {
        Self {
            type_label: type_label.into(),
            indexer: indexer.into(),
        }
    }
}

/// Everything needed to register a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub dim1: AxisSpec,
    pub dim2: AxisSpec,
    /// Filter names, AND-combined. Empty means every message.
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub options: DatasetOptions,
}

/// A named counting array. Lives until process exit.
pub struct Dataset {
    array: CountingArray,
    counted: u64,
}

impl Dataset {
    /// Dataset name as registered.
    pub fn name(&self) -> &str {
        self.array.name()
    }

    /// The dataset's counting array.
    pub fn array(&self) -> &CountingArray {
        &self.array
    }

    /// Messages counted since registration, across intervals.
    pub fn counted(&self) -> u64 {
        self.counted
    }
}

/// Outcome of offering one message to every dataset.
#[derive(Debug, Default)]
#[must_use]
pub struct Classified {
    /// Datasets that counted the message.
    pub counted: usize,
    /// First capacity error raised by any dataset.
    pub error: Option<StatsError>,
}

impl Classified {
    /// The counted total, or the error if any dataset failed.
    pub fn into_result(self) -> Result<usize> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.counted),
        }
    }
}

/// Write-once collection of datasets, dumped and reset as a unit.
pub struct DatasetRegistry {
    datasets: Vec<Dataset>,
    /// Lowercased name -> position in `datasets`.
    by_name: HashMap<String, usize>,
    capacity: usize,
}

impl DatasetRegistry {
    /// Empty registry with the default axis capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INDEX_CAPACITY)
    }

    /// `capacity` bounds every axis of arrays built by [`register`](Self::register).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            datasets: Vec::new(),
            by_name: HashMap::new(),
            capacity,
        }
    }

    /// Build and register a dataset from its configuration names.
    pub fn register(&mut self, spec: &DatasetSpec, resolver: &dyn SymbolResolver) -> Result<()> {
        if self.contains(&spec.name) {
            return Err(StatsError::DuplicateDataset(spec.name.clone()));
        }
        spec.options.validate(&spec.name)?;

        let d1 = self.dimension(&spec.dim1, resolver)?;
        let d2 = self.dimension(&spec.dim2, resolver)?;

        let filter: Option<Box<dyn Filter>> = match spec.filters.len() {
            0 => None,
            1 => Some(Self::filter(&spec.filters[0], resolver)?),
            _ => {
                let all = spec
                    .filters
                    .iter()
                    .map(|name| Self::filter(name, resolver))
                    .collect::<Result<Vec<_>>>()?;
                Some(Box::new(AllOf(all)))
            }
        };

        let array = CountingArray::new(spec.name.clone(), filter, d1, d2).with_options(spec.options);
        self.register_array(array)?;

        tracing::info!(
            dataset = %spec.name,
            dim1 = %spec.dim1.indexer,
            dim2 = %spec.dim2.indexer,
            filters = ?spec.filters,
            "Created dataset"
        );
        Ok(())
    }

    /// Register an already built array under its own name.
    pub fn register_array(&mut self, array: CountingArray) -> Result<()> {
        let key = array.name().to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(StatsError::DuplicateDataset(array.name().to_string()));
        }
        self.by_name.insert(key, self.datasets.len());
        self.datasets.push(Dataset { array, counted: 0 });
        Ok(())
    }

    fn dimension(&self, axis: &AxisSpec, resolver: &dyn SymbolResolver) -> Result<Dimension> {
        let indexer = resolver
            .indexer(&axis.indexer)
            .ok_or_else(|| StatsError::UnknownIndexer(axis.indexer.clone()))?;
        Ok(Dimension::new(axis.type_label.clone(), indexer).with_capacity(self.capacity))
    }

    fn filter(name: &str, resolver: &dyn SymbolResolver) -> Result<Box<dyn Filter>> {
        resolver
            .filter(name)
            .ok_or_else(|| StatsError::UnknownFilter(name.to_string()))
    }

    /// Whether a dataset with this name exists, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_ascii_lowercase())
    }

    /// Look up a dataset by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(|&pos| &self.datasets[pos])
    }

    /// Datasets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    /// Number of registered datasets.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether no dataset has been registered.
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Offer `msg` to every dataset.
    ///
    /// A capacity error in one dataset does not keep the others from
    /// counting; the result carries both the count and the first error.
    pub fn classify_all(&mut self, msg: &DnsMessage) -> Classified {
        let mut out = Classified::default();
        for ds in &mut self.datasets {
            match ds.array.count(msg) {
                Ok(true) => {
                    ds.counted += 1;
                    out.counted += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    if out.error.is_none() {
                        out.error = Some(e);
                    }
                }
            }
        }
        out
    }

    /// Print every dataset in registration order.
    pub fn dump_all(&self, printer: &mut dyn ArrayPrinter) {
        for ds in &self.datasets {
            ds.array.print(printer);
        }
    }

    /// Zero all cells and clear every axis registry.
    pub fn reset_all(&mut self) {
        for ds in &mut self.datasets {
            ds.array.reset();
            ds.array.reset_indexers();
        }
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
