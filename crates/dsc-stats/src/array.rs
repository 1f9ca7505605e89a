//! The two-dimensional counting array behind every dataset.

use serde::{Deserialize, Serialize};

use dsc_types::DnsMessage;

use crate::error::{Result, StatsError};
use crate::index_registry::DEFAULT_INDEX_CAPACITY;
use crate::indexer::{Filter, Indexer};
use crate::printer::ArrayPrinter;

/// Label of the element carrying the number of withheld cells in a row.
pub const SKIPPED_LABEL: &str = "-:SKIPPED:-";
/// Label of the element carrying the summed count of withheld cells.
pub const SKIPPED_SUM_LABEL: &str = "-:SKIPPED_SUM:-";

/// One axis of a counting array.
pub struct Dimension {
    type_label: String,
    indexer: Box<dyn Indexer>,
    capacity: usize,
}

impl Dimension {
    /// Axis labelled `type_label` with the default capacity.
    pub fn new(type_label: impl Into<String>, indexer: Box<dyn Indexer>) -> Self {
        Self {
            type_label: type_label.into(),
            indexer,
            capacity: DEFAULT_INDEX_CAPACITY,
        }
    }

    /// Reject indices at or past `capacity`.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Axis type label printed before the data.
    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    /// Exclusive upper bound on indices along this axis.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index(&mut self, msg: &DnsMessage) -> Result<Option<usize>> {
        match self.indexer.index(msg)? {
            Some(idx) if idx >= self.capacity => Err(StatsError::Capacity {
                domain: self.type_label.clone(),
                limit: self.capacity,
            }),
            other => Ok(other),
        }
    }
}

/// Output shaping applied per d1 row at print time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOptions {
    /// Cells counted fewer times than this are withheld.
    #[serde(default)]
    pub min_count: u64,
    /// Emit at most this many cells per row, largest counts first.
    #[serde(default)]
    pub max_cells: Option<usize>,
}

impl DatasetOptions {
    /// Reject `max_cells = 0`.
    pub fn validate(&self, dataset: &str) -> Result<()> {
        if self.max_cells == Some(0) {
            return Err(StatsError::InvalidOption {
                dataset: dataset.to_string(),
                key: "max_cells",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    fn is_default(&self) -> bool {
        self.min_count == 0 && self.max_cells.is_none()
    }
}

/// Sparse-growing grid of counters indexed by `(d1, d2)`.
///
/// Rows are allocated on first use and grow to the highest d2 index seen.
/// Indices at or past an axis capacity are rejected, never wrapped.
pub struct CountingArray {
    name: String,
    filter: Option<Box<dyn Filter>>,
    d1: Dimension,
    d2: Dimension,
    options: DatasetOptions,
    cells: Vec<Vec<u64>>,
}

impl CountingArray {
    pub fn new(
        name: impl Into<String>,
        filter: Option<Box<dyn Filter>>,
        d1: Dimension,
        d2: Dimension,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            d1,
            d2,
            options: DatasetOptions::default(),
            cells: Vec::new(),
        }
    }

    /// Replace the print-time options.
    pub fn with_options(mut self, options: DatasetOptions) -> Self {
        self.options = options;
        self
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row axis.
    pub fn d1(&self) -> &Dimension {
        &self.d1
    }

    /// Column axis.
    pub fn d2(&self) -> &Dimension {
        &self.d2
    }

    /// Print-time options.
    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    /// Classify `msg` and bump its cell.
    ///
    /// Returns `Ok(false)` when the filter rejects the message or either
    /// axis can not classify it. The d2 indexer is not consulted once d1 has
    /// failed.
    pub fn count(&mut self, msg: &DnsMessage) -> Result<bool> {
        if let Some(filter) = &self.filter {
            if !filter.accepts(msg) {
                return Ok(false);
            }
        }
        let Some(i) = self.d1.index(msg)? else {
            return Ok(false);
        };
        let Some(j) = self.d2.index(msg)? else {
            return Ok(false);
        };

        if self.cells.len() <= i {
            self.cells.resize_with(i + 1, Vec::new);
        }
        let row = &mut self.cells[i];
        if row.len() <= j {
            row.resize(j + 1, 0);
        }
        row[j] += 1;
        Ok(true)
    }

    /// Current value of cell `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.cells
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over all cells.
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    /// Number of nonzero cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c > 0).count()
    }

    /// Stream the nonzero cells to `printer`, rows and columns ascending.
    pub fn print(&self, printer: &mut dyn ArrayPrinter) {
        printer.start_array(&self.name);
        printer.d1_type(&self.d1.type_label);
        printer.d2_type(&self.d2.type_label);
        printer.start_data();

        for (i, row) in self.cells.iter().enumerate() {
            let mut elements: Vec<(usize, u64)> = row
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c > 0)
                .map(|(j, &c)| (j, c))
                .collect();
            if elements.is_empty() {
                continue;
            }

            let skipped = if self.options.is_default() {
                None
            } else {
                Some(self.shape_row(&mut elements))
            };

            let label1 = self.d1.indexer.label(i);
            printer.d1_begin(&label1);
            for &(j, c) in &elements {
                printer.element(&self.d2.indexer.label(j), c);
            }
            if let Some((cells, sum)) = skipped.filter(|&(cells, _)| cells > 0) {
                printer.element(SKIPPED_LABEL, cells);
                printer.element(SKIPPED_SUM_LABEL, sum);
            }
            printer.d1_end(&label1);
        }

        printer.finish_data();
        printer.finish_array();
    }

    /// Apply min-count and max-cells to one row. Returns the number and the
    /// summed count of withheld cells.
    fn shape_row(&self, elements: &mut Vec<(usize, u64)>) -> (u64, u64) {
        let mut skipped = 0u64;
        let mut skipped_sum = 0u64;
        let min = self.options.min_count;

        elements.retain(|&(_, c)| {
            if c < min {
                skipped += 1;
                skipped_sum += c;
                false
            } else {
                true
            }
        });

        if let Some(max) = self.options.max_cells {
            // Stable: equal counts stay in ascending d2 order.
            elements.sort_by(|a, b| b.1.cmp(&a.1));
            if elements.len() > max {
                for &(_, c) in &elements[max..] {
                    skipped += 1;
                    skipped_sum += c;
                }
                elements.truncate(max);
            }
        }

        (skipped, skipped_sum)
    }

    /// Zero every cell. Axis registries are reset separately through
    /// [`reset_indexers`](Self::reset_indexers).
    pub fn reset(&mut self) {
        self.cells.clear();
    }

    /// Clear per-interval state held by both axis indexers.
    pub fn reset_indexers(&mut self) {
        self.d1.indexer.reset();
        self.d2.indexer.reset();
    }
}
