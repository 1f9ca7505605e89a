//! Statistics engine for the dsc collector.
//!
//! Datasets are two-dimensional frequency tables over decoded DNS messages.
//! Each axis is driven by an [`Indexer`] that maps a message to a dense
//! index; open-ended axes (client address, ASN, TLD) allocate indices on the
//! fly through a [`DynamicIndexRegistry`]. Once per interval the
//! [`DatasetRegistry`] prints every array to an [`ArrayPrinter`] and then
//! resets counters and registries together.

pub mod array;
pub mod dataset;
pub mod error;
pub mod index_registry;
pub mod indexer;
pub mod printer;

pub use array::{CountingArray, DatasetOptions, Dimension, SKIPPED_LABEL, SKIPPED_SUM_LABEL};
pub use dataset::{AxisSpec, Classified, Dataset, DatasetRegistry, DatasetSpec, SymbolResolver};
pub use error::{Result, StatsError};
pub use index_registry::{DynamicIndexRegistry, DEFAULT_INDEX_CAPACITY};
pub use indexer::{AllOf, DynamicIndexer, Filter, FnIndexer, Indexer, KeyExtractor};
pub use printer::{ArrayPrinter, ArrayReport, ElementReport, ReportBuilder, RowReport};
