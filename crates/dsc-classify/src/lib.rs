//! Classifiers for dsc datasets.
//!
//! [`Catalog`] resolves the indexer and filter names used in dataset
//! configuration to fresh instances. Reference-backed axes (`asn`,
//! `country`) share loaded [`PrefixTable`]s through a [`ReferencePair`].

pub mod catalog;
pub mod filters;
pub mod indexers;
pub mod lookup;
pub mod reference;

pub use catalog::{Catalog, CatalogSettings, FilterFactory, IndexerFactory};
pub use indexers::MessageKey;
pub use lookup::{LookupError, PrefixTable, ReferenceLookup};
pub use reference::{
    asn_indexer, country_indexer, normalize_asn, ReferenceKey, ReferencePair, NODB, UNKNOWN,
    UNKNOWN_V4, UNKNOWN_V6,
};
