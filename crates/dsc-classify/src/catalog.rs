use std::collections::HashMap;

use dsc_stats::{Filter, Indexer, SymbolResolver, DEFAULT_INDEX_CAPACITY};

use crate::filters;
use crate::indexers::{self, MessageKey};
use crate::reference::{asn_indexer, country_indexer, ReferencePair};

pub type IndexerFactory = Box<dyn Fn() -> Box<dyn Indexer> + Send + Sync>;
pub type FilterFactory = Box<dyn Fn() -> Box<dyn Filter> + Send + Sync>;

/// Parameters shared by the dynamic-domain indexers a catalog builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Prefix length applied to IPv4 sources by `client_subnet`.
    pub client_v4_prefix: u8,
    /// Prefix length applied to IPv6 sources by `client_subnet`.
    pub client_v6_prefix: u8,
    /// Distinct-key ceiling of each dynamic registry.
    pub capacity: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            client_v4_prefix: 24,
            client_v6_prefix: 48,
            capacity: DEFAULT_INDEX_CAPACITY,
        }
    }
}

/// Name-resolution table for dataset registration.
///
/// Built-in indexers and filters are always available. Custom factories
/// registered under the same name take precedence.
#[derive(Default)]
pub struct Catalog {
    settings: CatalogSettings,
    asn: ReferencePair,
    country: ReferencePair,
    indexers: HashMap<String, IndexerFactory>,
    filters: HashMap<String, FilterFactory>,
}

impl Catalog {
    pub fn new(settings: CatalogSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn with_asn(mut self, tables: ReferencePair) -> Self {
        self.asn = tables;
        self
    }

    pub fn with_country(mut self, tables: ReferencePair) -> Self {
        self.country = tables;
        self
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn add_indexer<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Indexer> + Send + Sync + 'static,
    {
        self.indexers.insert(name.into(), Box::new(factory));
    }

    pub fn add_filter<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Filter> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(factory));
    }

    /// Every indexer name this catalog resolves, sorted.
    pub fn indexer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = indexers::CLOSED_INDEXERS
            .iter()
            .chain(MessageKey::NAMES)
            .chain(&["asn", "country"])
            .map(|s| s.to_string())
            .chain(self.indexers.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl SymbolResolver for Catalog {
    fn indexer(&self, name: &str) -> Option<Box<dyn Indexer>> {
        if let Some(factory) = self.indexers.get(name) {
            return Some(factory());
        }
        if let Some(indexer) = indexers::closed(name) {
            return Some(indexer);
        }
        let s = &self.settings;
        match name {
            "asn" => Some(Box::new(asn_indexer(self.asn.clone(), s.capacity))),
            "country" => Some(Box::new(country_indexer(self.country.clone(), s.capacity))),
            _ => MessageKey::by_name(name, s.client_v4_prefix, s.client_v6_prefix)
                .map(|key| Box::new(key.indexer(s.capacity)) as Box<dyn Indexer>),
        }
    }

    fn filter(&self, name: &str) -> Option<Box<dyn Filter>> {
        match self.filters.get(name) {
            Some(factory) => Some(factory()),
            None => filters::builtin(name),
        }
    }
}
