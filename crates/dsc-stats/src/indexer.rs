//! Pluggable classifier traits.
//!
//! An [`Indexer`] maps a message to a position on one axis of a dataset and
//! maps positions back to labels at dump time. A [`Filter`] decides whether a
//! dataset sees a message at all.

use std::borrow::Cow;

use dsc_types::DnsMessage;

use crate::error::Result;
use crate::index_registry::DynamicIndexRegistry;

/// Axis classifier paired with its label function.
pub trait Indexer: Send {
    /// Axis index for `msg`, or `None` when the message can not be
    /// classified on this axis.
    fn index(&mut self, msg: &DnsMessage) -> Result<Option<usize>>;

    /// Display label for an index this indexer produced.
    fn label(&self, index: usize) -> Cow<'_, str>;

    /// Forget per-interval state. Closed-domain indexers have none.
    fn reset(&mut self) {}
}

/// Dataset membership predicate.
pub trait Filter: Send + Sync {
    fn accepts(&self, msg: &DnsMessage) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&DnsMessage) -> bool + Send + Sync,
{
    fn accepts(&self, msg: &DnsMessage) -> bool {
        self(msg)
    }
}

/// Conjunction of filters. Empty accepts everything.
pub struct AllOf(pub Vec<Box<dyn Filter>>);

impl Filter for AllOf {
    fn accepts(&self, msg: &DnsMessage) -> bool {
        self.0.iter().all(|f| f.accepts(msg))
    }
}

/// Closed-domain indexer built from a pair of closures.
pub struct FnIndexer<I, L> {
    index_fn: I,
    label_fn: L,
}

impl<I, L> FnIndexer<I, L>
where
    I: Fn(&DnsMessage) -> Option<usize> + Send,
    L: Fn(usize) -> String + Send,
{
    pub fn new(index_fn: I, label_fn: L) -> Self {
        Self { index_fn, label_fn }
    }
}

impl<I, L> Indexer for FnIndexer<I, L>
where
    I: Fn(&DnsMessage) -> Option<usize> + Send,
    L: Fn(usize) -> String + Send,
{
    fn index(&mut self, msg: &DnsMessage) -> Result<Option<usize>> {
        Ok((self.index_fn)(msg))
    }

    fn label(&self, index: usize) -> Cow<'_, str> {
        Cow::Owned((self.label_fn)(index))
    }
}

/// Derives the classification key of a dynamic-domain indexer.
pub trait KeyExtractor: Send {
    /// Key for `msg`, or `None` to skip the message on this axis.
    fn key<'a>(&'a self, msg: &'a DnsMessage) -> Option<Cow<'a, str>>;
}

/// Indexer over an open-ended domain: keys get dense indices on first sight.
///
/// Each instance owns its registry, so two datasets using the same key
/// extractor never share numbering.
pub struct DynamicIndexer<K> {
    extractor: K,
    registry: DynamicIndexRegistry,
}

impl<K: KeyExtractor> DynamicIndexer<K> {
    pub fn new(extractor: K, registry: DynamicIndexRegistry) -> Self {
        Self {
            extractor,
            registry,
        }
    }

    pub fn registry(&self) -> &DynamicIndexRegistry {
        &self.registry
    }
}

impl<K: KeyExtractor> Indexer for DynamicIndexer<K> {
    fn index(&mut self, msg: &DnsMessage) -> Result<Option<usize>> {
        match self.extractor.key(msg) {
            Some(key) => self.registry.assign_or_lookup(&key),
            None => Ok(None),
        }
    }

    fn label(&self, index: usize) -> Cow<'_, str> {
        match self.registry.key(index) {
            Some(key) => Cow::Borrowed(key),
            None => Cow::Owned(index.to_string()),
        }
    }

    fn reset(&mut self) {
        self.registry.reset();
    }
}
