//! Dense index allocation for open-ended classification domains.

use std::collections::HashMap;

use crate::error::{Result, StatsError};

/// Default ceiling on distinct keys per registry.
pub const DEFAULT_INDEX_CAPACITY: usize = 65536;

/// Maps string keys onto dense indices `0..n` in first-seen order.
///
/// Keys are compared ASCII case-insensitively; the label kept for an index
/// is the spelling first seen. Numbering restarts at 0 after [`reset`].
///
/// [`reset`]: DynamicIndexRegistry::reset
#[derive(Debug, Clone)]
pub struct DynamicIndexRegistry {
    domain: String,
    capacity: usize,
    /// Folded key -> index.
    index_of: HashMap<String, usize>,
    /// Index -> key as first seen.
    keys: Vec<String>,
}

impl DynamicIndexRegistry {
    /// Registry for `domain` with the default capacity.
    pub fn new(domain: impl Into<String>) -> Self {
        Self::with_capacity(domain, DEFAULT_INDEX_CAPACITY)
    }

    /// Registry for `domain` holding at most `capacity` keys.
    pub fn with_capacity(domain: impl Into<String>, capacity: usize) -> Self {
        Self {
            domain: domain.into(),
            capacity,
            index_of: HashMap::new(),
            keys: Vec::new(),
        }
    }

    /// Return the index of `key`, allocating the next one if it is new.
    ///
    /// An empty key yields `Ok(None)` and leaves the registry untouched.
    /// A new key beyond the capacity ceiling is an error; existing keys keep
    /// resolving.
    pub fn assign_or_lookup(&mut self, key: &str) -> Result<Option<usize>> {
        if key.is_empty() {
            return Ok(None);
        }
        let folded = key.to_ascii_lowercase();
        if let Some(&idx) = self.index_of.get(&folded) {
            return Ok(Some(idx));
        }
        if self.keys.len() >= self.capacity {
            return Err(StatsError::Capacity {
                domain: self.domain.clone(),
                limit: self.capacity,
            });
        }
        let idx = self.keys.len();
        self.index_of.insert(folded, idx);
        self.keys.push(key.to_string());
        Ok(Some(idx))
    }

    /// Index of `key` if it has been seen this interval.
    pub fn lookup(&self, key: &str) -> Option<usize> {
        self.index_of.get(&key.to_ascii_lowercase()).copied()
    }

    /// Key stored at `index`.
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    /// `(index, key)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.keys.iter().map(String::as_str).enumerate()
    }

    /// Drop every entry; the next new key gets index 0.
    pub fn reset(&mut self) {
        self.index_of.clear();
        self.keys.clear();
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key has been seen.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Ceiling on distinct keys.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Domain name used in capacity errors.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}
