//! ASN and country axes keyed by reference-table lookups on the source address.

use std::borrow::Cow;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use dsc_stats::{DynamicIndexRegistry, DynamicIndexer, KeyExtractor};
use dsc_types::{DnsMessage, TransportMessage};

use crate::lookup::{LookupError, PrefixTable, ReferenceLookup};

/// No table is loaded for the address family.
pub const NODB: &str = "NODB";
/// The source address is missing.
pub const UNKNOWN: &str = "??";
/// IPv4 address not present in the table.
pub const UNKNOWN_V4: &str = "?4";
/// IPv6 address not present in the table.
pub const UNKNOWN_V6: &str = "?6";

/// Keep the AS number of a network name: `"AS100 Example Corp"` -> `"AS100"`.
///
/// Tables report different network descriptions for one AS, so only the
/// identifier before the first space is counted.
pub fn normalize_asn(raw: &str) -> &str {
    match raw.find(' ') {
        Some(pos) => &raw[..pos],
        None => raw,
    }
}

/// Per-family reference tables shared by every indexer built from them.
#[derive(Clone, Default)]
pub struct ReferencePair {
    v4: Option<Arc<dyn ReferenceLookup>>,
    v6: Option<Arc<dyn ReferenceLookup>>,
}

impl ReferencePair {
    pub fn new(
        v4: Option<Arc<dyn ReferenceLookup>>,
        v6: Option<Arc<dyn ReferenceLookup>>,
    ) -> Self {
        Self { v4, v6 }
    }

    /// Load the configured tables. A missing path leaves that family without
    /// a database; a path that can not be loaded is an error.
    pub fn open(kind: &str, v4: Option<&Path>, v6: Option<&Path>) -> Result<Self, LookupError> {
        Ok(Self {
            v4: Self::open_family(kind, "IPv4", v4)?,
            v6: Self::open_family(kind, "IPv6", v6)?,
        })
    }

    fn open_family(
        kind: &str,
        family: &str,
        path: Option<&Path>,
    ) -> Result<Option<Arc<dyn ReferenceLookup>>, LookupError> {
        let Some(path) = path else {
            tracing::warn!(kind, family, "No {} database loaded, reporting {}", kind, NODB);
            return Ok(None);
        };
        let table = PrefixTable::open(path)?;
        tracing::info!(
            kind,
            family,
            path = %path.display(),
            entries = table.len(),
            "Loaded reference table"
        );
        Ok(Some(Arc::new(table)))
    }

    pub fn has_v4(&self) -> bool {
        self.v4.is_some()
    }

    pub fn has_v6(&self) -> bool {
        self.v6.is_some()
    }

    /// Raw reference value for the message source, or a sentinel.
    pub fn resolve(&self, tm: &TransportMessage) -> &str {
        match tm.src_ip {
            Some(addr @ IpAddr::V4(_)) => match self.v4.as_deref() {
                Some(db) => db.lookup(&addr).unwrap_or(UNKNOWN_V4),
                None => NODB,
            },
            Some(addr @ IpAddr::V6(_)) => match self.v6.as_deref() {
                Some(db) => db.lookup(&addr).unwrap_or(UNKNOWN_V6),
                None => NODB,
            },
            None => UNKNOWN,
        }
    }
}

/// Key extractor for reference-backed axes.
pub struct ReferenceKey {
    tables: ReferencePair,
    truncate: bool,
}

impl ReferenceKey {
    /// AS numbers, truncated at the first space.
    pub fn asn(tables: ReferencePair) -> Self {
        Self {
            tables,
            truncate: true,
        }
    }

    /// Country codes, used verbatim.
    pub fn country(tables: ReferencePair) -> Self {
        Self {
            tables,
            truncate: false,
        }
    }
}

impl KeyExtractor for ReferenceKey {
    fn key<'a>(&'a self, msg: &'a DnsMessage) -> Option<Cow<'a, str>> {
        if msg.malformed {
            return None;
        }
        let raw = self.tables.resolve(&msg.tm);
        tracing::trace!(raw, "Reference lookup");
        let key = if self.truncate { normalize_asn(raw) } else { raw };
        Some(Cow::Borrowed(key))
    }
}

pub fn asn_indexer(tables: ReferencePair, capacity: usize) -> DynamicIndexer<ReferenceKey> {
    DynamicIndexer::new(
        ReferenceKey::asn(tables),
        DynamicIndexRegistry::with_capacity("asn", capacity),
    )
}

pub fn country_indexer(tables: ReferencePair, capacity: usize) -> DynamicIndexer<ReferenceKey> {
    DynamicIndexer::new(
        ReferenceKey::country(tables),
        DynamicIndexRegistry::with_capacity("country", capacity),
    )
}
