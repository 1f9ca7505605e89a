//! Address-keyed reference data (ASN and country tables).

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read reference table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// In-memory lookup from an address to a reference value.
///
/// Implementations must not block; they sit on the classification path.
pub trait ReferenceLookup: Send + Sync {
    fn lookup(&self, addr: &IpAddr) -> Option<&str>;
}

/// Longest-prefix-match table covering both address families.
///
/// Text format, one entry per line: `<network>/<len> <value...>`. Blank lines
/// and lines starting with `#` are ignored. The value is the rest of the line.
#[derive(Debug, Default)]
pub struct PrefixTable {
    /// Prefix length -> masked network -> value, searched longest first.
    v4: BTreeMap<u8, HashMap<u128, String>>,
    v6: BTreeMap<u8, HashMap<u128, String>>,
    entries: usize,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LookupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|(line, reason)| LookupError::Parse {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Parse table text. Errors carry the 1-based line number.
    pub fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut table = Self::new();
        for (n, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (cidr, value) = match line.split_once(char::is_whitespace) {
                Some((c, v)) => (c, v.trim()),
                None => return Err((n + 1, "missing value".into())),
            };
            let (addr, len) = parse_cidr(cidr).map_err(|reason| (n + 1, reason))?;
            table.insert(addr, len, value);
        }
        Ok(table)
    }

    pub fn insert(&mut self, network: IpAddr, prefix_len: u8, value: impl Into<String>) {
        let (bits, width) = addr_bits(&network);
        let len = prefix_len.min(width);
        let family = match network {
            IpAddr::V4(_) => &mut self.v4,
            IpAddr::V6(_) => &mut self.v6,
        };
        let previous = family
            .entry(len)
            .or_default()
            .insert(mask(bits, len, width), value.into());
        if previous.is_none() {
            self.entries += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

impl ReferenceLookup for PrefixTable {
    fn lookup(&self, addr: &IpAddr) -> Option<&str> {
        let (bits, width) = addr_bits(addr);
        let family = match addr {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => &self.v6,
        };
        family
            .iter()
            .rev()
            .find_map(|(&len, nets)| nets.get(&mask(bits, len, width)))
            .map(String::as_str)
    }
}

fn addr_bits(addr: &IpAddr) -> (u128, u8) {
    match addr {
        IpAddr::V4(v4) => (u32::from(*v4) as u128, 32),
        IpAddr::V6(v6) => (u128::from(*v6), 128),
    }
}

/// Keep the top `len` bits of a `width`-bit address.
fn mask(bits: u128, len: u8, width: u8) -> u128 {
    if len == 0 {
        return 0;
    }
    let host = u32::from(width - len);
    if host == 0 {
        bits
    } else {
        (bits >> host) << host
    }
}

fn parse_cidr(s: &str) -> Result<(IpAddr, u8), String> {
    let (addr, len) = match s.split_once('/') {
        Some((a, l)) => (a, Some(l)),
        None => (s, None),
    };
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| format!("invalid address `{}`", addr))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    let len = match len {
        Some(l) => l
            .parse::<u8>()
            .ok()
            .filter(|&l| l <= max)
            .ok_or_else(|| format!("invalid prefix length `{}`", l))?,
        None => max,
    };
    Ok((addr, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
# network            value
192.0.2.0/24         AS64500 Example Net
192.0.2.128/25       AS64501 Example Subnet
198.51.100.0/24      AS64502
2001:db8::/32        AS64510 Documentation v6
";

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = PrefixTable::parse(TABLE).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(&ip("192.0.2.1")), Some("AS64500 Example Net"));
        assert_eq!(table.lookup(&ip("192.0.2.200")), Some("AS64501 Example Subnet"));
        assert_eq!(table.lookup(&ip("198.51.100.7")), Some("AS64502"));
        assert_eq!(table.lookup(&ip("203.0.113.1")), None);
    }

    #[test]
    fn test_ipv6_lookup() {
        let table = PrefixTable::parse(TABLE).unwrap();
        assert_eq!(
            table.lookup(&ip("2001:db8:1::53")),
            Some("AS64510 Documentation v6")
        );
        assert_eq!(table.lookup(&ip("2001:db9::1")), None);
    }

    #[test]
    fn test_families_do_not_mix() {
        let mut table = PrefixTable::new();
        table.insert(ip("::"), 0, "v6 default");
        assert_eq!(table.lookup(&ip("10.0.0.1")), None);
        table.insert(ip("0.0.0.0"), 0, "v4 default");
        assert_eq!(table.lookup(&ip("10.0.0.1")), Some("v4 default"));
        assert_eq!(table.lookup(&ip("fe80::1")), Some("v6 default"));
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = PrefixTable::parse("10.0.0.0/8 AS1\nbogus/8 AS2\n").unwrap_err();
        assert_eq!(err.0, 2);
        let err = PrefixTable::parse("10.0.0.0/33 AS1\n").unwrap_err();
        assert!(err.1.contains("prefix length"));
        let err = PrefixTable::parse("10.0.0.0/8\n").unwrap_err();
        assert_eq!(err.1, "missing value");
    }

    #[test]
    fn test_open_missing_file() {
        let err = PrefixTable::open("/nonexistent/dsc/asn.txt").unwrap_err();
        assert!(matches!(err, LookupError::Io { .. }));
    }
}
