//! Built-in indexers.
//!
//! Closed-domain indexers map a message straight to a small integer and
//! label it without any state. Dynamic-domain indexers derive a string key
//! and leave numbering to a per-instance [`DynamicIndexRegistry`].

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use dsc_stats::{DynamicIndexRegistry, DynamicIndexer, FnIndexer, Indexer, KeyExtractor};
use dsc_types::{DnsMessage, IpVersion, Transport};

/// Closed-domain indexer names, in documentation order.
pub const CLOSED_INDEXERS: &[&str] = &[
    "null",
    "qtype",
    "qclass",
    "rcode",
    "opcode",
    "transport",
    "ip_version",
    "do_bit",
    "rd_bit",
    "edns_version",
    "qnamelen",
    "label_count",
    "msglen",
    "idn_qname",
    "certain_qnames",
];

/// Build a closed-domain indexer by name.
pub fn closed(name: &str) -> Option<Box<dyn Indexer>> {
    let indexer: Box<dyn Indexer> = match name {
        "null" => Box::new(FnIndexer::new(
            |_: &DnsMessage| Some(0),
            |_: usize| "ALL".to_string(),
        )),
        "qtype" => numeric(|m| Some(m.qtype as usize)),
        "qclass" => numeric(|m| Some(m.qclass as usize)),
        "rcode" => numeric(|m| m.is_reply().then_some(m.rcode as usize)),
        "opcode" => numeric(|m| Some(m.opcode as usize)),
        "transport" => Box::new(FnIndexer::new(
            |m: &DnsMessage| {
                Some(match m.tm.transport {
                    Transport::Udp => 0,
                    Transport::Tcp => 1,
                })
            },
            |i: usize| if i == 0 { "udp" } else { "tcp" }.to_string(),
        )),
        "ip_version" => Box::new(FnIndexer::new(
            |m: &DnsMessage| {
                m.tm.ip_version().map(|v| match v {
                    IpVersion::V4 => 0,
                    IpVersion::V6 => 1,
                })
            },
            |i: usize| if i == 0 { "IPv4" } else { "IPv6" }.to_string(),
        )),
        "do_bit" => numeric(|m| Some(m.edns.map_or(0, |e| e.do_bit as usize))),
        "rd_bit" => numeric(|m| Some(m.rd as usize)),
        "edns_version" => Box::new(FnIndexer::new(
            |m: &DnsMessage| Some(m.edns.map_or(0, |e| e.version as usize + 1)),
            |i: usize| match i {
                0 => "none".to_string(),
                v => (v - 1).to_string(),
            },
        )),
        "qnamelen" => numeric(|m| Some(m.qname_trimmed().len())),
        "label_count" => numeric(|m| Some(m.qname_labels().count())),
        "msglen" => numeric(|m| Some(m.msglen as usize)),
        "idn_qname" => Box::new(FnIndexer::new(
            |m: &DnsMessage| Some(is_idn(m) as usize),
            |i: usize| if i == 0 { "normal" } else { "idn" }.to_string(),
        )),
        "certain_qnames" => Box::new(FnIndexer::new(
            |m: &DnsMessage| Some(certain_qname(m.qname_trimmed())),
            |i: usize| match i {
                0 => "localhost",
                1 => "X.root-servers.net",
                _ => "else",
            }
            .to_string(),
        )),
        _ => return None,
    };
    Some(indexer)
}

/// Closed-domain indexer labelled by the decimal index.
fn numeric<I>(index_fn: I) -> Box<dyn Indexer>
where
    I: Fn(&DnsMessage) -> Option<usize> + Send + 'static,
{
    Box::new(FnIndexer::new(index_fn, |i: usize| i.to_string()))
}

/// First label is an ACE-encoded internationalized label.
pub fn is_idn(msg: &DnsMessage) -> bool {
    msg.qname_labels()
        .next()
        .and_then(|label| label.get(..4))
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("xn--"))
}

/// A single-character label directly under `root-servers.net`.
pub fn is_root_server_name(qname: &str) -> bool {
    const SUFFIX: &str = ".root-servers.net";
    qname.len() == SUFFIX.len() + 1
        && qname.is_char_boundary(1)
        && qname[1..].eq_ignore_ascii_case(SUFFIX)
}

fn certain_qname(qname: &str) -> usize {
    if qname.eq_ignore_ascii_case("localhost") {
        0
    } else if is_root_server_name(qname) {
        1
    } else {
        2
    }
}

/// Key derivations for dynamic-domain indexers that need no reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    /// Source address.
    Client,
    /// Destination address.
    Server,
    /// Source address masked to a network prefix.
    ClientSubnet { v4_prefix: u8, v6_prefix: u8 },
    /// Rightmost label; `.` for the root name.
    Tld,
    /// Last two labels.
    SecondLd,
    /// Last three labels.
    ThirdLd,
    /// The full query name.
    Qname,
}

impl MessageKey {
    /// Dynamic indexer names not backed by reference tables.
    pub const NAMES: &'static [&'static str] = &[
        "client",
        "server",
        "client_subnet",
        "tld",
        "second_ld",
        "third_ld",
        "qname",
    ];

    pub fn by_name(name: &str, v4_prefix: u8, v6_prefix: u8) -> Option<Self> {
        Some(match name {
            "client" => Self::Client,
            "server" => Self::Server,
            "client_subnet" => Self::ClientSubnet {
                v4_prefix,
                v6_prefix,
            },
            "tld" => Self::Tld,
            "second_ld" => Self::SecondLd,
            "third_ld" => Self::ThirdLd,
            "qname" => Self::Qname,
            _ => return None,
        })
    }

    pub fn domain(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::ClientSubnet { .. } => "client_subnet",
            Self::Tld => "tld",
            Self::SecondLd => "second_ld",
            Self::ThirdLd => "third_ld",
            Self::Qname => "qname",
        }
    }

    /// A fresh indexer with its own registry.
    pub fn indexer(self, capacity: usize) -> DynamicIndexer<Self> {
        DynamicIndexer::new(
            self,
            DynamicIndexRegistry::with_capacity(self.domain(), capacity),
        )
    }

    fn name_key(name: &str, labels: usize) -> Cow<'_, str> {
        if name.is_empty() {
            Cow::Borrowed(".")
        } else {
            Cow::Borrowed(last_labels(name, labels))
        }
    }
}

impl KeyExtractor for MessageKey {
    fn key<'a>(&'a self, msg: &'a DnsMessage) -> Option<Cow<'a, str>> {
        match *self {
            Self::Client => msg.tm.src_ip.map(|a| Cow::Owned(a.to_string())),
            Self::Server => msg.tm.dst_ip.map(|a| Cow::Owned(a.to_string())),
            Self::ClientSubnet {
                v4_prefix,
                v6_prefix,
            } => msg
                .tm
                .src_ip
                .map(|a| Cow::Owned(mask_addr(a, v4_prefix, v6_prefix).to_string())),
            Self::Tld => Some(Cow::Borrowed(msg.tld().unwrap_or("."))),
            Self::SecondLd => Some(Self::name_key(msg.qname_trimmed(), 2)),
            Self::ThirdLd => Some(Self::name_key(msg.qname_trimmed(), 3)),
            Self::Qname => Some(Self::name_key(msg.qname_trimmed(), usize::MAX)),
        }
    }
}

/// The rightmost `n` labels of a dot-separated name, or the whole name if
/// it has fewer.
fn last_labels(name: &str, n: usize) -> &str {
    let mut end = name.len();
    for _ in 0..n {
        match name[..end].rfind('.') {
            Some(pos) => end = pos,
            None => return name,
        }
    }
    &name[end + 1..]
}

/// Zero the host bits of `addr`.
pub fn mask_addr(addr: IpAddr, v4_prefix: u8, v6_prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = match v4_prefix.min(32) {
                0 => 0,
                n => u32::MAX << (32 - u32::from(n)),
            };
            IpAddr::V4(Ipv4Addr::from(bits & mask))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = match v6_prefix.min(128) {
                0 => 0,
                n => u128::MAX << (128 - u32::from(n)),
            };
            IpAddr::V6(Ipv6Addr::from(bits & mask))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsc_types::{EdnsInfo, RecordClass, RecordType};

    fn index(name: &str, msg: &DnsMessage) -> Option<usize> {
        closed(name).unwrap().index(msg).unwrap()
    }

    fn label(name: &str, i: usize) -> String {
        closed(name).unwrap().label(i).into_owned()
    }

    fn key(k: MessageKey, msg: &DnsMessage) -> Option<String> {
        k.key(msg).map(Cow::into_owned)
    }

    #[test]
    fn test_every_closed_name_resolves() {
        for name in CLOSED_INDEXERS {
            assert!(closed(name).is_some(), "{name}");
        }
        assert!(closed("client").is_none());
        assert!(closed("QTYPE").is_none());
    }

    #[test]
    fn test_null_indexer() {
        let msg = DnsMessage::query(RecordType::A, "example.com");
        assert_eq!(index("null", &msg), Some(0));
        assert_eq!(label("null", 0), "ALL");
    }

    #[test]
    fn test_qtype_and_qclass() {
        let mut msg = DnsMessage::query(RecordType::AAAA, "example.com");
        assert_eq!(index("qtype", &msg), Some(28));
        assert_eq!(label("qtype", 28), "28");
        msg.qclass = RecordClass::CH;
        assert_eq!(index("qclass", &msg), Some(3));
    }

    #[test]
    fn test_rcode_skips_queries() {
        let query = DnsMessage::query(RecordType::A, "nope.example");
        assert_eq!(index("rcode", &query), None);
        let reply = query.into_reply(dsc_types::Rcode::NXDOMAIN);
        assert_eq!(index("rcode", &reply), Some(3));
    }

    #[test]
    fn test_transport_and_ip_version() {
        let mut msg = DnsMessage::query(RecordType::A, "example.com");
        assert_eq!(index("transport", &msg), Some(0));
        msg.tm.transport = Transport::Tcp;
        assert_eq!(index("transport", &msg), Some(1));
        assert_eq!(label("transport", 1), "tcp");

        assert_eq!(index("ip_version", &msg), None);
        let msg = msg.with_source("2001:db8::1".parse().unwrap());
        assert_eq!(index("ip_version", &msg), Some(1));
        assert_eq!(label("ip_version", 1), "IPv6");
    }

    #[test]
    fn test_edns_indexers() {
        let mut msg = DnsMessage::query(RecordType::A, "example.com");
        assert_eq!(index("edns_version", &msg), Some(0));
        assert_eq!(index("do_bit", &msg), Some(0));
        assert_eq!(label("edns_version", 0), "none");

        msg.edns = Some(EdnsInfo {
            version: 0,
            do_bit: true,
            bufsiz: 1232,
        });
        assert_eq!(index("edns_version", &msg), Some(1));
        assert_eq!(label("edns_version", 1), "0");
        assert_eq!(index("do_bit", &msg), Some(1));
    }

    #[test]
    fn test_name_shape_indexers() {
        let msg = DnsMessage::query(RecordType::A, "www.example.com.");
        assert_eq!(index("qnamelen", &msg), Some(15));
        assert_eq!(index("label_count", &msg), Some(3));
        let root = DnsMessage::query(RecordType::NS, ".");
        assert_eq!(index("label_count", &root), Some(0));
    }

    #[test]
    fn test_idn_and_certain_qnames() {
        let idn = DnsMessage::query(RecordType::A, "XN--bcher-kva.example");
        assert_eq!(index("idn_qname", &idn), Some(1));
        let plain = DnsMessage::query(RecordType::A, "xn.example");
        assert_eq!(index("idn_qname", &plain), Some(0));

        let cases = [
            ("localhost", 0),
            ("LOCALHOST.", 0),
            ("a.root-servers.net", 1),
            ("M.ROOT-SERVERS.NET.", 1),
            ("ab.root-servers.net", 2),
            ("example.com", 2),
        ];
        for (qname, expected) in cases {
            let msg = DnsMessage::query(RecordType::A, qname);
            assert_eq!(index("certain_qnames", &msg), Some(expected), "{qname}");
        }
        assert_eq!(label("certain_qnames", 1), "X.root-servers.net");
    }

    #[test]
    fn test_address_keys() {
        let msg = DnsMessage::query(RecordType::A, "example.com")
            .with_source("192.0.2.77".parse().unwrap())
            .with_destination("2001:db8::53".parse().unwrap());
        assert_eq!(key(MessageKey::Client, &msg).as_deref(), Some("192.0.2.77"));
        assert_eq!(key(MessageKey::Server, &msg).as_deref(), Some("2001:db8::53"));

        let subnet = MessageKey::by_name("client_subnet", 24, 48).unwrap();
        assert_eq!(key(subnet, &msg).as_deref(), Some("192.0.2.0"));

        let v6 = DnsMessage::query(RecordType::A, "x").with_source("2001:db8:1:2:3::1".parse().unwrap());
        assert_eq!(key(subnet, &v6).as_deref(), Some("2001:db8:1::"));

        assert_eq!(key(MessageKey::Client, &DnsMessage::default()), None);
    }

    #[test]
    fn test_name_keys() {
        let msg = DnsMessage::query(RecordType::A, "a.b.Example.COM.");
        assert_eq!(key(MessageKey::Tld, &msg).as_deref(), Some("COM"));
        assert_eq!(key(MessageKey::SecondLd, &msg).as_deref(), Some("Example.COM"));
        assert_eq!(key(MessageKey::ThirdLd, &msg).as_deref(), Some("b.Example.COM"));
        assert_eq!(key(MessageKey::Qname, &msg).as_deref(), Some("a.b.Example.COM"));

        let short = DnsMessage::query(RecordType::A, "com");
        assert_eq!(key(MessageKey::ThirdLd, &short).as_deref(), Some("com"));

        let root = DnsMessage::query(RecordType::NS, ".");
        assert_eq!(key(MessageKey::Tld, &root).as_deref(), Some("."));
    }

    #[test]
    fn test_tld_indexer_folds_case() {
        let mut idx = MessageKey::Tld.indexer(16);
        let upper = DnsMessage::query(RecordType::A, "example.COM");
        let lower = DnsMessage::query(RecordType::A, "other.com");
        assert_eq!(idx.index(&upper).unwrap(), Some(0));
        assert_eq!(idx.index(&lower).unwrap(), Some(0));
        assert_eq!(idx.label(0), "COM");
        assert_eq!(idx.registry().domain(), "tld");
    }

    #[test]
    fn test_mask_addr_edges() {
        let a: IpAddr = "203.0.113.200".parse().unwrap();
        assert_eq!(mask_addr(a, 0, 0), "0.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(mask_addr(a, 32, 0), a);
        assert_eq!(mask_addr(a, 40, 0), a);
        assert_eq!(mask_addr(a, 25, 0), "203.0.113.128".parse::<IpAddr>().unwrap());
    }
}
