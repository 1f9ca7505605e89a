//! Built-in dataset filters.

use dsc_stats::Filter;
use dsc_types::{DnsMessage, Rcode, RecordClass, RecordType};

use crate::indexers::{is_idn, is_root_server_name};

pub const FILTER_NAMES: &[&str] = &[
    "any",
    "queries-only",
    "replies-only",
    "nxdomains-only",
    "popular-qtypes",
    "idn-only",
    "aaaa-or-a6-only",
    "root-servers-net-only",
    "chaos-class",
    "priming-query",
    "authentic-data-only",
];

const POPULAR_QTYPES: &[u16] = &[
    RecordType::A,
    RecordType::NS,
    RecordType::CNAME,
    RecordType::SOA,
    RecordType::PTR,
    RecordType::MX,
    RecordType::TXT,
    RecordType::AAAA,
    RecordType::SRV,
    RecordType::A6,
    RecordType::ANY,
];

/// Build a built-in filter by name.
pub fn builtin(name: &str) -> Option<Box<dyn Filter>> {
    let filter: fn(&DnsMessage) -> bool = match name {
        "any" => |_| true,
        "queries-only" => DnsMessage::is_query,
        "replies-only" => DnsMessage::is_reply,
        "nxdomains-only" => |m| m.is_reply() && m.rcode == Rcode::NXDOMAIN,
        "popular-qtypes" => |m| POPULAR_QTYPES.contains(&m.qtype),
        "idn-only" => is_idn,
        "aaaa-or-a6-only" => |m| m.qtype == RecordType::AAAA || m.qtype == RecordType::A6,
        "root-servers-net-only" => |m| is_root_server_name(m.qname_trimmed()),
        "chaos-class" => |m| m.qclass == RecordClass::CH,
        "priming-query" => |m| {
            m.is_query() && m.qtype == RecordType::NS && m.qname_trimmed().is_empty()
        },
        "authentic-data-only" => |m| m.ad,
        _ => return None,
    };
    Some(Box::new(filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(name: &str, msg: &DnsMessage) -> bool {
        builtin(name).unwrap().accepts(msg)
    }

    #[test]
    fn test_every_name_resolves() {
        for name in FILTER_NAMES {
            assert!(builtin(name).is_some(), "{name}");
        }
        assert!(builtin("no-such-filter").is_none());
    }

    #[test]
    fn test_direction_filters() {
        let q = DnsMessage::query(RecordType::A, "example.com");
        let r = q.clone().into_reply(Rcode::NOERROR);
        assert!(accepts("any", &q));
        assert!(accepts("queries-only", &q));
        assert!(!accepts("queries-only", &r));
        assert!(accepts("replies-only", &r));
        assert!(!accepts("nxdomains-only", &r));
        assert!(accepts("nxdomains-only", &q.into_reply(Rcode::NXDOMAIN)));
    }

    #[test]
    fn test_qtype_filters() {
        assert!(accepts("popular-qtypes", &DnsMessage::query(RecordType::MX, "x")));
        assert!(!accepts("popular-qtypes", &DnsMessage::query(RecordType::DNSKEY, "x")));
        assert!(accepts("aaaa-or-a6-only", &DnsMessage::query(RecordType::A6, "x")));
        assert!(!accepts("aaaa-or-a6-only", &DnsMessage::query(RecordType::A, "x")));
    }

    #[test]
    fn test_name_filters() {
        assert!(accepts("idn-only", &DnsMessage::query(RecordType::A, "xn--p1ai")));
        assert!(accepts(
            "root-servers-net-only",
            &DnsMessage::query(RecordType::A, "k.root-servers.net.")
        ));
        assert!(!accepts(
            "root-servers-net-only",
            &DnsMessage::query(RecordType::A, "root-servers.net")
        ));
    }

    #[test]
    fn test_priming_and_chaos() {
        let priming = DnsMessage::query(RecordType::NS, ".");
        assert!(accepts("priming-query", &priming));
        assert!(!accepts("priming-query", &DnsMessage::query(RecordType::NS, "com")));
        assert!(!accepts("priming-query", &priming.clone().into_reply(0)));

        let mut chaos = DnsMessage::query(RecordType::TXT, "version.bind");
        assert!(!accepts("chaos-class", &chaos));
        chaos.qclass = RecordClass::CH;
        assert!(accepts("chaos-class", &chaos));
    }

    #[test]
    fn test_authentic_data() {
        let mut msg = DnsMessage::query(RecordType::A, "example.com").into_reply(0);
        assert!(!accepts("authentic-data-only", &msg));
        msg.ad = true;
        assert!(accepts("authentic-data-only", &msg));
    }
}
