use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::rr::{opcode_t, rcode_t, rr_class_t, rr_type_t, RecordClass, RecordType};

/// Transport protocol the message was carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => write!(f, "udp"),
            Transport::Tcp => write!(f, "tcp"),
        }
    }
}

/// IP version of the transport envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

/// Envelope information about a captured DNS message.
///
/// Addresses are `None` when the decoder could not recover them (for example
/// an unsupported link or network layer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    #[serde(default)]
    pub src_ip: Option<IpAddr>,
    #[serde(default)]
    pub dst_ip: Option<IpAddr>,
    #[serde(default)]
    pub src_port: u16,
    #[serde(default)]
    pub dst_port: u16,
    #[serde(default)]
    pub transport: Transport,
}

impl TransportMessage {
    /// IP version of the source address, if one was decoded.
    pub fn ip_version(&self) -> Option<IpVersion> {
        self.src_ip.as_ref().map(IpVersion::of)
    }
}

/// EDNS(0) OPT record details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdnsInfo {
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub do_bit: bool,
    #[serde(default)]
    pub bufsiz: u16,
}

/// A decoded DNS message as produced by the capture/decode layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsMessage {
    #[serde(default)]
    pub tm: TransportMessage,
    /// True for responses, false for queries.
    #[serde(default)]
    pub qr: bool,
    #[serde(default)]
    pub opcode: opcode_t,
    #[serde(default)]
    pub rcode: rcode_t,
    #[serde(default)]
    pub qtype: rr_type_t,
    #[serde(default = "default_qclass")]
    pub qclass: rr_class_t,
    #[serde(default)]
    pub qname: String,
    #[serde(default)]
    pub rd: bool,
    #[serde(default)]
    pub tc: bool,
    #[serde(default)]
    pub ad: bool,
    #[serde(default)]
    pub edns: Option<EdnsInfo>,
    #[serde(default)]
    pub msglen: u16,
    /// Set by the decoder when the message could not be fully parsed.
    #[serde(default)]
    pub malformed: bool,
}

fn default_qclass() -> rr_class_t {
    RecordClass::IN
}

impl Default for DnsMessage {
    fn default() -> Self {
        Self {
            tm: TransportMessage::default(),
            qr: false,
            opcode: 0,
            rcode: 0,
            qtype: RecordType::A,
            qclass: default_qclass(),
            qname: String::new(),
            rd: false,
            tc: false,
            ad: false,
            edns: None,
            msglen: 0,
            malformed: false,
        }
    }
}

impl DnsMessage {
    /// Create a query for `qname`/`qtype` in class IN.
    pub fn query(qtype: rr_type_t, qname: impl Into<String>) -> Self {
        Self {
            qtype,
            qname: qname.into(),
            ..Default::default()
        }
    }

    /// Set the source address.
    pub fn with_source(mut self, addr: IpAddr) -> Self {
        self.tm.src_ip = Some(addr);
        self
    }

    /// Set the destination address.
    pub fn with_destination(mut self, addr: IpAddr) -> Self {
        self.tm.dst_ip = Some(addr);
        self
    }

    /// Turn this message into a response carrying `rcode`.
    pub fn into_reply(mut self, rcode: rcode_t) -> Self {
        self.qr = true;
        self.rcode = rcode;
        self
    }

    pub fn is_query(&self) -> bool {
        !self.qr
    }

    pub fn is_reply(&self) -> bool {
        self.qr
    }

    /// The query name without a trailing dot.
    pub fn qname_trimmed(&self) -> &str {
        self.qname.strip_suffix('.').unwrap_or(&self.qname)
    }

    /// Labels of the query name, left to right. The root name has none.
    pub fn qname_labels(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.qname_trimmed().split('.').filter(|l| !l.is_empty())
    }

    /// Rightmost label, or `None` for the root name.
    pub fn tld(&self) -> Option<&str> {
        self.qname_labels().next_back()
    }
}
