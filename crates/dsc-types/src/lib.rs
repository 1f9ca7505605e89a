//! Shared types for the dsc statistics collector.
//!
//! The capture/decode layer hands the collector fully decoded messages; this
//! crate holds that model plus the numeric DNS code tables the classifiers
//! match against.

#[allow(non_snake_case)]
pub mod rr;

pub mod message;

// Re-export commonly used items at the crate root.
pub use message::{DnsMessage, EdnsInfo, IpVersion, Transport, TransportMessage};
pub use rr::*;
