/// Numeric DNS code types, matching the on-the-wire field widths.
#[allow(non_camel_case_types)]
pub type rr_type_t = u16;
#[allow(non_camel_case_types)]
pub type rr_class_t = u16;
#[allow(non_camel_case_types)]
pub type rcode_t = u16;
#[allow(non_camel_case_types)]
pub type opcode_t = u8;

/// Resource record types (RFC 1035 and successors).
pub mod RecordType {
    use super::rr_type_t;

    pub const A: rr_type_t = 1;
    pub const NS: rr_type_t = 2;
    pub const CNAME: rr_type_t = 5;
    pub const SOA: rr_type_t = 6;
    pub const PTR: rr_type_t = 12;
    pub const MX: rr_type_t = 15;
    pub const TXT: rr_type_t = 16;
    pub const AAAA: rr_type_t = 28;
    pub const SRV: rr_type_t = 33;
    pub const A6: rr_type_t = 38;
    pub const DS: rr_type_t = 43;
    pub const RRSIG: rr_type_t = 46;
    pub const DNSKEY: rr_type_t = 48;
    pub const HTTPS: rr_type_t = 65;
    pub const ANY: rr_type_t = 255;
}

/// Query classes.
pub mod RecordClass {
    use super::rr_class_t;

    pub const IN: rr_class_t = 1;
    pub const CH: rr_class_t = 3;
    pub const HS: rr_class_t = 4;
    pub const ANY: rr_class_t = 255;
}

/// Response codes (4-bit header code, extended by EDNS).
pub mod Rcode {
    use super::rcode_t;

    pub const NOERROR: rcode_t = 0;
    pub const FORMERR: rcode_t = 1;
    pub const SERVFAIL: rcode_t = 2;
    pub const NXDOMAIN: rcode_t = 3;
    pub const NOTIMP: rcode_t = 4;
    pub const REFUSED: rcode_t = 5;
}

/// Header opcodes.
pub mod Opcode {
    use super::opcode_t;

    pub const QUERY: opcode_t = 0;
    pub const IQUERY: opcode_t = 1;
    pub const STATUS: opcode_t = 2;
    pub const NOTIFY: opcode_t = 4;
    pub const UPDATE: opcode_t = 5;
}

/// Mnemonic for a record type, used in log messages.
pub fn rr_type_name(rtype: rr_type_t) -> &'static str {
    match rtype {
        RecordType::A => "A",
        RecordType::NS => "NS",
        RecordType::CNAME => "CNAME",
        RecordType::SOA => "SOA",
        RecordType::PTR => "PTR",
        RecordType::MX => "MX",
        RecordType::TXT => "TXT",
        RecordType::AAAA => "AAAA",
        RecordType::SRV => "SRV",
        RecordType::A6 => "A6",
        RecordType::DS => "DS",
        RecordType::RRSIG => "RRSIG",
        RecordType::DNSKEY => "DNSKEY",
        RecordType::HTTPS => "HTTPS",
        RecordType::ANY => "ANY",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rr_type_name() {
        assert_eq!(rr_type_name(RecordType::A), "A");
        assert_eq!(rr_type_name(RecordType::AAAA), "AAAA");
        assert_eq!(rr_type_name(4711), "UNKNOWN");
    }

    #[test]
    fn test_code_values() {
        assert_eq!(RecordType::AAAA, 28);
        assert_eq!(RecordClass::CH, 3);
        assert_eq!(Rcode::NXDOMAIN, 3);
        assert_eq!(Opcode::UPDATE, 5);
    }
}
