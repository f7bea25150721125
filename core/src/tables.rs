//! Fixed lookup tables for the rule language.
//!
//! All names are lower-case; callers normalize before lookup.

/// Named bits of the characteristics mask. Bit 0 is the LSB.
pub static CHARACTERISTIC_BITS: &[(&str, u32)] = &[
    ("inbound", 63),
    ("multicast", 62),
    ("broadcast", 61),
    ("ipauth", 60),
    ("macauth", 59),
    ("tcp_fin", 0),
    ("tcp_syn", 1),
    ("tcp_rst", 2),
    ("tcp_psh", 3),
    ("tcp_ack", 4),
    ("tcp_urg", 5),
    ("tcp_ece", 6),
    ("tcp_cwr", 7),
    ("tcp_ns", 8),
    ("tcp_rs2", 9),
    ("tcp_rs1", 10),
    ("tcp_rs0", 11),
];

/// Shorthand names for common ethernet types.
pub static ETHERTYPES: &[(&str, u16)] = &[
    ("ipv4", 0x0800),
    ("arp", 0x0806),
    ("wol", 0x0842),
    ("rarp", 0x8035),
    ("ipv6", 0x86dd),
    ("atalk", 0x809b),
    ("aarp", 0x80f3),
    ("ipx_a", 0x8137),
    ("ipx_b", 0x8138),
];

/// Shorthand names for common IP protocols.
pub static IP_PROTOCOLS: &[(&str, u8)] = &[
    ("icmp", 0x01),
    ("icmp4", 0x01),
    ("icmpv4", 0x01),
    ("igmp", 0x02),
    ("ipip", 0x04),
    ("tcp", 0x06),
    ("egp", 0x08),
    ("igp", 0x09),
    ("udp", 0x11),
    ("rdp", 0x1b),
    ("esp", 0x32),
    ("ah", 0x33),
    ("icmp6", 0x3a),
    ("icmpv6", 0x3a),
    ("l2tp", 0x73),
    ("sctp", 0x84),
    ("udplite", 0x88),
];

/// Keywords that open a block terminated by a semicolon.
pub static BLOCK_KEYWORDS: &[&str] = &[
    "macro", "tag", "cap", "drop", "accept", "tee", "watch", "redirect", "break", "priority",
];

/// Words that can't be used as tag, capability, or macro names.
pub static RESERVED_WORDS: &[&str] = &[
    // declarations
    "macro", "tag", "cap", "default",
    // actions
    "drop", "accept", "tee", "watch", "redirect", "break", "priority",
    // matches
    "ztsrc", "ztdest", "vlan", "vlanpcp", "vlandei", "ethertype", "macsrc", "macdest", "ipsrc",
    "ipdest", "iptos", "ipprotocol", "icmp", "sport", "dport", "chr", "framesize", "random",
    "tand", "tor", "txor", "tdiff", "teq", "tseq", "treq",
    // held back for future syntax
    "type", "enum", "class", "define", "import", "include", "log", "not", "xor", "or", "and",
    "set", "var", "let",
];

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

pub fn characteristic_bit(name: &str) -> Option<u32> {
    lookup(CHARACTERISTIC_BITS, name)
}

pub fn ethertype(name: &str) -> Option<u16> {
    lookup(ETHERTYPES, name)
}

pub fn ip_protocol(name: &str) -> Option<u8> {
    lookup(IP_PROTOCOLS, name)
}

/// Returns true if `word` (case-insensitive) opens a block.
pub fn is_block_keyword(word: &str) -> bool {
    BLOCK_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Returns true if `word` (case-insensitive) is reserved.
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Checks the identifier grammar used for macro, tag, capability, and
/// sub-value names: non-empty, not starting with a digit, and made only of
/// Unicode alphanumerics and `_`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(first) if first.is_ascii_digit() => false,
        Some(first) => {
            (first == '_' || first.is_alphanumeric())
                && chars.all(|c| c == '_' || c.is_alphanumeric())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_lookups() {
        assert_eq!(ethertype("ipv6"), Some(0x86dd));
        assert_eq!(ip_protocol("udp"), Some(17));
        assert_eq!(characteristic_bit("inbound"), Some(63));
        assert_eq!(characteristic_bit("tcp_syn"), Some(1));
        assert_eq!(ethertype("IPV6"), None);
    }

    #[test]
    fn test_block_keywords_case_insensitive() {
        assert!(is_block_keyword("accept"));
        assert!(is_block_keyword("DROP"));
        assert!(!is_block_keyword("include"));
    }

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved("ipsrc"));
        assert!(is_reserved("Include"));
        assert!(!is_reserved("superuser"));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("superuser"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("dépt_2"));
        assert!(is_valid_name("役割"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2fast"));
        assert!(!is_valid_name("has-dash"));
        assert!(!is_valid_name("has space"));
    }
}
