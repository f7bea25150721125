//! Canonical rule entries.
//!
//! A compiled rule set is an ordered list of [`Rule`]s. Zero or more match
//! predicates precede the action they guard. The serialized form is the JSON
//! object shape the policy engine consumes: a `type` field naming the entry
//! plus the fields relevant to that kind.

use serde::{Serialize, Serializer};

/// One entry of a compiled rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rule {
    Match(MatchPredicate),
    Action(Action),
}

impl Rule {
    /// Returns true if this entry is an action.
    pub fn is_action(&self) -> bool {
        matches!(self, Rule::Action(_))
    }

    /// Returns the match predicate, if this entry is one.
    pub fn as_match(&self) -> Option<&MatchPredicate> {
        match self {
            Rule::Match(m) => Some(m),
            Rule::Action(_) => None,
        }
    }

    /// Returns the action, if this entry is one.
    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Rule::Match(_) => None,
            Rule::Action(a) => Some(a),
        }
    }
}

impl From<MatchPredicate> for Rule {
    fn from(m: MatchPredicate) -> Self {
        Rule::Match(m)
    }
}

impl From<Action> for Rule {
    fn from(a: Action) -> Self {
        Rule::Action(a)
    }
}

/// A single match condition with its modifiers.
///
/// `not` inverts the condition. `or` combines it with the preceding
/// predicate by OR instead of the default AND.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPredicate {
    #[serde(flatten)]
    pub kind: MatchKind,
    pub not: bool,
    pub or: bool,
}

impl MatchPredicate {
    /// Create a plain (non-negated, AND-combined) predicate.
    pub fn new(kind: MatchKind) -> Self {
        Self {
            kind,
            not: false,
            or: false,
        }
    }

    pub fn with_not(mut self, not: bool) -> Self {
        self.not = not;
        self
    }

    pub fn with_or(mut self, or: bool) -> Self {
        self.or = or;
        self
    }
}

/// The closed set of match conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MatchKind {
    #[serde(rename = "MATCH_SOURCE_ZEROTIER_ADDRESS")]
    SourceAddress { zt: String },
    #[serde(rename = "MATCH_DEST_ZEROTIER_ADDRESS")]
    DestAddress { zt: String },
    #[serde(rename = "MATCH_VLAN_ID", rename_all = "camelCase")]
    VlanId { vlan_id: u16 },
    #[serde(rename = "MATCH_VLAN_PCP", rename_all = "camelCase")]
    VlanPcp { vlan_pcp: u8 },
    #[serde(rename = "MATCH_VLAN_DEI", rename_all = "camelCase")]
    VlanDei { vlan_dei: u8 },
    #[serde(rename = "MATCH_ETHERTYPE", rename_all = "camelCase")]
    Ethertype { ether_type: u16 },
    #[serde(rename = "MATCH_MAC_SOURCE")]
    MacSource { mac: String },
    #[serde(rename = "MATCH_MAC_DEST")]
    MacDest { mac: String },
    #[serde(rename = "MATCH_IPV4_SOURCE")]
    Ipv4Source { ip: String },
    #[serde(rename = "MATCH_IPV4_DEST")]
    Ipv4Dest { ip: String },
    #[serde(rename = "MATCH_IPV6_SOURCE")]
    Ipv6Source { ip: String },
    #[serde(rename = "MATCH_IPV6_DEST")]
    Ipv6Dest { ip: String },
    #[serde(rename = "MATCH_IP_TOS")]
    IpTos { mask: u8, start: u8, end: u8 },
    #[serde(rename = "MATCH_IP_PROTOCOL", rename_all = "camelCase")]
    IpProtocol { ip_protocol: u8 },
    /// `icmp_code` of `None` matches any code.
    #[serde(rename = "MATCH_ICMP", rename_all = "camelCase")]
    Icmp { icmp_type: u8, icmp_code: Option<u8> },
    #[serde(rename = "MATCH_IP_SOURCE_PORT_RANGE")]
    SourcePortRange { start: u16, end: u16 },
    #[serde(rename = "MATCH_IP_DEST_PORT_RANGE")]
    DestPortRange { start: u16, end: u16 },
    /// Bit 63 is the MSB; serialized as 16 hex digits.
    #[serde(rename = "MATCH_CHARACTERISTICS")]
    Characteristics {
        #[serde(serialize_with = "serialize_mask")]
        mask: u64,
    },
    #[serde(rename = "MATCH_FRAME_SIZE_RANGE")]
    FrameSizeRange { start: u16, end: u16 },
    /// Probability scaled so that `u32::MAX` means always.
    #[serde(rename = "MATCH_RANDOM")]
    Random { probability: u32 },
    #[serde(rename = "MATCH_TAGS_DIFFERENCE")]
    TagsDifference { id: u32, value: u32 },
    #[serde(rename = "MATCH_TAGS_BITWISE_AND")]
    TagsBitwiseAnd { id: u32, value: u32 },
    #[serde(rename = "MATCH_TAGS_BITWISE_OR")]
    TagsBitwiseOr { id: u32, value: u32 },
    #[serde(rename = "MATCH_TAGS_BITWISE_XOR")]
    TagsBitwiseXor { id: u32, value: u32 },
    #[serde(rename = "MATCH_TAGS_EQUAL")]
    TagsEqual { id: u32, value: u32 },
    #[serde(rename = "MATCH_TAG_SENDER")]
    TagSender { id: u32, value: u32 },
    #[serde(rename = "MATCH_TAG_RECEIVER")]
    TagReceiver { id: u32, value: u32 },
}

fn serialize_mask<S: Serializer>(mask: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:08x}{:08x}", mask >> 32, mask & 0xffff_ffff))
}

/// The closed set of actions.
///
/// `Tee` and `Watch` forward at most `length` bytes of the frame (`-1` for
/// the whole frame) to `address`. `Break` ends evaluation of the current
/// rule set without a verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "ACTION_DROP")]
    Drop,
    #[serde(rename = "ACTION_ACCEPT")]
    Accept,
    #[serde(rename = "ACTION_TEE")]
    Tee { address: String, length: i32 },
    #[serde(rename = "ACTION_WATCH")]
    Watch { address: String, length: i32 },
    #[serde(rename = "ACTION_REDIRECT")]
    Redirect { address: String },
    #[serde(rename = "ACTION_BREAK")]
    Break,
    #[serde(rename = "ACTION_PRIORITY", rename_all = "camelCase")]
    Priority { qos_bucket: u8 },
}
