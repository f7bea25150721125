//! Match rendering.
//!
//! Turns the match portion of an action statement into canonical
//! [`MatchPredicate`]s. `and` is implicit; `not` and `or` apply to the next
//! predicate only.

use crate::actions::{Renderer, Scope};
use crate::literal::{
    parse_bounded, parse_characteristics, parse_ip, parse_mac, parse_node_address, parse_number,
    parse_probability, parse_range, parse_u32, IpLiteral, IpLiteralError,
};
use crate::{CompileError, CompileResult};
use rulec_core::tables::{ethertype, ip_protocol, is_reserved};
use rulec_core::{MatchKind, MatchPredicate, Rule};
use rulec_parser::{Node, Span};

/// Match keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKeyword {
    ZtSrc,
    ZtDest,
    Vlan,
    VlanPcp,
    VlanDei,
    Ethertype,
    MacSrc,
    MacDest,
    IpSrc,
    IpDest,
    IpTos,
    IpProtocol,
    Icmp,
    SPort,
    DPort,
    Chr,
    FrameSize,
    Random,
    TAnd,
    TOr,
    TXor,
    TDiff,
    TEq,
    TSeq,
    TReq,
}

impl MatchKeyword {
    fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "ztsrc" => Self::ZtSrc,
            "ztdest" => Self::ZtDest,
            "vlan" => Self::Vlan,
            "vlanpcp" => Self::VlanPcp,
            "vlandei" => Self::VlanDei,
            "ethertype" => Self::Ethertype,
            "macsrc" => Self::MacSrc,
            "macdest" => Self::MacDest,
            "ipsrc" => Self::IpSrc,
            "ipdest" => Self::IpDest,
            "iptos" => Self::IpTos,
            "ipprotocol" => Self::IpProtocol,
            "icmp" => Self::Icmp,
            "sport" => Self::SPort,
            "dport" => Self::DPort,
            "chr" => Self::Chr,
            "framesize" => Self::FrameSize,
            "random" => Self::Random,
            "tand" => Self::TAnd,
            "tor" => Self::TOr,
            "txor" => Self::TXor,
            "tdiff" => Self::TDiff,
            "teq" => Self::TEq,
            "tseq" => Self::TSeq,
            "treq" => Self::TReq,
            _ => return None,
        };
        Some(keyword)
    }

    fn arity(self) -> usize {
        match self {
            Self::IpTos
            | Self::Icmp
            | Self::TAnd
            | Self::TOr
            | Self::TXor
            | Self::TDiff
            | Self::TEq
            | Self::TSeq
            | Self::TReq => 2,
            _ => 1,
        }
    }
}

/// Number of arguments a match keyword takes, or `None` if `word` is not one.
pub fn match_arity(word: &str) -> Option<usize> {
    MatchKeyword::from_word(&word.to_lowercase()).map(MatchKeyword::arity)
}

/// A match argument after variable substitution.
struct Arg {
    text: String,
    span: Span,
}

impl Renderer<'_> {
    /// Render a match list, appending predicates to `out`.
    pub(crate) fn render_matches(
        &self,
        nodes: &[Node],
        scope: &Scope,
        out: &mut Vec<Rule>,
    ) -> CompileResult<()> {
        let mut not = false;
        let mut or = false;
        let mut nodes = nodes.iter();

        while let Some(node) = nodes.next() {
            let token = match node {
                Node::Word(token) => token,
                Node::Block(b) => return Err(CompileError::unexpected_block(b.span())),
            };
            let word = token.text().unwrap_or_default().to_lowercase();
            match word.as_str() {
                "and" => continue,
                "not" => {
                    not = true;
                    continue;
                }
                "or" => {
                    or = true;
                    continue;
                }
                _ => {}
            }

            let keyword = MatchKeyword::from_word(&word)
                .ok_or_else(|| CompileError::unrecognized_match(&word, token.span))?;

            let mut args = Vec::with_capacity(keyword.arity());
            let mut previous = token.span;
            for _ in 0..keyword.arity() {
                let arg = match nodes.next() {
                    Some(Node::Word(arg)) => arg,
                    _ => return Err(missing_match_argument(&word, previous)),
                };
                let text = arg.text().unwrap_or_default();
                if text.is_empty() || is_reserved(text) {
                    return Err(missing_match_argument(&word, previous));
                }
                // A bound value is held to the same rule as a literal argument.
                let text = scope.substitute(text, arg.span)?;
                if text.is_empty() || is_reserved(&text) {
                    return Err(missing_match_argument(&word, previous));
                }
                args.push(Arg {
                    text,
                    span: arg.span,
                });
                previous = arg.span;
            }

            let kind = self.match_kind(keyword, &args)?;
            out.push(Rule::Match(
                MatchPredicate::new(kind).with_not(not).with_or(or),
            ));
            not = false;
            or = false;
        }

        Ok(())
    }

    fn match_kind(&self, keyword: MatchKeyword, args: &[Arg]) -> CompileResult<MatchKind> {
        let first = &args[0];
        let kind = match keyword {
            MatchKeyword::ZtSrc => MatchKind::SourceAddress {
                zt: node_address(first)?,
            },
            MatchKeyword::ZtDest => MatchKind::DestAddress {
                zt: node_address(first)?,
            },
            MatchKeyword::Vlan => MatchKind::VlanId {
                vlan_id: bounded(first, 0xfff)? as u16,
            },
            MatchKeyword::VlanPcp => MatchKind::VlanPcp {
                vlan_pcp: bounded(first, 7)? as u8,
            },
            MatchKeyword::VlanDei => MatchKind::VlanDei {
                vlan_dei: bounded(first, 1)? as u8,
            },
            MatchKeyword::Ethertype => MatchKind::Ethertype {
                ether_type: match ethertype(&first.text.to_lowercase()) {
                    Some(e) => e,
                    None => bounded(first, 0xffff)? as u16,
                },
            },
            MatchKeyword::IpProtocol => MatchKind::IpProtocol {
                ip_protocol: match ip_protocol(&first.text.to_lowercase()) {
                    Some(p) => p,
                    None => bounded(first, 0xff)? as u8,
                },
            },
            MatchKeyword::MacSrc => MatchKind::MacSource { mac: mac(first)? },
            MatchKeyword::MacDest => MatchKind::MacDest { mac: mac(first)? },
            MatchKeyword::IpSrc => match ip(first)? {
                IpLiteral::V4(ip) => MatchKind::Ipv4Source { ip },
                IpLiteral::V6(ip) => MatchKind::Ipv6Source { ip },
            },
            MatchKeyword::IpDest => match ip(first)? {
                IpLiteral::V4(ip) => MatchKind::Ipv4Dest { ip },
                IpLiteral::V6(ip) => MatchKind::Ipv6Dest { ip },
            },
            MatchKeyword::IpTos => {
                let mask = parse_bounded(&first.text, 0xff).ok_or_else(|| {
                    CompileError::invalid_value(format!("Invalid ToS mask '{}'", first.text), first.span)
                })?;
                let (start, end) = range(&args[1], 0xff)?;
                MatchKind::IpTos {
                    mask: mask as u8,
                    start: start as u8,
                    end: end as u8,
                }
            }
            MatchKeyword::Icmp => {
                let icmp_type = parse_bounded(&first.text, 0xff).ok_or_else(|| {
                    CompileError::invalid_value(
                        format!("Missing or invalid ICMP type '{}'", first.text),
                        first.span,
                    )
                })?;
                let code = &args[1];
                let icmp_code = match parse_number(&code.text) {
                    Some(-1) => None,
                    Some(n @ 0..=0xff) => Some(n as u8),
                    _ => {
                        return Err(CompileError::invalid_value(
                            format!("Invalid ICMP code '{}' (use -1 for any)", code.text),
                            code.span,
                        ))
                    }
                };
                MatchKind::Icmp {
                    icmp_type: icmp_type as u8,
                    icmp_code,
                }
            }
            MatchKeyword::SPort => {
                let (start, end) = range(first, 0xffff)?;
                MatchKind::SourcePortRange {
                    start: start as u16,
                    end: end as u16,
                }
            }
            MatchKeyword::DPort => {
                let (start, end) = range(first, 0xffff)?;
                MatchKind::DestPortRange {
                    start: start as u16,
                    end: end as u16,
                }
            }
            MatchKeyword::FrameSize => {
                let (start, end) = range(first, 0xffff)?;
                MatchKind::FrameSizeRange {
                    start: start as u16,
                    end: end as u16,
                }
            }
            MatchKeyword::Chr => MatchKind::Characteristics {
                mask: parse_characteristics(&first.text).ok_or_else(|| {
                    CompileError::invalid_value(
                        format!(
                            "Invalid bit index (range 0-63) or unrecognized name in '{}'",
                            first.text
                        ),
                        first.span,
                    )
                })?,
            },
            MatchKeyword::Random => MatchKind::Random {
                probability: parse_probability(&first.text).ok_or_else(|| {
                    CompileError::invalid_value(
                        format!("Invalid probability '{}' (expected 0.0-1.0)", first.text),
                        first.span,
                    )
                })?,
            },
            MatchKeyword::TAnd
            | MatchKeyword::TOr
            | MatchKeyword::TXor
            | MatchKeyword::TDiff
            | MatchKeyword::TEq
            | MatchKeyword::TSeq
            | MatchKeyword::TReq => {
                let (id, value) = self.tag_operands(first, &args[1])?;
                match keyword {
                    MatchKeyword::TAnd => MatchKind::TagsBitwiseAnd { id, value },
                    MatchKeyword::TOr => MatchKind::TagsBitwiseOr { id, value },
                    MatchKeyword::TXor => MatchKind::TagsBitwiseXor { id, value },
                    MatchKeyword::TDiff => MatchKind::TagsDifference { id, value },
                    MatchKeyword::TEq => MatchKind::TagsEqual { id, value },
                    MatchKeyword::TSeq => MatchKind::TagSender { id, value },
                    _ => MatchKind::TagReceiver { id, value },
                }
            }
        };
        Ok(kind)
    }

    /// Resolve a tag reference and its value. A declared tag lets the value
    /// be one of its flag or enum names; otherwise both must be numbers.
    fn tag_operands(&self, tag: &Arg, value: &Arg) -> CompileResult<(u32, u32)> {
        let (id, resolved) = match self.decls.tag(&tag.text.to_lowercase()) {
            Some(declared) => {
                let name = value.text.to_lowercase();
                let resolved = declared
                    .flag(&name)
                    .or_else(|| declared.enum_value(&name))
                    .or_else(|| parse_u32(&value.text));
                (declared.id, resolved)
            }
            None => {
                let id = parse_u32(&tag.text).ok_or_else(|| {
                    CompileError::invalid_value(
                        format!("Undefined tag name and invalid tag ID '{}'", tag.text),
                        tag.span,
                    )
                })?;
                (id, parse_u32(&value.text))
            }
        };
        let value = resolved.ok_or_else(|| {
            CompileError::invalid_value(
                format!(
                    "Invalid tag value or unrecognized flag/enum name '{}'",
                    value.text
                ),
                value.span,
            )
        })?;
        Ok((id, value))
    }
}

fn missing_match_argument(keyword: &str, span: Span) -> CompileError {
    CompileError::missing_argument(
        format!(
            "Missing argument(s) to match '{}' (invalid argument or argument is reserved word)",
            keyword
        ),
        span,
    )
}

fn bounded(arg: &Arg, max: u32) -> CompileResult<u32> {
    parse_bounded(&arg.text, max).ok_or_else(|| {
        CompileError::invalid_value(
            format!("Invalid numeric value '{}' (expected 0-{})", arg.text, max),
            arg.span,
        )
    })
}

fn range(arg: &Arg, max: u32) -> CompileResult<(u32, u32)> {
    parse_range(&arg.text, max).ok_or_else(|| {
        CompileError::invalid_value(
            format!("Invalid numeric range '{}' (expected N or N-M within 0-{})", arg.text, max),
            arg.span,
        )
    })
}

fn node_address(arg: &Arg) -> CompileResult<String> {
    parse_node_address(&arg.text).ok_or_else(|| {
        CompileError::invalid_value(
            format!("Invalid node address '{}' (expected 10 hex digits)", arg.text),
            arg.span,
        )
    })
}

fn mac(arg: &Arg) -> CompileResult<String> {
    parse_mac(&arg.text).ok_or_else(|| {
        CompileError::invalid_value(format!("Invalid MAC address '{}'", arg.text), arg.span)
    })
}

fn ip(arg: &Arg) -> CompileResult<IpLiteral> {
    parse_ip(&arg.text).map_err(|e| {
        let message = match e {
            IpLiteralError::MissingPrefix => "Missing /bits netmask length designation in IP",
            IpLiteralError::InvalidAddress => "Invalid IP address (not valid IPv4 or IPv6)",
            IpLiteralError::InvalidPrefix => "Invalid netmask length in IP",
        };
        CompileError::invalid_value(format!("{} '{}'", message, arg.text), arg.span)
    })
}
