//! Literal parsing for match and action arguments.
//!
//! These helpers only decide whether a word is well formed; callers attach
//! the error position and message.

use rulec_core::tables::characteristic_bit;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Parse a decimal or `0x`-prefixed hexadecimal integer.
pub(crate) fn parse_number(s: &str) -> Option<i64> {
    let lower = s.to_ascii_lowercase();
    match lower.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() => i64::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None => lower.parse().ok(),
    }
}

/// Parse a number in `0..=max`.
pub(crate) fn parse_bounded(s: &str, max: u32) -> Option<u32> {
    parse_number(s)
        .filter(|n| (0..=i64::from(max)).contains(n))
        .and_then(|n| u32::try_from(n).ok())
}

pub(crate) fn parse_u32(s: &str) -> Option<u32> {
    parse_bounded(s, u32::MAX)
}

/// Parse `N` or `N-M` with `0 <= N <= M <= max`.
pub(crate) fn parse_range(s: &str, max: u32) -> Option<(u32, u32)> {
    let (start, end) = match s.find('-') {
        Some(idx) if idx > 0 => {
            let (start, rest) = (&s[..idx], &s[idx + 1..]);
            if rest.contains('-') {
                return None;
            }
            (parse_bounded(start, max)?, parse_bounded(rest, max)?)
        }
        _ => {
            let n = parse_bounded(s, max)?;
            (n, n)
        }
    };
    (start <= end).then_some((start, end))
}

/// Lower-case hex digits of `s`, ignoring every other character.
fn hex_digits(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A 40-bit node address: exactly 10 hex digits once separators are dropped.
pub(crate) fn parse_node_address(s: &str) -> Option<String> {
    let digits = hex_digits(s);
    (digits.len() == 10).then_some(digits)
}

/// A MAC address normalized to `xx:xx:xx:xx:xx:xx`.
pub(crate) fn parse_mac(s: &str) -> Option<String> {
    let digits = hex_digits(s);
    if digits.len() != 12 {
        return None;
    }
    let octets: Vec<&str> = (0..6).map(|i| &digits[i * 2..i * 2 + 2]).collect();
    Some(octets.join(":"))
}

/// An IP network literal, normalized to `addr/bits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IpLiteral {
    V4(String),
    V6(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IpLiteralError {
    MissingPrefix,
    InvalidAddress,
    InvalidPrefix,
}

/// Parse `addr/bits`. An address containing `:` is IPv6, anything else IPv4.
pub(crate) fn parse_ip(s: &str) -> Result<IpLiteral, IpLiteralError> {
    let (addr, bits) = match s.split_once('/') {
        Some((addr, bits)) if !addr.is_empty() => (addr, bits),
        _ => return Err(IpLiteralError::MissingPrefix),
    };
    let bits: u8 = bits.parse().map_err(|_| IpLiteralError::InvalidPrefix)?;

    if addr.contains(':') {
        // A link-local address may carry a `%zone` suffix, kept verbatim.
        let (addr, zone) = match addr.split_once('%') {
            Some((_, "")) => return Err(IpLiteralError::InvalidAddress),
            Some((addr, zone)) => (addr, Some(zone)),
            None => (addr, None),
        };
        let addr: Ipv6Addr = addr.parse().map_err(|_| IpLiteralError::InvalidAddress)?;
        if bits > 128 {
            return Err(IpLiteralError::InvalidPrefix);
        }
        Ok(IpLiteral::V6(match zone {
            Some(zone) => format!("{}%{}/{}", addr, zone, bits),
            None => format!("{}/{}", addr, bits),
        }))
    } else {
        let addr: Ipv4Addr = addr.parse().map_err(|_| IpLiteralError::InvalidAddress)?;
        if bits > 32 {
            return Err(IpLiteralError::InvalidPrefix);
        }
        Ok(IpLiteral::V4(format!("{}/{}", addr, bits)))
    }
}

/// Comma-separated characteristic bit names or indices (0..=63), OR'ed together.
pub(crate) fn parse_characteristics(s: &str) -> Option<u64> {
    let mut mask = 0u64;
    for part in s.split(',').filter(|p| !p.is_empty()) {
        let bit = match characteristic_bit(&part.to_lowercase()) {
            Some(bit) => bit,
            None => parse_bounded(part, 63)?,
        };
        mask |= 1u64 << bit;
    }
    Some(mask)
}

/// A probability in `[0, 1]` scaled to the full `u32` range.
pub(crate) fn parse_probability(s: &str) -> Option<u32> {
    let p: f64 = s.parse().ok()?;
    if !(0.0..=1.0).contains(&p) {
        return None;
    }
    Some((f64::from(u32::MAX) * p).floor() as u32)
}

/// Split `name(a,b,...)` into its name and non-empty arguments.
pub(crate) fn split_invocation(s: &str) -> (&str, Vec<&str>) {
    match s.find('(') {
        Some(idx) if idx > 0 => {
            let args = s[idx + 1..]
                .split([',', ')'])
                .filter(|a| !a.is_empty())
                .collect();
            (&s[..idx], args)
        }
        _ => (s, Vec::new()),
    }
}
