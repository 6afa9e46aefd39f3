//! Cidr ranges and the remote address matcher.
//!
//! Ranges are parsed once when the filter is built, and matched for every request.

use std::{fmt, net::IpAddr, str::FromStr};

use ipnet::IpNet;

use crate::error::RangeParseError;

/// One cidr block, either ipv4 or ipv6, e.g. `192.168.100.1/24` or `2001:db8::/48`,
/// as defined in RFC 4632 and RFC 4291.
///
/// Host bits of the expression are kept for display, but ignored when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkRange(IpNet);

impl NetworkRange {
    /// Parse a cidr expression.
    ///
    /// # Errors
    /// If the expression is not a valid `address/prefix` pair.
    pub fn parse(expr: &str) -> Result<Self, RangeParseError> {
        expr.parse::<IpNet>().map(Self).map_err(|e| RangeParseError::new(expr, e))
    }

    /// Whether `ip` falls into this block. Addresses of the other family never do.
    #[inline]
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    /// The first address of the block.
    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }
}

impl FromStr for NetworkRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Parse a list of cidr expressions.
///
/// Invalid expressions are reported with a warning and left out, the order of the valid ones is kept.
pub fn parse_ranges<I, S>(exprs: I) -> (Vec<NetworkRange>, Vec<RangeParseError>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ranges = vec![];
    let mut errors = vec![];
    for expr in exprs {
        match NetworkRange::parse(expr.as_ref()) {
            Ok(range) => ranges.push(range),
            Err(e) => {
                tracing::warn!("{e}");
                errors.push(e);
            }
        }
    }
    (ranges, errors)
}

/// Strip the port and the ipv6 brackets off a raw remote address.
///
/// The last `:`-separated segment is always taken as the port, so `[::1]:3223` and `10.0.0.1:80`
/// come out right, but an unbracketed ipv6 address loses its last group: `2001:db8::1` becomes
/// `2001:db8:`. Bracket ipv6 literals and give them a port.
pub fn normalize_remote_addr(raw: &str) -> &str {
    let host = match raw.rfind(':') {
        Some(port_sep) => raw.get(..port_sep).unwrap_or(raw),
        None => raw,
    };
    if host.len() > 1 {
        if let Some(rest) = host.strip_prefix('[') {
            let mut chars = rest.chars();
            chars.next_back();
            return chars.as_str();
        }
    }
    host
}

/// Normalize a raw remote address and parse it as an ipv4 or ipv6 address.
///
/// Ipv4-mapped ipv6 addresses (`::ffff:a.b.c.d`) come out as ipv4, as dual stack listeners report ipv4 clients that way.
pub fn parse_remote_addr(raw: &str) -> Option<IpAddr> {
    normalize_remote_addr(raw).parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}

/// Whether the raw remote address falls into any of the ranges.
///
/// Unparsable addresses and empty range lists never match.
pub fn matches(ranges: &[NetworkRange], raw: &str) -> bool {
    if ranges.is_empty() {
        return false;
    }
    let Some(ip) = parse_remote_addr(raw) else {
        return false;
    };
    ranges.iter().any(|range| range.contains(&ip))
}
