use std::fmt::{self, Display};

/// A cidr expression that could not be parsed.
///
/// It's never fatal: the filter reports it and keeps the other ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeParseError {
    expr: String,
    source: ipnet::AddrParseError,
}

impl RangeParseError {
    pub fn new(expr: impl Into<String>, source: ipnet::AddrParseError) -> Self {
        Self { expr: expr.into(), source }
    }
    /// The offending expression.
    pub fn expr(&self) -> &str {
        &self.expr
    }
}

impl Display for RangeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Ig.IpFilter] invalid cidr expression {expr:?}: {e}", expr = self.expr, e = self.source)
    }
}

impl std::error::Error for RangeParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Errors building an [`IpFilter`](crate::IpFilter) out of a config.
#[derive(Debug)]
pub enum IpFilterError {
    /// The config is not in the expected shape.
    Config(serde_json::Error),
    /// The deny status is not a valid http status code.
    InvalidStatus(u16),
}

impl Display for IpFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFilterError::Config(e) => write!(f, "[Ig.IpFilter] invalid config: {e}"),
            IpFilterError::InvalidStatus(code) => write!(f, "[Ig.IpFilter] invalid deny status code: {code}"),
        }
    }
}

impl std::error::Error for IpFilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpFilterError::Config(e) => Some(e),
            IpFilterError::InvalidStatus(_) => None,
        }
    }
}

impl From<serde_json::Error> for IpFilterError {
    fn from(value: serde_json::Error) -> Self {
        IpFilterError::Config(value)
    }
}
