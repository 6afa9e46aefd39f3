//! # Ipgate ip filter
//!
//! Allow or deny http requests by the client ip, matched against a set of ipv4/ipv6 cidr ranges.
//!
//! The filter is a [`Handler`](ipgate_kernel::Handler): for each request it
//! - forwards it untouched when a bypass check matches,
//! - answers with the deny responder when the address is in no allowed range,
//! - otherwise runs its own sub-chain of handlers, and forwards it.
#![deny(clippy::unwrap_used, clippy::dbg_macro, clippy::unimplemented, clippy::todo, clippy::inline_always)]
pub mod chain;
pub mod config;
pub mod error;
pub mod filter;
pub mod range;

pub use chain::{Phase, SubChain};
pub use config::{DenyConfig, IpFilterConfig};
pub use error::{IpFilterError, RangeParseError};
pub use filter::{forbidden, BypassFn, DenyResponder, IpFilter, Outcome, FORBIDDEN_MESSAGE};
pub use ipgate_kernel;
pub use range::{matches, normalize_remote_addr, parse_ranges, parse_remote_addr, NetworkRange};
