use std::{fmt, net::SocketAddr, ops::Deref, sync::Arc};

use crate::IgRequest;

/// The socket address of the peer, put in the request extensions by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddr(pub SocketAddr);

/// The remote address of a request, exactly as the transport layer reported it.
///
/// It may carry a port, and ipv6 literals may be bracketed, e.g. `[::1]:3223`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteAddr(Arc<str>);

impl RemoteAddr {
    pub fn new(addr: impl Into<Arc<str>>) -> Self {
        Self(addr.into())
    }

    /// The remote address of `req`.
    ///
    /// Taken from the [`RemoteAddr`] extension, else from the formatted [`PeerAddr`],
    /// else it is empty.
    pub fn of(req: &IgRequest) -> Self {
        let extensions = req.extensions();
        if let Some(addr) = extensions.get::<RemoteAddr>() {
            return addr.clone();
        }
        match extensions.get::<PeerAddr>() {
            Some(peer) => Self::from(*peer),
            None => Self::new(""),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for RemoteAddr {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PeerAddr> for RemoteAddr {
    fn from(PeerAddr(addr): PeerAddr) -> Self {
        Self::new(addr.to_string())
    }
}
