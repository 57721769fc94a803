use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Network address of a skeleton, as advertised to stubs.
///
/// Unlike [`SocketAddr`] the host is kept as a string, so an advertised
/// address can carry a hostname when the bind address itself is not
/// externally routable (see `Stub::for_skeleton_with_hostname`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RpcAddr {
    pub host: String,
    pub port: u16,
}

impl RpcAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the same address with a different host.
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        Self::new(host, self.port)
    }
}

impl fmt::Display for RpcAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for RpcAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}
