use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// Listen address in `host:port` form
///
/// The host part may be empty (`:8080`), in which case the server listens on
/// all IPv4 interfaces. IPv6 literals must be bracketed (`[::1]:8080`).
/// Host names are resolved when the address is bound, not when it is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    host: String,
    port: u16,
}

impl ListenAddr {
    /// Creates a listen address from a host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Listen on all interfaces at the given port
    pub fn any(port: u16) -> Self {
        Self::new("", port)
    }

    /// Host part, empty for "all interfaces"
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolves the address to a socket address suitable for binding
    ///
    /// Literal IPs never touch the resolver. For host names the first
    /// resolved address wins.
    pub async fn resolve(&self) -> crate::Result<SocketAddr> {
        if self.host.is_empty() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port));
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| crate::EchoError::Config(format!("Cannot resolve host {}: {e}", self.host)))?;
        addrs
            .next()
            .ok_or_else(|| crate::EchoError::Config(format!("No addresses found for host {}", self.host)))
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for ListenAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl FromStr for ListenAddr {
    type Err = crate::EchoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| crate::EchoError::Config(format!("Invalid listen address {s:?}: {reason}"));

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, rest) = rest.split_once(']').ok_or_else(|| invalid("missing ']'"))?;
            let port = rest.strip_prefix(':').ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            let (host, port) = s.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
            if host.contains(':') {
                return Err(invalid("too many colons, bracket IPv6 hosts"));
            }
            (host, port)
        };

        if port.is_empty() {
            return Err(invalid("missing port"));
        }
        let port = port.parse::<u16>().map_err(|e| invalid(&e.to_string()))?;

        Ok(Self::new(host, port))
    }
}
