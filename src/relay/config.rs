//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::constants::RTMP_PORT;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to accept clients on
    pub bind_addr: SocketAddr,

    /// Real RTMP server to relay to (host:port)
    pub upstream_addr: String,

    /// Maximum concurrent relay sessions (0 = unlimited)
    pub max_sessions: usize,

    /// Timeout for dialing the upstream server
    pub connect_timeout: Duration,

    /// Deadline for each handshake read on either leg (None = wait forever)
    pub read_timeout: Option<Duration>,

    /// Enable TCP_NODELAY on both legs
    pub tcp_nodelay: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], RTMP_PORT)),
            upstream_addr: String::new(),
            max_sessions: 0,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(10)),
            tcp_nodelay: true,
        }
    }
}

impl RelayConfig {
    /// Relay to `upstream_addr`, listening on the default RTMP port
    pub fn new(upstream_addr: impl Into<String>) -> Self {
        Self {
            upstream_addr: upstream_addr.into(),
            ..Default::default()
        }
    }

    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Check the config before starting a listener
    pub fn validate(&self) -> Result<()> {
        if self.upstream_addr.is_empty() {
            return Err(Error::Config("upstream address is required".into()));
        }
        let missing_port = || {
            Error::Config(format!(
                "upstream address '{}' is missing a port",
                self.upstream_addr
            ))
        };
        let (host, port) = self.upstream_addr.rsplit_once(':').ok_or_else(missing_port)?;
        // "[::1]" splits inside the brackets
        if host.is_empty() || (host.starts_with('[') && !host.ends_with(']')) {
            return Err(missing_port());
        }
        port.parse::<u16>().map_err(|_| {
            Error::Config(format!(
                "upstream address '{}' has an invalid port",
                self.upstream_addr
            ))
        })?;
        Ok(())
    }
}
