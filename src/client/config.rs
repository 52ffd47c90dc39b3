//! Client configuration

use std::time::Duration;

use crate::protocol::constants::RTMP_PORT;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// RTMP URL to connect to (rtmp://host[:port]/app/stream)
    pub url: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Deadline for each handshake read (None = wait forever)
    pub read_timeout: Option<Duration>,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Parse URL into components
    pub fn parse_url(&self) -> Option<ParsedUrl> {
        // rtmp://host[:port]/app[/stream]
        let url = self.url.strip_prefix("rtmp://")?;

        let (host_port, path) = url.split_once('/').unwrap_or((url, ""));
        let (host, port) = if let Some((h, p)) = host_port.split_once(':') {
            (h.to_string(), p.parse().ok()?)
        } else {
            (host_port.to_string(), RTMP_PORT)
        };
        if host.is_empty() {
            return None;
        }

        let (app, stream_key) = if let Some((a, s)) = path.split_once('/') {
            (a.to_string(), Some(s.to_string()))
        } else {
            (path.to_string(), None)
        };

        Some(ParsedUrl {
            host,
            port,
            app,
            stream_key,
        })
    }
}

/// Parsed RTMP URL components
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    pub host: String,
    pub port: u16,
    pub app: String,
    pub stream_key: Option<String>,
}

impl ParsedUrl {
    /// `host:port` suitable for `TcpStream::connect`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing() {
        let config = ClientConfig::new("rtmp://localhost/live/test");
        let parsed = config.parse_url().unwrap();
        assert_eq!(parsed.host, "localhost");
        assert_eq!(parsed.port, 1935);
        assert_eq!(parsed.app, "live");
        assert_eq!(parsed.stream_key, Some("test".into()));
        assert_eq!(parsed.addr(), "localhost:1935");

        let config = ClientConfig::new("rtmp://example.com:1936/app");
        let parsed = config.parse_url().unwrap();
        assert_eq!(parsed.host, "example.com");
        assert_eq!(parsed.port, 1936);
        assert_eq!(parsed.app, "app");
        assert_eq!(parsed.stream_key, None);

        // Host only is enough for a bare handshake
        let config = ClientConfig::new("rtmp://192.168.20.111");
        let parsed = config.parse_url().unwrap();
        assert_eq!(parsed.addr(), "192.168.20.111:1935");
        assert_eq!(parsed.app, "");
    }

    #[test]
    fn test_invalid_urls() {
        assert!(ClientConfig::new("http://localhost/live").parse_url().is_none());
        assert!(ClientConfig::new("rtmp://host:notaport/live").parse_url().is_none());
        assert!(ClientConfig::new("rtmp:///live").parse_url().is_none());
    }
}
