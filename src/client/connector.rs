//! RTMP client connector
//!
//! Dials an RTMP server and performs the complex handshake. The returned
//! stream is ready for the RTMP chunk/command layer.

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::transport::{client_handshake, HandshakenStream};

use super::config::{ClientConfig, ParsedUrl};

/// RTMP client connector
#[derive(Debug)]
pub struct RtmpConnector {
    config: ClientConfig,
    parsed_url: ParsedUrl,
    stream: HandshakenStream<TcpStream>,
}

impl RtmpConnector {
    /// Connect to an RTMP server and complete the handshake
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let parsed_url = config
            .parse_url()
            .ok_or_else(|| Error::Config("Invalid RTMP URL".into()))?;

        let addr = parsed_url.addr();

        let socket = timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::Io)?;

        if config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }

        tracing::debug!(addr = %addr, "Connected, starting handshake");
        let stream = client_handshake(socket, config.read_timeout).await?;
        tracing::info!(
            addr = %addr,
            peer_scheme = ?stream.peer_scheme(),
            "RTMP handshake complete"
        );

        Ok(Self {
            config,
            parsed_url,
            stream,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn parsed_url(&self) -> &ParsedUrl {
        &self.parsed_url
    }

    pub fn stream(&self) -> &HandshakenStream<TcpStream> {
        &self.stream
    }

    /// Hand the handshaken socket to the message layer
    pub fn into_stream(self) -> TcpStream {
        self.stream.into_inner()
    }
}
