//! Relay handler trait
//!
//! The extension point for relay applications. Implement this trait to
//! filter clients and to take over the streams once the handshake has
//! been relayed.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::relay::session::EstablishedRelay;

/// Context passed to RelayHandler callbacks
#[derive(Debug, Clone)]
pub struct RelayContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote client address
    pub peer_addr: SocketAddr,

    /// Upstream server the client is relayed to
    pub upstream_addr: String,
}

/// Handler trait for relay applications
///
/// All methods have default implementations: every client is accepted
/// and established relays are spliced byte-for-byte until either side
/// closes.
#[async_trait]
pub trait RelayHandler: Send + Sync + 'static {
    /// Called when a new client connects, before the upstream is dialed
    ///
    /// Return false to immediately close the connection.
    async fn on_connection(&self, _ctx: &RelayContext) -> bool {
        true
    }

    /// Called once both legs passed validation
    ///
    /// Owns both sockets from here on.
    async fn on_established(
        &self,
        ctx: &RelayContext,
        relay: EstablishedRelay<TcpStream, TcpStream>,
    ) -> Result<()> {
        let (mut client, mut server) = relay.into_parts();
        let (up, down) = tokio::io::copy_bidirectional(&mut client, &mut server).await?;
        tracing::debug!(
            session_id = ctx.session_id,
            bytes_to_server = up,
            bytes_to_client = down,
            "Relay closed"
        );
        Ok(())
    }

    /// Called when the handshake could not be relayed
    async fn on_failed(&self, _ctx: &RelayContext, _error: &Error) {}
}

/// Handler with all default behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct SpliceHandler;

impl RelayHandler for SpliceHandler {}
