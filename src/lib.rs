//! rtmp-relay: RTMP complex handshake and transparent handshake relay
//!
//! This library provides:
//! - The HMAC-SHA256 "complex" handshake used by Flash Player and FMS
//! - Client mode for dialing an RTMP server and verifying its S1/S2
//! - Server mode for answering a complex handshake
//! - A transparent relay that forwards both legs verbatim while verifying
//!   every digest and signature
//!
//! Once a handshake completes the raw stream is handed back; the RTMP
//! chunk and command layers are left to the caller.
//!
//! # Example: Relay
//!
//! ```no_run
//! use rtmp_relay::{RelayConfig, RelayServer, SpliceHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::new("192.168.20.111:1935");
//!     let relay = RelayServer::new(config, SpliceHandler);
//!     relay.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod transport;

// Re-export main types for convenience
pub use client::{ClientConfig, RtmpConnector};
pub use error::{Error, HandshakeError, Result};
pub use relay::{RelayConfig, RelayHandler, RelayServer, RelaySession, SpliceHandler};
pub use transport::{client_handshake, server_handshake, HandshakenStream};
