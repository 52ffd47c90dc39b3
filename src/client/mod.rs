//! RTMP client implementation
//!
//! Provides the client side of the complex handshake:
//! - Dialing a remote RTMP server
//! - Signing C1/C2 and verifying S1/S2
//! - Handing the ready socket to the message layer

pub mod config;
pub mod connector;

pub use config::ClientConfig;
pub use connector::RtmpConnector;
