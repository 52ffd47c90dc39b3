//! Transparent RTMP handshake relay
//!
//! Interposes between a client and a server:
//! - Forwards C0/C1/C2 and S0/S1/S2 byte-for-byte
//! - Verifies both peers' digests and signatures before each forward
//! - Tears down both legs on any failure

pub mod config;
pub mod handler;
pub mod listener;
pub mod session;
pub mod state;

pub use config::RelayConfig;
pub use handler::{RelayContext, RelayHandler, SpliceHandler};
pub use listener::RelayServer;
pub use session::{EstablishedRelay, RelaySession};
pub use state::{RelayState, RelayValidator};
