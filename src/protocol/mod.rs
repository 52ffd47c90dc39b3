//! RTMP complex handshake primitives
//!
//! This module handles the low-level protocol details:
//! - Handshake constants and the fixed Adobe keys
//! - HMAC-SHA256 digests and digest offset schemes
//! - Validation and generation of C1/S1 digests and C2/S2 signatures
//! - The client/server handshake state machine

pub mod block;
pub mod constants;
pub mod digest;
pub mod handshake;
pub mod offset;
pub mod validate;

pub use block::HandshakeBlock;
pub use digest::{hmac_sha256, Digest, DigestKey};
pub use handshake::{Handshake, HandshakeRole};
pub use offset::OffsetScheme;
pub use validate::{
    validate_client_block, validate_digest, validate_response_block, validate_server_block,
    DigestPosition,
};
