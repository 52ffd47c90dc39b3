//! RTMP complex handshake state machine
//!
//! The RTMP handshake consists of three phases:
//!
//! ```text
//! Client                                   Server
//!   |                                        |
//!   |------- C0 (1 byte: version) --------->|
//!   |------- C1 (1536 bytes, digest) ------>|
//!   |                                        |
//!   |<------ S0 (1 byte: version) ----------|
//!   |<------ S1 (1536 bytes, digest) -------|
//!   |<------ S2 (1536 bytes, signs C1) -----|
//!   |                                        |
//!   |------- C2 (1536 bytes, signs S1) ---->|
//!   |                                        |
//!   |          [Handshake Complete]          |
//! ```
//!
//! Both C1 and S1 embed an HMAC digest of themselves; S2 and C2 carry a
//! signature keyed from the other side's digest. Every check is strict:
//! peers that only speak the simple (unsigned) handshake are rejected.
//!
//! The state machine does no I/O. Callers read exactly
//! [`Handshake::bytes_needed`] bytes and feed them to [`Handshake::process`].

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{HandshakeError, Result};
use crate::protocol::block::HandshakeBlock;
use crate::protocol::constants::{FLASH_PLAYER_VERSION, FMS_VERSION, HANDSHAKE_SIZE, RTMP_VERSION};
use crate::protocol::digest::{Digest, DigestKey};
use crate::protocol::offset::OffsetScheme;
use crate::protocol::validate::{
    generate_digest_block, generate_response_block, validate_client_block,
    validate_response_block, validate_server_block, DigestPosition,
};

/// Handshake role (client or server)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeRole {
    Client,
    Server,
}

/// Handshake state machine
#[derive(Debug)]
pub struct Handshake {
    role: HandshakeRole,
    state: HandshakeState,
    /// Digest embedded in our C1/S1
    our_digest: Option<DigestPosition>,
    /// Digest accepted from the peer's C1/S1
    peer_digest: Option<DigestPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    /// Initial state - need to send C0C1 (client) or start waiting (server)
    Initial,
    /// Waiting for peer's C0C1 (server) or S0S1S2 (client)
    WaitingForPeerPacket,
    /// Server waiting for C2
    WaitingForPeerResponse,
    /// Handshake complete
    Done,
    /// A check failed; the handshake cannot continue
    Failed,
}

impl Handshake {
    /// Create a new handshake state machine
    pub fn new(role: HandshakeRole) -> Self {
        Self {
            role,
            state: HandshakeState::Initial,
            our_digest: None,
            peer_digest: None,
        }
    }

    pub fn role(&self) -> HandshakeRole {
        self.role
    }

    /// Check if handshake is complete
    pub fn is_done(&self) -> bool {
        self.state == HandshakeState::Done
    }

    pub fn is_failed(&self) -> bool {
        self.state == HandshakeState::Failed
    }

    /// Offset scheme the peer signed its C1/S1 with, once validated
    pub fn peer_scheme(&self) -> Option<OffsetScheme> {
        self.peer_digest.map(|p| p.scheme)
    }

    /// Exact number of bytes the next [`process`](Self::process) call consumes
    pub fn bytes_needed(&self) -> usize {
        match (self.state, self.role) {
            (HandshakeState::WaitingForPeerPacket, HandshakeRole::Server) => 1 + HANDSHAKE_SIZE,
            (HandshakeState::WaitingForPeerPacket, HandshakeRole::Client) => 1 + HANDSHAKE_SIZE * 2,
            (HandshakeState::WaitingForPeerResponse, _) => HANDSHAKE_SIZE,
            _ => 0,
        }
    }

    /// Generate initial packet
    ///
    /// For client: returns C0+C1 (1 + 1536 bytes), C1 signed under scheme A
    /// For server: returns None (server waits for C0C1 first)
    pub fn generate_initial(&mut self) -> Result<Option<Bytes>> {
        if self.state != HandshakeState::Initial {
            return Ok(None);
        }

        match self.role {
            HandshakeRole::Client => {
                let (c1, position) = self.guard(generate_digest_block(
                    FLASH_PLAYER_VERSION,
                    OffsetScheme::SchemeA,
                    DigestKey::FlashPlayer,
                ))?;
                self.our_digest = Some(position);

                let mut buf = BytesMut::with_capacity(1 + HANDSHAKE_SIZE);
                buf.put_u8(RTMP_VERSION);
                buf.put_slice(c1.as_bytes());

                self.state = HandshakeState::WaitingForPeerPacket;
                Ok(Some(buf.freeze()))
            }
            HandshakeRole::Server => {
                self.state = HandshakeState::WaitingForPeerPacket;
                Ok(None)
            }
        }
    }

    /// Process received data and return response if ready
    ///
    /// For server receiving C0C1: returns S0+S1+S2
    /// For client receiving S0S1S2: returns C2
    /// For server receiving C2: returns None (handshake done)
    ///
    /// Returns `Ok(None)` without consuming anything if `data` holds fewer
    /// than [`bytes_needed`](Self::bytes_needed) bytes.
    pub fn process(&mut self, data: &mut Bytes) -> Result<Option<Bytes>> {
        match self.state {
            HandshakeState::WaitingForPeerPacket | HandshakeState::WaitingForPeerResponse => {
                if data.remaining() < self.bytes_needed() {
                    return Ok(None);
                }
            }
            HandshakeState::Failed => return Err(HandshakeError::InvalidState.into()),
            _ => return Ok(None),
        }

        let result = match (self.state, self.role) {
            (HandshakeState::WaitingForPeerPacket, HandshakeRole::Server) => {
                self.process_c0c1(data).map(Some)
            }
            (HandshakeState::WaitingForPeerPacket, HandshakeRole::Client) => {
                self.process_s0s1s2(data).map(Some)
            }
            _ => self.process_c2(data).map(|_| None),
        };
        self.guard(result)
    }

    /// Server side: validate C1, answer with S0+S1+S2
    fn process_c0c1(&mut self, data: &mut Bytes) -> Result<Bytes> {
        check_version(data.get_u8())?;
        let c1 = take_block(data)?;
        let c1_digest = validate_client_block(&c1)?;
        self.peer_digest = Some(c1_digest);

        // Answer in the scheme the client chose
        let (s1, s1_digest) =
            generate_digest_block(FMS_VERSION, c1_digest.scheme, DigestKey::FlashMediaServer)?;
        self.our_digest = Some(s1_digest);
        let s2 = generate_response_block(FMS_VERSION, &c1_digest.digest, DigestKey::FlashMediaServer)?;

        let mut response = BytesMut::with_capacity(1 + HANDSHAKE_SIZE * 2);
        response.put_u8(RTMP_VERSION);
        response.put_slice(s1.as_bytes());
        response.put_slice(s2.as_bytes());

        self.state = HandshakeState::WaitingForPeerResponse;
        Ok(response.freeze())
    }

    /// Client side: validate S1 and S2, answer with C2
    fn process_s0s1s2(&mut self, data: &mut Bytes) -> Result<Bytes> {
        check_version(data.get_u8())?;
        let s1 = take_block(data)?;
        let s2 = take_block(data)?;

        let s1_digest = validate_server_block(&s1)?;
        self.peer_digest = Some(s1_digest);

        let c1_digest = self.our_digest_value()?;
        validate_response_block(&s2, &c1_digest, DigestKey::FlashMediaServer)?;

        let c2 = generate_response_block(FLASH_PLAYER_VERSION, &s1_digest.digest, DigestKey::FlashPlayer)?;

        self.state = HandshakeState::Done;
        Ok(Bytes::copy_from_slice(c2.as_bytes()))
    }

    /// Server side: validate C2 against our S1 digest
    fn process_c2(&mut self, data: &mut Bytes) -> Result<()> {
        let c2 = take_block(data)?;
        let s1_digest = self.our_digest_value()?;
        validate_response_block(&c2, &s1_digest, DigestKey::FlashPlayer)?;

        self.state = HandshakeState::Done;
        Ok(())
    }

    fn our_digest_value(&self) -> Result<Digest> {
        self.our_digest
            .map(|p| p.digest)
            .ok_or_else(|| HandshakeError::InvalidState.into())
    }

    /// Move to `Failed` if `result` is an error
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = HandshakeState::Failed;
        }
        result
    }
}

/// Reject anything but plain RTMP (3)
pub fn check_version(version: u8) -> Result<()> {
    if version != RTMP_VERSION {
        return Err(HandshakeError::UnexpectedVersion(version).into());
    }
    Ok(())
}

fn take_block(data: &mut Bytes) -> Result<HandshakeBlock> {
    if data.remaining() < HANDSHAKE_SIZE {
        return Err(HandshakeError::Structural(format!(
            "{} bytes left, expected {}",
            data.remaining(),
            HANDSHAKE_SIZE
        ))
        .into());
    }
    HandshakeBlock::from_slice(&data.split_to(HANDSHAKE_SIZE))
}
