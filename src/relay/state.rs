//! Relay handshake state machine
//!
//! Tracks a handshake passing through the relay and validates each leg
//! from the captured bytes. Does no I/O; [`RelaySession`] reads, writes,
//! and reports each forward back here.
//!
//! ```text
//! AwaitingClientGreeting -> ReceivedC0C1 -> ForwardedToServer
//!   -> ReceivedS0S1S2 -> ValidatedServerSignature -> ForwardedToClient
//!   -> ReceivedC2 -> ValidatedClientResponse -> RelayEstablished
//! ```
//!
//! Any failure or out-of-order call lands in `Failed`, which is terminal.
//!
//! [`RelaySession`]: crate::relay::session::RelaySession

use crate::error::{HandshakeError, Result};
use crate::protocol::block::HandshakeBlock;
use crate::protocol::digest::DigestKey;
use crate::protocol::handshake::check_version;
use crate::protocol::validate::{
    validate_client_block, validate_response_block, validate_server_block, DigestPosition,
};

/// Progress of a relayed handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    AwaitingClientGreeting,
    /// C0+C1 captured and C1 digest accepted
    ReceivedC0C1,
    ForwardedToServer,
    ReceivedS0S1S2,
    /// S1 digest and S2 signature accepted
    ValidatedServerSignature,
    ForwardedToClient,
    ReceivedC2,
    ValidatedClientResponse,
    RelayEstablished,
    Failed,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::RelayEstablished | RelayState::Failed)
    }
}

/// Validator for both legs of a relayed handshake
#[derive(Debug)]
pub struct RelayValidator {
    state: RelayState,
    client_digest: Option<DigestPosition>,
    server_digest: Option<DigestPosition>,
}

impl Default for RelayValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayValidator {
    pub fn new() -> Self {
        Self {
            state: RelayState::AwaitingClientGreeting,
            client_digest: None,
            server_digest: None,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == RelayState::RelayEstablished
    }

    /// Digest accepted from the client's C1
    pub fn client_digest(&self) -> Option<&DigestPosition> {
        self.client_digest.as_ref()
    }

    /// Digest accepted from the server's S1
    pub fn server_digest(&self) -> Option<&DigestPosition> {
        self.server_digest.as_ref()
    }

    /// Abort the relay, e.g. after a transport error
    pub fn fail(&mut self) {
        self.state = RelayState::Failed;
    }

    /// C0+C1 captured from the client
    pub fn accept_client_greeting(&mut self, c0: u8, c1: &HandshakeBlock) -> Result<DigestPosition> {
        self.expect(RelayState::AwaitingClientGreeting)?;
        let result = check_version(c0).and_then(|_| validate_client_block(c1));
        let position = self.guard(result)?;

        self.client_digest = Some(position);
        self.state = RelayState::ReceivedC0C1;
        Ok(position)
    }

    pub fn client_greeting_forwarded(&mut self) -> Result<()> {
        self.transition(RelayState::ReceivedC0C1, RelayState::ForwardedToServer)
    }

    /// S0+S1+S2 captured from the server
    ///
    /// S1 must carry a valid server digest and S2 must be signed for the
    /// client's C1 digest.
    pub fn accept_server_response(
        &mut self,
        s0: u8,
        s1: &HandshakeBlock,
        s2: &HandshakeBlock,
    ) -> Result<DigestPosition> {
        self.transition(RelayState::ForwardedToServer, RelayState::ReceivedS0S1S2)?;
        let client_digest = self.recorded(self.client_digest)?;

        let result = check_version(s0)
            .and_then(|_| validate_server_block(s1))
            .and_then(|position| {
                validate_response_block(s2, &client_digest.digest, DigestKey::FlashMediaServer)
                    .map(|_| position)
            });
        let position = self.guard(result)?;

        self.server_digest = Some(position);
        self.state = RelayState::ValidatedServerSignature;
        Ok(position)
    }

    pub fn server_response_forwarded(&mut self) -> Result<()> {
        self.transition(RelayState::ValidatedServerSignature, RelayState::ForwardedToClient)
    }

    /// C2 captured from the client; must be signed for the server's S1 digest
    pub fn accept_client_response(&mut self, c2: &HandshakeBlock) -> Result<()> {
        self.transition(RelayState::ForwardedToClient, RelayState::ReceivedC2)?;
        let server_digest = self.recorded(self.server_digest)?;

        let result = validate_response_block(c2, &server_digest.digest, DigestKey::FlashPlayer);
        self.guard(result)?;

        self.state = RelayState::ValidatedClientResponse;
        Ok(())
    }

    pub fn client_response_forwarded(&mut self) -> Result<()> {
        self.transition(RelayState::ValidatedClientResponse, RelayState::RelayEstablished)
    }

    fn expect(&mut self, expected: RelayState) -> Result<()> {
        if self.state != expected {
            self.state = RelayState::Failed;
            return Err(HandshakeError::InvalidState.into());
        }
        Ok(())
    }

    fn transition(&mut self, from: RelayState, to: RelayState) -> Result<()> {
        self.expect(from)?;
        self.state = to;
        Ok(())
    }

    fn recorded(&mut self, position: Option<DigestPosition>) -> Result<DigestPosition> {
        let result = position.ok_or_else(|| HandshakeError::InvalidState.into());
        self.guard(result)
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = RelayState::Failed;
        }
        result
    }
}
