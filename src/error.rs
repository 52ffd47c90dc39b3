//! Unified error types for rtmp-relay

use std::fmt;
use std::io;

use crate::protocol::offset::OffsetScheme;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for handshake and relay operations
#[derive(Debug)]
pub enum Error {
    /// I/O error during network operations
    Io(io::Error),
    /// Handshake failure
    Handshake(HandshakeError),
    /// Operation timed out
    Timeout,
    /// Peer closed the connection mid-handshake
    ConnectionClosed,
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Handshake(e) => write!(f, "Handshake error: {}", e),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::ConnectionClosed => write!(f, "Connection closed"),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Handshake(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::ConnectionClosed
        } else {
            Error::Io(err)
        }
    }
}

impl From<HandshakeError> for Error {
    fn from(err: HandshakeError) -> Self {
        Error::Handshake(err)
    }
}

impl Error {
    /// Returns the handshake error if this is a validation failure
    pub fn as_handshake(&self) -> Option<&HandshakeError> {
        match self {
            Error::Handshake(e) => Some(e),
            _ => None,
        }
    }
}

/// One failed try of the digest search under a single offset scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeAttempt {
    pub scheme: OffsetScheme,
    pub offset: usize,
    /// Bytes found at the computed offset
    pub embedded: [u8; 32],
    /// HMAC computed over the block minus the digest region
    pub computed: [u8; 32],
}

/// Handshake-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Buffer of the wrong size or a region outside the block
    Structural(String),
    /// Leading C0/S0 byte is not the RTMP version
    UnexpectedVersion(u8),
    /// No offset scheme produced a matching embedded digest
    DigestMismatch { attempts: Vec<SchemeAttempt> },
    /// Trailing C2/S2 signature does not match the derived key
    SignatureMismatch { expected: [u8; 32], computed: [u8; 32] },
    /// Step attempted out of order
    InvalidState,
    /// HMAC primitive rejected its input
    Crypto(String),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::Structural(msg) => write!(f, "Malformed handshake data: {}", msg),
            HandshakeError::UnexpectedVersion(v) => write!(f, "Invalid RTMP version: {}", v),
            HandshakeError::DigestMismatch { attempts } => {
                write!(f, "Handshake digest mismatch")?;
                for attempt in attempts {
                    write!(
                        f,
                        "; {:?} at {}: expected {} got {}",
                        attempt.scheme,
                        attempt.offset,
                        hex(&attempt.embedded),
                        hex(&attempt.computed)
                    )?;
                }
                Ok(())
            }
            HandshakeError::SignatureMismatch { expected, computed } => write!(
                f,
                "Handshake response signature mismatch: expected {} got {}",
                hex(expected),
                hex(computed)
            ),
            HandshakeError::InvalidState => write!(f, "Invalid handshake state"),
            HandshakeError::Crypto(msg) => write!(f, "HMAC failure: {}", msg),
        }
    }
}

impl std::error::Error for HandshakeError {}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
