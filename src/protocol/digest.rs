//! HMAC-SHA256 digests used by the complex handshake
//!
//! Every digest in the handshake is an HMAC-SHA256 keyed with either a
//! fixed protocol key or a key derived from the peer's accepted digest.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{HandshakeError, Result};
use crate::protocol::constants::{
    FMS_KEY_PARTIAL_LENGTH, FP_KEY_PARTIAL_LENGTH, GENUINE_FMS_KEY, GENUINE_FP_KEY,
    SHA256_DIGEST_LENGTH,
};

type HmacSha256 = Hmac<Sha256>;

/// A 32-byte HMAC-SHA256 value
pub type Digest = [u8; SHA256_DIGEST_LENGTH];

/// Fixed shared secrets of the complex handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKey {
    /// Client side key ("Genuine Adobe Flash Player 001" + tail)
    FlashPlayer,
    /// Server side key ("Genuine Adobe Flash Media Server 001" + tail)
    FlashMediaServer,
}

impl DigestKey {
    /// Textual prefix only; keys the digest embedded in C1/S1
    pub fn partial(self) -> &'static [u8] {
        match self {
            DigestKey::FlashPlayer => &GENUINE_FP_KEY[..FP_KEY_PARTIAL_LENGTH],
            DigestKey::FlashMediaServer => &GENUINE_FMS_KEY[..FMS_KEY_PARTIAL_LENGTH],
        }
    }

    /// Whole key; used to derive C2/S2 signing keys
    pub fn full(self) -> &'static [u8] {
        match self {
            DigestKey::FlashPlayer => &GENUINE_FP_KEY,
            DigestKey::FlashMediaServer => &GENUINE_FMS_KEY,
        }
    }
}

/// Compute HMAC-SHA256 of `message` under `key`
pub fn hmac_sha256(message: &[u8], key: &[u8]) -> Result<Digest> {
    hmac_sha256_parts(&[message], key)
}

/// Compute HMAC-SHA256 over the concatenation of `parts`
///
/// Lets callers hash a block with its digest region cut out without
/// allocating the reduced buffer.
pub fn hmac_sha256_parts(parts: &[&[u8]], key: &[u8]) -> Result<Digest> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| HandshakeError::Crypto(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut digest = [0u8; SHA256_DIGEST_LENGTH];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_rfc4231_case_2() {
        let digest = hmac_sha256(b"what do ya want for nothing?", b"Jefe").unwrap();
        assert_eq!(
            hex(&digest),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_parts_match_whole_message() {
        let whole = hmac_sha256(b"hello world", b"key").unwrap();
        let pieces: [&[u8]; 3] = [b"hello", b" ", b"world"];
        let parts = hmac_sha256_parts(&pieces, b"key").unwrap();
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_deterministic() {
        let a = hmac_sha256(&[7u8; 100], DigestKey::FlashPlayer.full()).unwrap();
        let b = hmac_sha256(&[7u8; 100], DigestKey::FlashPlayer.full()).unwrap();
        assert_eq!(a, b);

        let c = hmac_sha256(&[7u8; 100], DigestKey::FlashPlayer.partial()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_forms() {
        assert_eq!(DigestKey::FlashPlayer.partial().len(), 30);
        assert_eq!(DigestKey::FlashPlayer.full().len(), 62);
        assert_eq!(DigestKey::FlashMediaServer.partial().len(), 36);
        assert_eq!(DigestKey::FlashMediaServer.full().len(), 68);
    }
}
