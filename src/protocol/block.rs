//! Fixed-size handshake block (C1, C2, S1, S2)
//!
//! Layout of a digest-carrying block (C1/S1):
//!
//! ```text
//! 0        4         8                                            1536
//! +--------+---------+---------- fill ----+--digest--+---- fill ----+
//! | time   | version |                    | 32 bytes |              |
//! +--------+---------+--------------------+----------+--------------+
//! ```
//!
//! A response block (C2/S2) instead carries its signature in the last
//! 32 bytes, computed over the first 1504.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::error::{HandshakeError, Result};
use crate::protocol::constants::{HANDSHAKE_SIZE, SHA256_DIGEST_LENGTH, SIGNED_REGION_LENGTH};
use crate::protocol::digest::Digest;

/// One 1536-byte handshake block
///
/// The contents are fixed once built; bounds are checked by every accessor.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeBlock {
    bytes: [u8; HANDSHAKE_SIZE],
}

impl HandshakeBlock {
    /// Wrap raw bytes read off the wire
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() != HANDSHAKE_SIZE {
            return Err(HandshakeError::Structural(format!(
                "block is {} bytes, expected {}",
                data.len(),
                HANDSHAKE_SIZE
            ))
            .into());
        }
        let mut bytes = [0u8; HANDSHAKE_SIZE];
        bytes.copy_from_slice(data);
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: [u8; HANDSHAKE_SIZE]) -> Self {
        Self { bytes }
    }

    /// Block filled with random bytes, current timestamp and `version`
    pub(crate) fn random(version: [u8; 4]) -> [u8; HANDSHAKE_SIZE] {
        let mut bytes = [0u8; HANDSHAKE_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes[8..]);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u32)
            .unwrap_or(0);
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..8].copy_from_slice(&version);
        bytes
    }

    pub fn as_bytes(&self) -> &[u8; HANDSHAKE_SIZE] {
        &self.bytes
    }

    /// Bytes 0..4
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    /// Bytes 4..8; zero for peers using the simple handshake
    pub fn version(&self) -> [u8; 4] {
        [self.bytes[4], self.bytes[5], self.bytes[6], self.bytes[7]]
    }

    /// The 32 bytes starting at `offset`
    pub fn digest_at(&self, offset: usize) -> Result<Digest> {
        let end = digest_end(offset)?;
        let mut digest = [0u8; SHA256_DIGEST_LENGTH];
        digest.copy_from_slice(&self.bytes[offset..end]);
        Ok(digest)
    }

    /// The block split around the digest region at `offset`
    ///
    /// Concatenated, the two halves form the message the embedded digest
    /// was computed over.
    pub fn around_digest(&self, offset: usize) -> Result<(&[u8], &[u8])> {
        let end = digest_end(offset)?;
        Ok((&self.bytes[..offset], &self.bytes[end..]))
    }

    /// First 1504 bytes, covered by a C2/S2 signature
    pub fn signed_region(&self) -> &[u8] {
        &self.bytes[..SIGNED_REGION_LENGTH]
    }

    /// Trailing 32 bytes of a C2/S2 block
    pub fn signature(&self) -> Digest {
        let mut signature = [0u8; SHA256_DIGEST_LENGTH];
        signature.copy_from_slice(&self.bytes[SIGNED_REGION_LENGTH..]);
        signature
    }
}

/// End of the digest region at `offset`, if it lies inside the block
fn digest_end(offset: usize) -> Result<usize> {
    offset
        .checked_add(SHA256_DIGEST_LENGTH)
        .filter(|end| *end <= HANDSHAKE_SIZE)
        .ok_or_else(|| {
            HandshakeError::Structural(format!("digest region at {} exceeds block", offset)).into()
        })
}

impl AsRef<[u8]> for HandshakeBlock {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for HandshakeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeBlock")
            .field("timestamp", &self.timestamp())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_from_slice_requires_exact_size() {
        assert!(HandshakeBlock::from_slice(&[0u8; HANDSHAKE_SIZE]).is_ok());
        assert!(HandshakeBlock::from_slice(&[0u8; HANDSHAKE_SIZE - 1]).is_err());
        assert!(HandshakeBlock::from_slice(&[0u8; HANDSHAKE_SIZE + 1]).is_err());
    }

    #[test]
    fn test_header_accessors() {
        let mut bytes = [0u8; HANDSHAKE_SIZE];
        bytes[0..4].copy_from_slice(&1000u32.to_be_bytes());
        bytes[4..8].copy_from_slice(&[0x0A, 0x00, 0x2D, 0x02]);
        let block = HandshakeBlock::from_bytes(bytes);

        assert_eq!(block.timestamp(), 1000);
        assert_eq!(block.version(), [0x0A, 0x00, 0x2D, 0x02]);
    }

    #[test]
    fn test_random_block_header() {
        let bytes = HandshakeBlock::random([1, 2, 3, 4]);
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
        assert!(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) > 0);
    }

    #[test]
    fn test_digest_regions() {
        let mut bytes = [0u8; HANDSHAKE_SIZE];
        bytes[100..132].fill(0xee);
        let block = HandshakeBlock::from_bytes(bytes);

        assert_eq!(block.digest_at(100).unwrap(), [0xee; 32]);
        let (head, tail) = block.around_digest(100).unwrap();
        assert_eq!(head.len(), 100);
        assert_eq!(tail.len(), HANDSHAKE_SIZE - 132);
        assert!(head.iter().chain(tail).all(|&b| b == 0));

        assert!(block.digest_at(HANDSHAKE_SIZE - 32).is_ok());
        assert!(block.digest_at(HANDSHAKE_SIZE - 31).is_err());
        assert!(block.around_digest(HANDSHAKE_SIZE).is_err());
    }

    #[test]
    fn test_huge_offsets_are_structural_errors() {
        let block = HandshakeBlock::from_bytes([0u8; HANDSHAKE_SIZE]);

        for offset in [usize::MAX, usize::MAX - 4, usize::MAX - SHA256_DIGEST_LENGTH] {
            assert!(matches!(
                block.digest_at(offset).unwrap_err(),
                Error::Handshake(HandshakeError::Structural(_))
            ));
            assert!(matches!(
                block.around_digest(offset).unwrap_err(),
                Error::Handshake(HandshakeError::Structural(_))
            ));
        }
    }

    #[test]
    fn test_signature_region() {
        let mut bytes = [0u8; HANDSHAKE_SIZE];
        bytes[SIGNED_REGION_LENGTH..].fill(0x42);
        let block = HandshakeBlock::from_bytes(bytes);

        assert_eq!(block.signed_region().len(), 1504);
        assert_eq!(block.signature(), [0x42; 32]);
    }
}
