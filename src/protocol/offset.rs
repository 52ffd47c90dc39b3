//! Digest offset schemes
//!
//! The position of the 32-byte digest inside C1/S1 is not transmitted.
//! Both sides derive it from four header bytes:
//!
//! ```text
//! offset = (b[base] + b[base+1] + b[base+2] + b[base+3]) % 728 + base + 4
//! ```
//!
//! Two bases are in use (8 and 772). A peer never says which one it
//! picked, so verifiers try them in a fixed order.

use crate::error::{HandshakeError, Result};
use crate::protocol::constants::{DIGEST_OFFSET_MODULUS, HANDSHAKE_SIZE, SHA256_DIGEST_LENGTH};

/// Number of header bytes summed into the offset checksum
const CHECKSUM_WIDTH: usize = 4;

/// Rule locating the embedded digest in a C1/S1 block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetScheme {
    /// Checksum over bytes 8..12, digest window starts at 12
    SchemeA,
    /// Checksum over bytes 772..776, digest window starts at 776
    SchemeB,
}

impl OffsetScheme {
    /// Search order used by every validator
    pub const ALL: [OffsetScheme; 2] = [OffsetScheme::SchemeA, OffsetScheme::SchemeB];

    /// First byte of the checksum sample
    pub fn checksum_base(self) -> usize {
        match self {
            OffsetScheme::SchemeA => 8,
            OffsetScheme::SchemeB => 772,
        }
    }

    /// First byte the digest may start at
    pub fn window_start(self) -> usize {
        self.checksum_base() + CHECKSUM_WIDTH
    }

    /// Compute where this scheme places the digest in `block`
    pub fn digest_offset(self, block: &[u8]) -> Result<usize> {
        digest_offset(
            block,
            self.checksum_base(),
            DIGEST_OFFSET_MODULUS,
            self.window_start(),
        )
    }
}

/// Derive a digest offset from a checksum of four bytes at `checksum_base`
///
/// Fails if `block` is not a full handshake block or the resulting digest
/// region would not fit inside it.
pub fn digest_offset(
    block: &[u8],
    checksum_base: usize,
    modulus: usize,
    window_start: usize,
) -> Result<usize> {
    if block.len() < HANDSHAKE_SIZE {
        return Err(HandshakeError::Structural(format!(
            "block is {} bytes, expected {}",
            block.len(),
            HANDSHAKE_SIZE
        ))
        .into());
    }
    if modulus == 0 {
        return Err(HandshakeError::Structural("zero offset modulus".into()).into());
    }

    let sample = checksum_base
        .checked_add(CHECKSUM_WIDTH)
        .and_then(|end| block.get(checksum_base..end))
        .ok_or_else(|| {
            HandshakeError::Structural(format!("checksum base {} out of range", checksum_base))
        })?;
    let sum: usize = sample.iter().map(|&b| b as usize).sum();

    (sum % modulus)
        .checked_add(window_start)
        .filter(|offset| {
            offset
                .checked_add(SHA256_DIGEST_LENGTH)
                .map_or(false, |end| end <= HANDSHAKE_SIZE)
        })
        .ok_or_else(|| {
            HandshakeError::Structural(format!(
                "digest window at {} exceeds block",
                window_start
            ))
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_zero_block_offsets() {
        let block = [0u8; HANDSHAKE_SIZE];
        assert_eq!(OffsetScheme::SchemeA.digest_offset(&block).unwrap(), 12);
        assert_eq!(OffsetScheme::SchemeB.digest_offset(&block).unwrap(), 776);
    }

    #[test]
    fn test_checksum_reduction() {
        let mut block = [0u8; HANDSHAKE_SIZE];
        // 255 * 4 = 1020, 1020 % 728 = 292
        block[8..12].copy_from_slice(&[0xff; 4]);
        assert_eq!(OffsetScheme::SchemeA.digest_offset(&block).unwrap(), 292 + 12);

        block[772..776].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(OffsetScheme::SchemeB.digest_offset(&block).unwrap(), 10 + 776);
    }

    #[test]
    fn test_bytes_outside_sample_ignored() {
        let mut a = [0u8; HANDSHAKE_SIZE];
        let mut b = [0u8; HANDSHAKE_SIZE];
        a[8..12].copy_from_slice(&[9, 8, 7, 6]);
        b[8..12].copy_from_slice(&[9, 8, 7, 6]);
        b[0..8].copy_from_slice(&[0xaa; 8]);
        b[100..200].fill(0x55);

        let first = OffsetScheme::SchemeA.digest_offset(&a).unwrap();
        assert_eq!(first, OffsetScheme::SchemeA.digest_offset(&b).unwrap());
        assert_eq!(first, OffsetScheme::SchemeA.digest_offset(&a).unwrap());
    }

    #[test]
    fn test_offsets_stay_in_bounds() {
        let mut block = [0u8; HANDSHAKE_SIZE];
        for value in [0u8, 1, 91, 182, 255] {
            block[8..12].fill(value);
            block[772..776].fill(value);
            for scheme in OffsetScheme::ALL {
                let offset = scheme.digest_offset(&block).unwrap();
                assert!(offset >= scheme.window_start());
                assert!(offset + SHA256_DIGEST_LENGTH <= HANDSHAKE_SIZE);
            }
        }
    }

    #[test]
    fn test_short_block_rejected() {
        let block = [0u8; 100];
        let err = OffsetScheme::SchemeA.digest_offset(&block).unwrap_err();
        assert!(matches!(err, Error::Handshake(HandshakeError::Structural(_))));
    }

    #[test]
    fn test_custom_window_overflow_rejected() {
        let block = [0u8; HANDSHAKE_SIZE];
        assert!(digest_offset(&block, 8, 728, 1510).is_err());
        assert!(digest_offset(&block, 1534, 728, 12).is_err());
        assert!(digest_offset(&block, 8, 0, 12).is_err());
    }

    #[test]
    fn test_huge_bases_are_structural_errors() {
        let block = [0u8; HANDSHAKE_SIZE];
        for (base, window) in [
            (usize::MAX - 1, 12),
            (usize::MAX, 12),
            (8, usize::MAX),
            (8, usize::MAX - SHA256_DIGEST_LENGTH),
        ] {
            let err = digest_offset(&block, base, DIGEST_OFFSET_MODULUS, window).unwrap_err();
            assert!(matches!(err, Error::Handshake(HandshakeError::Structural(_))));
        }
    }
}
