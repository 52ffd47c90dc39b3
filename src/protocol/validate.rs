//! Digest and signature checks for handshake blocks
//!
//! C1 and S1 embed a digest of themselves at a scheme-dependent offset.
//! C2 and S2 end with a signature keyed by a digest derived from the
//! peer's accepted C1/S1 digest, so each response is chained to the
//! other side's first block.

use crate::error::{HandshakeError, Result, SchemeAttempt};
use crate::protocol::block::HandshakeBlock;
use crate::protocol::constants::{HANDSHAKE_SIZE, SIGNED_REGION_LENGTH};
use crate::protocol::digest::{hmac_sha256, hmac_sha256_parts, Digest, DigestKey};
use crate::protocol::offset::OffsetScheme;

/// Where an accepted embedded digest was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestPosition {
    pub scheme: OffsetScheme,
    pub offset: usize,
    pub digest: Digest,
}

/// Compute the digest `block` should carry at `offset`
fn compute_embedded_digest(block: &HandshakeBlock, offset: usize, key: &[u8]) -> Result<Digest> {
    let (head, tail) = block.around_digest(offset)?;
    hmac_sha256_parts(&[head, tail], key)
}

/// Search both offset schemes for a digest keyed with `key`
///
/// Schemes are tried in [`OffsetScheme::ALL`] order and the first match
/// wins. When none match, every attempt is returned for diagnostics.
pub fn validate_digest(block: &HandshakeBlock, key: &[u8]) -> Result<DigestPosition> {
    let mut attempts = Vec::with_capacity(OffsetScheme::ALL.len());

    for scheme in OffsetScheme::ALL {
        let offset = scheme.digest_offset(block.as_bytes())?;
        let computed = compute_embedded_digest(block, offset, key)?;
        let embedded = block.digest_at(offset)?;

        if computed == embedded {
            tracing::trace!(?scheme, offset, "Embedded digest accepted");
            return Ok(DigestPosition {
                scheme,
                offset,
                digest: embedded,
            });
        }

        attempts.push(SchemeAttempt {
            scheme,
            offset,
            embedded,
            computed,
        });
    }

    Err(HandshakeError::DigestMismatch { attempts }.into())
}

/// Validate a client-originated C1
pub fn validate_client_block(block: &HandshakeBlock) -> Result<DigestPosition> {
    validate_digest(block, DigestKey::FlashPlayer.partial())
}

/// Validate a server-originated S1
pub fn validate_server_block(block: &HandshakeBlock) -> Result<DigestPosition> {
    validate_digest(block, DigestKey::FlashMediaServer.partial())
}

/// Key that signs the response to a block whose digest is `peer_digest`
pub fn response_key(peer_digest: &Digest, key: DigestKey) -> Result<Digest> {
    hmac_sha256(peer_digest, key.full())
}

/// Check the trailing signature of a C2/S2
///
/// For S2, `peer_digest` is the C1 digest and `key` is the FMS key;
/// for C2, the S1 digest and the Flash Player key.
pub fn validate_response_block(
    block: &HandshakeBlock,
    peer_digest: &Digest,
    key: DigestKey,
) -> Result<()> {
    let signing_key = response_key(peer_digest, key)?;
    let computed = hmac_sha256(block.signed_region(), &signing_key)?;
    let expected = block.signature();

    if computed != expected {
        return Err(HandshakeError::SignatureMismatch { expected, computed }.into());
    }
    Ok(())
}

/// Build a C1/S1 with a digest embedded under `scheme`
pub fn generate_digest_block(
    version: [u8; 4],
    scheme: OffsetScheme,
    key: DigestKey,
) -> Result<(HandshakeBlock, DigestPosition)> {
    let bytes = HandshakeBlock::random(version);
    embed_digest(bytes, scheme, key.partial())
}

/// Write the digest of `bytes` into its `scheme` offset
pub fn embed_digest(
    mut bytes: [u8; HANDSHAKE_SIZE],
    scheme: OffsetScheme,
    key: &[u8],
) -> Result<(HandshakeBlock, DigestPosition)> {
    let offset = scheme.digest_offset(&bytes)?;
    let digest = compute_embedded_digest(&HandshakeBlock::from_bytes(bytes), offset, key)?;
    bytes[offset..offset + digest.len()].copy_from_slice(&digest);

    Ok((
        HandshakeBlock::from_bytes(bytes),
        DigestPosition {
            scheme,
            offset,
            digest,
        },
    ))
}

/// Build a C2/S2 signed for the peer whose digest is `peer_digest`
pub fn generate_response_block(
    version: [u8; 4],
    peer_digest: &Digest,
    key: DigestKey,
) -> Result<HandshakeBlock> {
    let mut bytes = HandshakeBlock::random(version);
    let signing_key = response_key(peer_digest, key)?;
    let signature = hmac_sha256(&bytes[..SIGNED_REGION_LENGTH], &signing_key)?;
    bytes[SIGNED_REGION_LENGTH..].copy_from_slice(&signature);
    Ok(HandshakeBlock::from_bytes(bytes))
}
