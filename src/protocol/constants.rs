//! RTMP handshake constants
//!
//! Reference: Adobe RTMP Specification (December 2012), Section 5.2
//! Reference: the de-facto complex handshake used by Flash Player / FMS

/// RTMP version number (always 3 for standard RTMP)
pub const RTMP_VERSION: u8 = 3;

/// Default RTMP port
pub const RTMP_PORT: u16 = 1935;

/// Handshake packet sizes
pub const HANDSHAKE_SIZE: usize = 1536;

/// Length of an HMAC-SHA256 digest
pub const SHA256_DIGEST_LENGTH: usize = 32;

/// Bytes of a C2/S2 block covered by its trailing signature
pub const SIGNED_REGION_LENGTH: usize = HANDSHAKE_SIZE - SHA256_DIGEST_LENGTH;

/// Modulus applied to the offset checksum
pub const DIGEST_OFFSET_MODULUS: usize = 728;

/// Version marker written into C1 bytes 4..8 (Flash Player 10.0.45.2)
pub const FLASH_PLAYER_VERSION: [u8; 4] = [0x0A, 0x00, 0x2D, 0x02];

/// Version marker written into S1 bytes 4..8 (FMS 4.5.0.1)
pub const FMS_VERSION: [u8; 4] = [0x04, 0x05, 0x00, 0x01];

/// "Genuine Adobe Flash Player 001" followed by 32 fixed bytes
pub const GENUINE_FP_KEY: [u8; 62] = [
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F', b'l',
    b'a', b's', b'h', b' ', b'P', b'l', b'a', b'y', b'e', b'r', b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57,
    0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

/// "Genuine Adobe Flash Media Server 001" followed by 32 fixed bytes
pub const GENUINE_FMS_KEY: [u8; 68] = [
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F', b'l',
    b'a', b's', b'h', b' ', b'M', b'e', b'd', b'i', b'a', b' ', b'S', b'e', b'r', b'v', b'e', b'r',
    b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57,
    0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

/// Length of the textual prefix of the Flash Player key
pub const FP_KEY_PARTIAL_LENGTH: usize = 30;

/// Length of the textual prefix of the FMS key
pub const FMS_KEY_PARTIAL_LENGTH: usize = 36;
