//! Seed derivation shared by all environments

use sha2::{Digest, Sha512};

/// Derive a 32-bit engine seed from a user seed.
///
/// The decimal form of the seed is hashed with SHA-512; the first eight bytes,
/// read little-endian, are reduced modulo 2^32. Without a seed a random one is
/// drawn first, so the result is still well mixed.
#[must_use]
pub fn derive_seed(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(rand::random);
    let digest = Sha512::digest(seed.to_string().as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head) % (1 << 32)
}
