//! Name hashing for references.
//!
//! References are stored and compared as 32-bit hashes of their names. The
//! hash function is pluggable per VM; the built-in one is MurmurHash3
//! (x86, 32-bit variant). Distinct names that collide alias the same binding.
//!
//! # Example
//! ```
//! use avm::backend::hash_utils::{murmur3_32, DEFAULT_HASH_SEED};
//!
//! let a = murmur3_32(b"counter", DEFAULT_HASH_SEED);
//! let b = murmur3_32(b"counter", DEFAULT_HASH_SEED);
//! assert_eq!(a, b);
//! ```

/// Hash function signature: `(name bytes, seed) -> hash`
pub type HashFn = fn(&[u8], u32) -> u32;

/// Seed a fresh VM starts with
pub const DEFAULT_HASH_SEED: u32 = 0x873d_1ae5;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

#[inline]
fn mix_block(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline]
fn finalize(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3, x86 32-bit
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    let mut blocks = data.chunks_exact(4);

    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h ^= mix_block(k);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k |= (*byte as u32) << (8 * i);
        }
        h ^= mix_block(k);
    }

    finalize(h ^ data.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e_28b7);
        assert_eq!(murmur3_32(b"hello", 0), 0x248b_fa47);
        assert_eq!(
            murmur3_32(b"The quick brown fox jumps over the lazy dog", 0),
            0x2e4f_f723
        );
    }

    #[test]
    fn test_seed_changes_hash() {
        assert_ne!(
            murmur3_32(b"x", DEFAULT_HASH_SEED),
            murmur3_32(b"x", DEFAULT_HASH_SEED ^ 1)
        );
    }
}
