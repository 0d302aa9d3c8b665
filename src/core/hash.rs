//! Keccak Hashing
//!
//! Hash derivations that must agree bit-for-bit with the Dungeon contract:
//! - Epoch hash: `keccak256(uint256(epoch))`
//! - Room hash: `keccak256(bytes32(epochHash) ‖ uint256(roomId))`
//!
//! Plus bitfield extraction from a digest, read as a big-endian 256-bit
//! unsigned integer (the way the EVM and the JS client read it).

use sha3::{Digest, Keccak256};

use super::bytes::H256;
use super::coords::RoomId;

/// Incremental keccak256 over ABI-packed words.
///
/// Order of updates is part of the hash contract.
pub struct PackedHasher {
    hasher: Keccak256,
}

impl Default for PackedHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PackedHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self { hasher: Keccak256::new() }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a `bytes32` word.
    #[inline]
    pub fn update_bytes32(&mut self, word: &H256) {
        self.hasher.update(word.0);
    }

    /// Update with a `uint256` word holding a u64.
    #[inline]
    pub fn update_uint256(&mut self, value: u64) {
        self.hasher.update(encode_uint256(value));
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> H256 {
        H256(self.hasher.finalize().into())
    }
}

/// keccak256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> H256 {
    H256(Keccak256::digest(data).into())
}

/// Left-padded big-endian 32-byte word.
#[inline]
pub fn encode_uint256(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Seed hash of an epoch, as the contract's `epochHash(uint256)`.
pub fn epoch_hash(epoch: u64) -> H256 {
    keccak256(&encode_uint256(epoch))
}

/// Room digest, as the contract's `roomHash(int32,int32)`.
pub fn room_hash(epoch_hash: &H256, room_id: RoomId) -> H256 {
    let mut hasher = PackedHasher::new();
    hasher.update_bytes32(epoch_hash);
    hasher.update_uint256(room_id);
    hasher.finalize()
}

/// Digest as four little-endian-ordered u64 limbs (limb 0 is least significant).
#[inline]
fn limbs(digest: &H256) -> [u64; 4] {
    let mut out = [0u64; 4];
    for (i, limb) in out.iter_mut().enumerate() {
        let start = 32 - (i + 1) * 8;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest.0[start..start + 8]);
        *limb = u64::from_be_bytes(buf);
    }
    out
}

/// `digest >> shift` as limbs.
fn shr(digest: &H256, shift: u32) -> [u64; 4] {
    let src = limbs(digest);
    let mut out = [0u64; 4];
    let word = (shift / 64) as usize;
    let bit = shift % 64;
    for (i, limb) in out.iter_mut().enumerate() {
        let lo = i + word;
        if lo >= 4 {
            break;
        }
        let mut v = src[lo] >> bit;
        if bit > 0 && lo + 1 < 4 {
            v |= src[lo + 1] << (64 - bit);
        }
        *limb = v;
    }
    out
}

/// `(digest >> lsb) % 2^size` for `size <= 64`.
pub fn field(digest: &H256, lsb: u32, size: u32) -> u64 {
    debug_assert!(size <= 64 && lsb < 256);
    let low = shr(digest, lsb)[0];
    if size >= 64 {
        low
    } else {
        low & ((1u64 << size) - 1)
    }
}

/// `(digest >> lsb) % modulus` for any non-zero modulus.
pub fn field_mod(digest: &H256, lsb: u32, modulus: u64) -> u64 {
    debug_assert!(modulus != 0);
    let shifted = shr(digest, lsb);
    let m = modulus as u128;
    shifted
        .iter()
        .rev()
        .fold(0u128, |rem, limb| ((rem << 64) | *limb as u128) % m) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const KECCAK_EMPTY: &str = "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";
    const KECCAK_ZERO_WORD: &str = "0x290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563";

    fn digest_from_u64(value: u64) -> H256 {
        H256(encode_uint256(value))
    }

    #[test]
    fn test_keccak_known_answers() {
        assert_eq!(keccak256(&[]).to_string(), KECCAK_EMPTY);
        assert_eq!(epoch_hash(0).to_string(), KECCAK_ZERO_WORD);
    }

    #[test]
    fn test_epoch_hash_is_pure() {
        assert_eq!(epoch_hash(42), epoch_hash(42));
        assert_ne!(epoch_hash(42), epoch_hash(43));
    }

    #[test]
    fn test_encode_uint256_is_big_endian() {
        let word = encode_uint256(0x0102);
        assert!(word[..30].iter().all(|b| *b == 0));
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
    }

    #[test]
    fn test_room_hash_matches_packed_encoding() {
        let epoch = epoch_hash(1);
        let mut packed = Vec::with_capacity(64);
        packed.extend_from_slice(&epoch.0);
        packed.extend_from_slice(&encode_uint256(77));
        assert_eq!(room_hash(&epoch, 77), keccak256(&packed));
    }

    #[test]
    fn test_field_low_bits() {
        let d = digest_from_u64(0b1011_0110);
        assert_eq!(field(&d, 0, 2), 0b10);
        assert_eq!(field(&d, 2, 5), 0b01101);
        assert_eq!(field(&d, 7, 2), 0b01);
        assert_eq!(field(&d, 0, 64), 0b1011_0110);
    }

    #[test]
    fn test_field_across_limb_boundary() {
        let mut bytes = [0u8; 32];
        // Bits 60..68 set: straddles limb 0 and limb 1.
        bytes[31 - 7] = 0xF0;
        bytes[31 - 8] = 0x0F;
        let d = H256(bytes);
        assert_eq!(field(&d, 60, 8), 0xFF);
        assert_eq!(field(&d, 64, 4), 0xF);
        assert_eq!(field(&d, 56, 4), 0);
    }

    #[test]
    fn test_field_top_bits() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x80;
        let d = H256(bytes);
        assert_eq!(field(&d, 255, 1), 1);
        assert_eq!(field(&d, 250, 10), 0b10_0000);
    }

    #[test]
    fn test_field_mod_matches_field_for_powers_of_two() {
        let d = keccak256(b"jolly roger");
        for lsb in [0u32, 3, 9, 19, 63, 64, 130, 200] {
            assert_eq!(field_mod(&d, lsb, 1 << 10), field(&d, lsb, 10));
        }
    }

    #[test]
    fn test_field_mod_arbitrary_modulus() {
        let d = digest_from_u64(1000);
        assert_eq!(field_mod(&d, 0, 7), 1000 % 7);
        assert_eq!(field_mod(&d, 3, 6), (1000 >> 3) % 6);

        // 2^64 mod 10 = 6
        let mut bytes = [0u8; 32];
        bytes[23] = 1;
        assert_eq!(field_mod(&H256(bytes), 0, 10), 6);
    }
}
