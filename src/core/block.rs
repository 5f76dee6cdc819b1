use crate::error::{NodeError, Result};
use crate::utils::{format_rfc3339, sha256_digest};
use chrono::{DateTime, Duration, Utc};
use data_encoding::HEXLOWER;
use std::fmt;

/// Number of bytes in a block digest.
pub const HASH_LEN: usize = 32;

/// 256-bit block digest.
pub type BlockHash = [u8; HASH_LEN];

// Clock-drift tolerance for timestamp validation. A block may be stamped at
// most this far before its parent, and at most this far into our future.
const TIMESTAMP_TOLERANCE_SECS: i64 = 60;

/// A single block. Immutable once hashed: the stored `hash` commits to every
/// other field except `difficulty`, which is enforced separately through the
/// leading-zero-bit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    index: u32,
    hash: BlockHash,
    previous_hash: BlockHash,
    timestamp: DateTime<Utc>,
    payload: Vec<u8>,
    difficulty: u32,
    nonce: Vec<u8>,
}

impl Block {
    /// Assemble a block and seal it with its computed hash.
    pub(crate) fn new(
        index: u32,
        previous_hash: BlockHash,
        timestamp: DateTime<Utc>,
        payload: Vec<u8>,
        difficulty: u32,
        nonce: Vec<u8>,
    ) -> Block {
        let mut block = Block {
            index,
            hash: [0u8; HASH_LEN],
            previous_hash,
            timestamp,
            payload,
            difficulty,
            nonce,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Reassemble a block from its transmitted fields, keeping the stored
    /// hash as-is. Validation recomputes and compares it later.
    pub(crate) fn from_parts(
        index: u32,
        hash: BlockHash,
        previous_hash: BlockHash,
        timestamp: DateTime<Utc>,
        payload: Vec<u8>,
        difficulty: u32,
        nonce: Vec<u8>,
    ) -> Block {
        Block {
            index,
            hash,
            previous_hash,
            timestamp,
            payload,
            difficulty,
            nonce,
        }
    }

    /// The hash preimage without the nonce: little-endian index, raw previous
    /// hash, canonical RFC 3339 timestamp, payload. The miner reuses this
    /// prefix across nonce attempts.
    pub(crate) fn hash_prefix(
        index: u32,
        previous_hash: &BlockHash,
        timestamp: &DateTime<Utc>,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut input = Vec::with_capacity(4 + HASH_LEN + 20 + payload.len());
        input.extend_from_slice(&index.to_le_bytes());
        input.extend_from_slice(previous_hash);
        input.extend_from_slice(format_rfc3339(timestamp).as_bytes());
        input.extend_from_slice(payload);
        input
    }

    /// Recompute this block's digest over all fields except the hash itself
    /// and the difficulty.
    pub fn compute_hash(&self) -> BlockHash {
        let mut input = Self::hash_prefix(
            self.index,
            &self.previous_hash,
            &self.timestamp,
            &self.payload,
        );
        input.extend_from_slice(&self.nonce);
        sha256_digest(&input)
    }

    pub fn get_index(&self) -> u32 {
        self.index
    }

    pub fn get_hash(&self) -> &BlockHash {
        &self.hash
    }

    pub fn get_previous_hash(&self) -> &BlockHash {
        &self.previous_hash
    }

    pub fn get_timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn get_payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Validate this block against its logical predecessor: hash link, stored
    /// hash, proof-of-work and the timestamp drift window.
    pub fn validate_against(&self, parent: &Block) -> Result<()> {
        if self.previous_hash != parent.hash {
            return Err(NodeError::InvalidBlock(format!(
                "block {}: previous hash does not match parent {}",
                self.index, parent.index
            )));
        }

        if self.compute_hash() != self.hash {
            return Err(NodeError::InvalidBlock(format!(
                "block {}: stored hash does not match its contents",
                self.index
            )));
        }

        let zero_bits = leading_zero_bits(&self.hash);
        if zero_bits < self.difficulty {
            return Err(NodeError::InvalidBlock(format!(
                "block {}: hash has {} leading zero bits, difficulty requires {}",
                self.index, zero_bits, self.difficulty
            )));
        }

        self.validate_timestamp(parent)
    }

    // A forged timestamp could drag the retarget window around, so a block may
    // claim at most one minute before its parent and one minute into our
    // future.
    fn validate_timestamp(&self, parent: &Block) -> Result<()> {
        let tolerance = Duration::seconds(TIMESTAMP_TOLERANCE_SECS);
        if self.timestamp <= parent.timestamp - tolerance {
            return Err(NodeError::InvalidBlock(format!(
                "block {}: timestamp {} is too far before its parent",
                self.index,
                format_rfc3339(&self.timestamp)
            )));
        }
        if self.timestamp >= Utc::now() + tolerance {
            return Err(NodeError::InvalidBlock(format!(
                "block {}: timestamp {} is too far in the future",
                self.index,
                format_rfc3339(&self.timestamp)
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(index: {}, hash: {}, previous: {}, timestamp: {}, payload: {}, difficulty: {}, nonce: {})",
            self.index,
            HEXLOWER.encode(&self.hash),
            HEXLOWER.encode(&self.previous_hash),
            format_rfc3339(&self.timestamp),
            HEXLOWER.encode(&self.payload),
            self.difficulty,
            HEXLOWER.encode(&self.nonce),
        )
    }
}

/// Count the leading zero bits of a digest, most significant byte first.
/// Every all-zero byte contributes 8 bits; the first non-zero byte adds its
/// own leading zeros and ends the count.
pub fn leading_zero_bits(hash: &BlockHash) -> u32 {
    let mut total = 0u32;
    for byte in hash {
        if *byte == 0 {
            total += 8;
        } else {
            total += byte.leading_zeros();
            break;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::now_secs;

    fn sample_block(difficulty: u32) -> Block {
        Block::new(
            1,
            [0u8; HASH_LEN],
            now_secs(),
            b"sample payload".to_vec(),
            difficulty,
            vec![0, 0, 0, 0, 0, 0, 0, 0],
        )
    }

    #[test]
    fn test_leading_zero_bits_all_zero() {
        assert_eq!(leading_zero_bits(&[0u8; HASH_LEN]), 256);
    }

    #[test]
    fn test_leading_zero_bits_partial_byte() {
        let mut hash = [0u8; HASH_LEN];
        hash[0] = 0x0F;
        assert_eq!(leading_zero_bits(&hash), 4);

        hash[0] = 0x01;
        assert_eq!(leading_zero_bits(&hash), 7);

        hash[0] = 0xF0;
        assert_eq!(leading_zero_bits(&hash), 0);
    }

    #[test]
    fn test_leading_zero_bits_stops_at_first_nonzero_byte() {
        let mut hash = [0u8; HASH_LEN];
        hash[1] = 0xFF;
        // One full zero byte, then counting halts regardless of later zeros.
        assert_eq!(leading_zero_bits(&hash), 8);
    }

    #[test]
    fn test_hash_is_idempotent() {
        let block = sample_block(0);
        assert_eq!(block.compute_hash(), *block.get_hash());
        assert_eq!(block.compute_hash(), block.compute_hash());
    }

    #[test]
    fn test_mutating_any_field_changes_hash() {
        let block = sample_block(0);
        let original = *block.get_hash();

        let mut changed = block.clone();
        changed.index += 1;
        assert_ne!(changed.compute_hash(), original);

        let mut changed = block.clone();
        changed.previous_hash[0] ^= 1;
        assert_ne!(changed.compute_hash(), original);

        let mut changed = block.clone();
        changed.timestamp = block.timestamp + Duration::seconds(1);
        assert_ne!(changed.compute_hash(), original);

        let mut changed = block.clone();
        changed.payload.push(0);
        assert_ne!(changed.compute_hash(), original);

        let mut changed = block.clone();
        changed.nonce = vec![1];
        assert_ne!(changed.compute_hash(), original);
    }

    #[test]
    fn test_validate_against_accepts_well_formed_child() {
        let parent = sample_block(0);
        let child = Block::new(
            2,
            *parent.get_hash(),
            now_secs(),
            Vec::new(),
            0,
            Vec::new(),
        );
        assert!(child.validate_against(&parent).is_ok());
    }

    #[test]
    fn test_validate_against_rejects_broken_link() {
        let parent = sample_block(0);
        let child = Block::new(2, [1u8; HASH_LEN], now_secs(), Vec::new(), 0, Vec::new());
        assert!(child.validate_against(&parent).is_err());
    }

    #[test]
    fn test_validate_against_rejects_tampered_hash() {
        let parent = sample_block(0);
        let mut child = Block::new(
            2,
            *parent.get_hash(),
            now_secs(),
            Vec::new(),
            0,
            Vec::new(),
        );
        child.hash[0] ^= 1;
        assert!(child.validate_against(&parent).is_err());
    }

    #[test]
    fn test_validate_against_rejects_unmet_difficulty() {
        let parent = sample_block(0);
        // No honest SHA-256 output clears 255 leading zero bits.
        let child = Block::new(
            2,
            *parent.get_hash(),
            now_secs(),
            Vec::new(),
            255,
            Vec::new(),
        );
        assert!(child.validate_against(&parent).is_err());
    }

    #[test]
    fn test_timestamp_far_before_parent_rejected() {
        let parent = sample_block(0);
        let child = Block::new(
            2,
            *parent.get_hash(),
            *parent.get_timestamp() - Duration::seconds(61),
            Vec::new(),
            0,
            Vec::new(),
        );
        assert!(child.validate_against(&parent).is_err());
    }

    #[test]
    fn test_timestamp_slightly_before_parent_accepted() {
        let parent = sample_block(0);
        let child = Block::new(
            2,
            *parent.get_hash(),
            *parent.get_timestamp() - Duration::seconds(5),
            Vec::new(),
            0,
            Vec::new(),
        );
        assert!(child.validate_against(&parent).is_ok());
    }

    #[test]
    fn test_timestamp_in_future_rejected() {
        let parent = sample_block(0);
        let child = Block::new(
            2,
            *parent.get_hash(),
            now_secs() + Duration::seconds(120),
            Vec::new(),
            0,
            Vec::new(),
        );
        assert!(child.validate_against(&parent).is_err());
    }
}
