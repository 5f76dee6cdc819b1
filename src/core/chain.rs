use crate::core::block::{Block, HASH_LEN};
use crate::error::{NodeError, Result};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use std::fmt;

/// Index carried by the genesis block; chains are 1-based.
pub const GENESIS_INDEX: u32 = 1;
/// Difficulty stamped into the genesis block.
pub const GENESIS_DIFFICULTY: u32 = 2;

const GENESIS_PAYLOAD: &[u8] = b"this is the genesis block";

// The genesis block is a compile-time constant shared identically by every
// node; a node with a different constant can never validate anyone's chain.
static GENESIS_BLOCK: Lazy<Block> = Lazy::new(|| {
    let timestamp = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("genesis timestamp is a fixed valid instant");
    Block::new(
        GENESIS_INDEX,
        [0u8; HASH_LEN],
        timestamp,
        GENESIS_PAYLOAD.to_vec(),
        GENESIS_DIFFICULTY,
        Vec::new(),
    )
});

/// The canonical genesis block.
pub fn genesis_block() -> &'static Block {
    &GENESIS_BLOCK
}

/// An ordered sequence of blocks, position 0 being genesis. The authoritative
/// chain is always replaced wholesale, never mutated in place, so `Chain`
/// offers copy-and-extend rather than push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// A fresh chain holding only the genesis block.
    pub fn genesis() -> Chain {
        Chain {
            blocks: vec![genesis_block().clone()],
        }
    }

    /// Wrap an arbitrary block sequence, e.g. one decoded off the wire.
    /// No validity is implied; call [`Chain::validate`] before trusting it.
    pub fn from_blocks(blocks: Vec<Block>) -> Chain {
        Chain { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block, if any.
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// A new chain equal to this one with `block` appended.
    pub fn extended_with(&self, block: Block) -> Chain {
        let mut blocks = self.blocks.clone();
        blocks.push(block);
        Chain { blocks }
    }

    /// Validate the whole chain: non-empty, canonical genesis first, and every
    /// later block valid against its predecessor.
    pub fn validate(&self) -> Result<()> {
        let first = self
            .blocks
            .first()
            .ok_or_else(|| NodeError::InvalidChain("chain is empty".to_string()))?;

        if first != genesis_block() {
            return Err(NodeError::InvalidChain(
                "first block is not the canonical genesis block".to_string(),
            ));
        }

        for (parent, block) in self.blocks.iter().zip(self.blocks.iter().skip(1)) {
            block.validate_against(parent)?;
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Total work embodied by the chain: the sum of `2^difficulty` over all
    /// blocks, saturating at `u128::MAX`.
    pub fn cumulative_weight(&self) -> u128 {
        self.blocks.iter().fold(0u128, |total, block| {
            let weight = 1u128
                .checked_shl(block.get_difficulty())
                .unwrap_or(u128::MAX);
            total.saturating_add(weight)
        })
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
