//! Core consensus functionality
//!
//! This module contains the consensus engine: the block and chain data model,
//! canonical hashing and validity rules, the cancellable proof-of-work search,
//! difficulty retargeting and heaviest-chain selection.

pub mod block;
pub mod chain;
pub mod difficulty;
pub mod miner;
pub mod selector;

pub use block::{leading_zero_bits, Block, BlockHash, HASH_LEN};
pub use chain::{genesis_block, Chain, GENESIS_DIFFICULTY, GENESIS_INDEX};
pub use difficulty::{
    next_difficulty, BLOCK_GENERATION_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL,
};
pub use miner::{find_block, CancelToken, MineOutcome};
pub use selector::should_replace;
