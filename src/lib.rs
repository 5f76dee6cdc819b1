//! # Gossip Chain - A Minimal Proof-of-Work Blockchain Node
//!
//! This is my minimal but complete proof-of-work blockchain node. When I come
//! back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Consensus Engine**: hash-linked blocks from a fixed genesis, with
//!   leading-zero-bit proof-of-work and timestamp drift checks
//! - **Dynamic Difficulty**: retargets every two blocks against a 10s
//!   generation goal
//! - **Heaviest-Chain Selection**: cumulative `2^difficulty` weight decides
//!   between competing chains, ties keep the current one
//! - **Peer Gossip**: whole-chain snapshots over plain TCP, one reader and
//!   one writer thread per peer
//! - **Single-Writer Coordinator**: one merge task owns the chain; mining is
//!   cancellable and restarts when its tip goes stale
//!
//! ## How I Organized My Code
//! - `core/`: blocks, chain, difficulty, mining, chain selection
//! - `network/`: wire format, peer connection threads, accept loop
//! - `sync/`: the coordinator tying mining, merging and broadcast together
//! - `config/`: process configuration
//! - `cli/`: command-line interface
//! - `utils/`: SHA-256, timestamps, serialization helpers
//!
//! ## Key Design Decisions I Made
//! - No persistence: chain state lives and dies with the process
//! - Whole-chain snapshots on every change instead of incremental gossip;
//!   simple, but it caps how far a chain can usefully grow
//! - A misbehaving peer only ever costs us its own connection
//! - The transaction layer is just an opaque payload for now

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use crate::cli::{Command, Opt};
pub use crate::config::{Config, GLOBAL_CONFIG};
pub use crate::core::{
    find_block, genesis_block, leading_zero_bits, next_difficulty, should_replace, Block,
    BlockHash, CancelToken, Chain, MineOutcome, BLOCK_GENERATION_INTERVAL_SECS,
    DIFFICULTY_ADJUSTMENT_INTERVAL, GENESIS_DIFFICULTY, GENESIS_INDEX, HASH_LEN,
};
pub use crate::error::{NodeError, Result};
pub use crate::network::{PeerSet, Server};
pub use crate::sync::{SharedChain, SyncCoordinator, SyncEvent, DEFAULT_MINE_INTERVAL};
