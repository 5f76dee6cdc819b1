//! Peer synchronization coordinator
//!
//! This module owns the authoritative chain and every task that may touch it:
//! the single-writer merge loop, the cancellable mining loop, and the
//! broadcast fan-out.

pub mod coordinator;

pub use coordinator::{SharedChain, SyncCoordinator, SyncEvent, DEFAULT_MINE_INTERVAL};
