//! Peer-to-peer networking
//!
//! This module handles communication between nodes: the snapshot wire format,
//! per-peer connection threads, and the TCP accept loop. There is no peer
//! discovery, handshake or authentication; peers are added by address and
//! exchange whole-chain snapshots from then on.

pub mod peer;
pub mod server;
pub mod wire;

pub use peer::PeerSet;
pub use server::Server;
