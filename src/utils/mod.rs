//! Utility functions and helpers
//!
//! This module contains the cryptographic digest, timestamp handling and
//! serialization helpers used throughout the node.

pub mod crypto;
pub mod serialization;
pub mod time;

pub use crypto::sha256_digest;
pub use serialization::{deserialize, serialize};
pub use time::{format_rfc3339, now_secs, parse_rfc3339};
