//! Error handling for the node
//!
//! This module provides the error types for all node operations.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Error types for node operations
#[derive(Debug, Clone)]
pub enum NodeError {
    /// Network communication errors
    Network(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Single-block validation errors (bad link, hash, proof-of-work or timestamp)
    InvalidBlock(String),
    /// Whole-chain validation errors (empty chain, wrong genesis)
    InvalidChain(String),
    /// Difficulty retargeting was asked to operate on a zero-length chain
    EmptyChain,
    /// A locally mined chain failed its own validity check
    InternalInvariant(String),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Network(msg) => write!(f, "Network error: {msg}"),
            NodeError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            NodeError::Io(msg) => write!(f, "I/O error: {msg}"),
            NodeError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            NodeError::InvalidChain(msg) => write!(f, "Invalid chain: {msg}"),
            NodeError::EmptyChain => write!(f, "Chain is empty"),
            NodeError::InternalInvariant(msg) => {
                write!(f, "Internal invariant violation: {msg}")
            }
            NodeError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for NodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for NodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        NodeError::Serialization(err.to_string())
    }
}
