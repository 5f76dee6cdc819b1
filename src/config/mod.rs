//! Configuration management
//!
//! Process-level settings: the listening address and whether this node mines.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
