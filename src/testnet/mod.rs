//! Shared helpers for the test suite

pub mod test_utils;
