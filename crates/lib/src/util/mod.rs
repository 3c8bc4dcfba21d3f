//! Shared utilities.
//!
//! Checksums, byte formatting and test helpers.

pub mod hash;
pub mod size;

#[cfg(test)]
pub mod testutil;
