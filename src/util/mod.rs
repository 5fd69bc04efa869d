//! Utility types shared across the crate.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`Timestamp`] - Modification times used for staleness checks

mod error;

pub use error::*;

/// Modification time in seconds since the Unix epoch. `0` means unknown.
pub type Timestamp = u64;
