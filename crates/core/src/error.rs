//! Crate-wide error taxonomy.
//!
//! Every error that escapes the loader/dispatcher boundary collapses
//! into one of these five kinds and is shown to the user as a
//! 15-character menu status message; inside a scheme engine's hot loop
//! no errors exist, a miscompute just shows up as wrong bytes on the bus.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize)]
pub enum CartError {
    #[error("image does not fit in the arena: {0}")]
    PlacementError(String),

    #[error("flash erase or program failed: {0}")]
    FlashError(String),

    #[error("mass-storage read failed: {0}")]
    IoError(String),

    #[error("unrecognized file format: {0}")]
    FormatError(String),

    #[error("no scheme matched this image")]
    Unrecognized,
}

impl CartError {
    /// The fixed, ≤15-character message shown in the menu's status line.
    pub fn status_message(&self) -> &'static str {
        match self {
            CartError::PlacementError(_) => "ROM TOO BIG",
            CartError::FlashError(_) => "FLASH WRITE ERR",
            CartError::IoError(_) => "CANT READ SD",
            CartError::FormatError(_) => "BAD ACE FILE",
            CartError::Unrecognized => "BAD ROM FILE",
        }
    }
}
