//! Shared primitives for the cartridge bus engine: the bus-pin seam,
//! the stable-address/write-capture samplers, the crate-wide error
//! taxonomy, and structured logging.

pub mod bus;
pub mod error;
pub mod logging;

pub use bus::{BusPins, StableAddressSampler, Two, Three};
pub use error::CartError;

/// A12 (0x1000) is the cartridge-select line: the 6502 is addressing
/// cartridge space whenever this bit is set.
pub const A12: u16 = 0x1000;

/// Mask applied to every address sample; the bus is 13 bits wide.
pub const ADDR_MASK: u16 = 0x1FFF;
