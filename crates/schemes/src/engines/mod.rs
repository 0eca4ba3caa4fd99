//! Per-scheme decode logic.
//!
//! Every engine splits the skeleton from the specification into two
//! halves: a pure `decode` step (address in, [`Action`] out, mutating
//! only the engine's own small state) and a thin `run` loop that does
//! the actual bus I/O. Keeping decode pure means every scheme's bank
//! math and RAM windowing is unit-testable without a scripted bus.

pub mod bankswitch;
pub mod cv;
pub mod dpc;
pub mod e0;
pub mod e7;
pub mod supercharger;
pub mod tigervision;
pub mod zero840;

use cart_arena::{BankPointer, FlashDriver, MemoryArena};

/// What the bus loop should do in response to the address it just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No cartridge-select line recognized this address; stay silent.
    Idle,
    /// Drive `byte` onto the data bus until the address moves on.
    Respond(u8),
    /// The console is writing to cartridge RAM at this address; capture
    /// the byte and hand it to the engine's `apply_write`.
    Capture,
}

/// A small fixed-size RAM window with independent read/write port
/// ranges, the shape shared by F8SC/F6SC/F4SC/EFSC, FA, and CV.
///
/// Backed by the arena's Buffer region rather than its own heap
/// allocation: `base` is the writable bank [`ImagePlan::bank_ptr`]
/// handed to the scheme that owns this window.
#[derive(Debug, Clone, Copy)]
pub struct RamWindow {
    pub write_lo: u16,
    pub write_hi: u16,
    pub read_lo: u16,
    pub read_hi: u16,
    base: BankPointer,
}

impl RamWindow {
    pub fn new(write_lo: u16, write_hi: u16, read_lo: u16, read_hi: u16, base: BankPointer) -> Self {
        Self { write_lo, write_hi, read_lo, read_hi, base }
    }

    pub fn is_write(&self, addr: u16) -> bool {
        addr >= self.write_lo && addr <= self.write_hi
    }

    pub fn is_read(&self, addr: u16) -> bool {
        addr >= self.read_lo && addr <= self.read_hi
    }

    pub fn read<F: FlashDriver>(&self, arena: &MemoryArena<F>, addr: u16) -> u8 {
        let offset = self.base.offset + (addr - self.read_lo) as u32;
        arena.read_byte(BankPointer { region: self.base.region, offset })
    }

    pub fn write<F: FlashDriver>(&self, arena: &mut MemoryArena<F>, addr: u16, byte: u8) {
        let offset = self.base.offset + (addr - self.write_lo) as u32;
        arena.write_byte(BankPointer { region: self.base.region, offset }, byte);
    }
}
