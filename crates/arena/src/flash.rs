//! On-chip flash: sector table, the `FlashDriver` seam, and the
//! unlock/erase/program state machine the arena drives through it.
//!
//! Sector boundaries and the reserved-firmware convention are taken
//! directly from the STM32F4 `flash.c` this module is grounded on.

use cart_core::log;
use cart_core::logging::{LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cumulative byte offset at which each of the 24 STM32F4 sectors ends
/// (exclusive), for both 1 MiB and 2 MiB parts.
pub const SECTOR_BOUNDARIES: [u32; 24] = [
    0x0000_4000,
    0x0000_8000,
    0x0000_c000,
    0x0001_0000,
    0x0002_0000,
    0x0004_0000,
    0x0006_0000,
    0x0008_0000,
    0x000a_0000,
    0x000c_0000,
    0x000e_0000,
    0x0010_0000,
    // STM32F42/STM32F43
    0x0010_4000,
    0x0010_8000,
    0x0010_c000,
    0x0011_0000,
    0x0012_0000,
    0x0014_0000,
    0x0016_0000,
    0x0018_0000,
    0x001a_0000,
    0x001c_0000,
    0x001e_0000,
    0x0020_0000,
];

/// Bytes at the bottom of flash reserved for the firmware image itself;
/// the arena never erases or programs inside this range.
pub const RESERVED_FLASH_BYTES: u32 = 64 * 1024;

#[derive(Debug, Error)]
pub enum FlashError {
    #[error("flash erase failed at sector {0}")]
    EraseFailed(u8),
    #[error("flash program failed at offset {0:#x}")]
    ProgramFailed(u32),
    #[error("flash write target out of bounds: {0:#x}")]
    OutOfBounds(u32),
}

/// First sector whose boundary is strictly greater than `offset`.
pub fn sector_id_for_offset(offset: u32) -> Option<u8> {
    SECTOR_BOUNDARIES
        .iter()
        .position(|&boundary| offset < boundary)
        .map(|i| i as u8)
}

pub fn lowest_available_offset() -> u32 {
    RESERVED_FLASH_BYTES
}

/// Byte count available for cartridge use between the reserved firmware
/// region and the top of flash.
pub fn available_flash(flash_size_bytes: u32) -> u32 {
    let highest = flash_size_bytes.saturating_sub(1);
    let lowest = lowest_available_offset();
    let last_reserved_sector = sector_id_for_offset(lowest.saturating_sub(1));
    let highest_available_sector = sector_id_for_offset(highest);
    match (last_reserved_sector, highest_available_sector) {
        (Some(lo), Some(hi)) => SECTOR_BOUNDARIES[hi as usize].saturating_sub(SECTOR_BOUNDARIES[lo as usize]),
        _ => 0,
    }
}

/// Erase/program cursor for a single flash reservation. Append-only:
/// `next_write` only ever increases within the lifetime of one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashContext {
    pub base: u32,
    pub next_write: u32,
}

/// External collaborator: drives the physical flash controller.
/// Production code implements this over register writes; `InMemoryFlash`
/// below gives the host build and tests a faithful stand-in.
pub trait FlashDriver {
    fn flash_size_bytes(&self) -> u32;
    fn unlock(&mut self);
    fn lock(&mut self);
    fn erase_sector(&mut self, id: u8) -> Result<(), FlashError>;
    fn program_word(&mut self, offset: u32, word: u32) -> Result<(), FlashError>;
    fn program_halfword(&mut self, offset: u32, half: u16) -> Result<(), FlashError>;
    fn program_byte(&mut self, offset: u32, byte: u8) -> Result<(), FlashError>;
    fn read_byte(&self, offset: u32) -> u8;
}

/// Reserves the top `size` bytes of flash, erasing every sector the
/// reservation touches. Refuses a reservation that overlaps the
/// firmware-reserved low region.
pub fn prepare_flash(driver: &mut impl FlashDriver, size: u32) -> Result<FlashContext, FlashError> {
    if size == 0 || size > available_flash(driver.flash_size_bytes()) {
        return Err(FlashError::OutOfBounds(size));
    }

    let highest = driver.flash_size_bytes() - 1;
    let first_sector = sector_id_for_offset(highest - size + 1).ok_or(FlashError::OutOfBounds(size))?;
    let last_sector = sector_id_for_offset(highest).ok_or(FlashError::OutOfBounds(size))?;
    let last_reserved_sector =
        sector_id_for_offset(lowest_available_offset().saturating_sub(1)).ok_or(FlashError::OutOfBounds(size))?;

    if first_sector <= last_reserved_sector {
        return Err(FlashError::OutOfBounds(size));
    }

    driver.unlock();
    for sector in first_sector..=last_sector {
        if let Err(e) = driver.erase_sector(sector) {
            driver.lock();
            log!(LogCategory::Flash, LogLevel::Error, "erase failed at sector {sector}: {e}");
            return Err(e);
        }
    }
    driver.lock();

    let base = highest - size + 1;
    log!(LogCategory::Flash, LogLevel::Info, "reserved {size} bytes at {base:#x} (sectors {first_sector}..={last_sector})");
    Ok(FlashContext { base, next_write: base })
}

/// Appends `bytes` to the flash region described by `ctx`, choosing
/// word/halfword/byte programming by alignment exactly as the source
/// driver does, and always re-locking flash on success or error.
pub fn write_flash(driver: &mut impl FlashDriver, bytes: &[u8], ctx: &mut FlashContext) -> Result<(), FlashError> {
    let byte_count = bytes.len() as u32;
    if ctx.next_write < lowest_available_offset() {
        return Err(FlashError::OutOfBounds(ctx.next_write));
    }
    if ctx.next_write + byte_count > driver.flash_size_bytes() {
        return Err(FlashError::OutOfBounds(ctx.next_write + byte_count));
    }

    driver.unlock();

    let result = (|| {
        if ctx.next_write % 4 == 0 && byte_count % 4 == 0 {
            for chunk in bytes.chunks_exact(4) {
                let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                driver.program_word(ctx.next_write, word)?;
                ctx.next_write += 4;
            }
        } else if ctx.next_write % 2 == 0 && byte_count % 2 == 0 {
            for chunk in bytes.chunks_exact(2) {
                let half = u16::from_le_bytes([chunk[0], chunk[1]]);
                driver.program_halfword(ctx.next_write, half)?;
                ctx.next_write += 2;
            }
        } else {
            for &byte in bytes {
                driver.program_byte(ctx.next_write, byte)?;
                ctx.next_write += 1;
            }
        }
        Ok(())
    })();

    driver.lock();
    if let Err(e) = &result {
        log!(LogCategory::Flash, LogLevel::Error, "program failed at {:#x}: {e}", ctx.next_write);
    } else {
        log!(LogCategory::Flash, LogLevel::Debug, "programmed {byte_count} bytes, cursor now {:#x}", ctx.next_write);
    }
    result
}

/// A faithful host-side stand-in for the STM32 flash controller: erase
/// sets a sector's bytes to `0xFF`, and programming can only clear bits
/// (never set a `0` bit back to `1`), matching real NOR flash semantics.
pub struct InMemoryFlash {
    data: Vec<u8>,
    locked: bool,
}

impl InMemoryFlash {
    pub fn new(flash_size_bytes: u32) -> Self {
        Self { data: vec![0xFF; flash_size_bytes as usize], locked: true }
    }
}

impl FlashDriver for InMemoryFlash {
    fn flash_size_bytes(&self) -> u32 {
        self.data.len() as u32
    }

    fn unlock(&mut self) {
        self.locked = false;
    }

    fn lock(&mut self) {
        self.locked = true;
    }

    fn erase_sector(&mut self, id: u8) -> Result<(), FlashError> {
        let start = if id == 0 { 0 } else { SECTOR_BOUNDARIES[id as usize - 1] };
        let end = SECTOR_BOUNDARIES[id as usize];
        self.data[start as usize..end as usize].fill(0xFF);
        Ok(())
    }

    fn program_word(&mut self, offset: u32, word: u32) -> Result<(), FlashError> {
        for (i, byte) in word.to_le_bytes().iter().enumerate() {
            self.program_byte(offset + i as u32, *byte)?;
        }
        Ok(())
    }

    fn program_halfword(&mut self, offset: u32, half: u16) -> Result<(), FlashError> {
        for (i, byte) in half.to_le_bytes().iter().enumerate() {
            self.program_byte(offset + i as u32, *byte)?;
        }
        Ok(())
    }

    fn program_byte(&mut self, offset: u32, byte: u8) -> Result<(), FlashError> {
        let slot = self
            .data
            .get_mut(offset as usize)
            .ok_or(FlashError::ProgramFailed(offset))?;
        *slot &= byte;
        Ok(())
    }

    fn read_byte(&self, offset: u32) -> u8 {
        self.data[offset as usize]
    }
}
