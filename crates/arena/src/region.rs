//! Tiered memory arena: HotRam (zero-wait-state), Buffer (staging +
//! cartridge RAM), and Flash, plus the plan that assigns image banks
//! across them.

use crate::flash::{self, FlashContext, FlashDriver};
use cart_core::CartError;
use serde::{Deserialize, Serialize};

/// Zero-wait-state RAM capacity (STM32 CCM equivalent).
pub const HOT_CAPACITY: usize = 64 * 1024;
/// General RAM used for image staging and, for some schemes, as
/// cartridge RAM banks.
pub const BUFFER_CAPACITY: usize = 96 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    HotRam,
    Buffer,
    Flash,
}

/// A region-relative stand-in for a raw flash/RAM pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankPointer {
    pub region: Region,
    pub offset: u32,
}

/// How a loaded image is tiered across the three regions: bank `i`
/// lives at `banks[i]`, in the order HotRam, then Buffer, then Flash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePlan {
    pub total_size: u32,
    pub bank_size: u32,
    pub bank_count: u32,
    banks: Vec<(Region, u32, bool)>,
}

impl ImagePlan {
    pub fn bank_ptr(&self, bank_index: u32) -> BankPointer {
        let (region, offset, _) = self.banks[bank_index as usize];
        BankPointer { region, offset }
    }

    pub fn bank_writable(&self, bank_index: u32) -> bool {
        self.banks[bank_index as usize].2
    }

    /// Number of banks the ROM image itself occupies, i.e. every bank
    /// before the writable (RAM) banks `writable_banks` appended.
    pub fn rom_bank_count(&self) -> u32 {
        (self.total_size + self.bank_size - 1) / self.bank_size
    }
}

/// Greedily assigns the ROM image's banks to HotRam first, then Buffer,
/// then Flash, then appends `writable_banks` extra Buffer banks for an
/// engine that needs cartridge RAM (SC/FA's RAM window, CV, 3E, E7):
/// those always land in Buffer, contiguous and writable, since Flash
/// can't be written outside the loader's erase/program cycle and HotRam
/// is reserved for the image's own hottest banks.
pub fn plan(image_size: u32, bank_size: u32, writable_banks: Option<u32>) -> Result<ImagePlan, CartError> {
    if image_size == 0 {
        return Err(CartError::PlacementError("zero-size image".into()));
    }

    let rom_bank_count = (image_size + bank_size - 1) / bank_size;
    let hot_banks_cap = HOT_CAPACITY as u32 / bank_size;
    let buffer_banks_cap = BUFFER_CAPACITY as u32 / bank_size;

    let hot_count = rom_bank_count.min(hot_banks_cap);
    let remaining = rom_bank_count - hot_count;
    let buffer_count = remaining.min(buffer_banks_cap);
    let flash_count = remaining - buffer_count;

    let writable_count = writable_banks.unwrap_or(0);
    let buffer_remaining_cap = buffer_banks_cap.saturating_sub(buffer_count);
    if writable_count > buffer_remaining_cap {
        return Err(CartError::PlacementError(format!(
            "image needs {writable_count} writable bank(s) but only {buffer_remaining_cap} Buffer bank(s) remain"
        )));
    }

    let mut banks = Vec::with_capacity((rom_bank_count + writable_count) as usize);
    for i in 0..hot_count {
        banks.push((Region::HotRam, i * bank_size, false));
    }
    for i in 0..buffer_count {
        banks.push((Region::Buffer, i * bank_size, false));
    }
    for i in 0..flash_count {
        banks.push((Region::Flash, i * bank_size, false));
    }
    for i in 0..writable_count {
        banks.push((Region::Buffer, (buffer_count + i) * bank_size, true));
    }

    Ok(ImagePlan { total_size: image_size, bank_size, bank_count: rom_bank_count + writable_count, banks })
}

/// Owns all three regions; engines hold read-only views resolved
/// through [`ImagePlan::bank_ptr`], never raw pointers into it.
pub struct MemoryArena<F: FlashDriver> {
    hot: Vec<u8>,
    buffer: Vec<u8>,
    flash_driver: F,
    flash_ctx: Option<FlashContext>,
}

impl<F: FlashDriver> MemoryArena<F> {
    pub fn new(flash_driver: F) -> Self {
        Self {
            hot: vec![0; HOT_CAPACITY],
            buffer: vec![0; BUFFER_CAPACITY],
            flash_driver,
            flash_ctx: None,
        }
    }

    pub fn available_flash(&self) -> u32 {
        flash::available_flash(self.flash_driver.flash_size_bytes())
    }

    pub fn prepare_flash(&mut self, size: u32) -> Result<(), CartError> {
        let ctx = flash::prepare_flash(&mut self.flash_driver, size)
            .map_err(|e| CartError::FlashError(e.to_string()))?;
        self.flash_ctx = Some(ctx);
        Ok(())
    }

    pub fn write_flash(&mut self, bytes: &[u8]) -> Result<(), CartError> {
        let ctx = self
            .flash_ctx
            .as_mut()
            .ok_or_else(|| CartError::FlashError("write_flash called without a prepared context".into()))?;
        flash::write_flash(&mut self.flash_driver, bytes, ctx).map_err(|e| CartError::FlashError(e.to_string()))
    }

    pub fn hot_mut(&mut self) -> &mut [u8] {
        &mut self.hot
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn read_byte(&self, ptr: BankPointer) -> u8 {
        match ptr.region {
            Region::HotRam => self.hot[ptr.offset as usize],
            Region::Buffer => self.buffer[ptr.offset as usize],
            Region::Flash => self.flash_driver.read_byte(ptr.offset),
        }
    }

    /// Writes to HotRam or Buffer only; Flash is read-only outside the
    /// loader's erase/program cycle.
    pub fn write_byte(&mut self, ptr: BankPointer, value: u8) {
        match ptr.region {
            Region::HotRam => self.hot[ptr.offset as usize] = value,
            Region::Buffer => self.buffer[ptr.offset as usize] = value,
            Region::Flash => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::InMemoryFlash;

    #[test]
    fn plan_places_small_image_entirely_in_hot_ram() {
        let p = plan(4096, 4096, None).unwrap();
        assert_eq!(p.bank_count, 1);
        assert_eq!(p.bank_ptr(0).region, Region::HotRam);
    }

    #[test]
    fn plan_spills_into_buffer_then_flash() {
        // bank_size 4096: 16 hot banks, 24 buffer banks, rest flash.
        let bank_size = 4096;
        let total_banks = 50u32;
        let p = plan(total_banks * bank_size, bank_size, None).unwrap();
        assert_eq!(p.bank_ptr(0).region, Region::HotRam);
        assert_eq!(p.bank_ptr(15).region, Region::HotRam);
        assert_eq!(p.bank_ptr(16).region, Region::Buffer);
        assert_eq!(p.bank_ptr(39).region, Region::Buffer);
        assert_eq!(p.bank_ptr(40).region, Region::Flash);
    }

    #[test]
    fn plan_rejects_zero_size_image() {
        assert!(plan(0, 4096, None).is_err());
    }

    #[test]
    fn plan_appends_writable_buffer_banks_for_cartridge_ram() {
        // 1 hot bank, then 2 writable (RAM) banks right after it.
        let p = plan(4096, 4096, Some(2)).unwrap();
        assert_eq!(p.bank_count, 3);
        assert!(!p.bank_writable(0));
        assert_eq!(p.bank_ptr(0).region, Region::HotRam);
        assert!(p.bank_writable(1));
        assert!(p.bank_writable(2));
        assert_eq!(p.bank_ptr(1).region, Region::Buffer);
        assert_eq!(p.bank_ptr(2).region, Region::Buffer);
        assert_eq!(p.bank_ptr(2).offset - p.bank_ptr(1).offset, 4096);
    }

    #[test]
    fn plan_rejects_more_writable_banks_than_buffer_can_hold() {
        let bank_size = 4096;
        // Every Buffer bank is already spoken for by the ROM image;
        // there's no room left for an extra writable bank.
        let buffer_banks = (BUFFER_CAPACITY as u32) / bank_size;
        let hot_banks = (HOT_CAPACITY as u32) / bank_size;
        let image_size = (hot_banks + buffer_banks) * bank_size;
        assert!(plan(image_size, bank_size, Some(1)).is_err());
    }

    #[test]
    fn arena_round_trips_hot_ram_bytes() {
        let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
        arena.hot_mut()[10] = 0xAB;
        let ptr = BankPointer { region: Region::HotRam, offset: 10 };
        assert_eq!(arena.read_byte(ptr), 0xAB);
    }

    #[test]
    fn arena_flash_round_trip_through_prepare_write() {
        let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
        arena.prepare_flash(4096).unwrap();
        let payload = vec![0x5Au8; 4096];
        arena.write_flash(&payload).unwrap();

        let p = plan(4096, 4096, None).unwrap();
        // a fresh plan() call doesn't know the previous reservation's
        // base address; this test only exercises the arena's own
        // read-after-write path using the context's resulting base.
        let ptr = BankPointer { region: Region::Flash, offset: 0x0010_0000 - 4096 };
        assert_eq!(arena.read_byte(ptr), 0x5A);
        let _ = p;
    }
}
