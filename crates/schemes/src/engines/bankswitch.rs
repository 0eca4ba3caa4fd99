//! The "hotspot" bank-switch family: F8, F6, F4, EF and their SC (RAM)
//! variants, FA, F0, and the unbanked 2K/4K images. All of these pick
//! a bank by the address alone; only FE needs the extra post-trigger
//! data-bus peek, so it gets its own small state machine below.

use cart_arena::{BankPointer, FlashDriver, ImagePlan, MemoryArena};
use cart_core::log;
use cart_core::logging::{LogCategory, LogLevel};

use super::{Action, RamWindow};

/// Parameters for a contiguous-hotspot scheme: bank `i` is selected by
/// accessing `trigger_base + i`, for `i` in `0..bank_count`.
#[derive(Debug, Clone, Copy)]
pub struct Hotspots {
    pub trigger_base: u16,
    pub bank_count: u32,
}

pub struct BankSwitchState {
    current_bank: u32,
    ram: Option<RamWindow>,
}

impl BankSwitchState {
    pub fn new(ram: Option<RamWindow>) -> Self {
        Self { current_bank: 0, ram }
    }

    pub fn current_bank(&self) -> u32 {
        self.current_bank
    }

    pub fn decode<F: FlashDriver>(
        &mut self,
        hotspots: &Hotspots,
        plan: &ImagePlan,
        arena: &MemoryArena<F>,
        addr: u16,
    ) -> Action {
        if addr >= hotspots.trigger_base && addr < hotspots.trigger_base + hotspots.bank_count as u16 {
            self.current_bank = (addr - hotspots.trigger_base) as u32;
            log!(LogCategory::Scheme, LogLevel::Debug, "bank switch: now on bank {}", self.current_bank);
        }

        if let Some(ram) = &self.ram {
            if ram.is_write(addr) {
                return Action::Capture;
            }
            if ram.is_read(addr) {
                return Action::Respond(ram.read(arena, addr));
            }
        }

        if addr < 0x1000 {
            return Action::Idle;
        }
        let ptr = plan.bank_ptr(self.current_bank);
        let byte = arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr & 0x0FFF) as u32 });
        Action::Respond(byte)
    }

    pub fn apply_write<F: FlashDriver>(&mut self, arena: &mut MemoryArena<F>, addr: u16, byte: u8) {
        if let Some(ram) = &mut self.ram {
            if ram.is_write(addr) {
                ram.write(arena, addr, byte);
            }
        }
    }
}

/// F0 (Dynacom Megaboy): any access to `$1FF0` advances the bank,
/// wrapping after 16; no direct-select hotspots.
pub struct F0State {
    current_bank: u32,
}

impl F0State {
    pub fn new() -> Self {
        Self { current_bank: 0 }
    }

    pub fn current_bank(&self) -> u32 {
        self.current_bank
    }

    pub fn decode<F: FlashDriver>(&mut self, plan: &ImagePlan, arena: &MemoryArena<F>, addr: u16) -> Action {
        if addr == 0x1FF0 {
            self.current_bank = (self.current_bank + 1) % 16;
        }
        if addr < 0x1000 {
            return Action::Idle;
        }
        let ptr = plan.bank_ptr(self.current_bank);
        let byte = arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr & 0x0FFF) as u32 });
        Action::Respond(byte)
    }
}

impl Default for F0State {
    fn default() -> Self {
        Self::new()
    }
}

/// FE (Activision): the bank select is the *next* data-bus value's bit
/// 5 after any access to `$01FE`, so the trigger and the switch happen
/// one bus cycle apart.
pub struct FeState {
    current_bank: u32,
    armed: bool,
}

impl FeState {
    pub fn new() -> Self {
        Self { current_bank: 0, armed: false }
    }

    pub fn current_bank(&self) -> u32 {
        self.current_bank
    }

    /// Called on every stable address; arms the latch on `$01FE`.
    pub fn note_address(&mut self, addr: u16) {
        if addr == 0x01FE {
            self.armed = true;
        }
    }

    /// Called with the data byte observed on the cycle after arming;
    /// selects bank 0 if bit 5 is set, bank 1 otherwise.
    pub fn latch_from_data(&mut self, data: u8) {
        if self.armed {
            self.current_bank = if data & 0x20 != 0 { 0 } else { 1 };
            self.armed = false;
        }
    }

    pub fn decode<F: FlashDriver>(&self, plan: &ImagePlan, arena: &MemoryArena<F>, addr: u16) -> Action {
        if addr < 0x1000 {
            return Action::Idle;
        }
        let ptr = plan.bank_ptr(self.current_bank);
        let byte = arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr & 0x0FFF) as u32 });
        Action::Respond(byte)
    }
}

impl Default for FeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_arena::{plan, InMemoryFlash};

    fn arena_with_banks(bank_count: u32) -> (ImagePlan, MemoryArena<InMemoryFlash>) {
        arena_with_banks_and_ram(bank_count, 0)
    }

    fn arena_with_banks_and_ram(bank_count: u32, writable_banks: u32) -> (ImagePlan, MemoryArena<InMemoryFlash>) {
        let bank_size = 4096u32;
        let image_plan = plan(bank_count * bank_size, bank_size, Some(writable_banks)).unwrap();
        let mut arena = MemoryArena::new(InMemoryFlash::new(0));
        for bank in 0..bank_count {
            let ptr = image_plan.bank_ptr(bank);
            for off in 0..bank_size {
                arena.write_byte(BankPointer { region: ptr.region, offset: ptr.offset + off }, bank as u8);
            }
        }
        (image_plan, arena)
    }

    #[test]
    fn f8_selects_bank_by_hotspot_and_serves_bytes_from_it() {
        let (plan, arena) = arena_with_banks(2);
        let hs = Hotspots { trigger_base: 0x1FF8, bank_count: 2 };
        let mut state = BankSwitchState::new(None);

        assert_eq!(state.decode(&hs, &plan, &arena, 0x1FF9), Action::Respond(0));
        assert_eq!(state.current_bank(), 1);
        assert_eq!(state.decode(&hs, &plan, &arena, 0x1000), Action::Respond(1));
    }

    #[test]
    fn f8sc_ram_window_shadows_the_rom_read_range() {
        let (plan, mut arena) = arena_with_banks_and_ram(2, 1);
        let hs = Hotspots { trigger_base: 0x1FF8, bank_count: 2 };
        let ram_base = plan.bank_ptr(plan.rom_bank_count());
        let ram = RamWindow::new(0x1000, 0x107F, 0x1080, 0x10FF, ram_base);
        let mut state = BankSwitchState::new(Some(ram));

        assert_eq!(state.decode(&hs, &plan, &arena, 0x1000), Action::Capture);
        state.apply_write(&mut arena, 0x1000, 0x42);
        assert_eq!(state.decode(&hs, &plan, &arena, 0x1080), Action::Respond(0x42));
    }

    #[test]
    fn f0_wraps_bank_after_sixteen_accesses() {
        let (plan, arena) = arena_with_banks(16);
        let mut state = F0State::new();
        for _ in 0..16 {
            state.decode(&plan, &arena, 0x1FF0);
        }
        assert_eq!(state.current_bank(), 0);
    }

    #[test]
    fn fe_latches_bank_from_the_cycle_after_01fe() {
        let mut state = FeState::new();
        state.note_address(0x01FE);
        state.latch_from_data(0b0010_0000);
        assert_eq!(state.current_bank(), 0);

        state.note_address(0x01FE);
        state.latch_from_data(0x00);
        assert_eq!(state.current_bank(), 1);
    }
}
