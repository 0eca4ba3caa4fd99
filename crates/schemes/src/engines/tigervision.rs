//! 3F (Tigervision) and 3E/3EX (3F plus switchable RAM banks).
//!
//! Both schemes select their bank through a write below A12 — `$0000`
//! through `$003F` for 3F, the single addresses `$003E`/`$003F` for
//! 3E/3EX — so the engine always captures those accesses and updates
//! state from the captured byte rather than from the address alone.

use cart_arena::{BankPointer, FlashDriver, ImagePlan, MemoryArena};

use super::Action;

pub struct ThreeFState {
    bank_count: u32,
    current_bank: u32,
}

impl ThreeFState {
    pub fn new(bank_count: u32) -> Self {
        Self { bank_count, current_bank: 0 }
    }

    pub fn current_bank(&self) -> u32 {
        self.current_bank
    }

    pub fn decode<F: FlashDriver>(&self, plan: &ImagePlan, arena: &MemoryArena<F>, addr: u16) -> Action {
        if addr <= 0x003F {
            return Action::Capture;
        }
        if addr < 0x1000 {
            return Action::Idle;
        }
        let bank = if addr < 0x1800 { self.current_bank } else { self.bank_count - 1 };
        let base = if addr < 0x1800 { 0x1000 } else { 0x1800 };
        let ptr = plan.bank_ptr(bank);
        Action::Respond(arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr - base) as u32 }))
    }

    pub fn apply_write(&mut self, addr: u16, byte: u8) {
        if addr <= 0x003F {
            self.current_bank = byte as u32 % self.bank_count;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Rom(u32),
    Ram(u32),
}

pub struct ThreeEState {
    rom_banks: u32,
    ram_bank_count: u32,
    ram_base: BankPointer,
    window: Window,
}

impl ThreeEState {
    /// `ram_base` is the first of `ram_bank_count` contiguous 1 KiB
    /// writable Buffer banks the dispatcher's `plan()` set aside.
    pub fn new(rom_banks: u32, ram_bank_count: u32, ram_base: BankPointer) -> Self {
        Self { rom_banks, ram_bank_count, ram_base, window: Window::Rom(0) }
    }

    fn ram_ptr(&self, bank: u32, local_offset: u32) -> BankPointer {
        BankPointer { region: self.ram_base.region, offset: self.ram_base.offset + bank * 1024 + local_offset }
    }

    pub fn decode<F: FlashDriver>(&self, plan: &ImagePlan, arena: &MemoryArena<F>, addr: u16) -> Action {
        if addr == 0x003E || addr == 0x003F {
            return Action::Capture;
        }
        if addr >= 0x1800 && addr < 0x2000 {
            let ptr = plan.bank_ptr(self.rom_banks - 1);
            return Action::Respond(
                arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr - 0x1800) as u32 }),
            );
        }
        if addr < 0x1000 || addr >= 0x1800 {
            return Action::Idle;
        }
        match self.window {
            Window::Rom(bank) => {
                let ptr = plan.bank_ptr(bank);
                Action::Respond(
                    arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr - 0x1000) as u32 }),
                )
            }
            Window::Ram(bank) => {
                if addr < 0x1400 {
                    Action::Respond(arena.read_byte(self.ram_ptr(bank, (addr - 0x1000) as u32)))
                } else {
                    Action::Capture
                }
            }
        }
    }

    pub fn apply_write<F: FlashDriver>(&mut self, arena: &mut MemoryArena<F>, addr: u16, byte: u8) {
        match addr {
            0x003F => self.window = Window::Rom(byte as u32 % self.rom_banks),
            0x003E => self.window = Window::Ram(byte as u32 % self.ram_bank_count),
            0x1400..=0x17FF => {
                if let Window::Ram(bank) = self.window {
                    let ptr = self.ram_ptr(bank, (addr - 0x1400) as u32);
                    arena.write_byte(ptr, byte);
                }
            }
            _ => {}
        }
    }
}
