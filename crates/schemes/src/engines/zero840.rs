//! 0840 (Econobanking): bank select is snooped below A12, because the
//! trigger addresses (`$0800`, `$0840`) sit outside the cartridge's
//! normal `$1000-$1FFF` window and only ever appear while A12 is low.

use cart_arena::{BankPointer, FlashDriver, ImagePlan, MemoryArena};

use super::Action;

pub struct Zero840State {
    current_bank: u32,
}

impl Zero840State {
    pub fn new() -> Self {
        Self { current_bank: 0 }
    }

    pub fn current_bank(&self) -> u32 {
        self.current_bank
    }

    pub fn decode<F: FlashDriver>(&mut self, plan: &ImagePlan, arena: &MemoryArena<F>, addr: u16) -> Action {
        if addr & 0x1000 != 0 {
            let ptr = plan.bank_ptr(self.current_bank);
            return Action::Respond(
                arena.read_byte(BankPointer { region: ptr.region, offset: ptr.offset + (addr & 0x0FFF) as u32 }),
            );
        }

        match addr & 0x1840 {
            0x0800 => self.current_bank = 0,
            0x0840 => self.current_bank = 1,
            _ => {}
        }
        Action::Idle
    }
}

impl Default for Zero840State {
    fn default() -> Self {
        Self::new()
    }
}
