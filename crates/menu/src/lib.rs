//! Menu/Firmware Cartridge: a fixed 4 KiB ROM with a mailbox, status
//! bytes, and a command protocol the 6502-side menu program uses to
//! tell the MCU which file to mount.
//!
//! Grounded on `cartridge_firmware.c`; the 7800 guard (mailbox/status
//! disabled until a write to `$1FF4` is observed) is an addition named
//! explicitly in the specification this crate implements, with no
//! counterpart in the original source.

pub mod directory;

use cart_core::bus::{respond, BusPins, StableAddressSampler, Three};
use cart_core::A12;

pub const CART_CMD_SEL_ITEM_N: u16 = 0x1E00;
pub const CART_CMD_ROOT_DIR: u16 = 0x1EF0;
pub const CART_CMD_START_CART: u16 = 0x1EFF;
pub const CART_STATUS_BYTES: u16 = 0x1FE0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvMode {
    Ntsc,
    Pal,
    Pal60,
}

/// A placeholder 4 KiB firmware image: the real assembled 6502 menu
/// program is outside this crate's scope, but the overlay logic below
/// is fully exercised against a fixed-content stand-in, with the reset
/// vector's low byte tagging which TV mode produced it.
fn placeholder_firmware(mode: TvMode) -> [u8; 4096] {
    let mut rom = [0xEAu8; 4096]; // NOP-equivalent filler
    let tag = match mode {
        TvMode::Ntsc => 0x01,
        TvMode::Pal => 0x02,
        TvMode::Pal60 => 0x03,
    };
    rom[4095] = tag;
    rom
}

pub struct MenuCartridge {
    menu_ram: [u8; 1024],
    menu_status: [u8; 16],
    firmware: [u8; 4096],
    tv_mode: TvMode,
    guard_unlocked: bool,
}

impl MenuCartridge {
    pub fn new(tv_mode: TvMode) -> Self {
        Self {
            menu_ram: [0; 1024],
            menu_status: [0; 16],
            firmware: placeholder_firmware(tv_mode),
            tv_mode,
            guard_unlocked: false,
        }
    }

    pub fn tv_mode(&self) -> TvMode {
        self.tv_mode
    }

    pub fn set_tv_mode(&mut self, mode: TvMode) {
        self.firmware = placeholder_firmware(mode);
        self.tv_mode = mode;
    }

    pub fn set_menu_status_msg(&mut self, message: &str) {
        let bytes = message.as_bytes();
        let len = bytes.len().min(15);
        self.menu_status[..len].copy_from_slice(&bytes[..len]);
        for slot in self.menu_status[len..15].iter_mut() {
            *slot = 0;
        }
    }

    pub fn set_menu_status_byte(&mut self, status_byte: u8) {
        self.menu_status[15] = status_byte;
    }

    pub fn menu_ram(&mut self) -> &mut [u8; 1024] {
        &mut self.menu_ram
    }

    /// True once the 7800 write-guard has been satisfied and the
    /// mailbox/status overlays are live.
    pub fn guard_unlocked(&self) -> bool {
        self.guard_unlocked
    }

    fn decode(&self, addr: u16) -> u8 {
        if self.guard_unlocked && addr >= 0x1800 && addr < 0x1C00 {
            self.menu_ram[(addr & 0x3FF) as usize]
        } else if self.guard_unlocked && (addr & 0x1FF0) == CART_STATUS_BYTES {
            self.menu_status[(addr & 0xF) as usize]
        } else {
            self.firmware[(addr & 0xFFF) as usize]
        }
    }

    /// Runs the menu loop until the console sends a command word
    /// (`$1E00..$1EFE`, `$1EF0`, or `$1EFF`), then returns it.
    pub fn run(&mut self, bus: &mut impl BusPins) -> u16 {
        loop {
            let addr = Three::sample(bus);
            if addr & A12 == 0 {
                continue;
            }
            if (addr & 0x1F00) == 0x1E00 {
                return addr;
            }
            if addr == 0x1FF4 {
                self.guard_unlocked = true;
            }
            let byte = self.decode(addr);
            respond(bus, addr, byte);
        }
    }

    /// Sets the "booting into cartridge" status byte and runs the menu
    /// until the console selects `CART_CMD_START_CART`.
    pub fn reboot_into_cartridge(&mut self, bus: &mut impl BusPins) -> bool {
        self.set_menu_status_byte(1);
        self.run(bus) == CART_CMD_START_CART
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A scripted bus for menu tests: replays a fixed address sequence,
    /// with no data bus traffic needed since the menu never reads writes.
    struct ScriptedBus {
        addrs: Vec<u16>,
        pos: usize,
    }

    impl ScriptedBus {
        fn new(addrs: Vec<u16>) -> Self {
            Self { addrs, pos: 0 }
        }
    }

    impl BusPins for ScriptedBus {
        fn sample_addr(&mut self) -> u16 {
            let a = self.addrs[self.pos.min(self.addrs.len() - 1)];
            if self.pos < self.addrs.len() - 1 {
                self.pos += 1;
            }
            a
        }
        fn sample_data(&mut self) -> u8 {
            0
        }
        fn drive_data(&mut self, _: u8) {}
        fn release_data(&mut self) {}
    }

    fn stable(addr: u16) -> Vec<u16> {
        vec![addr, addr, addr]
    }

    #[test]
    fn status_message_is_truncated_to_fifteen_bytes_and_byte_fifteen_is_separate() {
        let mut menu = MenuCartridge::new(TvMode::Ntsc);
        menu.set_menu_status_msg("THIS MESSAGE IS DEFINITELY TOO LONG");
        menu.set_menu_status_byte(7);
        assert_eq!(menu.menu_status[15], 7);
        assert_eq!(&menu.menu_status[..15], b"THIS MESSAGE IS");
    }

    #[test]
    fn guard_blocks_mailbox_until_1ff4_is_observed() {
        let mut menu = MenuCartridge::new(TvMode::Ntsc);
        menu.menu_ram()[0] = 0x99;

        // Before the guard write: reading $1800 returns firmware ROM, not mailbox.
        assert_eq!(menu.decode(0x1800), menu.firmware[0x800]);

        // simulate the guard-triggering access.
        let mut bus = ScriptedBus::new(stable(0x1FF4));
        // A direct call into run() would loop forever waiting for a command,
        // so drive the guard through the same path run() uses.
        let addr = Three::sample(&mut bus);
        assert_eq!(addr, 0x1FF4);
        if addr == 0x1FF4 {
            menu.guard_unlocked = true;
        }

        assert_eq!(menu.decode(0x1800), 0x99);
    }

    #[test]
    fn run_returns_the_command_word() {
        let mut bus = ScriptedBus::new(vec![0x1E00, 0x1E00, 0x1EFF, 0x1EFF, 0x1EFF]);
        let mut menu = MenuCartridge::new(TvMode::Ntsc);
        let cmd = menu.run(&mut bus);
        assert_eq!(cmd, CART_CMD_START_CART);
    }

    #[test]
    fn different_tv_modes_select_different_firmware() {
        let ntsc = MenuCartridge::new(TvMode::Ntsc);
        let pal = MenuCartridge::new(TvMode::Pal);
        assert_ne!(ntsc.firmware[4095], pal.firmware[4095]);
    }
}
