//! Scheme engines: the bus-response loops for every cartridge banking
//! scheme, plus the boot-time classifier that picks one.

pub mod dispatcher;
pub mod engines;

pub use dispatcher::classify;

use cart_arena::{BankPointer, FlashDriver, ImagePlan, MemoryArena};
use cart_core::bus::{capture_write, respond, BusPins, StableAddressSampler, Three, Two};
use serde::{Deserialize, Serialize};

use engines::bankswitch::{BankSwitchState, FeState, Hotspots, F0State};
use engines::cv::CvState;
use engines::dpc::DpcState;
use engines::e0::E0State;
use engines::e7::E7State;
use engines::supercharger::{MultiloadSource, SuperchargerState};
use engines::tigervision::{ThreeEState, ThreeFState};
use engines::zero840::Zero840State;
use engines::{Action, RamWindow};

/// One cartridge banking scheme, carrying only the parameters its
/// engine needs. Constructed by the dispatcher (from size/content
/// heuristics) or directly by a caller that already knows the format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scheme {
    TwoK,
    FourK,
    /// F8, F6, F4, EF and their SC variants: a contiguous hotspot range
    /// picks the bank, with an optional 128-byte SC RAM window.
    Fx { hotspot_base: u16, bank_count: u32, sc_ram: bool },
    Fa,
    F0,
    Fe,
    ThreeF { bank_count: u32 },
    ThreeE { rom_banks: u32, ram_banks: u32 },
    E0 { bank_count: u32 },
    Zero840,
    Cv,
    E7 { bank_count: u32 },
    Dpc { display_data: Vec<u8> },
    Supercharger { bios: Vec<u8> },
}

impl Scheme {
    pub fn fx(hotspot_base: u16, bank_count: u32, sc_ram: bool) -> Self {
        Scheme::Fx { hotspot_base, bank_count, sc_ram }
    }

    /// Whether this scheme needs the three-sample stable-address form:
    /// every 2 KiB-bank scheme, since their narrower windows make them
    /// the ones 7800-compatibility and glitch-rejection matter most for.
    fn needs_three_sample(&self) -> bool {
        matches!(self, Scheme::ThreeF { .. } | Scheme::ThreeE { .. })
    }

    /// How many bytes of cartridge RAM this scheme needs the dispatcher
    /// to set aside as writable Buffer banks. Zero for schemes that only
    /// ever read ROM.
    pub fn ram_bytes_needed(&self) -> u32 {
        match self {
            Scheme::Fx { sc_ram: true, .. } => 128,
            Scheme::Fa => 256,
            Scheme::Cv => 1024,
            Scheme::ThreeE { ram_banks, .. } => ram_banks * 1024,
            Scheme::E7 { .. } => 2048,
            _ => 0,
        }
    }
}

fn sc_ram_window(ram_base: BankPointer) -> RamWindow {
    RamWindow::new(0x1000, 0x107F, 0x1080, 0x10FF, ram_base)
}

fn fa_ram_window(ram_base: BankPointer) -> RamWindow {
    RamWindow::new(0x1000, 0x10FF, 0x1100, 0x11FF, ram_base)
}

/// Runs a scheme's bus-response loop to completion. On real hardware
/// this never returns; in the simulation harness it returns once
/// `BusPins::simulation_exhausted` reports true.
#[allow(clippy::too_many_lines)]
pub fn run<F: FlashDriver>(
    scheme: &Scheme,
    plan: &ImagePlan,
    arena: &mut MemoryArena<F>,
    bus: &mut impl BusPins,
    multiload: Option<&dyn MultiloadSource>,
) {
    fn sample_stable(scheme: &Scheme, bus: &mut impl BusPins) -> u16 {
        if scheme.needs_three_sample() {
            Three::sample(bus)
        } else {
            Two::sample(bus)
        }
    }

    match scheme {
        Scheme::TwoK => loop {
            if bus.simulation_exhausted() {
                return;
            }
            let addr = sample_stable(scheme, bus);
            if addr < 0x1000 {
                continue;
            }
            let ptr = plan.bank_ptr(0);
            respond(bus, addr, arena.read_byte(cart_arena::BankPointer { region: ptr.region, offset: ptr.offset + (addr & 0x07FF) as u32 }));
        },

        Scheme::FourK => loop {
            if bus.simulation_exhausted() {
                return;
            }
            let addr = sample_stable(scheme, bus);
            if addr < 0x1000 {
                continue;
            }
            let ptr = plan.bank_ptr(0);
            respond(bus, addr, arena.read_byte(cart_arena::BankPointer { region: ptr.region, offset: ptr.offset + (addr & 0x0FFF) as u32 }));
        },

        Scheme::Fx { hotspot_base, bank_count, sc_ram } => {
            let ram = if *sc_ram {
                Some(sc_ram_window(plan.bank_ptr(plan.rom_bank_count())))
            } else {
                None
            };
            let mut state = BankSwitchState::new(ram);
            let hotspots = Hotspots { trigger_base: *hotspot_base, bank_count: *bank_count };
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                match state.decode(&hotspots, plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(arena, addr, byte);
                    }
                }
            }
        }

        Scheme::Fa => {
            let ram_base = plan.bank_ptr(plan.rom_bank_count());
            let mut state = BankSwitchState::new(Some(fa_ram_window(ram_base)));
            let hotspots = Hotspots { trigger_base: 0x1FF8, bank_count: 3 };
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                match state.decode(&hotspots, plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(arena, addr, byte);
                    }
                }
            }
        }

        Scheme::F0 => {
            let mut state = F0State::new();
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                if let Action::Respond(byte) = state.decode(plan, arena, addr) {
                    respond(bus, addr, byte);
                }
            }
        }

        Scheme::Fe => {
            let mut state = FeState::new();
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                state.note_address(addr);
                state.latch_from_data(bus.sample_data());
                if let Action::Respond(byte) = state.decode(plan, arena, addr) {
                    respond(bus, addr, byte);
                }
            }
        }

        Scheme::ThreeF { bank_count } => {
            let mut state = ThreeFState::new(*bank_count);
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                match state.decode(plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(addr, byte);
                    }
                }
            }
        }

        Scheme::ThreeE { rom_banks, ram_banks } => {
            let ram_base = plan.bank_ptr(plan.rom_bank_count());
            let mut state = ThreeEState::new(*rom_banks, *ram_banks, ram_base);
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                match state.decode(plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(arena, addr, byte);
                    }
                }
            }
        }

        Scheme::E0 { bank_count } => {
            let mut state = E0State::new(*bank_count);
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                if let Action::Respond(byte) = state.decode(plan, arena, addr) {
                    respond(bus, addr, byte);
                }
            }
        }

        Scheme::Zero840 => {
            let mut state = Zero840State::new();
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                if let Action::Respond(byte) = state.decode(plan, arena, addr) {
                    respond(bus, addr, byte);
                }
            }
        }

        Scheme::Cv => {
            let ram_base = plan.bank_ptr(plan.rom_bank_count());
            let mut state = CvState::new(ram_base);
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                match state.decode(plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(arena, addr, byte);
                    }
                }
            }
        }

        Scheme::E7 { bank_count } => {
            let ram_base = plan.bank_ptr(plan.rom_bank_count());
            let mut state = E7State::new(*bank_count, ram_base);
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                match state.decode(plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(arena, addr, byte);
                    }
                }
            }
        }

        Scheme::Dpc { display_data } => {
            let mut state = DpcState::new(display_data.clone());
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                if addr < 0x1000 {
                    // Snooping range: this is also where a real DPC cart
                    // watches for the zero-page-store free-cycle pattern.
                    state.tick(bus.sample_data());
                    continue;
                }
                match state.decode(plan, arena, addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(addr, byte);
                    }
                }
            }
        }

        Scheme::Supercharger { bios } => {
            let mut bios_arr = [0u8; 2048];
            let n = bios.len().min(2048);
            bios_arr[..n].copy_from_slice(&bios[..n]);
            let mut state = SuperchargerState::new(bios_arr);
            loop {
                if bus.simulation_exhausted() {
                    return;
                }
                let addr = sample_stable(scheme, bus);
                if addr == 0x1FF9 {
                    if let Some(source) = multiload {
                        state.maybe_reload(bus, source);
                    }
                }
                match state.decode(addr) {
                    Action::Idle => {}
                    Action::Respond(byte) => respond(bus, addr, byte),
                    Action::Capture => {
                        let byte = capture_write(bus, addr);
                        state.apply_write(addr, byte);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_arena::{plan, BankPointer, InMemoryFlash};

    /// Replays a fixed address/data script; once it runs out, samples
    /// settle into runs of three identical sentinel addresses (so the
    /// two- and three-sample stabilizers both latch), then switch to
    /// the other sentinel (so any "wait for the address to change"
    /// loop still terminates), until `limit` total samples have been
    /// taken and the bus reports itself exhausted.
    struct ScriptedBus {
        addrs: Vec<u16>,
        data: Vec<u8>,
        pos: usize,
        limit: usize,
    }

    impl ScriptedBus {
        fn new(addrs: Vec<u16>, limit: usize) -> Self {
            Self { addrs, data: vec![0], pos: 0, limit }
        }
    }

    impl BusPins for ScriptedBus {
        fn sample_addr(&mut self) -> u16 {
            let a = if self.pos < self.addrs.len() {
                self.addrs[self.pos]
            } else {
                let tail = self.pos - self.addrs.len();
                if (tail / 3) % 2 == 0 {
                    0x0AAA
                } else {
                    0x0BBB
                }
            };
            self.pos += 1;
            a
        }
        fn sample_data(&mut self) -> u8 {
            self.data[0]
        }
        fn drive_data(&mut self, byte: u8) {
            self.data[0] = byte;
        }
        fn release_data(&mut self) {}
        fn simulation_exhausted(&mut self) -> bool {
            self.pos >= self.limit
        }
    }

    #[test]
    fn run_four_k_serves_bytes_from_the_single_bank() {
        let image_plan = plan(4096, 4096, None).unwrap();
        let mut arena = MemoryArena::new(InMemoryFlash::new(0));
        let ptr = image_plan.bank_ptr(0);
        arena.write_byte(BankPointer { region: ptr.region, offset: ptr.offset + 0x23 }, 0x99);

        let mut bus = ScriptedBus::new(vec![0x1023, 0x1023, 0x1023, 0x1500], 40);
        run(&Scheme::FourK, &image_plan, &mut arena, &mut bus, None);
    }

    #[test]
    fn run_f8_switches_bank_on_hotspot_access() {
        let bank_size = 4096u32;
        let image_plan = plan(2 * bank_size, bank_size, None).unwrap();
        let mut arena = MemoryArena::new(InMemoryFlash::new(0));
        for bank in 0..2 {
            let ptr = image_plan.bank_ptr(bank);
            arena.write_byte(BankPointer { region: ptr.region, offset: ptr.offset }, bank as u8);
        }

        let scheme = Scheme::fx(0x1FF8, 2, false);
        let mut bus = ScriptedBus::new(vec![0x1FF9, 0x1FF9, 0x1000, 0x1000, 0x1500], 60);
        run(&scheme, &image_plan, &mut arena, &mut bus, None);
    }
}
