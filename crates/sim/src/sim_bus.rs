//! Scriptable `BusPins` implementation: replays a fixed address trace
//! and records every byte an engine drives onto the data bus, so a
//! scheme engine's hot loop can be exercised from a host machine
//! exactly as `cart_core::bus`'s own sampler tests do, but end-to-end.

use cart_core::bus::BusPins;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DrivenByte {
    pub addr: u16,
    pub byte: u8,
}

pub struct SimBus {
    addrs: Vec<u16>,
    pos: usize,
    incoming_data: u8,
    driven: Option<u8>,
    pub history: Vec<DrivenByte>,
}

impl SimBus {
    pub fn new(addrs: Vec<u16>) -> Self {
        Self { addrs, pos: 0, incoming_data: 0, driven: None, history: Vec::new() }
    }

    /// Byte the scripted CPU is "writing": only meaningful while a
    /// capture-write hotspot address is being replayed.
    pub fn set_incoming_data(&mut self, byte: u8) {
        self.incoming_data = byte;
    }
}

impl BusPins for SimBus {
    fn sample_addr(&mut self) -> u16 {
        let addr = if self.pos < self.addrs.len() {
            self.addrs[self.pos]
        } else {
            // Tail sentinel: alternate in runs of three so both the
            // two- and three-sample stable-address forms can settle,
            // while `respond`'s "wait for address to change" loop
            // still eventually sees a change.
            let tail = self.pos - self.addrs.len();
            if (tail / 3) % 2 == 0 {
                0x0AAA
            } else {
                0x0BBB
            }
        };
        self.pos += 1;
        addr
    }

    fn sample_data(&mut self) -> u8 {
        self.incoming_data
    }

    fn drive_data(&mut self, byte: u8) {
        self.driven = Some(byte);
        let addr = self.addrs.get(self.pos.saturating_sub(1)).copied().unwrap_or(0);
        self.history.push(DrivenByte { addr, byte });
    }

    fn release_data(&mut self) {
        self.driven = None;
    }

    fn simulation_exhausted(&mut self) -> bool {
        self.pos >= self.addrs.len() + 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_driven_byte_with_its_address() {
        let mut bus = SimBus::new(vec![0x1000, 0x1001]);
        bus.sample_addr();
        bus.drive_data(0x42);
        assert_eq!(bus.history.len(), 1);
        assert_eq!(bus.history[0].byte, 0x42);
    }

    #[test]
    fn exhausts_nine_cycles_after_the_script_runs_out() {
        let mut bus = SimBus::new(vec![0x1000]);
        for _ in 0..9 {
            assert!(!bus.simulation_exhausted());
            bus.sample_addr();
        }
        assert!(bus.simulation_exhausted());
    }
}
