//! Synthetic Bus Traffic

use twai_driver::{Alerts, MockTwai, RxMessage};

/// Deterministic traffic source cycling through a few typical vehicle frames
pub struct TrafficGenerator {
    frames_per_tick: u32,
    error_every_ticks: u32,
    ticks: u64,
    sequence: u32,
}

impl TrafficGenerator {
    /// `error_every_ticks == 0` disables error injection
    pub fn new(frames_per_tick: u32, error_every_ticks: u32) -> Self {
        Self {
            frames_per_tick,
            error_every_ticks,
            ticks: 0,
            sequence: 0,
        }
    }

    /// Next frame in the cycle
    pub fn next_frame(&mut self) -> RxMessage {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        match seq % 4 {
            // J1939 EEC1: engine speed in bytes 3-4, 0.125 rpm/bit
            0 => {
                let rpm = 800 + (seq % 2400) as u16;
                let raw = (rpm * 8).to_le_bytes();
                RxMessage::data_frame(0x0CF0_0400, true, &[0xF0, 0x7D, 0x7D, raw[0], raw[1], 0xFF, 0xF0, 0xFF])
            }
            // J1939 CCVS: wheel speed in bytes 1-2, 1/256 km/h per bit
            1 => {
                let speed = ((seq % 120) as u16) << 8;
                let raw = speed.to_le_bytes();
                RxMessage::data_frame(0x18FE_F100, true, &[0xFF, raw[0], raw[1], 0x00, 0x00, 0x00, 0x00, 0xFF])
            }
            // OBD-II coolant temperature response
            2 => RxMessage::data_frame(0x7E8, false, &[0x03, 0x41, 0x05, 0x7B]),
            _ => RxMessage::remote_frame(0x123, false, 0),
        }
    }

    /// Put one tick's worth of traffic on the simulated bus
    ///
    /// Returns how many frames the controller accepted.
    pub fn drive(&mut self, bus: &MockTwai) -> u32 {
        self.ticks += 1;
        if self.error_every_ticks > 0 && self.ticks % self.error_every_ticks as u64 == 0 {
            bus.raise(Alerts::BUS_ERROR);
        }

        let mut accepted = 0;
        for _ in 0..self.frames_per_tick {
            let frame = self.next_frame();
            if bus.inject(frame) {
                accepted += 1;
            }
        }
        accepted
    }
}
