//! DIV/TIMA/TMA/TAC timer sub-state.
//!
//! Wired through the bus's address decode like real hardware, but modeled as
//! its own small state machine driven one T-cycle at a time so falling-edge
//! detection on the internal counter stays exact.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    pub internal_counter: u16,
    pub tima: u8,
    pub tma: u8,
    pub tac: u8,
    prev_timer_bit: bool,
    /// 0 means no pending TIMA-overflow reload; otherwise counts down to 0.
    tima_overflow_countdown: u8,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            internal_counter: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            prev_timer_bit: false,
            tima_overflow_countdown: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn tac_bit(tac: u8) -> u8 {
        match tac & 0x3 {
            0 => 9,
            1 => 3,
            2 => 5,
            3 => 7,
            _ => unreachable!(),
        }
    }

    fn timer_bit(&self) -> bool {
        let enabled = self.tac & 0x04 != 0;
        let bit = Self::tac_bit(self.tac);
        enabled && (self.internal_counter >> bit) & 1 != 0
    }

    fn recompute_edge(&mut self) {
        let bit = self.timer_bit();
        if self.prev_timer_bit && !bit {
            self.increment_tima();
        }
        self.prev_timer_bit = bit;
    }

    fn increment_tima(&mut self) {
        let (r, overflow) = self.tima.overflowing_add(1);
        self.tima = r;
        if overflow {
            self.tima_overflow_countdown = 4;
        }
    }

    /// Advance by `t_cycles` T-cycles. Returns true if the Timer IF bit
    /// should be raised (a TIMA-overflow reload completed during this call).
    pub fn step(&mut self, t_cycles: u32) -> bool {
        let mut irq = false;
        for _ in 0..t_cycles {
            if self.tima_overflow_countdown > 0 {
                self.tima_overflow_countdown -= 1;
                if self.tima_overflow_countdown == 0 {
                    self.tima = self.tma;
                    irq = true;
                }
            }
            self.internal_counter = self.internal_counter.wrapping_add(1);
            self.recompute_edge();
        }
        irq
    }

    pub fn div(&self) -> u8 {
        (self.internal_counter >> 8) as u8
    }

    pub fn write_div(&mut self) {
        self.internal_counter = 0;
        self.recompute_edge();
    }

    pub fn read_tac(&self) -> u8 {
        self.tac | 0xF8
    }

    pub fn write_tac(&mut self, v: u8) {
        self.tac = v & 0x07;
        self.recompute_edge();
    }

    pub fn read_tima(&self) -> u8 {
        self.tima
    }

    /// Writing TIMA during the 4-T-cycle reload window cancels both the
    /// pending TMA reload and the Timer IRQ for that cycle.
    pub fn write_tima(&mut self, v: u8) {
        self.tima = v;
        self.tima_overflow_countdown = 0;
    }

    pub fn write_tma(&mut self, v: u8) {
        self.tma = v;
        if self.tima_overflow_countdown > 0 {
            self.tima = v;
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
