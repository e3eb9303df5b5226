//! Envelope generator for volume control.
//!
//! The envelope generator provides automatic volume fade-out (or fade-in)
//! for pulse and noise channels.

use serde::{Deserialize, Serialize};

/// Envelope generator component.
///
/// Provides automatic volume control, counting up or down from an initial
/// volume depending on `add_mode`. Can also be used for constant volume mode
/// by setting `period` to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Start flag (set when a note is triggered)
    start_flag: bool,
    /// Decay level counter (0-15)
    decay_level: u8,
    /// Divider counter
    divider: u8,
    /// Divider period (reload value from register)
    period: u8,
    /// Loop flag (restart envelope when it reaches 0)
    loop_flag: bool,
    /// Volume loaded on trigger (0-15)
    initial_volume: u8,
    /// Direction: true = count up toward 15, false = count down toward 0
    add_mode: bool,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            start_flag: false,
            decay_level: 0,
            divider: 0,
            period: 0,
            loop_flag: false,
            initial_volume: 0,
            add_mode: false,
        }
    }

    /// Clock the envelope (called by the frame sequencer at 64 Hz).
    ///
    /// A period of 0 disables automatic volume change entirely (the
    /// envelope holds at whatever level it was triggered with).
    pub fn clock(&mut self) {
        if self.start_flag {
            self.start_flag = false;
            self.decay_level = self.initial_volume;
            self.divider = self.period;
            return;
        }
        if self.period == 0 {
            return;
        }
        if self.divider > 0 {
            self.divider -= 1;
        }
        if self.divider == 0 {
            self.divider = self.period;
            if self.add_mode {
                if self.decay_level < 15 {
                    self.decay_level += 1;
                }
            } else if self.decay_level > 0 {
                self.decay_level -= 1;
            } else if self.loop_flag {
                self.decay_level = 15;
            }
        }
    }

    /// Get the current decay level (0-15)
    pub fn level(&self) -> u8 {
        self.decay_level
    }

    /// Alias for [`Envelope::level`] matching the NRx2 register naming.
    pub fn volume(&self) -> u8 {
        self.decay_level
    }

    /// Restart the envelope
    pub fn restart(&mut self) {
        self.start_flag = true;
    }

    /// Alias for [`Envelope::restart`], used on channel trigger.
    pub fn trigger(&mut self) {
        self.restart();
    }

    /// Set the period (divider reload value)
    pub fn set_period(&mut self, period: u8) {
        self.period = period & 0x0F;
    }

    /// Set the loop flag
    pub fn set_loop(&mut self, loop_flag: bool) {
        self.loop_flag = loop_flag;
    }

    /// Set initial volume, direction, and period together, as written in one
    /// go via an NRx2-style register.
    pub fn set_params(&mut self, initial_volume: u8, add_mode: bool, period: u8) {
        self.initial_volume = initial_volume & 0x0F;
        self.add_mode = add_mode;
        self.period = period & 0x07;
    }

    /// Volume loaded on trigger (0-15)
    pub fn initial_volume(&self) -> u8 {
        self.initial_volume
    }

    /// Direction: true = count up toward 15, false = count down toward 0
    pub fn add_mode(&self) -> bool {
        self.add_mode
    }

    /// Current divider period (0-7)
    pub fn period(&self) -> u8 {
        self.period
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
