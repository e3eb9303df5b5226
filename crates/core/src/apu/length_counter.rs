//! Length counter used by pulse, triangle, and noise channels.
//!
//! The length counter provides automatic note duration control.

use serde::{Deserialize, Serialize};

/// NES length counter lookup table.
/// 
/// This table is indexed by a 5-bit value (0-31) and returns the length counter value.
/// The counter is clocked at half the frame counter rate (~120Hz NTSC, ~100Hz PAL).
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Length counter component.
/// 
/// Automatically decrements and can be halted. When it reaches zero,
/// the associated channel is silenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthCounter {
    /// Current counter value
    value: u16,
    /// Halt flag (when true, counter doesn't decrement)
    halt: bool,
    /// Enabled flag (when false, counter is set to 0)
    enabled: bool,
}

impl LengthCounter {
    pub fn new() -> Self {
        Self {
            value: 0,
            halt: false,
            enabled: false,
        }
    }

    /// Clock the length counter (decrement if not halted)
    pub fn clock(&mut self) {
        if !self.halt && self.enabled && self.value > 0 {
            self.value -= 1;
        }
    }

    /// Load a new value from the length table
    pub fn load(&mut self, index: u8) {
        if self.enabled {
            self.value = LENGTH_TABLE[(index & 0x1F) as usize] as u16;
        }
    }

    /// Load a Game Boy-style length register directly: the register holds
    /// how many ticks have already elapsed, counting up to `max` (64 for
    /// pulse/noise, 256 for wave).
    pub fn load_gb(&mut self, register: u8, max: u16) {
        self.value = max - register as u16;
    }

    /// Get the current counter value
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Set the halt flag
    pub fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }

    /// Set the enabled flag
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.value = 0;
        }
    }

    /// Whether length clocking is currently gated by the enable bit.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if the counter is non-zero (channel should be active)
    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}

impl Default for LengthCounter {
    fn default() -> Self {
        Self::new()
    }
}
