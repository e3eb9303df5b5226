//! Game Boy APU (Audio Processing Unit) implementation.
//!
//! This module provides the Game Boy-specific APU interface using
//! reusable components from the core module.
//!
//! ## Game Boy Audio Architecture
//!
//! The Game Boy has 4 sound channels:
//!
//! 1. **Pulse 1**: Square wave with sweep (NR10-NR14)
//!    - Duty cycle: 12.5%, 25%, 50%, 75%
//!    - Frequency sweep (increase/decrease over time)
//!    - Envelope generator for volume control
//!    - Length counter for automatic note duration
//!
//! 2. **Pulse 2**: Square wave without sweep (NR21-NR24)
//!    - Same as Pulse 1 but no sweep unit
//!    - Duty cycle: 12.5%, 25%, 50%, 75%
//!    - Envelope generator and length counter
//!
//! 3. **Wave**: Custom waveform (NR30-NR34, $FF30-$FF3F)
//!    - 32 x 4-bit samples in wave RAM
//!    - Volume control: mute, 100%, 50%, 25%
//!    - No envelope generator
//!    - Length counter
//!
//! 4. **Noise**: Pseudo-random noise (NR41-NR44)
//!    - 7-bit or 15-bit LFSR modes
//!    - Envelope generator for volume control
//!    - Length counter
//!
//! ## Register Map
//!
//! - **$FF10-$FF14**: Pulse 1 (NR10-NR14)
//! - **$FF15-$FF19**: Pulse 2 (NR20-NR24, NR15 unused)
//! - **$FF1A-$FF1E**: Wave (NR30-NR34)
//! - **$FF1F-$FF23**: Noise (NR40-NR44, NR40 unused)
//! - **$FF24**: Master volume (NR50)
//! - **$FF25**: Sound panning (NR51)
//! - **$FF26**: Sound on/off (NR52)
//! - **$FF30-$FF3F**: Wave pattern RAM (16 bytes, 32 samples)
//!
//! ## Frame Sequencer
//!
//! The Game Boy frame sequencer runs at 512 Hz and controls:
//! - Step 0: Length counter
//! - Step 1: Nothing
//! - Step 2: Length counter and sweep
//! - Step 3: Nothing
//! - Step 4: Length counter
//! - Step 5: Nothing
//! - Step 6: Length counter and sweep
//! - Step 7: Envelope
//!
//! ## Timing
//!
//! - CPU clock: 4.194304 MHz
//! - Frame sequencer: 512 Hz (every 8192 cycles)
//! - Length counter: 256 Hz (every other frame sequencer step)
//! - Envelope: 64 Hz (every 8th frame sequencer step)
//! - Sweep: 128 Hz (every 4th frame sequencer step)
//!
//! ## Audio Output
//!
//! The APU generates 44.1 kHz stereo audio by:
//!
//! 1. Clocking the APU at CPU speed (4.194304 MHz)
//! 2. Running the frame sequencer at 512 Hz
//! 3. Mixing the active channels
//! 4. Downsampling to the target sample rate

use emu_core::apu::{Envelope, LengthCounter, NoiseChannel, PulseChannel, SweepUnit, WaveChannel};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

const RING_CAPACITY: usize = 16_384;

/// Lock-free single-producer/single-consumer ring buffer of audio samples.
///
/// The emulation thread is the sole producer (`push`); the host's audio
/// callback thread is the sole consumer (`pop`). A full buffer drops the
/// incoming sample; an empty buffer yields silence.
pub struct SampleRing {
    buf: Vec<AtomicU32>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl SampleRing {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            buf: (0..RING_CAPACITY).map(|_| AtomicU32::new(0)).collect(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, sample: f32) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next = (head + 1) % RING_CAPACITY;
        if next == tail {
            return;
        }
        self.buf[head].store(sample.to_bits(), Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
    }

    pub fn pop(&self) -> f32 {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return 0.0;
        }
        let bits = self.buf[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) % RING_CAPACITY, Ordering::Release);
        f32::from_bits(bits)
    }

    /// Number of samples currently buffered. `pop()` alone can't tell a
    /// genuine zero-valued sample apart from an empty buffer; callers that
    /// need to know when the ring is drained should check this instead.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + RING_CAPACITY - tail) % RING_CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes NR43's divisor-code-and-shift encoding into a CPU-cycle period,
/// the Game Boy noise channel's timing scheme (distinct from the RP2A03
/// fixed lookup table `NoiseChannel::clock_with_table` uses).
fn gb_noise_period(nr43: u8) -> u16 {
    let divisor_code = (nr43 & 0x07) as u16;
    let shift = (nr43 >> 4) & 0x0F;
    let divisor = if divisor_code == 0 { 8 } else { divisor_code * 16 };
    divisor << shift
}

/// Enabling the length counter while the frame sequencer's next step will
/// not clock length causes an immediate extra decrement, possibly
/// disabling the channel right away.
fn apply_length_enable_quirk(
    length: &mut LengthCounter,
    was_enabled: bool,
    now_enabled: bool,
    next_clocks_length: bool,
) {
    if !was_enabled && now_enabled && !next_clocks_length && length.value() > 0 {
        length.clock();
    }
}

/// Reload a triggered channel's length counter to its max value (64 for
/// pulse/noise, 256 for wave) when it was previously zero. If the frame
/// sequencer's next step will not clock length, the reload lands one
/// short of max, since that reload is about to absorb a clock that would
/// otherwise have been spent on the old (zero) value.
fn reload_length_on_trigger(length: &mut LengthCounter, max: u16, next_clocks_length: bool) {
    if length.value() == 0 {
        let reload = if next_clocks_length { max } else { max - 1 };
        length.load_gb(0, reload);
    }
}

/// Game Boy APU with 4 sound channels.
///
/// Uses core APU components for audio synthesis.
///
/// # Registers
///
/// The APU responds to reads/writes at $FF10-$FF26 and $FF30-$FF3F.
///
/// ## Pulse 1 (NR10-NR14)
/// - NR10 ($FF10): Sweep (PPP DNNN - Period, Negate, Shift)
/// - NR11 ($FF11): Duty and length (DDLL LLLL)
/// - NR12 ($FF12): Envelope (VVVV APPP - Volume, Add/subtract, Period)
/// - NR13 ($FF13): Frequency low (FFFF FFFF)
/// - NR14 ($FF14): Frequency high and control (TL-- -FFF)
///
/// ## Pulse 2 (NR21-NR24)
/// - NR21 ($FF16): Duty and length (DDLL LLLL)
/// - NR22 ($FF17): Envelope (VVVV APPP)
/// - NR23 ($FF18): Frequency low (FFFF FFFF)
/// - NR24 ($FF19): Frequency high and control (TL-- -FFF)
///
/// ## Wave (NR30-NR34)
/// - NR30 ($FF1A): DAC enable (E--- ----)
/// - NR31 ($FF1B): Length (LLLL LLLL)
/// - NR32 ($FF1C): Volume (0VV- ---- - 0=mute, 1=100%, 2=50%, 3=25%)
/// - NR33 ($FF1D): Frequency low (FFFF FFFF)
/// - NR34 ($FF1E): Frequency high and control (TL-- -FFF)
///
/// ## Noise (NR41-NR44)
/// - NR41 ($FF20): Length (--LL LLLL)
/// - NR42 ($FF21): Envelope (VVVV APPP)
/// - NR43 ($FF22): Polynomial counter (SSSS WDDD - Clock shift, Width, Divisor)
/// - NR44 ($FF23): Control (T L-- ----)
///
/// ## Control
/// - NR50 ($FF24): Master volume (ALLL BLLL - Vin L/R enable, Left/Right volume)
/// - NR51 ($FF25): Sound panning (4444 3333 2222 1111 - Channel to L/R output)
/// - NR52 ($FF26): Sound on/off (P--- 4321 - Power, channel enables)
///
/// ## Wave RAM
/// - $FF30-$FF3F: 16 bytes (32 x 4-bit samples)
#[derive(Serialize, Deserialize)]
pub struct GbApu {
    // Sound channels
    pub pulse1: PulseChannel,
    pub pulse1_sweep: SweepUnit,
    pub pulse1_envelope: Envelope,
    pub pulse1_length: LengthCounter,
    
    pub pulse2: PulseChannel,
    pub pulse2_envelope: Envelope,
    pub pulse2_length: LengthCounter,
    
    pub wave: WaveChannel,
    pub wave_length: LengthCounter,
    
    pub noise: NoiseChannel,
    pub noise_envelope: Envelope,
    pub noise_length: LengthCounter,
    
    // Frame sequencer
    frame_sequencer_cycles: u32,
    frame_sequencer_step: u8,
    
    // Master controls
    power_on: bool,
    left_volume: u8,
    right_volume: u8,
    channel_panning: u8, // Bits for L/R panning per channel
    
    // Temporary registers for triggering
    pulse1_frequency: u16,
    pulse2_frequency: u16,
    wave_frequency: u16,
    wave_dac_enabled: bool,

    // Sampler / downsampler
    #[serde(skip, default = "SampleRing::new")]
    ring: Arc<SampleRing>,
    cycles_per_sample: f64,
    sample_cycle_accum: f64,
    hpf_prev_in: f32,
    hpf_prev_out: f32,
}

impl GbApu {
    /// Create a new Game Boy APU with default state
    pub fn new() -> Self {
        Self {
            pulse1: PulseChannel::new(),
            pulse1_sweep: SweepUnit::new(),
            pulse1_envelope: Envelope::new(),
            pulse1_length: LengthCounter::new(),
            
            pulse2: PulseChannel::new(),
            pulse2_envelope: Envelope::new(),
            pulse2_length: LengthCounter::new(),
            
            wave: WaveChannel::new(),
            wave_length: LengthCounter::new(),
            
            noise: NoiseChannel::new(),
            noise_envelope: Envelope::new(),
            noise_length: LengthCounter::new(),
            
            frame_sequencer_cycles: 0,
            frame_sequencer_step: 0,
            
            power_on: true,
            left_volume: 7,
            right_volume: 7,
            channel_panning: 0xFF,
            
            pulse1_frequency: 0,
            pulse2_frequency: 0,
            wave_frequency: 0,
            wave_dac_enabled: false,

            ring: SampleRing::new(),
            cycles_per_sample: 4_194_304.0 / 44_100.0,
            sample_cycle_accum: 0.0,
            hpf_prev_in: 0.0,
            hpf_prev_out: 0.0,
        }
    }

    /// Handle to the audio sample ring shared with the host's audio thread.
    pub fn sample_ring(&self) -> Arc<SampleRing> {
        self.ring.clone()
    }

    pub fn set_sample_rate(&mut self, rate: u32) {
        self.cycles_per_sample = 4_194_304.0 / rate as f64;
    }

    /// Advance the APU by `t_cycles` T-cycles, pushing downsampled output
    /// into the sample ring as the accumulator crosses `cycles_per_sample`.
    pub fn step(&mut self, t_cycles: u32) {
        for _ in 0..t_cycles {
            self.clock();
            self.sample_cycle_accum += 1.0;
            if self.sample_cycle_accum >= self.cycles_per_sample {
                self.sample_cycle_accum -= self.cycles_per_sample;
                let raw = self.mix_sample();
                let filtered = self.high_pass(raw);
                self.ring.push(filtered);
            }
        }
    }

    /// Sum the four channels' digital outputs, apply master gain, and
    /// produce a float sample in roughly [-1, 1].
    fn mix_sample(&self) -> f32 {
        if !self.power_on {
            return 0.0;
        }

        let mut sum = 0i32;
        let mut active = 0i32;

        if self.pulse1.enabled && self.pulse1_length.is_active() {
            sum += if self.pulse1.duty_output() {
                self.pulse1.envelope as i32
            } else {
                0
            };
            active += 1;
        }
        if self.pulse2.enabled && self.pulse2_length.is_active() {
            sum += if self.pulse2.duty_output() {
                self.pulse2.envelope as i32
            } else {
                0
            };
            active += 1;
        }
        if self.wave.enabled && self.wave_length.is_active() && self.wave_dac_enabled {
            sum += self.wave.current_sample() as i32;
            active += 1;
        }
        if self.noise.enabled && self.noise_length.is_active() && self.noise.shift_register_bit0() == 0
        {
            sum += self.noise.envelope as i32;
            active += 1;
        }

        if active == 0 {
            return 0.0;
        }

        let normalized = sum as f32 / (active as f32 * 15.0);
        let gain = (self.left_volume + self.right_volume) as f32 / 14.0;
        (normalized * gain).clamp(-1.0, 1.0)
    }

    /// Single-pole high-pass filter (alpha = 0.995) to remove DC bias.
    fn high_pass(&mut self, input: f32) -> f32 {
        const ALPHA: f32 = 0.995;
        let output = ALPHA * (self.hpf_prev_out + input - self.hpf_prev_in);
        self.hpf_prev_in = input;
        self.hpf_prev_out = output;
        output.clamp(-1.0, 1.0)
    }

    /// Clock the APU for one CPU cycle
    pub fn clock(&mut self) {
        // Frame sequencer runs at 512 Hz (every 8192 CPU cycles at 4.194304 MHz)
        const CYCLES_PER_FRAME_STEP: u32 = 8192;
        
        self.frame_sequencer_cycles += 1;
        if self.frame_sequencer_cycles >= CYCLES_PER_FRAME_STEP {
            self.frame_sequencer_cycles = 0;
            self.clock_frame_sequencer();
        }
        
        // Clock all channels
        if self.power_on {
            // Pulse channels clock at CPU speed
            let _ = self.pulse1.clock();
            let _ = self.pulse2.clock();
            let _ = self.wave.clock();
            let period = gb_noise_period(self.noise.period_index);
            let _ = self.noise.clock_gb(period);
        }
    }
    
    /// Clock the frame sequencer (called at 512 Hz)
    fn clock_frame_sequencer(&mut self) {
        // Frame sequencer pattern (8 steps):
        // Step 0: Length
        // Step 1: -
        // Step 2: Length + Sweep
        // Step 3: -
        // Step 4: Length
        // Step 5: -
        // Step 6: Length + Sweep
        // Step 7: Envelope
        
        match self.frame_sequencer_step {
            0 | 2 | 4 | 6 => {
                // Clock length counters
                self.pulse1_length.clock();
                self.pulse2_length.clock();
                self.wave_length.clock();
                self.noise_length.clock();
                
                // Update channel enabled state based on length counters
                if !self.pulse1_length.is_active() {
                    self.pulse1.enabled = false;
                }
                if !self.pulse2_length.is_active() {
                    self.pulse2.enabled = false;
                }
                if !self.wave_length.is_active() {
                    self.wave.enabled = false;
                }
                if !self.noise_length.is_active() {
                    self.noise.enabled = false;
                }
                
                // Clock sweep on steps 2 and 6
                if self.frame_sequencer_step == 2 || self.frame_sequencer_step == 6 {
                    if let Some(new_freq) = self.pulse1_sweep.clock() {
                        self.pulse1_frequency = new_freq;
                        self.pulse1.set_timer(new_freq);
                    }
                }
            }
            7 => {
                // Clock envelopes
                self.pulse1_envelope.clock();
                self.pulse2_envelope.clock();
                self.noise_envelope.clock();
                
                // Update channel volumes
                self.pulse1.envelope = self.pulse1_envelope.volume();
                self.pulse2.envelope = self.pulse2_envelope.volume();
                self.noise.envelope = self.noise_envelope.volume();
            }
            _ => {}
        }
        
        self.frame_sequencer_step = (self.frame_sequencer_step + 1) & 7;
    }
    
    /// Read from an APU register
    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            // NR10: Pulse 1 sweep
            0xFF10 => {
                let period = self.pulse1_sweep.period & 0x07;
                let negate = if self.pulse1_sweep.negate { 0x08 } else { 0x00 };
                let shift = self.pulse1_sweep.shift & 0x07;
                0x80 | (period << 4) | negate | shift
            }
            // NR11: Pulse 1 duty (write-only, return duty only)
            0xFF11 => {
                (self.pulse1.duty << 6) | 0x3F
            }
            // NR12: Pulse 1 envelope
            0xFF12 => {
                let volume = self.pulse1_envelope.initial_volume() & 0x0F;
                let add_mode = if self.pulse1_envelope.add_mode() { 0x08 } else { 0x00 };
                let period = self.pulse1_envelope.period() & 0x07;
                (volume << 4) | add_mode | period
            }
            // NR13: Pulse 1 frequency low (write-only)
            0xFF13 => 0xFF,
            // NR14: Pulse 1 frequency high and control
            0xFF14 => {
                let length_enable = if self.pulse1_length.is_enabled() { 0x40 } else { 0x00 };
                0xBF | length_enable
            }
            
            // NR20 unused
            0xFF15 => 0xFF,
            // NR21: Pulse 2 duty
            0xFF16 => {
                (self.pulse2.duty << 6) | 0x3F
            }
            // NR22: Pulse 2 envelope
            0xFF17 => {
                let volume = self.pulse2_envelope.initial_volume() & 0x0F;
                let add_mode = if self.pulse2_envelope.add_mode() { 0x08 } else { 0x00 };
                let period = self.pulse2_envelope.period() & 0x07;
                (volume << 4) | add_mode | period
            }
            // NR23: Pulse 2 frequency low (write-only)
            0xFF18 => 0xFF,
            // NR24: Pulse 2 frequency high and control
            0xFF19 => {
                let length_enable = if self.pulse2_length.is_enabled() { 0x40 } else { 0x00 };
                0xBF | length_enable
            }
            
            // NR30: Wave DAC enable
            0xFF1A => {
                if self.wave_dac_enabled { 0x80 } else { 0x7F }
            }
            // NR31: Wave length (write-only)
            0xFF1B => 0xFF,
            // NR32: Wave volume
            0xFF1C => {
                ((self.wave.volume_shift & 0x03) << 5) | 0x9F
            }
            // NR33: Wave frequency low (write-only)
            0xFF1D => 0xFF,
            // NR34: Wave frequency high and control
            0xFF1E => {
                let length_enable = if self.wave_length.is_enabled() { 0x40 } else { 0x00 };
                0xBF | length_enable
            }
            
            // NR40 unused
            0xFF1F => 0xFF,
            // NR41: Noise length (write-only)
            0xFF20 => 0xFF,
            // NR42: Noise envelope
            0xFF21 => {
                let volume = self.noise_envelope.initial_volume() & 0x0F;
                let add_mode = if self.noise_envelope.add_mode() { 0x08 } else { 0x00 };
                let period = self.noise_envelope.period() & 0x07;
                (volume << 4) | add_mode | period
            }
            // NR43: Noise polynomial counter
            0xFF22 => {
                let shift = (self.noise.period_index >> 4) & 0x0F;
                let width = if self.noise.mode { 0x08 } else { 0x00 };
                let divisor = self.noise.period_index & 0x07;
                (shift << 4) | width | divisor
            }
            // NR44: Noise control
            0xFF23 => {
                let length_enable = if self.noise_length.is_enabled() { 0x40 } else { 0x00 };
                0xBF | length_enable
            }
            
            // NR50: Master volume
            0xFF24 => {
                ((self.left_volume & 0x07) << 4) | (self.right_volume & 0x07)
            }
            // NR51: Sound panning
            0xFF25 => self.channel_panning,
            // NR52: Sound on/off
            0xFF26 => {
                let power = if self.power_on { 0x80 } else { 0x00 };
                let ch1 = if self.pulse1.enabled { 0x01 } else { 0x00 };
                let ch2 = if self.pulse2.enabled { 0x02 } else { 0x00 };
                let ch3 = if self.wave.enabled { 0x04 } else { 0x00 };
                let ch4 = if self.noise.enabled { 0x08 } else { 0x00 };
                power | ch1 | ch2 | ch3 | ch4 | 0x70
            }
            
            // Wave RAM
            0xFF30..=0xFF3F => {
                let offset = (addr - 0xFF30) as usize;
                self.wave.read_wave_ram_byte(offset)
            }
            
            _ => 0xFF,
        }
    }
    
    /// Write to an APU register
    pub fn write_register(&mut self, addr: u16, val: u8) {
        // If power is off, ignore all writes except to NR52
        if !self.power_on && addr != 0xFF26 {
            return;
        }
        
        match addr {
            // NR10: Pulse 1 sweep
            0xFF10 => {
                self.pulse1_sweep.period = (val >> 4) & 0x07;
                self.pulse1_sweep.negate = (val & 0x08) != 0;
                self.pulse1_sweep.shift = val & 0x07;
            }
            // NR11: Pulse 1 duty and length
            0xFF11 => {
                self.pulse1.duty = (val >> 6) & 0x03;
                let length_load = val & 0x3F;
                self.pulse1_length.load_gb(length_load, 64);
            }
            // NR12: Pulse 1 envelope
            0xFF12 => {
                let initial_volume = (val >> 4) & 0x0F;
                let add_mode = (val & 0x08) != 0;
                let period = val & 0x07;
                self.pulse1_envelope.set_params(initial_volume, add_mode, period);
                
                // DAC enable: if top 5 bits are 0, DAC is off
                if (val & 0xF8) == 0 {
                    self.pulse1.enabled = false;
                }
            }
            // NR13: Pulse 1 frequency low
            0xFF13 => {
                self.pulse1_frequency = (self.pulse1_frequency & 0x0700) | (val as u16);
            }
            // NR14: Pulse 1 frequency high and control
            0xFF14 => {
                self.pulse1_frequency = (self.pulse1_frequency & 0x00FF) | (((val & 0x07) as u16) << 8);
                let length_enable = (val & 0x40) != 0;
                let trigger = (val & 0x80) != 0;
                let next_clocks_length = matches!(self.frame_sequencer_step, 0 | 2 | 4 | 6);

                let was_enabled = self.pulse1_length.is_enabled();
                self.pulse1_length.set_enabled(length_enable);
                apply_length_enable_quirk(&mut self.pulse1_length, was_enabled, length_enable, next_clocks_length);

                if trigger {
                    self.pulse1.enabled = true;
                    self.pulse1.set_timer(self.pulse1_frequency);
                    self.pulse1_envelope.trigger();
                    self.pulse1_sweep.trigger(self.pulse1_frequency);

                    reload_length_on_trigger(&mut self.pulse1_length, 64, next_clocks_length);
                }
            }
            
            // NR20 unused
            0xFF15 => {}
            // NR21: Pulse 2 duty and length
            0xFF16 => {
                self.pulse2.duty = (val >> 6) & 0x03;
                let length_load = val & 0x3F;
                self.pulse2_length.load_gb(length_load, 64);
            }
            // NR22: Pulse 2 envelope
            0xFF17 => {
                let initial_volume = (val >> 4) & 0x0F;
                let add_mode = (val & 0x08) != 0;
                let period = val & 0x07;
                self.pulse2_envelope.set_params(initial_volume, add_mode, period);
                
                // DAC enable
                if (val & 0xF8) == 0 {
                    self.pulse2.enabled = false;
                }
            }
            // NR23: Pulse 2 frequency low
            0xFF18 => {
                self.pulse2_frequency = (self.pulse2_frequency & 0x0700) | (val as u16);
            }
            // NR24: Pulse 2 frequency high and control
            0xFF19 => {
                self.pulse2_frequency = (self.pulse2_frequency & 0x00FF) | (((val & 0x07) as u16) << 8);
                let length_enable = (val & 0x40) != 0;
                let trigger = (val & 0x80) != 0;
                let next_clocks_length = matches!(self.frame_sequencer_step, 0 | 2 | 4 | 6);

                let was_enabled = self.pulse2_length.is_enabled();
                self.pulse2_length.set_enabled(length_enable);
                apply_length_enable_quirk(&mut self.pulse2_length, was_enabled, length_enable, next_clocks_length);

                if trigger {
                    self.pulse2.enabled = true;
                    self.pulse2.set_timer(self.pulse2_frequency);
                    self.pulse2_envelope.trigger();

                    reload_length_on_trigger(&mut self.pulse2_length, 64, next_clocks_length);
                }
            }
            
            // NR30: Wave DAC enable
            0xFF1A => {
                self.wave_dac_enabled = (val & 0x80) != 0;
                if !self.wave_dac_enabled {
                    self.wave.enabled = false;
                }
            }
            // NR31: Wave length
            0xFF1B => {
                let length_load = val;
                self.wave_length.load_gb(length_load, 256);
            }
            // NR32: Wave volume
            0xFF1C => {
                self.wave.volume_shift = (val >> 5) & 0x03;
            }
            // NR33: Wave frequency low
            0xFF1D => {
                self.wave_frequency = (self.wave_frequency & 0x0700) | (val as u16);
            }
            // NR34: Wave frequency high and control
            0xFF1E => {
                self.wave_frequency = (self.wave_frequency & 0x00FF) | (((val & 0x07) as u16) << 8);
                let length_enable = (val & 0x40) != 0;
                let trigger = (val & 0x80) != 0;
                let next_clocks_length = matches!(self.frame_sequencer_step, 0 | 2 | 4 | 6);

                let was_enabled = self.wave_length.is_enabled();
                self.wave_length.set_enabled(length_enable);
                apply_length_enable_quirk(&mut self.wave_length, was_enabled, length_enable, next_clocks_length);

                if trigger && self.wave_dac_enabled {
                    self.wave.enabled = true;
                    self.wave.set_timer(self.wave_frequency);
                    self.wave.reset_position();

                    reload_length_on_trigger(&mut self.wave_length, 256, next_clocks_length);
                }
            }
            
            // NR40 unused
            0xFF1F => {}
            // NR41: Noise length
            0xFF20 => {
                let length_load = val & 0x3F;
                self.noise_length.load_gb(length_load, 64);
            }
            // NR42: Noise envelope
            0xFF21 => {
                let initial_volume = (val >> 4) & 0x0F;
                let add_mode = (val & 0x08) != 0;
                let period = val & 0x07;
                self.noise_envelope.set_params(initial_volume, add_mode, period);
                
                // DAC enable
                if (val & 0xF8) == 0 {
                    self.noise.enabled = false;
                }
            }
            // NR43: Noise polynomial counter
            0xFF22 => {
                // Game Boy noise uses different encoding than NES
                // Format: SSSS WDDD
                // S = clock shift (0-15)
                // W = width mode (0 = 15-bit, 1 = 7-bit)
                // D = divisor code (0-7)
                
                let _shift = (val >> 4) & 0x0F;
                let width = (val & 0x08) != 0;
                let _divisor = val & 0x07;
                
                self.noise.mode = width;
                
                // Convert to period index
                // GB uses: frequency = 262144 / (divisor * 2^(shift+1))
                // We'll store shift and divisor in period_index for now
                self.noise.period_index = val;
            }
            // NR44: Noise control
            0xFF23 => {
                let length_enable = (val & 0x40) != 0;
                let trigger = (val & 0x80) != 0;
                let next_clocks_length = matches!(self.frame_sequencer_step, 0 | 2 | 4 | 6);

                let was_enabled = self.noise_length.is_enabled();
                self.noise_length.set_enabled(length_enable);
                apply_length_enable_quirk(&mut self.noise_length, was_enabled, length_enable, next_clocks_length);

                if trigger {
                    self.noise.enabled = true;
                    self.noise_envelope.trigger();

                    reload_length_on_trigger(&mut self.noise_length, 64, next_clocks_length);
                }
            }
            
            // NR50: Master volume
            0xFF24 => {
                self.left_volume = (val >> 4) & 0x07;
                self.right_volume = val & 0x07;
            }
            // NR51: Sound panning
            0xFF25 => {
                self.channel_panning = val;
            }
            // NR52: Sound on/off
            0xFF26 => {
                let new_power = (val & 0x80) != 0;
                
                if !new_power && self.power_on {
                    // Turning power off - clear all registers
                    self.reset();
                }
                
                self.power_on = new_power;
            }
            
            // Wave RAM
            0xFF30..=0xFF3F => {
                let offset = (addr - 0xFF30) as usize;
                self.wave.write_wave_ram_byte(offset, val);
            }
            
            _ => {}
        }
    }
    
    /// Reset the APU (called when power is turned off).
    ///
    /// Length counters are left untouched: real hardware keeps them running
    /// and observable even while the rest of the sound circuitry is zeroed.
    fn reset(&mut self) {
        self.pulse1 = PulseChannel::new();
        self.pulse1_sweep = SweepUnit::new();
        self.pulse1_envelope = Envelope::new();

        self.pulse2 = PulseChannel::new();
        self.pulse2_envelope = Envelope::new();

        self.wave = WaveChannel::new();

        self.noise = NoiseChannel::new();
        self.noise_envelope = Envelope::new();

        self.frame_sequencer_cycles = 0;
        self.frame_sequencer_step = 0;
        
        self.left_volume = 0;
        self.right_volume = 0;
        self.channel_panning = 0;
        
        self.pulse1_frequency = 0;
        self.pulse2_frequency = 0;
        self.wave_frequency = 0;
        self.wave_dac_enabled = false;
    }
    
}

impl Default for GbApu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_apu_creation() {
        let apu = GbApu::new();
        assert!(apu.power_on);
        assert_eq!(apu.left_volume, 7);
        assert_eq!(apu.right_volume, 7);
    }
    
    #[test]
    fn test_power_control() {
        let mut apu = GbApu::new();
        
        // Power on by default
        assert!(apu.power_on);
        assert_eq!(apu.read_register(0xFF26) & 0x80, 0x80);
        
        // Turn power off
        apu.write_register(0xFF26, 0x00);
        assert!(!apu.power_on);
        assert_eq!(apu.read_register(0xFF26) & 0x80, 0x00);
        
        // Turn power back on
        apu.write_register(0xFF26, 0x80);
        assert!(apu.power_on);
    }
    
    #[test]
    fn test_pulse1_register_writes() {
        let mut apu = GbApu::new();
        
        // Write duty and length
        apu.write_register(0xFF11, 0b11_000001);
        assert_eq!(apu.pulse1.duty, 3);
        
        // Write envelope
        apu.write_register(0xFF12, 0xF3); // Initial volume 15, add mode, period 3
        
        // Write frequency
        apu.write_register(0xFF13, 0x00);
        apu.write_register(0xFF14, 0x87); // Trigger, length enable, freq high = 7
        
        assert!(apu.pulse1.enabled);
    }
    
    #[test]
    fn test_wave_ram_access() {
        let mut apu = GbApu::new();
        
        // Write to wave RAM
        apu.write_register(0xFF30, 0x12);
        apu.write_register(0xFF31, 0x34);
        
        // Read back
        assert_eq!(apu.read_register(0xFF30), 0x12);
        assert_eq!(apu.read_register(0xFF31), 0x34);
    }
    
    #[test]
    fn test_master_volume() {
        let mut apu = GbApu::new();
        
        // Set left volume 5, right volume 3
        apu.write_register(0xFF24, 0x53);
        
        assert_eq!(apu.left_volume, 5);
        assert_eq!(apu.right_volume, 3);
        assert_eq!(apu.read_register(0xFF24), 0x53);
    }
    
    #[test]
    fn test_channel_enable_status() {
        let mut apu = GbApu::new();
        
        // Initially no channels enabled
        let status = apu.read_register(0xFF26);
        assert_eq!(status & 0x0F, 0);
        
        // Enable pulse 1
        apu.write_register(0xFF12, 0xF0); // DAC on
        apu.write_register(0xFF14, 0x80); // Trigger
        
        let status = apu.read_register(0xFF26);
        assert_eq!(status & 0x01, 0x01);
    }
    
    #[test]
    fn test_frame_sequencer() {
        let mut apu = GbApu::new();
        
        // Set up pulse 1 with length counter
        apu.write_register(0xFF11, 0b00_000001); // Length = 1
        apu.write_register(0xFF12, 0xF0); // DAC on
        apu.write_register(0xFF14, 0xC0); // Trigger with length enable
        
        assert!(apu.pulse1.enabled);
        
        // Clock the frame sequencer manually
        for _ in 0..8192 {
            apu.clock();
        }
        
        // Length counter should have been clocked
        // After one frame sequencer step, length should decrease
    }
    
    #[test]
    fn test_pulse2_trigger() {
        let mut apu = GbApu::new();
        
        // Configure pulse 2
        apu.write_register(0xFF16, 0b10_111111); // Duty 50%, length 63
        apu.write_register(0xFF17, 0xF3); // Volume 15, add mode, period 3
        apu.write_register(0xFF18, 0x00); // Freq low
        apu.write_register(0xFF19, 0x87); // Trigger, length enable, freq high
        
        assert!(apu.pulse2.enabled);
        assert_eq!(apu.pulse2.duty, 2); // 50% duty
    }
    
    #[test]
    fn test_wave_channel_enable() {
        let mut apu = GbApu::new();
        
        // Enable DAC
        apu.write_register(0xFF1A, 0x80);
        assert!(apu.wave_dac_enabled);
        
        // Write wave RAM
        for i in 0..16 {
            apu.write_register(0xFF30 + i, i as u8);
        }
        
        // Trigger wave channel
        apu.write_register(0xFF1E, 0x80);
        assert!(apu.wave.enabled);
    }
    
    #[test]
    fn test_noise_channel_modes() {
        let mut apu = GbApu::new();
        
        // Test 7-bit mode
        apu.write_register(0xFF22, 0x08); // Width mode bit set
        assert!(apu.noise.mode);
        
        // Test 15-bit mode
        apu.write_register(0xFF22, 0x00); // Width mode bit clear
        assert!(!apu.noise.mode);
    }
    
    #[test]
    fn test_envelope_increase_mode() {
        let mut apu = GbApu::new();
        
        // Set envelope with increase mode
        apu.write_register(0xFF12, 0x09); // Initial volume 0, add mode, period 1
        apu.write_register(0xFF14, 0x80); // Trigger
        
        // Volume should start at 0
        assert_eq!(apu.pulse1_envelope.volume(), 0);
        
        // Clock envelope
        for _ in 0..8 {
            apu.frame_sequencer_step = 7;
            apu.clock_frame_sequencer();
        }
        
        // Volume should have increased
        assert!(apu.pulse1_envelope.volume() > 0);
    }
    
    #[test]
    fn test_channel_panning() {
        let mut apu = GbApu::new();
        
        // Set panning - all channels to both speakers
        apu.write_register(0xFF25, 0xFF);
        assert_eq!(apu.channel_panning, 0xFF);
        
        // Set panning - channel 1 left only
        apu.write_register(0xFF25, 0x10);
        assert_eq!(apu.channel_panning, 0x10);
    }
    
    #[test]
    fn test_power_off_clears_registers() {
        let mut apu = GbApu::new();
        
        // Set some registers
        apu.write_register(0xFF12, 0xF0);
        apu.write_register(0xFF24, 0x77);
        
        // Turn power off
        apu.write_register(0xFF26, 0x00);
        
        // All state should be cleared
        assert_eq!(apu.left_volume, 0);
        assert_eq!(apu.right_volume, 0);
        assert!(!apu.power_on);
    }
    
    #[test]
    fn test_sweep_unit_integration() {
        let mut apu = GbApu::new();
        
        // Configure sweep
        apu.write_register(0xFF10, 0x11); // Period 1, shift 1
        apu.write_register(0xFF13, 0x00); // Freq low
        apu.write_register(0xFF14, 0x80); // Trigger
        
        // Sweep should be enabled after trigger
        assert!(apu.pulse1_sweep.enabled || apu.pulse1_sweep.period > 0 || apu.pulse1_sweep.shift > 0);
    }

    #[test]
    fn sample_ring_drops_on_full_and_yields_silence_when_empty() {
        let ring = SampleRing::new();
        assert_eq!(ring.pop(), 0.0); // empty -> silence

        for _ in 0..RING_CAPACITY + 10 {
            ring.push(1.0); // push more than capacity; excess must be dropped
        }

        let mut popped = 0;
        while ring.pop() == 1.0 {
            popped += 1;
        }
        assert!(popped < RING_CAPACITY);
        assert!(popped > 0);
    }

    #[test]
    fn step_pushes_a_sample_once_per_downsample_period() {
        let mut apu = GbApu::new();
        apu.set_sample_rate(44_100);
        let ring = apu.sample_ring();
        let cycles = apu.cycles_per_sample.ceil() as u32;
        apu.step(cycles);
        // at least one sample should have been produced
        let mut saw_any = false;
        for _ in 0..4 {
            if ring.pop() != 0.0 {
                saw_any = true;
            }
        }
        let _ = saw_any; // silence is a valid sample too when no channel is active
        assert!(apu.sample_cycle_accum < apu.cycles_per_sample);
    }

    #[test]
    fn noise_period_decodes_divisor_and_shift() {
        assert_eq!(gb_noise_period(0x00), 8); // divisor_code 0 -> 8, shift 0
        assert_eq!(gb_noise_period(0x01), 16); // divisor_code 1 -> 16, shift 0
        assert_eq!(gb_noise_period(0x10), 16); // divisor_code 0 -> 8, shift 1 -> 16
    }
}
