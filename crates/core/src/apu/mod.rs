//! Core APU (Audio Processing Unit) components.
//!
//! Reusable audio synthesis building blocks shared by the emulated systems
//! in this workspace: a volume envelope, a frequency sweep unit, a length
//! counter, and the pulse/wave/noise channel generators they drive.

pub mod envelope;
pub mod length_counter;
pub mod noise;
pub mod pulse;
pub mod sweep;
pub mod wave;

pub use envelope::Envelope;
pub use length_counter::{LengthCounter, LENGTH_TABLE};
pub use noise::NoiseChannel;
pub use pulse::PulseChannel;
pub use sweep::SweepUnit;
pub use wave::WaveChannel;
