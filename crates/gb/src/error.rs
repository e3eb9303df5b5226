//! Host-boundary error taxonomy.
//!
//! Nothing inside the core is fatal: bus reads, CPU steps, and PPU/APU ticks
//! are infallible and clamp/log/continue instead. `GbError` only covers the
//! file I/O and save-state decode operations that sit at the host boundary.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum GbError {
    #[error("failed to read ROM {path}")]
    RomRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read save RAM {path}")]
    SaveRamRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write save RAM {path}")]
    SaveRamWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode save state")]
    SaveStateDecode {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
