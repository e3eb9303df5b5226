//! Game Boy Memory Bank Controllers (MBCs)
//!
//! This module contains implementations of various Game Boy cartridge mappers
//! that handle ROM/RAM banking and other cartridge hardware features.

mod mbc0;
mod mbc1;
mod mbc3;

pub use mbc0::Mbc0;
pub use mbc1::Mbc1;
pub use mbc3::Mbc3;

use serde::{Deserialize, Serialize};

/// Unified mapper enum that dispatches to specific implementations.
///
/// Scope is deliberately narrow: `None` (no banking), `Mbc1`, and `Mbc3`
/// cover the overwhelming majority of licensed cartridges. A cartridge-type
/// byte this core doesn't recognize loads as `Mapper::None`, which behaves
/// correctly for anything that fits without banking and degrades gracefully
/// (but incorrectly) for anything larger.
#[derive(Debug, Serialize, Deserialize)]
pub enum Mapper {
    None(Mbc0),
    Mbc1(Mbc1),
    Mbc3(Mbc3),
}

impl Mapper {
    /// Create a mapper from ROM data and the cartridge-type header byte (0x147).
    pub fn from_cart(rom: Vec<u8>, ram: Vec<u8>, cart_type: u8) -> Self {
        match cart_type {
            0x00 => Mapper::None(Mbc0::new(rom, ram)),
            0x01..=0x03 => Mapper::Mbc1(Mbc1::new(rom, ram)),
            0x0F..=0x13 => Mapper::Mbc3(Mbc3::new(rom, ram)),
            other => {
                log::warn!(
                    "cartridge type 0x{:02X} is not a supported mapper; loading as a plain ROM",
                    other
                );
                Mapper::None(Mbc0::new(rom, ram))
            }
        }
    }

    /// Read from ROM address space
    pub fn read_rom(&self, addr: u16) -> u8 {
        match self {
            Mapper::None(m) => m.read_rom(addr),
            Mapper::Mbc1(m) => m.read_rom(addr),
            Mapper::Mbc3(m) => m.read_rom(addr),
        }
    }

    /// Write to ROM address space (for mapper registers)
    pub fn write_rom(&mut self, addr: u16, val: u8) {
        match self {
            Mapper::None(m) => m.write_rom(addr, val),
            Mapper::Mbc1(m) => m.write_rom(addr, val),
            Mapper::Mbc3(m) => m.write_rom(addr, val),
        }
    }

    /// Read from RAM address space
    pub fn read_ram(&self, addr: u16) -> u8 {
        match self {
            Mapper::None(m) => m.read_ram(addr),
            Mapper::Mbc1(m) => m.read_ram(addr),
            Mapper::Mbc3(m) => m.read_ram(addr),
        }
    }

    /// Write to RAM address space
    pub fn write_ram(&mut self, addr: u16, val: u8) {
        match self {
            Mapper::None(m) => m.write_ram(addr, val),
            Mapper::Mbc1(m) => m.write_ram(addr, val),
            Mapper::Mbc3(m) => m.write_ram(addr, val),
        }
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        match self {
            Mapper::None(_) => "None",
            Mapper::Mbc1(_) => "MBC1",
            Mapper::Mbc3(_) => "MBC3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_from_cart_type() {
        let mapper = Mapper::from_cart(vec![0; 0x8000], vec![], 0x00);
        assert_eq!(mapper.name(), "None");

        for t in [0x01, 0x02, 0x03] {
            let mapper = Mapper::from_cart(vec![0; 0x8000], vec![], t);
            assert_eq!(mapper.name(), "MBC1");
        }

        for t in [0x0F, 0x11, 0x13] {
            let mapper = Mapper::from_cart(vec![0; 0x8000], vec![], t);
            assert_eq!(mapper.name(), "MBC3");
        }

        // An unsupported cartridge type falls back to a plain ROM mapper.
        let mapper = Mapper::from_cart(vec![0; 0x8000], vec![], 0x19);
        assert_eq!(mapper.name(), "None");
    }

    #[test]
    fn test_mapper_delegation() {
        let mut rom = vec![0; 0x8000];
        rom[0] = 0xAA;
        rom[0x4000] = 0xBB;

        let mapper = Mapper::from_cart(rom, vec![], 0x00);

        assert_eq!(mapper.read_rom(0x0000), 0xAA);
        assert_eq!(mapper.read_rom(0x4000), 0xBB);
    }
}
