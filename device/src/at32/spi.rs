//! SPI/I2S cells and the full-duplex I2S extensions

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub SpiRegisters {
        (0x00 => pub ctrl1: ReadWrite<u32>),
        (0x04 => pub ctrl2: ReadWrite<u32, CTRL2::Register>),
        (0x08 => pub sts: ReadWrite<u32>),
        (0x0C => pub dt: ReadWrite<u32>),
        (0x10 => _reserved0),
        /// Built by `I2sConfig::i2sctrl_bits`
        (0x1C => pub i2sctrl: ReadWrite<u32, I2SCTRL::Register>),
        /// Built by `Prescaler::i2sclkp_bits`
        (0x20 => pub i2sclkp: ReadWrite<u32>),
        (0x24 => @END),
    }
}

register_bitfields![u32,
    pub CTRL2 [
        DMAREN OFFSET(0) NUMBITS(1) [],
        DMATEN OFFSET(1) NUMBITS(1) []
    ],
    pub I2SCTRL [
        I2SEN OFFSET(10) NUMBITS(1) [],
        /// I2S rather than SPI
        I2SMSEL OFFSET(11) NUMBITS(1) []
    ]
];

pub const SPI2_BASE: StaticRef<SpiRegisters> =
    unsafe { StaticRef::new(0x4000_3800 as *const SpiRegisters) };
pub const SPI3_BASE: StaticRef<SpiRegisters> =
    unsafe { StaticRef::new(0x4000_3C00 as *const SpiRegisters) };
pub const I2S2EXT_BASE: StaticRef<SpiRegisters> =
    unsafe { StaticRef::new(0x4001_7800 as *const SpiRegisters) };
pub const I2S3EXT_BASE: StaticRef<SpiRegisters> =
    unsafe { StaticRef::new(0x4001_7C00 as *const SpiRegisters) };
