//! Pin multiplexing

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub IomuxRegisters {
        (0x00 => pub evtout: ReadWrite<u32>),
        (0x04 => pub remap: ReadWrite<u32, REMAP::Register>),
        (0x08 => @END),
    }
}

register_bitfields![u32,
    pub REMAP [
        /// EMAC in RMII mode
        MII_RMII_SEL OFFSET(23) NUMBITS(1) [],
        /// SPI3/I2S3 on PA4, PC10, PC11, PC12
        SPI3_GMUX OFFSET(28) NUMBITS(1) []
    ]
];

pub const IOMUX_BASE: StaticRef<IomuxRegisters> =
    unsafe { StaticRef::new(0x4001_0000 as *const IomuxRegisters) };
