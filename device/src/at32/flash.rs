//! Flash memory controller, bank 1

use tock_registers::registers::{ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub FlashRegisters {
        (0x00 => pub psr: ReadWrite<u32>),
        (0x04 => pub unlock: WriteOnly<u32>),
        (0x08 => pub usd_unlock: WriteOnly<u32>),
        (0x0C => pub sts: ReadWrite<u32, STS::Register>),
        (0x10 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        (0x14 => pub addr: ReadWrite<u32>),
        (0x18 => @END),
    }
}

register_bitfields![u32,
    pub STS [
        OBF OFFSET(0) NUMBITS(1) [],
        /// Write 1 to clear
        PRGMERR OFFSET(2) NUMBITS(1) [],
        EPPERR OFFSET(4) NUMBITS(1) [],
        ODF OFFSET(5) NUMBITS(1) []
    ],
    pub CTRL [
        FPRGM OFFSET(0) NUMBITS(1) [],
        SECERS OFFSET(1) NUMBITS(1) [],
        BANKERS OFFSET(2) NUMBITS(1) [],
        ERSTR OFFSET(6) NUMBITS(1) [],
        OPLK OFFSET(7) NUMBITS(1) []
    ]
];

pub const FLASH_BASE: StaticRef<FlashRegisters> =
    unsafe { StaticRef::new(0x4002_2000 as *const FlashRegisters) };

pub const UNLOCK_KEY1: u32 = 0x4567_0123;
pub const UNLOCK_KEY2: u32 = 0xCDEF_89AB;
