//! DMA1 controller with flexible request mapping

use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub DmaChannelRegisters {
        (0x00 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        (0x04 => pub dtcnt: ReadWrite<u32>),
        (0x08 => pub paddr: ReadWrite<u32>),
        (0x0C => pub maddr: ReadWrite<u32>),
        (0x10 => _reserved),
        (0x14 => @END),
    },
    pub DmaRegisters {
        /// Four flags per channel: global, full, half, error
        (0x00 => pub sts: ReadOnly<u32>),
        (0x04 => pub clr: WriteOnly<u32>),
        (0x08 => pub channel: [DmaChannelRegisters; 7]),
        (0x94 => _reserved0),
        /// Request sources of channels 1-4, one byte each
        (0xA0 => pub src_sel0: ReadWrite<u32>),
        /// Channels 5-7 and the flexible mapping enable
        (0xA4 => pub src_sel1: ReadWrite<u32, SRC_SEL1::Register>),
        (0xA8 => @END),
    }
}

register_bitfields![u32,
    pub CTRL [
        CHEN OFFSET(0) NUMBITS(1) [],
        FDTIEN OFFSET(1) NUMBITS(1) [],
        HDTIEN OFFSET(2) NUMBITS(1) [],
        DTERRIEN OFFSET(3) NUMBITS(1) [],
        /// 1 = memory to peripheral
        DTD OFFSET(4) NUMBITS(1) [],
        /// Circular mode
        LM OFFSET(5) NUMBITS(1) [],
        PINCM OFFSET(6) NUMBITS(1) [],
        MINCM OFFSET(7) NUMBITS(1) [],
        PWIDTH OFFSET(8) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2
        ],
        MWIDTH OFFSET(10) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2
        ],
        CHPL OFFSET(12) NUMBITS(2) [
            Low = 0,
            Medium = 1,
            High = 2,
            VeryHigh = 3
        ],
        M2M OFFSET(14) NUMBITS(1) []
    ],
    pub SRC_SEL1 [
        CH5_SRC OFFSET(0) NUMBITS(8) [],
        CH6_SRC OFFSET(8) NUMBITS(8) [],
        CH7_SRC OFFSET(16) NUMBITS(8) [],
        DMA_FLEX_EN OFFSET(24) NUMBITS(1) []
    ]
];

pub const DMA1_BASE: StaticRef<DmaRegisters> =
    unsafe { StaticRef::new(0x4002_0000 as *const DmaRegisters) };
