//! Ethernet MAC and its DMA engine

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub EmacRegisters {
        // MAC
        (0x0000 => pub ctrl: ReadWrite<u32, MAC_CTRL::Register>),
        (0x0004 => pub frmf: ReadWrite<u32, FRMF::Register>),
        (0x0008 => pub hth: ReadWrite<u32>),
        (0x000C => pub htl: ReadWrite<u32>),
        (0x0010 => pub miiaddr: ReadWrite<u32, MIIADDR::Register>),
        (0x0014 => pub miidt: ReadWrite<u32>),
        (0x0018 => pub fctrl: ReadWrite<u32>),
        (0x001C => _reserved0),
        (0x003C => pub imr: ReadWrite<u32>),
        (0x0040 => pub a0h: ReadWrite<u32>),
        (0x0044 => pub a0l: ReadWrite<u32>),
        (0x0048 => _reserved1),

        // DMA
        (0x1000 => pub dma_bm: ReadWrite<u32, DMA_BM::Register>),
        /// Any write resumes transmission
        (0x1004 => pub dma_tpd: ReadWrite<u32>),
        /// Any write resumes reception
        (0x1008 => pub dma_rpd: ReadWrite<u32>),
        (0x100C => pub dma_rdladdr: ReadWrite<u32>),
        (0x1010 => pub dma_tdladdr: ReadWrite<u32>),
        /// Write 1 to clear
        (0x1014 => pub dma_sts: ReadWrite<u32, DMA_STS::Register>),
        (0x1018 => pub dma_opm: ReadWrite<u32, DMA_OPM::Register>),
        (0x101C => pub dma_ie: ReadWrite<u32, DMA_STS::Register>),
        (0x1020 => @END),
    }
}

register_bitfields![u32,
    pub MAC_CTRL [
        RE OFFSET(2) NUMBITS(1) [],
        TE OFFSET(3) NUMBITS(1) [],
        /// Automatic pad/CRC stripping
        ACS OFFSET(7) NUMBITS(1) [],
        /// Retry disable
        DR OFFSET(9) NUMBITS(1) [],
        /// IPv4 checksum offload
        IPC OFFSET(10) NUMBITS(1) [],
        /// Full duplex
        DM OFFSET(11) NUMBITS(1) [],
        /// 100 Mbit/s
        FES OFFSET(14) NUMBITS(1) []
    ],
    pub FRMF [
        PR OFFSET(0) NUMBITS(1) [],
        RA OFFSET(31) NUMBITS(1) []
    ],
    pub MIIADDR [
        MB OFFSET(0) NUMBITS(1) [],
        MW OFFSET(1) NUMBITS(1) [],
        CR OFFSET(2) NUMBITS(3) [],
        MII OFFSET(6) NUMBITS(5) [],
        PA OFFSET(11) NUMBITS(5) []
    ],
    pub DMA_BM [
        SWR OFFSET(0) NUMBITS(1) [],
        PBL OFFSET(8) NUMBITS(6) [],
        FB OFFSET(16) NUMBITS(1) [],
        AAB OFFSET(25) NUMBITS(1) []
    ],
    pub DMA_STS [
        TI OFFSET(0) NUMBITS(1) [],
        TBU OFFSET(2) NUMBITS(1) [],
        RI OFFSET(6) NUMBITS(1) [],
        RBU OFFSET(7) NUMBITS(1) [],
        AIS OFFSET(15) NUMBITS(1) [],
        NIS OFFSET(16) NUMBITS(1) []
    ],
    pub DMA_OPM [
        SSR OFFSET(1) NUMBITS(1) [],
        SSTC OFFSET(13) NUMBITS(1) [],
        FTF OFFSET(20) NUMBITS(1) [],
        TSF OFFSET(21) NUMBITS(1) [],
        RSF OFFSET(25) NUMBITS(1) []
    ]
];

pub const EMAC_BASE: StaticRef<EmacRegisters> =
    unsafe { StaticRef::new(0x4002_8000 as *const EmacRegisters) };
