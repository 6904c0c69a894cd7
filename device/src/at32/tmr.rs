//! Advanced-control timer TMR1

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub TmrRegisters {
        (0x00 => pub ctrl1: ReadWrite<u32, CTRL1::Register>),
        (0x04 => pub ctrl2: ReadWrite<u32, CTRL2::Register>),
        (0x08 => pub stctrl: ReadWrite<u32>),
        (0x0C => pub iden: ReadWrite<u32, INT::Register>),
        (0x10 => pub ists: ReadWrite<u32, INT::Register>),
        (0x14 => pub swevt: ReadWrite<u32, SWEVT::Register>),
        (0x18 => pub cm1: ReadWrite<u32, CM1::Register>),
        (0x1C => pub cm2: ReadWrite<u32, CM2::Register>),
        /// Channel enables and polarities, see `six_step::Channel`
        (0x20 => pub cctrl: ReadWrite<u32, CCTRL::Register>),
        (0x24 => pub cval: ReadWrite<u32>),
        (0x28 => pub div: ReadWrite<u32>),
        (0x2C => pub pr: ReadWrite<u32>),
        (0x30 => pub rpr: ReadWrite<u32>),
        (0x34 => pub c1dt: ReadWrite<u32>),
        (0x38 => pub c2dt: ReadWrite<u32>),
        (0x3C => pub c3dt: ReadWrite<u32>),
        (0x40 => pub c4dt: ReadWrite<u32>),
        (0x44 => pub brk: ReadWrite<u32, BRK::Register>),
        (0x48 => @END),
    }
}

register_bitfields![u32,
    pub CTRL1 [
        TMREN OFFSET(0) NUMBITS(1) [],
        OVFEN OFFSET(1) NUMBITS(1) [],
        /// 1 = count down
        CNT_DIR OFFSET(4) NUMBITS(1) [],
        TWCMSEL OFFSET(5) NUMBITS(2) [],
        PRBEN OFFSET(7) NUMBITS(1) []
    ],
    pub CTRL2 [
        /// Channel control bits are buffered until a hall event
        CBCTRL OFFSET(0) NUMBITS(1) [],
        /// 0 = the buffer is updated by the software hall trigger only
        CCFS OFFSET(2) NUMBITS(1) [],
        C1IOS OFFSET(8) NUMBITS(1) [],
        C1CIOS OFFSET(9) NUMBITS(1) [],
        C2IOS OFFSET(10) NUMBITS(1) [],
        C2CIOS OFFSET(11) NUMBITS(1) [],
        C3IOS OFFSET(12) NUMBITS(1) [],
        C3CIOS OFFSET(13) NUMBITS(1) []
    ],
    /// Shared by the enable and flag registers; flags clear on writing 0
    pub INT [
        OVF OFFSET(0) NUMBITS(1) [],
        HALL OFFSET(5) NUMBITS(1) []
    ],
    pub SWEVT [
        OVFSWTR OFFSET(0) NUMBITS(1) [],
        HALLSWTR OFFSET(5) NUMBITS(1) []
    ],
    pub CM1 [
        C1OBEN OFFSET(3) NUMBITS(1) [],
        C1OCTRL OFFSET(4) NUMBITS(3) [
            Off = 0b000,
            PwmA = 0b110
        ],
        C2OBEN OFFSET(11) NUMBITS(1) [],
        C2OCTRL OFFSET(12) NUMBITS(3) [
            Off = 0b000,
            PwmA = 0b110
        ]
    ],
    pub CM2 [
        C3OBEN OFFSET(3) NUMBITS(1) [],
        C3OCTRL OFFSET(4) NUMBITS(3) [
            Off = 0b000,
            PwmA = 0b110
        ]
    ],
    pub CCTRL [
        C1EN OFFSET(0) NUMBITS(1) [],
        C1P OFFSET(1) NUMBITS(1) [],
        C1CEN OFFSET(2) NUMBITS(1) [],
        C1CP OFFSET(3) NUMBITS(1) [],
        C2EN OFFSET(4) NUMBITS(1) [],
        C2P OFFSET(5) NUMBITS(1) [],
        C2CEN OFFSET(6) NUMBITS(1) [],
        C2CP OFFSET(7) NUMBITS(1) [],
        C3EN OFFSET(8) NUMBITS(1) [],
        C3P OFFSET(9) NUMBITS(1) [],
        C3CEN OFFSET(10) NUMBITS(1) [],
        C3CP OFFSET(11) NUMBITS(1) []
    ],
    pub BRK [
        DTC OFFSET(0) NUMBITS(8) [],
        /// Write protection level
        WPC OFFSET(8) NUMBITS(2) [],
        FCSODIS OFFSET(10) NUMBITS(1) [],
        FCSOEN OFFSET(11) NUMBITS(1) [],
        BRKEN OFFSET(12) NUMBITS(1) [],
        /// Break input active high
        BRKV OFFSET(13) NUMBITS(1) [],
        AOEN OFFSET(14) NUMBITS(1) [],
        OEN OFFSET(15) NUMBITS(1) []
    ]
];

pub const TMR1_BASE: StaticRef<TmrRegisters> =
    unsafe { StaticRef::new(0x4001_2C00 as *const TmrRegisters) };
