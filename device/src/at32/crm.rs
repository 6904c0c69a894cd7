//! Clock and reset manager

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use super::StaticRef;

register_structs! {
    pub CrmRegisters {
        (0x00 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        (0x04 => pub cfg: ReadWrite<u32, CFG::Register>),
        (0x08 => pub clkint: ReadWrite<u32>),
        (0x0C => pub apb2rst: ReadWrite<u32, APB2::Register>),
        (0x10 => pub apb1rst: ReadWrite<u32, APB1::Register>),
        (0x14 => pub ahben: ReadWrite<u32, AHB::Register>),
        (0x18 => pub apb2en: ReadWrite<u32, APB2::Register>),
        (0x1C => pub apb1en: ReadWrite<u32, APB1::Register>),
        (0x20 => _reserved0),
        (0x28 => pub ahbrst: ReadWrite<u32, AHB::Register>),
        (0x2C => _reserved1),
        (0x54 => pub misc3: ReadWrite<u32, MISC3::Register>),
        (0x58 => @END),
    }
}

register_bitfields![u32,
    pub CTRL [
        HICKEN OFFSET(0) NUMBITS(1) [],
        HICKSTBL OFFSET(1) NUMBITS(1) [],
        HEXTEN OFFSET(16) NUMBITS(1) [],
        HEXTSTBL OFFSET(17) NUMBITS(1) [],
        HEXTBYPS OFFSET(18) NUMBITS(1) [],
        CFDEN OFFSET(19) NUMBITS(1) [],
        PLLEN OFFSET(24) NUMBITS(1) [],
        PLLSTBL OFFSET(25) NUMBITS(1) []
    ],
    pub CFG [
        SCLKSEL OFFSET(0) NUMBITS(2) [
            Hick = 0,
            Hext = 1,
            Pll = 2
        ],
        SCLKSTS OFFSET(2) NUMBITS(2) [
            Hick = 0,
            Hext = 1,
            Pll = 2
        ],
        AHBDIV OFFSET(4) NUMBITS(4) [],
        APB1DIV OFFSET(8) NUMBITS(3) [],
        APB2DIV OFFSET(11) NUMBITS(3) [],
        /// PLL fed from HEXT instead of HICK/2
        PLLRCS OFFSET(16) NUMBITS(1) [],
        PLLHEXTDIV OFFSET(17) NUMBITS(1) [],
        PLLMULT_L OFFSET(18) NUMBITS(4) [],
        PLLMULT_H OFFSET(29) NUMBITS(2) [],
        /// Output above 72 MHz
        PLLRANGE OFFSET(31) NUMBITS(1) []
    ],
    pub AHB [
        DMA1 OFFSET(0) NUMBITS(1) [],
        EMAC OFFSET(14) NUMBITS(1) [],
        EMACTX OFFSET(15) NUMBITS(1) [],
        EMACRX OFFSET(16) NUMBITS(1) []
    ],
    pub APB2 [
        IOMUX OFFSET(0) NUMBITS(1) [],
        GPIOA OFFSET(2) NUMBITS(1) [],
        GPIOB OFFSET(3) NUMBITS(1) [],
        GPIOC OFFSET(4) NUMBITS(1) [],
        GPIOD OFFSET(5) NUMBITS(1) [],
        GPIOE OFFSET(6) NUMBITS(1) [],
        TMR1 OFFSET(11) NUMBITS(1) []
    ],
    pub APB1 [
        SPI2 OFFSET(14) NUMBITS(1) [],
        SPI3 OFFSET(15) NUMBITS(1) []
    ],
    pub MISC3 [
        /// Step the AHB divider while switching to a fast system clock
        AUTO_STEP_EN OFFSET(4) NUMBITS(2) [
            Disabled = 0,
            Enabled = 3
        ]
    ]
];

pub const CRM_BASE: StaticRef<CrmRegisters> =
    unsafe { StaticRef::new(0x4002_1000 as *const CrmRegisters) };
