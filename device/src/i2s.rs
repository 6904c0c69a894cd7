//! SPI2/SPI3 in I2S mode and their full-duplex extensions

use atstart_core::i2s::{I2sConfig, Mode, Prescaler};
use tock_registers::interfaces::{ReadWriteable, Writeable};

use crate::at32::StaticRef;
use crate::at32::crm::{APB1, APB2, CRM_BASE};
use crate::at32::gpio::{self, Mode as PinMode, Port};
use crate::at32::iomux::{IOMUX_BASE, REMAP};
use crate::at32::spi::{CTRL2, I2S2EXT_BASE, I2S3EXT_BASE, I2SCTRL, SPI2_BASE, SPI3_BASE, SpiRegisters};

/// One I2S cell
#[derive(Clone, Copy)]
pub struct I2s {
    regs: StaticRef<SpiRegisters>,
    name: &'static str,
}

pub const SPI2: I2s = I2s { regs: SPI2_BASE, name: "spi2" };
pub const SPI3: I2s = I2s { regs: SPI3_BASE, name: "spi3" };
pub const I2S2EXT: I2s = I2s { regs: I2S2EXT_BASE, name: "i2s2ext" };
pub const I2S3EXT: I2s = I2s { regs: I2S3EXT_BASE, name: "i2s3ext" };

impl I2s {
    /// Program `mode`; masters also get the prescaler for `i2s_clk`
    pub fn init(&self, config: &I2sConfig, mode: Mode, i2s_clk: u32) {
        self.regs.i2sctrl.set(config.i2sctrl_bits(mode));
        let prescaler = if mode.is_master() {
            Prescaler::for_rate(i2s_clk, config)
        } else {
            Prescaler::FALLBACK
        };
        self.regs
            .i2sclkp
            .set(prescaler.i2sclkp_bits(config.mclk_output && mode.is_master()));
        if mode.is_master() {
            defmt::info!(
                "{}: {} at {} Hz (asked {} Hz)",
                self.name,
                mode,
                prescaler.actual_rate(i2s_clk, config),
                config.sample_rate_hz
            );
        } else {
            defmt::debug!("{}: {}", self.name, mode);
        }
    }

    /// Data register address for DMA
    pub fn data_register(&self) -> u32 {
        &self.regs.dt as *const _ as u32
    }

    pub fn enable_dma_tx(&self) {
        self.regs.ctrl2.modify(CTRL2::DMATEN::SET);
    }

    pub fn enable_dma_rx(&self) {
        self.regs.ctrl2.modify(CTRL2::DMAREN::SET);
    }

    pub fn enable(&self) {
        self.regs.i2sctrl.modify(I2SCTRL::I2SEN::SET);
    }
}

pub fn enable_clocks() {
    CRM_BASE.apb1en.modify(APB1::SPI2::SET + APB1::SPI3::SET);
}

/// I2S2 on PB12-PB15 as master, I2S3 remapped to PA4/PC10-PC12 as slave
pub fn configure_pins() {
    Port::A.enable_clock();
    Port::B.enable_clock();
    Port::C.enable_clock();
    CRM_BASE.apb2en.modify(APB2::IOMUX::SET);
    IOMUX_BASE.remap.modify(REMAP::SPI3_GMUX::SET);

    // Master: WS, CK and SD driven, ext SD received
    gpio::configure_all(Port::B, &[12, 13, 15], PinMode::MuxPushPull);
    gpio::configure_all(Port::B, &[14], PinMode::PullUp);
    // Slave: WS, CK and SD received, ext SD driven
    gpio::configure_all(Port::A, &[4], PinMode::PullUp);
    gpio::configure_all(Port::C, &[10], PinMode::PullDown);
    gpio::configure_all(Port::C, &[11], PinMode::MuxPushPull);
    gpio::configure_all(Port::C, &[12], PinMode::PullUp);
}
