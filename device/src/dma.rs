//! DMA1 channels with flexible request mapping and completion signals

use core::sync::atomic::{Ordering, compiler_fence};

use cortex_m::peripheral::NVIC;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::at32::crm::{AHB, CRM_BASE};
use crate::at32::dma::{CTRL, DMA1_BASE, DmaChannelRegisters, SRC_SEL1};
use crate::at32::{Interrupt, nvic_priority};

const CHANNELS: usize = 7;

static FULL_TRANSFER: [Signal<CriticalSectionRawMutex, ()>; CHANNELS] =
    [const { Signal::new() }; CHANNELS];

/// Flexible mapping request sources
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum Request {
    Spi2Tx = 0x0C,
    Spi3Rx = 0x0D,
    I2s2extRx = 0x11,
    I2s3extTx = 0x14,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Direction {
    PeripheralToMemory,
    MemoryToPeripheral,
}

pub fn enable_clock() {
    CRM_BASE.ahben.modify(AHB::DMA1::SET);
}

/// One DMA1 channel, numbered 1-7 as in the reference manual
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Channel(u8);

impl Channel {
    pub const CH1: Channel = Channel(1);
    pub const CH2: Channel = Channel(2);
    pub const CH3: Channel = Channel(3);
    pub const CH4: Channel = Channel(4);

    fn index(self) -> usize {
        self.0 as usize - 1
    }

    fn regs(self) -> &'static DmaChannelRegisters {
        &DMA1_BASE.get().channel[self.index()]
    }

    /// Status and clear bits of this channel: global, full, half, error
    fn flag_shift(self) -> u32 {
        4 * self.index() as u32
    }

    /// Disable and return every register to its reset value
    pub fn reset(self) {
        let regs = self.regs();
        regs.ctrl.set(0);
        regs.dtcnt.set(0);
        regs.paddr.set(0);
        regs.maddr.set(0);
        self.clear_flags();
    }

    /// Route `request` to this channel through the flexible mapping
    pub fn select_request(self, request: Request) {
        let dma = DMA1_BASE;
        dma.src_sel1.modify(SRC_SEL1::DMA_FLEX_EN::SET);
        let shift = 8 * (self.index() % 4) as u32;
        if self.index() < 4 {
            let sel = dma.src_sel0.get() & !(0xFF << shift);
            dma.src_sel0.set(sel | (request as u32) << shift);
        } else {
            let sel = dma.src_sel1.get() & !(0xFF << shift);
            dma.src_sel1.set(sel | (request as u32) << shift);
        }
    }

    /// Single-shot halfword transfer between a peripheral data register and
    /// `len` halfwords at `mem`: memory increment, high priority, no loop mode.
    ///
    /// ## Safety
    ///
    /// `mem` must stay valid, and untouched by the CPU, until the transfer
    /// completes.
    pub unsafe fn configure_halfword(self, direction: Direction, periph: u32, mem: *mut u16, len: u16) {
        let regs = self.regs();
        regs.paddr.set(periph);
        regs.maddr.set(mem as u32);
        regs.dtcnt.set(len as u32);
        let dtd = match direction {
            Direction::PeripheralToMemory => CTRL::DTD::CLEAR,
            Direction::MemoryToPeripheral => CTRL::DTD::SET,
        };
        regs.ctrl.write(
            dtd + CTRL::LM::CLEAR
                + CTRL::PINCM::CLEAR
                + CTRL::MINCM::SET
                + CTRL::PWIDTH::HalfWord
                + CTRL::MWIDTH::HalfWord
                + CTRL::CHPL::High,
        );
    }

    pub fn enable(self) {
        compiler_fence(Ordering::SeqCst);
        self.regs().ctrl.modify(CTRL::CHEN::SET);
    }

    pub fn is_full_transfer_done(self) -> bool {
        DMA1_BASE.sts.get() & 1 << (self.flag_shift() + 1) != 0
    }

    pub fn clear_flags(self) {
        DMA1_BASE.clr.set(0xF << self.flag_shift());
    }

    /// Raise `irq` at `priority` when the full transfer completes
    pub fn listen_full_transfer(self, nvic: &mut NVIC, irq: Interrupt, priority: u8) {
        FULL_TRANSFER[self.index()].reset();
        self.regs().ctrl.modify(CTRL::FDTIEN::SET);
        unsafe {
            nvic.set_priority(irq, nvic_priority(priority));
            NVIC::unmask(irq);
        }
    }

    pub async fn wait_full_transfer(self) {
        FULL_TRANSFER[self.index()].wait().await;
        compiler_fence(Ordering::SeqCst);
    }

    /// Body of the channel's interrupt handler
    pub fn on_interrupt(self) {
        if self.is_full_transfer_done() {
            self.clear_flags();
            self.regs().ctrl.modify(CTRL::FDTIEN::CLEAR);
            FULL_TRANSFER[self.index()].signal(());
        }
    }
}
