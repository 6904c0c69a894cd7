//! EMAC bring-up, PHY management and the smoltcp device
//!
//! Frames move through chained descriptor rings in RAM. The CPU owns a
//! descriptor while OWN is clear; handing it back sets OWN and pokes the
//! matching poll-demand register.

use core::ptr;
use core::sync::atomic::{Ordering, fence};

use atstart_core::emac::{
    BUFFER_SIZE, RxStatus, mac_address_registers, rdes0, rx_control, tdes0, tx_frame_status,
};
use atstart_core::net::NetConfig;
use atstart_core::phy::{
    self, Duplex, LinkMode, MdcRange, PhyError, PhyId, Speed, bcr, bsr_autoneg_complete,
    bsr_link_up, reg,
};
use cortex_m::peripheral::NVIC;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use smoltcp::phy::{Checksum, Device, DeviceCapabilities, Medium};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::at32::crm::{AHB, APB2, CRM_BASE};
use crate::at32::emac::{DMA_BM, DMA_OPM, DMA_STS, EMAC_BASE, MAC_CTRL, MIIADDR};
use crate::at32::gpio::{self, Mode, Port};
use crate::at32::iomux::{IOMUX_BASE, REMAP};
use crate::at32::{Interrupt, nvic_priority};

pub const RX_DESCRIPTORS: usize = 4;
pub const TX_DESCRIPTORS: usize = 4;

/// Bus polls for an MDIO transaction
const MDIO_TIMEOUT: u32 = 0x4_0000;
/// Bus polls for the DMA software reset
const DMA_RESET_TIMEOUT: u32 = 0x10_0000;
const PHY_RESET_TIMEOUT: Duration = Duration::from_millis(1000);
const AUTONEG_TIMEOUT: Duration = Duration::from_millis(3000);

static EVENT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum EmacError {
    DmaResetTimeout,
    PhyNotFound,
    PhyResetTimeout,
}

impl From<PhyError> for EmacError {
    fn from(_: PhyError) -> Self {
        EmacError::PhyNotFound
    }
}

#[repr(C, align(4))]
struct Descriptor {
    status: u32,
    control: u32,
    buffer: u32,
    next: u32,
}

impl Descriptor {
    const EMPTY: Descriptor = Descriptor {
        status: 0,
        control: 0,
        buffer: 0,
        next: 0,
    };

    fn status(&self) -> u32 {
        unsafe { ptr::read_volatile(&self.status) }
    }

    fn set_status(&mut self, value: u32) {
        unsafe { ptr::write_volatile(&mut self.status, value) }
    }

    fn set_control(&mut self, value: u32) {
        unsafe { ptr::write_volatile(&mut self.control, value) }
    }
}

/// Descriptors and frame buffers, placed in a static by the caller
#[repr(C, align(4))]
pub struct DescriptorRings {
    rx: [Descriptor; RX_DESCRIPTORS],
    tx: [Descriptor; TX_DESCRIPTORS],
    rx_buf: [[u8; BUFFER_SIZE]; RX_DESCRIPTORS],
    tx_buf: [[u8; BUFFER_SIZE]; TX_DESCRIPTORS],
}

impl DescriptorRings {
    pub const fn new() -> Self {
        Self {
            rx: [Descriptor::EMPTY; RX_DESCRIPTORS],
            tx: [Descriptor::EMPTY; TX_DESCRIPTORS],
            rx_buf: [[0; BUFFER_SIZE]; RX_DESCRIPTORS],
            tx_buf: [[0; BUFFER_SIZE]; TX_DESCRIPTORS],
        }
    }
}

impl Default for DescriptorRings {
    fn default() -> Self {
        Self::new()
    }
}

struct RxRing {
    desc: &'static mut [Descriptor; RX_DESCRIPTORS],
    buf: &'static mut [[u8; BUFFER_SIZE]; RX_DESCRIPTORS],
    next: usize,
}

impl RxRing {
    fn init(&mut self) -> u32 {
        for i in 0..RX_DESCRIPTORS {
            let next = &self.desc[(i + 1) % RX_DESCRIPTORS] as *const Descriptor as u32;
            let d = &mut self.desc[i];
            d.buffer = self.buf[i].as_ptr() as u32;
            d.next = next;
            d.set_control(rx_control(BUFFER_SIZE));
            d.set_status(rdes0::OWN);
        }
        self.next = 0;
        self.desc.as_ptr() as u32
    }

    /// Next complete frame, recycling partial or errored ones on the way
    fn ready(&mut self) -> Option<RxStatus> {
        for _ in 0..RX_DESCRIPTORS {
            let status = RxStatus::from_rdes0(self.desc[self.next].status());
            if status.owned_by_dma {
                return None;
            }
            if status.is_complete() {
                return Some(status);
            }
            defmt::debug!("emac: dropping rx descriptor {}", status);
            self.release();
        }
        None
    }

    fn release(&mut self) {
        fence(Ordering::SeqCst);
        self.desc[self.next].set_status(rdes0::OWN);
        self.next = (self.next + 1) % RX_DESCRIPTORS;
        // Resume a suspended receive DMA
        let emac = EMAC_BASE;
        if emac.dma_sts.is_set(DMA_STS::RBU) {
            emac.dma_sts.write(DMA_STS::RBU::SET);
            emac.dma_rpd.set(0);
        }
    }
}

struct TxRing {
    desc: &'static mut [Descriptor; TX_DESCRIPTORS],
    buf: &'static mut [[u8; BUFFER_SIZE]; TX_DESCRIPTORS],
    next: usize,
}

impl TxRing {
    fn init(&mut self) -> u32 {
        for i in 0..TX_DESCRIPTORS {
            let next = &self.desc[(i + 1) % TX_DESCRIPTORS] as *const Descriptor as u32;
            let d = &mut self.desc[i];
            d.buffer = self.buf[i].as_ptr() as u32;
            d.next = next;
            d.set_control(0);
            d.set_status(tdes0::CHAINED);
        }
        self.next = 0;
        self.desc.as_ptr() as u32
    }

    fn available(&self) -> bool {
        self.desc[self.next].status() & tdes0::OWN == 0
    }

    fn send(&mut self, len: usize) {
        let d = &mut self.desc[self.next];
        d.set_control(len as u32 & 0x1FFF);
        fence(Ordering::SeqCst);
        d.set_status(tx_frame_status());
        self.next = (self.next + 1) % TX_DESCRIPTORS;
        let emac = EMAC_BASE;
        if emac.dma_sts.is_set(DMA_STS::TBU) {
            emac.dma_sts.write(DMA_STS::TBU::SET);
        }
        emac.dma_tpd.set(0);
    }
}

/// MDIO access to one PHY
#[derive(Clone, Copy, Debug, defmt::Format)]
struct Mdio {
    phy: u8,
    cr: u32,
}

impl Mdio {
    fn wait_idle() -> bool {
        let emac = EMAC_BASE;
        (0..MDIO_TIMEOUT).any(|_| !emac.miiaddr.is_set(MIIADDR::MB))
    }

    fn read(&self, register: u8) -> Option<u16> {
        let emac = EMAC_BASE;
        if !Self::wait_idle() {
            return None;
        }
        emac.miiaddr.write(
            MIIADDR::PA.val(self.phy as u32)
                + MIIADDR::MII.val(register as u32)
                + MIIADDR::CR.val(self.cr)
                + MIIADDR::MB::SET,
        );
        Self::wait_idle().then(|| emac.miidt.get() as u16)
    }

    fn write(&self, register: u8, value: u16) -> Option<()> {
        let emac = EMAC_BASE;
        if !Self::wait_idle() {
            return None;
        }
        emac.miidt.set(value as u32);
        emac.miiaddr.write(
            MIIADDR::PA.val(self.phy as u32)
                + MIIADDR::MII.val(register as u32)
                + MIIADDR::CR.val(self.cr)
                + MIIADDR::MW::SET
                + MIIADDR::MB::SET,
        );
        Self::wait_idle().then_some(())
    }
}

/// Ethernet MAC in RMII mode with a clause 22 PHY
pub struct Emac {
    rx: RxRing,
    tx: TxRing,
    mdio: Mdio,
    link_up: bool,
}

/// RMII: REF_CLK PA1, MDIO PA2, CRS_DV PA7, TX_EN PB11, TXD0 PB12, TXD1 PB13,
/// MDC PC1, RXD0 PC4, RXD1 PC5
fn configure_pins() {
    Port::A.enable_clock();
    Port::B.enable_clock();
    Port::C.enable_clock();
    gpio::configure_all(Port::A, &[2], Mode::MuxPushPull);
    gpio::configure_all(Port::A, &[1, 7], Mode::Floating);
    gpio::configure_all(Port::B, &[11, 12, 13], Mode::MuxPushPull);
    gpio::configure_all(Port::C, &[1], Mode::MuxPushPull);
    gpio::configure_all(Port::C, &[4, 5], Mode::Floating);
}

fn apply_link_mode(mode: LinkMode) {
    EMAC_BASE.ctrl.modify(
        MAC_CTRL::FES.val((mode.speed == Speed::Mbps100) as u32)
            + MAC_CTRL::DM.val((mode.duplex == Duplex::Full) as u32),
    );
}

impl Emac {
    /// Clocks, pins, MAC and DMA reset, PHY detection and negotiation, then
    /// start both DMA directions.
    ///
    /// A missing link is not an error: the MAC starts at 100 Mbit/s full
    /// duplex and follows the PHY once the link comes up.
    pub async fn init(
        rings: &'static mut DescriptorRings,
        config: &NetConfig,
        hclk: u32,
        nvic: &mut NVIC,
    ) -> Result<Self, EmacError> {
        let crm = CRM_BASE;
        let emac = EMAC_BASE;

        crm.apb2en.modify(APB2::IOMUX::SET);
        IOMUX_BASE.remap.modify(REMAP::MII_RMII_SEL::SET);
        configure_pins();
        crm.ahben
            .modify(AHB::EMAC::SET + AHB::EMACTX::SET + AHB::EMACRX::SET);
        crm.ahbrst.modify(AHB::EMAC::SET);
        crm.ahbrst.modify(AHB::EMAC::CLEAR);

        emac.dma_bm.modify(DMA_BM::SWR::SET);
        if !(0..DMA_RESET_TIMEOUT).any(|_| !emac.dma_bm.is_set(DMA_BM::SWR)) {
            return Err(EmacError::DmaResetTimeout);
        }

        let cr = MdcRange::for_hclk(hclk)
            .inspect_err(|e| defmt::error!("emac: {}", e))?
            .bits();
        let (mdio, id) = (0..32u8)
            .find_map(|phy| {
                let mdio = Mdio { phy, cr };
                let id1 = mdio.read(reg::ID1)?;
                let id2 = mdio.read(reg::ID2)?;
                PhyId::new(id1, id2).ok().map(|id| (mdio, id))
            })
            .ok_or(EmacError::PhyNotFound)?;
        defmt::info!("emac: phy {} at address {}", id, mdio.phy);

        mdio.write(reg::BCR, bcr::RESET)
            .ok_or(EmacError::PhyResetTimeout)?;
        let deadline = Instant::now() + PHY_RESET_TIMEOUT;
        loop {
            Timer::after_millis(10).await;
            match mdio.read(reg::BCR) {
                Some(v) if v & bcr::RESET == 0 => break,
                _ if Instant::now() > deadline => return Err(EmacError::PhyResetTimeout),
                _ => {}
            }
        }

        let DescriptorRings {
            rx,
            tx,
            rx_buf,
            tx_buf,
        } = rings;
        let mut emac_dev = Emac {
            rx: RxRing {
                desc: rx,
                buf: rx_buf,
                next: 0,
            },
            tx: TxRing {
                desc: tx,
                buf: tx_buf,
                next: 0,
            },
            mdio,
            link_up: false,
        };

        let mode = emac_dev.negotiate().await.unwrap_or_else(|| {
            defmt::warn!("emac: no link, assuming 100 Mbit/s full duplex");
            LinkMode::FULL_100
        });
        emac_dev.link_up = emac_dev.read_link();

        // MAC: checksum offload, pad/CRC strip, no retries in half duplex
        emac.ctrl
            .write(MAC_CTRL::IPC::SET + MAC_CTRL::ACS::SET + MAC_CTRL::DR::SET);
        apply_link_mode(mode);
        let (high, low) = mac_address_registers(config.mac);
        emac.a0h.set(high);
        emac.a0l.set(low);

        emac.dma_rdladdr.set(emac_dev.rx.init());
        emac.dma_tdladdr.set(emac_dev.tx.init());
        emac.dma_bm
            .write(DMA_BM::PBL.val(32) + DMA_BM::FB::SET + DMA_BM::AAB::SET);
        // Store and forward, required by checksum insertion
        emac.dma_opm.write(DMA_OPM::TSF::SET + DMA_OPM::RSF::SET);
        emac.dma_ie
            .write(DMA_STS::NIS::SET + DMA_STS::RI::SET + DMA_STS::TI::SET);
        unsafe {
            nvic.set_priority(Interrupt::EMAC, nvic_priority(1));
            NVIC::unmask(Interrupt::EMAC);
        }

        emac.ctrl.modify(MAC_CTRL::TE::SET);
        emac.dma_opm.modify(DMA_OPM::FTF::SET);
        if !(0..DMA_RESET_TIMEOUT).any(|_| !emac.dma_opm.is_set(DMA_OPM::FTF)) {
            defmt::warn!("emac: tx fifo flush timed out");
        }
        emac.ctrl.modify(MAC_CTRL::RE::SET);
        emac.dma_opm.modify(DMA_OPM::SSTC::SET + DMA_OPM::SSR::SET);

        defmt::info!(
            "emac: started, {} link {}",
            mode,
            if emac_dev.link_up { "up" } else { "down" }
        );
        Ok(emac_dev)
    }

    /// Restart auto-negotiation and wait for its result
    async fn negotiate(&mut self) -> Option<LinkMode> {
        self.mdio
            .write(reg::BCR, bcr::AUTONEG_ENABLE | bcr::RESTART_AUTONEG)?;
        let deadline = Instant::now() + AUTONEG_TIMEOUT;
        loop {
            let bsr = self.mdio.read(reg::BSR)?;
            if bsr_autoneg_complete(bsr) && bsr_link_up(bsr) {
                break;
            }
            if Instant::now() > deadline {
                return None;
            }
            Timer::after_millis(50).await;
        }
        self.resolved_mode()
    }

    fn resolved_mode(&self) -> Option<LinkMode> {
        let bcr = self.mdio.read(reg::BCR)?;
        if bcr & phy::bcr::AUTONEG_ENABLE == 0 {
            return Some(LinkMode::from_bcr(bcr));
        }
        let anar = self.mdio.read(reg::ANAR)?;
        let anlpar = self.mdio.read(reg::ANLPAR)?;
        LinkMode::resolve(anar, anlpar)
    }

    /// BSR link status latches low; the second read is current
    fn read_link(&self) -> bool {
        let _ = self.mdio.read(reg::BSR);
        self.mdio.read(reg::BSR).is_some_and(bsr_link_up)
    }

    /// Poll the PHY, retuning the MAC when the link comes back up.
    /// Returns the current link state.
    pub fn poll_link(&mut self) -> bool {
        let up = self.read_link();
        if up && !self.link_up {
            if let Some(mode) = self.resolved_mode() {
                defmt::info!("emac: link up, {}", mode);
                apply_link_mode(mode);
            }
        } else if !up && self.link_up {
            defmt::info!("emac: link down");
        }
        self.link_up = up;
        up
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }
}

/// Wait for a receive or transmit completion interrupt
pub async fn wait_event() {
    EVENT.wait().await;
}

/// Body of the EMAC interrupt handler
pub fn on_interrupt() {
    let emac = EMAC_BASE;
    let sts = emac.dma_sts.get();
    // Write-one-to-clear every pending bit
    emac.dma_sts.set(sts);
    EVENT.signal(());
}

pub struct EmacRxToken<'a> {
    ring: &'a mut RxRing,
    len: usize,
}

impl smoltcp::phy::RxToken for EmacRxToken<'_> {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        fence(Ordering::SeqCst);
        let result = f(&self.ring.buf[self.ring.next][..self.len]);
        self.ring.release();
        result
    }
}

pub struct EmacTxToken<'a> {
    ring: &'a mut TxRing,
}

impl smoltcp::phy::TxToken for EmacTxToken<'_> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let len = len.min(BUFFER_SIZE);
        let result = f(&mut self.ring.buf[self.ring.next][..len]);
        self.ring.send(len);
        result
    }
}

impl Device for Emac {
    type RxToken<'a>
        = EmacRxToken<'a>
    where
        Self: 'a;
    type TxToken<'a>
        = EmacTxToken<'a>
    where
        Self: 'a;

    fn receive(
        &mut self,
        _timestamp: smoltcp::time::Instant,
    ) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        if !self.tx.available() {
            return None;
        }
        let status = self.rx.ready()?;
        Some((
            EmacRxToken {
                ring: &mut self.rx,
                len: status.payload_len(),
            },
            EmacTxToken { ring: &mut self.tx },
        ))
    }

    fn transmit(&mut self, _timestamp: smoltcp::time::Instant) -> Option<Self::TxToken<'_>> {
        self.tx
            .available()
            .then(|| EmacTxToken { ring: &mut self.tx })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = 1514;
        caps.max_burst_size = Some(TX_DESCRIPTORS);
        // The MAC inserts every checksum on transmit
        caps.checksum.ipv4 = Checksum::Rx;
        caps.checksum.tcp = Checksum::Rx;
        caps.checksum.udp = Checksum::Rx;
        caps.checksum.icmpv4 = Checksum::Rx;
        caps
    }
}
