//! I2S full-duplex loopback over DMA.
//!
//! SPI2 (master) and SPI3 (slave) exchange a ramp in both directions
//! through their ext cells. LED2 lights when both received buffers match.
//! Wire PB12-PB15 to PA4/PC10-PC12.
#![no_std]
#![no_main]

use atstart_core::board::Led;
use atstart_core::clock::ClockConfig;
use atstart_core::i2s::{BUFFER_LEN, I2sConfig, LoopbackReport, Mode, fill_tx};
use atstart_device::at32::{self, Interrupt, interrupt};
use atstart_device::dma::{self, Channel, Direction, Request};
use atstart_device::i2s::{self, I2S2EXT, I2S3EXT, SPI2, SPI3};
use atstart_device::{board, clock, park, time_driver};
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_time::{Duration, with_timeout};
use static_cell::ConstStaticCell;

const DMA_PRIORITY: u8 = 2;
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(1);

/// SPI2 TX, I2S2EXT RX
const I2S2_TX: Channel = Channel::CH1;
const I2S2_RX: Channel = Channel::CH2;
/// SPI3 RX, I2S3EXT TX
const I2S3_RX: Channel = Channel::CH3;
const I2S3_TX: Channel = Channel::CH4;

struct Buffers {
    i2s2_tx: [u16; BUFFER_LEN],
    i2s2_rx: [u16; BUFFER_LEN],
    i2s3_tx: [u16; BUFFER_LEN],
    i2s3_rx: [u16; BUFFER_LEN],
}

static BUFFERS: ConstStaticCell<Buffers> = ConstStaticCell::new(Buffers {
    i2s2_tx: [0; BUFFER_LEN],
    i2s2_rx: [0; BUFFER_LEN],
    i2s3_tx: [0; BUFFER_LEN],
    i2s3_rx: [0; BUFFER_LEN],
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let Some(mut cp) = cortex_m::Peripherals::take() else {
        park();
    };
    at32::set_priority_group_4(&mut cp.SCB);

    let clocks = match clock::init(&ClockConfig::default()) {
        Ok(clocks) => clocks,
        Err(e) => {
            defmt::error!("clock init failed: {}", e);
            park();
        }
    };
    if let Err(e) = time_driver::init(cp.SYST, clocks.hclk) {
        defmt::error!("systick init failed: {}", e);
        park();
    }
    let mut leds = board::init();

    let buffers = BUFFERS.take();
    fill_tx(&mut buffers.i2s2_tx, &mut buffers.i2s3_tx);

    i2s::configure_pins();
    i2s::enable_clocks();
    dma::enable_clock();

    let len = BUFFER_LEN as u16;
    let transfers = [
        (I2S2_TX, Request::Spi2Tx, Direction::MemoryToPeripheral, SPI2.data_register(), buffers.i2s2_tx.as_mut_ptr()),
        (I2S2_RX, Request::I2s2extRx, Direction::PeripheralToMemory, I2S2EXT.data_register(), buffers.i2s2_rx.as_mut_ptr()),
        (I2S3_RX, Request::Spi3Rx, Direction::PeripheralToMemory, SPI3.data_register(), buffers.i2s3_rx.as_mut_ptr()),
        (I2S3_TX, Request::I2s3extTx, Direction::MemoryToPeripheral, I2S3EXT.data_register(), buffers.i2s3_tx.as_mut_ptr()),
    ];
    for (channel, request, direction, periph, mem) in transfers {
        channel.reset();
        channel.select_request(request);
        // The buffers are static and only read back after both receive
        // channels report completion
        unsafe { channel.configure_halfword(direction, periph, mem, len) };
    }

    let config = I2sConfig::default();
    SPI2.init(&config, Mode::MasterTx, clocks.sclk);
    I2S2EXT.init(&config, Mode::SlaveRx, clocks.sclk);
    SPI3.init(&config, Mode::SlaveRx, clocks.sclk);
    I2S3EXT.init(&config, Mode::SlaveTx, clocks.sclk);

    I2S2_RX.listen_full_transfer(&mut cp.NVIC, Interrupt::DMA1_CHANNEL2, DMA_PRIORITY);
    I2S3_RX.listen_full_transfer(&mut cp.NVIC, Interrupt::DMA1_CHANNEL3, DMA_PRIORITY);

    SPI2.enable_dma_tx();
    I2S2EXT.enable_dma_rx();
    SPI3.enable_dma_rx();
    I2S3EXT.enable_dma_tx();
    for (channel, ..) in transfers {
        channel.enable();
    }

    // Slaves first so they are listening when the master starts the clock
    SPI3.enable();
    I2S3EXT.enable();
    I2S2EXT.enable();
    SPI2.enable();

    let done = join(I2S2_RX.wait_full_transfer(), I2S3_RX.wait_full_transfer());
    if with_timeout(TRANSFER_TIMEOUT, done).await.is_err() {
        defmt::error!("i2s: transfer timed out, check the loopback wiring");
        park();
    }

    let report = LoopbackReport::check(
        &buffers.i2s2_rx,
        &buffers.i2s3_tx,
        &buffers.i2s3_rx,
        &buffers.i2s2_tx,
    );
    if report.passed() {
        defmt::info!("i2s: loopback passed");
    } else {
        defmt::error!("i2s: loopback failed: {}", report);
    }
    leds.set(Led::Led2, report.passed());
}

#[interrupt]
fn DMA1_CHANNEL2() {
    I2S2_RX.on_interrupt();
}

#[interrupt]
fn DMA1_CHANNEL3() {
    I2S3_RX.on_interrupt();
}
