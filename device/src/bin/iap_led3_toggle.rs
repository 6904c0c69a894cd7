//! Application image for the IAP bootloader.
//!
//! Linked at 0x0801_0000. Clears the bootloader's upgrade flag on boot,
//! answers ping at 192.168.81.37 and toggles LED3 every 500 ms. Sending
//! `upgrade` to TCP port 5002 sets the flag again and resets into the
//! bootloader.
#![no_std]
#![no_main]

use atstart_core::board::Led;
use atstart_core::clock::ClockConfig;
use atstart_core::iap::{APP_ORIGIN, FlagState, UpgradeFlag};
use atstart_core::net::NetConfig;
use atstart_device::at32::{self, interrupt};
use atstart_device::emac::{self, DescriptorRings, Emac};
use atstart_device::flash::Flash;
use atstart_device::net::upgrade::UpgradeListener;
use atstart_device::net::{self, NetStack, Service};
use atstart_device::{board, clock, park, time_driver};
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker};
use static_cell::ConstStaticCell;

const TOGGLE_PERIOD: Duration = Duration::from_millis(500);

static RINGS: ConstStaticCell<DescriptorRings> = ConstStaticCell::new(DescriptorRings::new());

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let Some(mut cp) = cortex_m::Peripherals::take() else {
        park();
    };
    // The bootloader jumps here with its own vector table still selected
    unsafe { cp.SCB.vtor.write(APP_ORIGIN) };
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

    let mut flash = Flash::new();
    match UpgradeFlag::new().check_and_clear(&mut flash) {
        Ok(FlagState::Clear) => defmt::info!("iap: no upgrade pending"),
        Ok(FlagState::Cleared(value)) => defmt::info!("iap: cleared upgrade flag {:#x}", value),
        Err(e) => defmt::warn!("iap: upgrade flag not cleared: {}", e),
    }

    let config = NetConfig::default();
    let device = match Emac::init(RINGS.take(), &config, clocks.hclk, &mut cp.NVIC).await {
        Ok(device) => device,
        Err(e) => {
            defmt::error!("emac init failed: {}", e);
            park();
        }
    };
    let mut stack = NetStack::new(device, &config);
    let listener = UpgradeListener::new(&mut stack, flash);
    spawner.spawn(net::run(stack, Service::Upgrade(listener))).unwrap();

    let mut ticker = Ticker::every(TOGGLE_PERIOD);
    loop {
        leds.toggle(Led::Led3);
        ticker.next().await;
    }
}

#[interrupt]
fn EMAC() {
    emac::on_interrupt();
}
