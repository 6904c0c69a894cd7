//! iperf2 TCP server at 192.168.81.37:5001.
//!
//! Run `iperf -c 192.168.81.37` (or atstart-host) against it. The LED
//! chase runs fast while the link is up and slow while it is down.
#![no_std]
#![no_main]

use atstart_core::chase::{BlinkSpeed, Chase};
use atstart_core::clock::ClockConfig;
use atstart_core::net::NetConfig;
use atstart_device::at32::{self, interrupt};
use atstart_device::emac::{self, DescriptorRings, Emac};
use atstart_device::net::iperf::{IperfConfig, IperfServer};
use atstart_device::net::{self, NetStack, Service};
use atstart_device::{board, clock, park, time_driver};
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use static_cell::ConstStaticCell;

static RINGS: ConstStaticCell<DescriptorRings> = ConstStaticCell::new(DescriptorRings::new());

#[embassy_executor::main]
async fn main(spawner: Spawner) {
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

    let config = NetConfig::default();
    let device = match Emac::init(RINGS.take(), &config, clocks.hclk, &mut cp.NVIC).await {
        Ok(device) => device,
        Err(e) => {
            defmt::error!("emac init failed: {}", e);
            park();
        }
    };
    let mut stack = NetStack::new(device, &config);
    let server = IperfServer::new(&mut stack, &IperfConfig::default());
    spawner.spawn(net::run(stack, Service::Iperf(server))).unwrap();

    let mut chase = Chase::new(BlinkSpeed::for_link(net::link_up()));
    loop {
        chase.set_speed(BlinkSpeed::for_link(net::link_up()));
        let (led, delay_ms) = chase.step();
        leds.toggle(led);
        Timer::after(Duration::from_millis(delay_ms as u64)).await;
    }
}

#[interrupt]
fn EMAC() {
    emac::on_interrupt();
}
