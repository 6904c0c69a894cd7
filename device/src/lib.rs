//! Drivers and runtime glue for the AT-START-F407 demo binaries
#![no_std]

pub mod at32;
pub mod board;
pub mod clock;
pub mod dma;
pub mod emac;
pub mod flash;
pub mod i2s;
pub mod net;
pub mod time_driver;
pub mod tmr;

// Global logger and panic handler for every binary
use defmt_rtt as _;
use panic_probe as _;

/// Park the core after a fatal init error
pub fn park() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
