//! TMR1 six-step commutation on its complementary outputs.
//!
//! A software hall event every `hall_period_ms` advances the drive pattern;
//! watch CH1-CH3 and CH1N-CH3N on a scope.
#![no_std]
#![no_main]

use atstart_core::board::Led;
use atstart_core::clock::ClockConfig;
use atstart_core::six_step::SixStepConfig;
use atstart_device::at32::{self, interrupt};
use atstart_device::tmr::{self, SixStepPwm};
use atstart_device::{board, clock, park, time_driver};
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker};

/// Highest priority for the hall interrupt
const HALL_PRIORITY: u8 = 0;

#[embassy_executor::task]
async fn hall_events(pwm: SixStepPwm, period: Duration) {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        pwm.trigger_hall();
        defmt::debug!("hall: next {}", tmr::pending_step());
    }
}

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
    for led in Led::ALL {
        leds.on(led);
    }

    let config = SixStepConfig::default();
    let mut pwm = match SixStepPwm::new(&config, &clocks) {
        Ok(pwm) => pwm,
        Err(e) => {
            defmt::error!("tmr1 setup failed: {}", e);
            park();
        }
    };
    pwm.start(&mut cp.NVIC, HALL_PRIORITY);
    defmt::info!("six-step running, hall event every {} ms", config.hall_period_ms);

    spawner
        .spawn(hall_events(pwm, Duration::from_millis(config.hall_period_ms)))
        .unwrap();
}

#[interrupt]
fn TMR1_TRG_HALL_TMR11() {
    tmr::on_hall_interrupt();
}
