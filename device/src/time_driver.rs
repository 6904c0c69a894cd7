//! embassy-time driver on SysTick
//!
//! SysTick fires at [`TICK_HZ`]; every tick bumps the counter and runs the
//! expired wakers out of a software timer queue.

use core::cell::{Cell, RefCell};
use core::task::Waker;

use atstart_core::clock::{ClockError, systick_reload};
use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::exception;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time_driver::Driver;
use embassy_time_queue_utils::Queue;

pub const TICK_HZ: u32 = embassy_time_driver::TICK_HZ as u32;

struct SysTickDriver {
    ticks: Mutex<CriticalSectionRawMutex, Cell<u64>>,
    queue: Mutex<CriticalSectionRawMutex, RefCell<Queue>>,
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver {
    ticks: Mutex::new(Cell::new(0)),
    queue: Mutex::new(RefCell::new(Queue::new())),
});

impl SysTickDriver {
    fn on_tick(&self) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            let now = ticks.get() + 1;
            ticks.set(now);
            self.queue.borrow(cs).borrow_mut().next_expiration(now);
        });
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        self.ticks.lock(|t| t.get())
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        critical_section::with(|cs| {
            let now = self.ticks.borrow(cs).get();
            let mut queue = self.queue.borrow(cs).borrow_mut();
            if queue.schedule_wake(at, waker) {
                // Already due: fire now rather than on the next tick
                queue.next_expiration(now);
            }
        });
    }
}

/// Start SysTick from HCLK; `Timer` and `Ticker` work from here on
pub fn init(mut syst: SYST, hclk: u32) -> Result<(), ClockError> {
    let reload = systick_reload(hclk, TICK_HZ)?;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(reload);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
    // Owned by the driver from now on
    core::mem::forget(syst);
    defmt::debug!("systick: reload {} at {} Hz", reload, TICK_HZ);
    Ok(())
}

#[exception]
fn SysTick() {
    DRIVER.on_tick();
}
