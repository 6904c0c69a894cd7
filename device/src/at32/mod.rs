//! AT32F403A/407 register blocks
//!
//! There is no PAC or HAL for this family in the embedded Rust ecosystem, so
//! the peripherals the demo binaries touch are described here with
//! `tock-registers`. Only the fields actually programmed are named.

pub mod crm;
pub mod dma;
pub mod emac;
pub mod flash;
pub mod gpio;
pub mod iomux;
pub mod irq;
pub mod spi;
pub mod tmr;

pub use irq::Interrupt;
// `#[interrupt]` handlers in the binaries check their name against the enum
pub use cortex_m_rt::interrupt;
pub use irq::Interrupt as interrupt;

use core::ops::Deref;

/// Reference to a register block at a fixed address
#[derive(Debug)]
pub struct StaticRef<T> {
    ptr: *const T,
}

impl<T> StaticRef<T> {
    /// ## Safety
    ///
    /// `ptr` must be aligned, non-null, and point at `T` for the whole
    /// program.
    pub const unsafe fn new(ptr: *const T) -> StaticRef<T> {
        StaticRef { ptr }
    }

    pub fn get(self) -> &'static T
    where
        T: 'static,
    {
        unsafe { &*self.ptr }
    }
}

impl<T> Clone for StaticRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StaticRef<T> {}

impl<T> Deref for StaticRef<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.ptr }
    }
}

// Register blocks only hold volatile cells
unsafe impl<T> Send for StaticRef<T> {}
unsafe impl<T> Sync for StaticRef<T> {}

/// NVIC priority group 4: four bits of pre-emption priority, no sub-priority
pub fn set_priority_group_4(scb: &mut cortex_m::peripheral::SCB) {
    const VECTKEY: u32 = 0x05FA << 16;
    const PRIGROUP_4: u32 = 3 << 8;
    unsafe { scb.aircr.write(VECTKEY | PRIGROUP_4) };
}

/// Pre-emption priority 0-15 in the four implemented NVIC bits
pub const fn nvic_priority(level: u8) -> u8 {
    (level & 0xF) << 4
}
