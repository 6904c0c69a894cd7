//! Device interrupt numbers and the vector table entries the demos use

use cortex_m::interrupt::InterruptNumber;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
#[repr(u16)]
pub enum Interrupt {
    DMA1_CHANNEL2 = 12,
    DMA1_CHANNEL3 = 13,
    TMR1_TRG_HALL_TMR11 = 26,
    EMAC = 61,
}

unsafe impl InterruptNumber for Interrupt {
    fn number(self) -> u16 {
        self as u16
    }
}

unsafe extern "C" {
    fn DMA1_CHANNEL2();
    fn DMA1_CHANNEL3();
    fn TMR1_TRG_HALL_TMR11();
    fn EMAC();
}

#[doc(hidden)]
pub union Vector {
    handler: unsafe extern "C" fn(),
    reserved: usize,
}

const NONE: Vector = Vector { reserved: 0 };
const IRQ_COUNT: usize = 85;

const fn vectors() -> [Vector; IRQ_COUNT] {
    let mut v = [NONE; IRQ_COUNT];
    v[Interrupt::DMA1_CHANNEL2 as usize] = Vector { handler: DMA1_CHANNEL2 };
    v[Interrupt::DMA1_CHANNEL3 as usize] = Vector { handler: DMA1_CHANNEL3 };
    v[Interrupt::TMR1_TRG_HALL_TMR11 as usize] = Vector {
        handler: TMR1_TRG_HALL_TMR11,
    };
    v[Interrupt::EMAC as usize] = Vector { handler: EMAC };
    v
}

#[doc(hidden)]
#[unsafe(link_section = ".vector_table.interrupts")]
#[unsafe(no_mangle)]
pub static __INTERRUPTS: [Vector; IRQ_COUNT] = vectors();
