//! TMR1 complementary outputs driven by the six-step commutation table

use core::cell::RefCell;

use atstart_core::clock::Clocks;
use atstart_core::six_step::{
    Channel, Commutator, DeadTimeError, Pattern, SixStepConfig, Step, dead_time_bits,
};
use cortex_m::peripheral::NVIC;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::at32::crm::{APB2, CRM_BASE};
use crate::at32::gpio::{self, Mode, Port};
use crate::at32::tmr::{BRK, CM1, CM2, CTRL1, CTRL2, INT, SWEVT, TMR1_BASE};
use crate::at32::{Interrupt, nvic_priority};

/// Step counter shared with the hall interrupt
static COMMUTATOR: Mutex<CriticalSectionRawMutex, RefCell<Commutator>> =
    Mutex::new(RefCell::new(Commutator::new()));

/// TMR1 configured for six-step output
pub struct SixStepPwm {
    _private: (),
}

impl SixStepPwm {
    /// Time base, the three channel pairs, break logic and the hall interrupt.
    ///
    /// Outputs start in "off" mode with every enable set. Each hall event
    /// applies the pattern the previous interrupt preloaded.
    pub fn new(config: &SixStepConfig, clocks: &Clocks) -> Result<Self, DeadTimeError> {
        let dtc = dead_time_bits(config.dead_time_ns, clocks.tmr_apb2())?;
        let tmr = TMR1_BASE;

        CRM_BASE.apb2en.modify(APB2::TMR1::SET);
        Port::A.enable_clock();
        Port::B.enable_clock();
        // CH1-CH3 on PA8-PA10, CH1N-CH3N on PB13-PB15, BRK on PB12
        gpio::configure_all(Port::A, &[8, 9, 10], Mode::MuxPushPull);
        gpio::configure_all(Port::B, &[13, 14, 15], Mode::MuxPushPull);
        gpio::configure_all(Port::B, &[12], Mode::Floating);

        tmr.pr.set(config.period as u32);
        tmr.div.set(config.prescaler as u32);
        tmr.ctrl1.modify(CTRL1::CNT_DIR::CLEAR);
        // Latch the prescaler now rather than at the first overflow
        tmr.swevt.write(SWEVT::OVFSWTR::SET);

        tmr.cm1.modify(CM1::C1OCTRL::Off + CM1::C2OCTRL::Off);
        tmr.cm2.modify(CM2::C3OCTRL::Off);
        // Active high, idle high, both outputs of every pair enabled
        tmr.cctrl.set(Pattern::cctrl_mask());
        tmr.ctrl2.modify(
            CTRL2::C1IOS::SET
                + CTRL2::C1CIOS::SET
                + CTRL2::C2IOS::SET
                + CTRL2::C2CIOS::SET
                + CTRL2::C3IOS::SET
                + CTRL2::C3CIOS::SET,
        );
        let [c1, c2, c3] = config.compare;
        tmr.c1dt.set(c1 as u32);
        tmr.c2dt.set(c2 as u32);
        tmr.c3dt.set(c3 as u32);

        tmr.brk.write(
            BRK::DTC.val(dtc as u32)
                + BRK::WPC.val(0)
                + BRK::FCSODIS::SET
                + BRK::FCSOEN::SET
                + BRK::BRKEN::SET
                + BRK::BRKV::SET
                + BRK::AOEN::SET,
        );

        // Enables and modes are buffered until the next hall event
        tmr.ctrl2.modify(CTRL2::CBCTRL::SET + CTRL2::CCFS::CLEAR);
        tmr.iden.modify(INT::HALL::SET);

        defmt::info!(
            "tmr1: period {} prescaler {} compare {} dead time {:#x}",
            config.period,
            config.prescaler,
            config.compare,
            dtc
        );
        Ok(Self { _private: () })
    }

    /// Unmask the hall interrupt at `priority`, then enable outputs and counter
    pub fn start(&mut self, nvic: &mut NVIC, priority: u8) {
        unsafe {
            nvic.set_priority(Interrupt::TMR1_TRG_HALL_TMR11, nvic_priority(priority));
            NVIC::unmask(Interrupt::TMR1_TRG_HALL_TMR11);
        }
        let tmr = TMR1_BASE;
        tmr.brk.modify(BRK::OEN::SET);
        tmr.ctrl1.modify(CTRL1::TMREN::SET);
    }

    /// Software hall event: transfers the preloaded pattern to the outputs
    pub fn trigger_hall(&self) {
        TMR1_BASE.swevt.write(SWEVT::HALLSWTR::SET);
    }
}

/// Step the next hall event will apply
pub fn pending_step() -> Step {
    COMMUTATOR.lock(|c| c.borrow().step())
}

fn preload(pattern: &Pattern) {
    let tmr = TMR1_BASE;
    for ch in pattern.pwm_channels() {
        match ch {
            Channel::Ch1 => tmr.cm1.modify(CM1::C1OCTRL::PwmA),
            Channel::Ch2 => tmr.cm1.modify(CM1::C2OCTRL::PwmA),
            Channel::Ch3 => tmr.cm2.modify(CM2::C3OCTRL::PwmA),
        }
    }
    let cctrl = tmr.cctrl.get();
    tmr.cctrl
        .set(cctrl & !Pattern::cctrl_mask() | pattern.cctrl_bits());
}

/// Body of the TMR1 trigger/hall interrupt
pub fn on_hall_interrupt() {
    let tmr = TMR1_BASE;
    if !tmr.ists.is_set(INT::HALL) {
        return;
    }
    tmr.ists.set(!(INT::HALL.mask << INT::HALL.shift));
    let pattern = COMMUTATOR.lock(|c| c.borrow_mut().on_hall());
    preload(&pattern);
}
