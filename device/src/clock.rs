//! System clock bring-up: HEXT through the PLL to 240 MHz

use atstart_core::clock::{ClockConfig, ClockError, Clocks, pll_mult_bits};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::at32::crm::{CFG, CRM_BASE, CTRL, MISC3};

/// Polls before giving up on an oscillator or clock switch
const STARTUP_TIMEOUT: u32 = 0x30_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum ClockInitError {
    Config(ClockError),
    HextTimeout,
    PllTimeout,
    SwitchTimeout,
}

impl From<ClockError> for ClockInitError {
    fn from(e: ClockError) -> Self {
        ClockInitError::Config(e)
    }
}

fn wait_for(mut done: impl FnMut() -> bool, err: ClockInitError) -> Result<(), ClockInitError> {
    for _ in 0..STARTUP_TIMEOUT {
        if done() {
            return Ok(());
        }
    }
    Err(err)
}

/// Back to HICK with the PLL and HEXT off
fn reset() -> Result<(), ClockInitError> {
    let crm = CRM_BASE;
    crm.ctrl.modify(CTRL::HICKEN::SET);
    wait_for(|| crm.ctrl.is_set(CTRL::HICKSTBL), ClockInitError::SwitchTimeout)?;
    crm.cfg.modify(CFG::SCLKSEL::Hick);
    wait_for(
        || crm.cfg.read_as_enum(CFG::SCLKSTS) == Some(CFG::SCLKSTS::Value::Hick),
        ClockInitError::SwitchTimeout,
    )?;
    crm.ctrl.modify(CTRL::PLLEN::CLEAR + CTRL::HEXTEN::CLEAR + CTRL::HEXTBYPS::CLEAR + CTRL::CFDEN::CLEAR);
    crm.cfg.set(0);
    crm.clkint.set(0x009F_0000);
    Ok(())
}

/// Program the clock tree and switch SCLK to the PLL
pub fn init(config: &ClockConfig) -> Result<Clocks, ClockInitError> {
    let clocks = Clocks::from_config(config)?;
    let (mult_l, mult_h) = pll_mult_bits(config.pll_mult)?;
    let crm = CRM_BASE;

    reset()?;

    crm.ctrl.modify(CTRL::HEXTEN::SET);
    wait_for(|| crm.ctrl.is_set(CTRL::HEXTSTBL), ClockInitError::HextTimeout)?;

    crm.cfg.modify(
        CFG::PLLRCS::SET
            + CFG::PLLHEXTDIV::CLEAR
            + CFG::PLLMULT_L.val(mult_l)
            + CFG::PLLMULT_H.val(mult_h)
            + CFG::PLLRANGE.val(clocks.pll_range_gt72() as u32),
    );
    crm.ctrl.modify(CTRL::PLLEN::SET);
    wait_for(|| crm.ctrl.is_set(CTRL::PLLSTBL), ClockInitError::PllTimeout)?;

    crm.cfg.modify(
        CFG::AHBDIV.val(config.ahb_div.bits())
            + CFG::APB1DIV.val(config.apb1_div.bits())
            + CFG::APB2DIV.val(config.apb2_div.bits()),
    );

    // Step the AHB clock up gradually while jumping to 240 MHz
    crm.misc3.modify(MISC3::AUTO_STEP_EN::Enabled);
    crm.cfg.modify(CFG::SCLKSEL::Pll);
    let switched = wait_for(
        || crm.cfg.read_as_enum(CFG::SCLKSTS) == Some(CFG::SCLKSTS::Value::Pll),
        ClockInitError::SwitchTimeout,
    );
    crm.misc3.modify(MISC3::AUTO_STEP_EN::Disabled);
    switched?;

    defmt::info!(
        "clocks: sclk {} Hz, hclk {} Hz, pclk1 {} Hz, pclk2 {} Hz",
        clocks.sclk,
        clocks.hclk,
        clocks.pclk1,
        clocks.pclk2
    );
    Ok(clocks)
}
