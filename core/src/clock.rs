//! Clock tree arithmetic for the AT32F403A/407 CRM
//!
//! SCLK is HEXT times the PLL multiplier; AHB and the two APB buses divide
//! it down. The device crate programs the registers from the bit values
//! computed here.

use crate::board::HEXT_HZ;

/// Highest supported system clock
pub const SCLK_MAX_HZ: u32 = 240_000_000;
/// Highest supported APB1/APB2 clock
pub const PCLK_MAX_HZ: u32 = 120_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    #[error("PLL multiplier {0} outside 2..=64")]
    PllMultiplier(u8),
    #[error("system clock {0} Hz above 240 MHz")]
    SclkTooHigh(u32),
    #[error("APB clock {0} Hz above 120 MHz")]
    PclkTooHigh(u32),
    #[error("SysTick reload does not fit 24 bits")]
    SysTickReload,
}

/// AHB prescaler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AhbDiv {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div64,
    Div128,
    Div256,
    Div512,
}

impl AhbDiv {
    pub const fn bits(self) -> u32 {
        match self {
            AhbDiv::Div1 => 0b0000,
            AhbDiv::Div2 => 0b1000,
            AhbDiv::Div4 => 0b1001,
            AhbDiv::Div8 => 0b1010,
            AhbDiv::Div16 => 0b1011,
            AhbDiv::Div64 => 0b1100,
            AhbDiv::Div128 => 0b1101,
            AhbDiv::Div256 => 0b1110,
            AhbDiv::Div512 => 0b1111,
        }
    }

    pub const fn divisor(self) -> u32 {
        match self {
            AhbDiv::Div1 => 1,
            AhbDiv::Div2 => 2,
            AhbDiv::Div4 => 4,
            AhbDiv::Div8 => 8,
            AhbDiv::Div16 => 16,
            AhbDiv::Div64 => 64,
            AhbDiv::Div128 => 128,
            AhbDiv::Div256 => 256,
            AhbDiv::Div512 => 512,
        }
    }
}

/// APB1/APB2 prescaler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApbDiv {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
}

impl ApbDiv {
    pub const fn bits(self) -> u32 {
        match self {
            ApbDiv::Div1 => 0b000,
            ApbDiv::Div2 => 0b100,
            ApbDiv::Div4 => 0b101,
            ApbDiv::Div8 => 0b110,
            ApbDiv::Div16 => 0b111,
        }
    }

    pub const fn divisor(self) -> u32 {
        match self {
            ApbDiv::Div1 => 1,
            ApbDiv::Div2 => 2,
            ApbDiv::Div4 => 4,
            ApbDiv::Div8 => 8,
            ApbDiv::Div16 => 16,
        }
    }
}

/// Requested clock tree
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    pub hext_hz: u32,
    pub pll_mult: u8,
    pub ahb_div: AhbDiv,
    pub apb1_div: ApbDiv,
    pub apb2_div: ApbDiv,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            hext_hz: HEXT_HZ,          // 8 MHz crystal
            pll_mult: 30,              // 8 MHz * 30 = 240 MHz
            ahb_div: AhbDiv::Div1,
            apb1_div: ApbDiv::Div2,    // 120 MHz
            apb2_div: ApbDiv::Div2,    // 120 MHz
        }
    }
}

/// PLL multiplier split into the `pllmult_l` (4 bits) and `pllmult_h`
/// (2 bits) fields of CRM_CFG.
pub fn pll_mult_bits(mult: u8) -> Result<(u32, u32), ClockError> {
    let code = match mult {
        2..=16 => mult as u32 - 2,
        17..=64 => mult as u32 - 1,
        _ => return Err(ClockError::PllMultiplier(mult)),
    };
    Ok((code & 0xF, code >> 4))
}

/// Frozen bus frequencies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    pub sclk: u32,
    pub hclk: u32,
    pub pclk1: u32,
    pub pclk2: u32,
}

impl Clocks {
    pub fn from_config(config: &ClockConfig) -> Result<Self, ClockError> {
        pll_mult_bits(config.pll_mult)?;
        let sclk = config.hext_hz as u64 * config.pll_mult as u64;
        if sclk > SCLK_MAX_HZ as u64 {
            return Err(ClockError::SclkTooHigh(sclk.min(u32::MAX as u64) as u32));
        }
        let sclk = sclk as u32;
        let hclk = sclk / config.ahb_div.divisor();
        let pclk1 = hclk / config.apb1_div.divisor();
        let pclk2 = hclk / config.apb2_div.divisor();
        for pclk in [pclk1, pclk2] {
            if pclk > PCLK_MAX_HZ {
                return Err(ClockError::PclkTooHigh(pclk));
            }
        }
        Ok(Self { sclk, hclk, pclk1, pclk2 })
    }

    /// PLL output range bit must be set above 72 MHz
    pub fn pll_range_gt72(&self) -> bool {
        self.sclk > 72_000_000
    }

    /// Timer kernel clock on APB2 (TMR1, TMR8...). Doubled when APB2 divides.
    pub fn tmr_apb2(&self) -> u32 {
        if self.pclk2 == self.hclk { self.pclk2 } else { self.pclk2 * 2 }
    }
}

/// SysTick reload value for an interrupt every `1 / rate_hz` seconds
pub fn systick_reload(hclk: u32, rate_hz: u32) -> Result<u32, ClockError> {
    if rate_hz == 0 {
        return Err(ClockError::SysTickReload);
    }
    let ticks = hclk / rate_hz;
    // A reload of zero never fires
    if ticks <= 1 || ticks > 0x0100_0000 {
        return Err(ClockError::SysTickReload);
    }
    Ok(ticks - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tree_runs_at_240mhz() {
        let clocks = Clocks::from_config(&ClockConfig::default()).unwrap();
        assert_eq!(clocks.sclk, 240_000_000);
        assert_eq!(clocks.hclk, 240_000_000);
        assert_eq!(clocks.pclk1, 120_000_000);
        assert_eq!(clocks.pclk2, 120_000_000);
        assert_eq!(clocks.tmr_apb2(), 240_000_000);
        assert!(clocks.pll_range_gt72());
    }

    #[test]
    fn pll_multiplier_encoding_skips_code_15() {
        assert_eq!(pll_mult_bits(2), Ok((0, 0)));
        assert_eq!(pll_mult_bits(15), Ok((13, 0)));
        assert_eq!(pll_mult_bits(16), Ok((14, 0)));
        assert_eq!(pll_mult_bits(17), Ok((0, 1)));
        assert_eq!(pll_mult_bits(30), Ok((13, 1)));
        assert_eq!(pll_mult_bits(64), Ok((15, 3)));
        assert_eq!(pll_mult_bits(1), Err(ClockError::PllMultiplier(1)));
        assert_eq!(pll_mult_bits(65), Err(ClockError::PllMultiplier(65)));
    }

    #[test]
    fn overclocked_trees_are_rejected() {
        let fast = ClockConfig { pll_mult: 31, ..ClockConfig::default() };
        assert_eq!(Clocks::from_config(&fast), Err(ClockError::SclkTooHigh(248_000_000)));

        let wide_apb = ClockConfig { apb1_div: ApbDiv::Div1, ..ClockConfig::default() };
        assert_eq!(Clocks::from_config(&wide_apb), Err(ClockError::PclkTooHigh(240_000_000)));
    }

    #[test]
    fn systick_reload_for_twenty_ms_and_one_ms() {
        // 240 MHz / 50 = one interrupt every 20 ms
        assert_eq!(systick_reload(240_000_000, 50), Ok(4_799_999));
        assert_eq!(systick_reload(240_000_000, 1_000), Ok(239_999));
        assert_eq!(systick_reload(240_000_000, 10), Err(ClockError::SysTickReload));
        assert_eq!(systick_reload(8_000_000, 50), Ok(159_999));
        assert_eq!(systick_reload(1_000, 0), Err(ClockError::SysTickReload));
        assert_eq!(systick_reload(1_000, 1_000), Err(ClockError::SysTickReload));
        assert_eq!(systick_reload(2_000, 1_000), Ok(1));
    }
}
