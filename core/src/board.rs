//! AT-START-F407 board wiring

/// User LEDs, all on GPIOD and active low
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    Led2,
    Led3,
    Led4,
}

impl Led {
    pub const ALL: [Led; 3] = [Led::Led2, Led::Led3, Led::Led4];

    /// Pin number on port D
    pub const fn pin(self) -> u8 {
        match self {
            Led::Led2 => 13,
            Led::Led3 => 14,
            Led::Led4 => 15,
        }
    }

    /// Single-bit mask for the GPIO set/clear registers
    pub const fn mask(self) -> u32 {
        1 << self.pin()
    }
}

/// External crystal fitted on the board
pub const HEXT_HZ: u32 = 8_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leds_sit_on_upper_port_d_pins() {
        assert_eq!(Led::Led2.mask(), 0x2000);
        assert_eq!(Led::Led3.mask(), 0x4000);
        assert_eq!(Led::Led4.mask(), 0x8000);
    }
}
