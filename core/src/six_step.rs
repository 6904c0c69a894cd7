//! 6-step commutation pattern for the TMR1 hall event demo
//!
//! Each step drives one phase through its main output, one phase through its
//! complementary output and leaves the third phase off:
//!
//! ```text
//!             step1 step2 step3 step4 step5 step6
//! channel1      1     0     0     0     0     1
//! channel1n     0     0     1     1     0     0
//! channel2      0     0     0     1     1     0
//! channel2n     1     1     0     0     0     0
//! channel3      0     1     1     0     0     0
//! channel3n     0     0     0     0     1     1
//! ```

/// Commutation step, numbered like the table above
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Step {
    Step1 = 1, // ch1, ch2n
    Step2 = 2, // ch3, ch2n
    Step3 = 3, // ch3, ch1n
    Step4 = 4, // ch2, ch1n
    Step5 = 5, // ch2, ch3n
    Step6 = 6, // ch1, ch3n
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Step1,
        Step::Step2,
        Step::Step3,
        Step::Step4,
        Step::Step5,
        Step::Step6,
    ];

    /// Advance to the next step, wrapping 6 to 1
    pub const fn next(self) -> Self {
        match self {
            Self::Step1 => Self::Step2,
            Self::Step2 => Self::Step3,
            Self::Step3 => Self::Step4,
            Self::Step4 => Self::Step5,
            Self::Step5 => Self::Step6,
            Self::Step6 => Self::Step1,
        }
    }

    /// Step number (1-6)
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Step1),
            2 => Some(Self::Step2),
            3 => Some(Self::Step3),
            4 => Some(Self::Step4),
            5 => Some(Self::Step5),
            6 => Some(Self::Step6),
            _ => None,
        }
    }

    /// Output pattern asserted during this step
    pub const fn pattern(self) -> Pattern {
        use PhaseDrive::{High, Low, Off};
        Pattern(match self {
            Self::Step1 => [High, Low, Off],
            Self::Step2 => [Off, Low, High],
            Self::Step3 => [Low, Off, High],
            Self::Step4 => [Low, High, Off],
            Self::Step5 => [Off, High, Low],
            Self::Step6 => [High, Off, Low],
        })
    }
}

/// TMR1 output channel carrying one motor phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ch1,
    Ch2,
    Ch3,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Ch1, Channel::Ch2, Channel::Ch3];

    const fn offset(self) -> u32 {
        match self {
            Channel::Ch1 => 0,
            Channel::Ch2 => 4,
            Channel::Ch3 => 8,
        }
    }

    /// CxEN bit in the channel control register
    pub const fn enable_bit(self) -> u32 {
        1 << self.offset()
    }

    /// CxCEN bit in the channel control register
    pub const fn complementary_enable_bit(self) -> u32 {
        1 << (self.offset() + 2)
    }
}

/// How a phase is driven during one step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseDrive {
    /// Both outputs disabled
    Off,
    /// Main output enabled
    High,
    /// Complementary output enabled
    Low,
}

/// Drive state of the three channels, indexed by [`Channel`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pattern(pub [PhaseDrive; 3]);

impl Pattern {
    pub fn drive(&self, channel: Channel) -> PhaseDrive {
        self.0[channel as usize]
    }

    /// Enable bits for the six outputs, ready for the channel control register
    pub fn cctrl_bits(&self) -> u32 {
        Channel::ALL.iter().fold(0, |bits, &ch| {
            bits | match self.drive(ch) {
                PhaseDrive::Off => 0,
                PhaseDrive::High => ch.enable_bit(),
                PhaseDrive::Low => ch.complementary_enable_bit(),
            }
        })
    }

    /// Mask covering every enable bit `cctrl_bits` may touch
    pub const fn cctrl_mask() -> u32 {
        0x0555
    }

    /// Channels that must be switched to PWM mode A for this step
    pub fn pwm_channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL
            .into_iter()
            .filter(|&ch| self.drive(ch) != PhaseDrive::Off)
    }
}

/// Step counter advanced by the hall interrupt
#[derive(Debug)]
pub struct Commutator {
    step: Step,
}

impl Commutator {
    pub const fn new() -> Self {
        Self { step: Step::Step1 }
    }

    pub const fn step(&self) -> Step {
        self.step
    }

    /// Pattern to preload on this hall event; the counter moves on.
    ///
    /// With channel buffering enabled the preloaded pattern only reaches the
    /// pins on the following hall event.
    pub fn on_hall(&mut self) -> Pattern {
        let pattern = self.step.pattern();
        self.step = self.step.next();
        pattern
    }
}

impl Default for Commutator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("dead time of {ticks} timer ticks exceeds 1008")]
pub struct DeadTimeError {
    pub ticks: u64,
}

/// Encode a dead time for the break register DTC field.
///
/// The requested time is rounded up to the next representable value.
pub fn dead_time_bits(dead_time_ns: u32, tmr_clk_hz: u32) -> Result<u8, DeadTimeError> {
    let ticks = (dead_time_ns as u64 * tmr_clk_hz as u64).div_ceil(1_000_000_000);
    let bits = match ticks {
        0..=127 => ticks,
        128..=254 => 0x80 | (ticks.div_ceil(2) - 64),
        255..=504 => 0xC0 | (ticks.div_ceil(8) - 32),
        505..=1008 => 0xE0 | (ticks.div_ceil(16) - 32),
        _ => return Err(DeadTimeError { ticks }),
    };
    Ok(bits as u8)
}

/// TMR1 setup for the demo
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SixStepConfig {
    /// Counter period (auto-reload)
    pub period: u16,
    pub prescaler: u16,
    /// Compare values for channels 1-3
    pub compare: [u16; 3],
    pub dead_time_ns: u32,
    /// Interval between software hall events
    pub hall_period_ms: u64,
}

impl Default for SixStepConfig {
    fn default() -> Self {
        Self {
            period: 4095,
            prescaler: 0,
            compare: [2047, 1023, 511],
            dead_time_ns: 0,
            hall_period_ms: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_sequence_wraps_after_six() {
        let mut step = Step::Step1;
        for i in 2..=7 {
            step = step.next();
            assert_eq!(step.index(), (i - 1) % 6 + 1);
        }
        assert_eq!(step, Step::Step1);
    }

    #[test]
    fn patterns_match_channel_table() {
        // columns of the table, bits ordered ch1 ch1n ch2 ch2n ch3 ch3n
        let table: [[u8; 6]; 6] = [
            [1, 0, 0, 1, 0, 0],
            [0, 0, 0, 1, 1, 0],
            [0, 1, 0, 0, 1, 0],
            [0, 1, 1, 0, 0, 0],
            [0, 0, 1, 0, 0, 1],
            [1, 0, 0, 0, 0, 1],
        ];
        for (step, column) in Step::ALL.iter().zip(table) {
            let bits = step.pattern().cctrl_bits();
            for (n, ch) in Channel::ALL.iter().enumerate() {
                assert_eq!(bits & ch.enable_bit() != 0, column[2 * n] == 1, "{step:?} {ch:?}");
                assert_eq!(
                    bits & ch.complementary_enable_bit() != 0,
                    column[2 * n + 1] == 1,
                    "{step:?} {ch:?}n"
                );
            }
        }
    }

    #[test]
    fn commutator_preloads_current_step_then_advances() {
        let mut commutator = Commutator::new();
        assert_eq!(commutator.on_hall(), Step::Step1.pattern());
        assert_eq!(commutator.step(), Step::Step2);
        for _ in 0..5 {
            commutator.on_hall();
        }
        assert_eq!(commutator.step(), Step::Step1);
    }

    #[test]
    fn pwm_channels_skip_the_floating_phase() {
        let pattern = Step::Step2.pattern();
        let mut channels = pattern.pwm_channels();
        assert_eq!(channels.next(), Some(Channel::Ch2));
        assert_eq!(channels.next(), Some(Channel::Ch3));
        assert_eq!(channels.next(), None);
    }

    #[test]
    fn dead_time_ranges() {
        // 240 MHz timer clock: one tick is ~4.17 ns
        assert_eq!(dead_time_bits(0, 240_000_000), Ok(0));
        assert_eq!(dead_time_bits(500, 240_000_000), Ok(120));
        assert_eq!(dead_time_bits(1_000, 240_000_000), Ok(0x80 | 56));
        assert_eq!(dead_time_bits(2_000, 240_000_000), Ok(0xC0 | 28));
        assert_eq!(dead_time_bits(4_000, 240_000_000), Ok(0xE0 | 28));
        assert_eq!(
            dead_time_bits(5_000, 240_000_000),
            Err(DeadTimeError { ticks: 1200 })
        );
    }

    #[test]
    fn dead_time_band_edges() {
        // 1 GHz clock so nanoseconds equal ticks
        let bits = |ticks| dead_time_bits(ticks, 1_000_000_000);
        assert_eq!(bits(127), Ok(127));
        assert_eq!(bits(128), Ok(0x80));
        assert_eq!(bits(254), Ok(0xBF));
        assert_eq!(bits(255), Ok(0xC0));
        assert_eq!(bits(504), Ok(0xDF));
        assert_eq!(bits(505), Ok(0xE0));
        assert_eq!(bits(1008), Ok(0xFF));
        assert_eq!(bits(1009), Err(DeadTimeError { ticks: 1009 }));
    }
}
