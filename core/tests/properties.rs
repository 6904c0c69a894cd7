use atstart_core::chase::{BlinkSpeed, Chase};
use atstart_core::i2s::{DataFormat, I2sConfig, Prescaler};
use atstart_core::six_step::{Commutator, PhaseDrive, Step};
use proptest::prelude::*;

proptest! {
    #[test]
    fn six_hall_events_return_to_the_same_step(start in 1u8..=6, extra in 0usize..64) {
        let step = Step::from_index(start).unwrap();
        let mut s = step;
        for _ in 0..6 * (extra + 1) {
            s = s.next();
        }
        prop_assert_eq!(s, step);
    }

    #[test]
    fn every_step_drives_exactly_one_high_and_one_low(events in 0usize..100) {
        let mut commutator = Commutator::new();
        for _ in 0..events {
            commutator.on_hall();
        }
        let pattern = commutator.on_hall();
        let highs = pattern.0.iter().filter(|d| **d == PhaseDrive::High).count();
        let lows = pattern.0.iter().filter(|d| **d == PhaseDrive::Low).count();
        prop_assert_eq!((highs, lows), (1, 1));
        prop_assert_eq!(pattern.cctrl_bits().count_ones(), 2);
    }

    #[test]
    fn prescaler_stays_in_hardware_range(
        clk in 4_000_000u32..=240_000_000,
        fs in 8_000u32..=192_000,
        mclk in any::<bool>(),
    ) {
        let config = I2sConfig {
            sample_rate_hz: fs,
            mclk_output: mclk,
            format: DataFormat::Data16Channel32,
            ..I2sConfig::default()
        };
        let p = Prescaler::for_rate(clk, &config);
        prop_assert!((2..=0x3FF).contains(&p.div));
        if p != Prescaler::FALLBACK {
            let actual = p.actual_rate(clk, &config);
            prop_assert!(actual >= fs * 3 / 4 && actual <= fs * 5 / 4 + 1, "{} Hz for {} Hz", actual, fs);
        }
    }

    #[test]
    fn chase_delay_tracks_speed(steps in 1usize..20, link in any::<bool>()) {
        let mut chase = Chase::new(BlinkSpeed::for_link(link));
        for _ in 0..steps {
            let (_, delay) = chase.step();
            prop_assert_eq!(delay, if link { 100 } else { 400 });
        }
    }
}
