//! LED chase shown while the network demos run

use crate::board::Led;

/// Base delay between two LED toggles
pub const CHASE_DELAY_MS: u32 = 100;

/// Chase speed multiplier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BlinkSpeed {
    Fast = 1,
    Slow = 4,
}

impl BlinkSpeed {
    /// Fast while the Ethernet link is up, slow while it is down
    pub const fn for_link(up: bool) -> Self {
        if up { Self::Fast } else { Self::Slow }
    }

    pub const fn delay_ms(self) -> u32 {
        self as u32 * CHASE_DELAY_MS
    }
}

/// Endless LED2 -> LED3 -> LED4 toggle sequence.
///
/// The speed is read on every step, so a link change takes effect on the
/// next toggle rather than after a full round.
#[derive(Debug)]
pub struct Chase {
    position: usize,
    speed: BlinkSpeed,
}

impl Chase {
    pub const fn new(speed: BlinkSpeed) -> Self {
        Self { position: 0, speed }
    }

    pub fn set_speed(&mut self, speed: BlinkSpeed) {
        self.speed = speed;
    }

    pub fn speed(&self) -> BlinkSpeed {
        self.speed
    }

    /// LED to toggle now and how long to wait afterwards
    pub fn step(&mut self) -> (Led, u32) {
        let led = Led::ALL[self.position];
        self.position = (self.position + 1) % Led::ALL.len();
        (led, self.speed.delay_ms())
    }
}

impl Default for Chase {
    fn default() -> Self {
        Self::new(BlinkSpeed::Fast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chase_walks_the_three_leds_in_order() {
        let mut chase = Chase::default();
        let leds: [Led; 4] = core::array::from_fn(|_| chase.step().0);
        assert_eq!(leds, [Led::Led2, Led::Led3, Led::Led4, Led::Led2]);
    }

    #[test]
    fn speed_change_applies_to_next_step() {
        let mut chase = Chase::default();
        assert_eq!(chase.step().1, 100);
        chase.set_speed(BlinkSpeed::for_link(false));
        assert_eq!(chase.step(), (Led::Led3, 400));
    }
}
