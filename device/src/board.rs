//! LED2-LED4 on the AT-START-F407

use atstart_core::board::Led;

use crate::at32::gpio::{Mode, Pin, Port};

/// The three user LEDs. Active low: driving the pin low lights the LED.
pub struct LedSet {
    _private: (),
}

impl LedSet {
    fn pin(led: Led) -> Pin {
        Pin::new(Port::D, led.pin())
    }

    pub fn on(&mut self, led: Led) {
        Self::pin(led).set_low();
    }

    pub fn off(&mut self, led: Led) {
        Self::pin(led).set_high();
    }

    pub fn toggle(&mut self, led: Led) {
        Self::pin(led).toggle();
    }

    pub fn set(&mut self, led: Led, lit: bool) {
        if lit { self.on(led) } else { self.off(led) }
    }
}

/// Port D clock, LED pins push-pull, all LEDs off
pub fn init() -> LedSet {
    Port::D.enable_clock();
    let mut leds = LedSet { _private: () };
    for led in Led::ALL {
        leds.off(led);
        LedSet::pin(led).configure(Mode::PushPull);
    }
    leds
}
