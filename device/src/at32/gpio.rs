//! General-purpose I/O, F1-style configuration registers

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_structs;
use tock_registers::registers::ReadWrite;

use super::StaticRef;
use super::crm::{APB2, CRM_BASE};

register_structs! {
    pub GpioRegisters {
        /// Pins 0-7, four bits each
        (0x00 => pub cfglr: ReadWrite<u32>),
        /// Pins 8-15
        (0x04 => pub cfghr: ReadWrite<u32>),
        (0x08 => pub idt: ReadWrite<u32>),
        (0x0C => pub odt: ReadWrite<u32>),
        /// Set/clear: low half sets, high half clears
        (0x10 => pub scr: ReadWrite<u32>),
        (0x14 => pub clr: ReadWrite<u32>),
        (0x18 => @END),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Port {
    A,
    B,
    C,
    D,
}

impl Port {
    fn registers(self) -> StaticRef<GpioRegisters> {
        let base = match self {
            Port::A => 0x4001_0800,
            Port::B => 0x4001_0C00,
            Port::C => 0x4001_1000,
            Port::D => 0x4001_1400,
        };
        unsafe { StaticRef::new(base as *const GpioRegisters) }
    }

    pub fn enable_clock(self) {
        let field = match self {
            Port::A => APB2::GPIOA::SET,
            Port::B => APB2::GPIOB::SET,
            Port::C => APB2::GPIOC::SET,
            Port::D => APB2::GPIOD::SET,
        };
        CRM_BASE.apb2en.modify(field);
    }
}

/// Pin configuration. Outputs run at the "stronger" drive strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Mode {
    Floating,
    PullUp,
    PullDown,
    PushPull,
    MuxPushPull,
}

impl Mode {
    /// IOFC:IOMC nibble
    const fn bits(self) -> u32 {
        const STRONGER: u32 = 0b01;
        match self {
            Mode::Floating => 0b0100,
            Mode::PullUp | Mode::PullDown => 0b1000,
            Mode::PushPull => STRONGER,
            Mode::MuxPushPull => 0b1000 | STRONGER,
        }
    }
}

/// One pin of a port
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct Pin {
    pub port: Port,
    pub pin: u8,
}

impl Pin {
    pub const fn new(port: Port, pin: u8) -> Self {
        Self { port, pin }
    }

    pub fn configure(&self, mode: Mode) {
        let regs = self.port.registers();
        let (reg, slot) = if self.pin < 8 {
            (&regs.cfglr, self.pin)
        } else {
            (&regs.cfghr, self.pin - 8)
        };
        let shift = 4 * slot as u32;
        reg.set(reg.get() & !(0xF << shift) | mode.bits() << shift);
        // Input pull direction is selected by the output data bit
        match mode {
            Mode::PullUp => self.set_high(),
            Mode::PullDown => self.set_low(),
            _ => {}
        }
    }

    pub fn set_high(&self) {
        self.port.registers().scr.set(1 << self.pin);
    }

    pub fn set_low(&self) {
        self.port.registers().clr.set(1 << self.pin);
    }

    pub fn toggle(&self) {
        if self.is_set_high() {
            self.set_low();
        } else {
            self.set_high();
        }
    }

    /// Output data latch
    pub fn is_set_high(&self) -> bool {
        self.port.registers().odt.get() & (1 << self.pin) != 0
    }
}

/// Configure several pins of the same port the same way
pub fn configure_all(port: Port, pins: &[u8], mode: Mode) {
    for &pin in pins {
        Pin::new(port, pin).configure(mode);
    }
}
