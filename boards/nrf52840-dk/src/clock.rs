//! Reference clock on TIMER2
//!
//! TIMER2 runs at 1 MHz in 32-bit mode and clears itself on compare 0,
//! giving a counter that wraps at the sync modulus. Compare/capture
//! channels 1..=3 are left to the engine.

use embassy_nrf::pac;
use embassy_nrf::pac::timer::vals;
use embassy_nrf::{peripherals, Peri};
use hal_abstractions::{ReferenceClock, Tick};

/// 16 MHz / 2^4
pub(crate) const PRESCALER_1MHZ: u8 = 4;

const WRAP_CHANNEL: usize = 0;

pub struct Timer2Clock {
    _timer: Peri<'static, peripherals::TIMER2>,
}

impl Timer2Clock {
    pub fn new(timer: Peri<'static, peripherals::TIMER2>) -> Self {
        Self { _timer: timer }
    }
}

impl ReferenceClock for Timer2Clock {
    fn start(&mut self, modulus: Tick) {
        let r = pac::TIMER2;
        r.mode().write(|w| w.set_mode(vals::Mode::TIMER));
        r.bitmode().write(|w| w.set_bitmode(vals::Bitmode::_32BIT));
        r.prescaler().write(|w| w.set_prescaler(PRESCALER_1MHZ));
        r.cc(WRAP_CHANNEL).write_value(modulus);
        r.shorts().write(|w| w.set_compare_clear(WRAP_CHANNEL, true));
        r.tasks_clear().write_value(1);
        r.tasks_start().write_value(1);
    }

    fn stop(&mut self) {
        pac::TIMER2.tasks_stop().write_value(1);
    }

    fn clear(&mut self) {
        pac::TIMER2.tasks_clear().write_value(1);
    }

    fn set_compare(&mut self, channel: u8, value: Tick) {
        let r = pac::TIMER2;
        r.cc(channel as usize).write_value(value);
        r.events_compare(channel as usize).write_value(0);
    }

    fn capture(&mut self, channel: u8) -> Tick {
        let r = pac::TIMER2;
        r.tasks_capture(channel as usize).write_value(1);
        r.cc(channel as usize).read()
    }

    fn read(&self, channel: u8) -> Tick {
        pac::TIMER2.cc(channel as usize).read()
    }
}
