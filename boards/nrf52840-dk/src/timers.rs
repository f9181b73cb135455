//! Window timers
//!
//! TIMER0 belongs to MPSL but is lent to the window owner: it restarts from
//! zero at 1 MHz at every window start and its compare 0 interrupt becomes
//! the `TimerExpiry` signal. TIMER3 times the TX capture chain: compare 0
//! is the clock capture, compare 1 the radio start, where it stops itself.

use embassy_nrf::pac;
use embassy_nrf::pac::timer::vals;
use embassy_nrf::{peripherals, Peri};
use hal_abstractions::{ChainTimer, ExpiryTimer, Tick};

use crate::clock::PRESCALER_1MHZ;

const EXPIRY_CHANNEL: usize = 0;
const CHAIN_CAPTURE: usize = 0;
const CHAIN_RADIO_START: usize = 1;

pub struct WindowTimers {
    _chain: Peri<'static, peripherals::TIMER3>,
}

impl WindowTimers {
    pub fn new(chain: Peri<'static, peripherals::TIMER3>) -> Self {
        Self { _chain: chain }
    }
}

impl ExpiryTimer for WindowTimers {
    fn arm_expiry(&mut self, after_us: u32) {
        let r = pac::TIMER0;
        r.cc(EXPIRY_CHANNEL).write_value(after_us);
        r.events_compare(EXPIRY_CHANNEL).write_value(0);
        r.intenset().write(|w| w.set_compare(EXPIRY_CHANNEL, true));
    }

    fn disarm_expiry(&mut self) {
        let r = pac::TIMER0;
        r.intenclr().write(|w| w.set_compare(EXPIRY_CHANNEL, true));
        r.events_compare(EXPIRY_CHANNEL).write_value(0);
    }
}

impl ChainTimer for WindowTimers {
    fn prime(&mut self, capture_at: Tick, start_at: Tick) {
        let r = pac::TIMER3;
        r.tasks_stop().write_value(1);
        r.tasks_clear().write_value(1);
        r.mode().write(|w| w.set_mode(vals::Mode::TIMER));
        r.bitmode().write(|w| w.set_bitmode(vals::Bitmode::_32BIT));
        r.prescaler().write(|w| w.set_prescaler(PRESCALER_1MHZ));
        r.cc(CHAIN_CAPTURE).write_value(capture_at);
        r.cc(CHAIN_RADIO_START).write_value(start_at);
        r.events_compare(CHAIN_CAPTURE).write_value(0);
        r.events_compare(CHAIN_RADIO_START).write_value(0);
        // One shot
        r.shorts().write(|w| {
            w.set_compare_stop(CHAIN_RADIO_START, true);
            w.set_compare_clear(CHAIN_RADIO_START, true);
        });
    }

    fn fire(&mut self) {
        pac::TIMER3.tasks_start().write_value(1);
    }

    fn is_captured(&self) -> bool {
        pac::TIMER3.events_compare(CHAIN_CAPTURE).read() != 0
    }

    fn reset(&mut self) {
        let r = pac::TIMER3;
        r.tasks_stop().write_value(1);
        r.tasks_clear().write_value(1);
        r.events_compare(CHAIN_CAPTURE).write_value(0);
        r.events_compare(CHAIN_RADIO_START).write_value(0);
    }
}
