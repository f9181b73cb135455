//! PPI event routing
//!
//! Route numbers are PPI channel numbers, group numbers are PPI channel
//! group numbers. Only the channels and the group claimed in
//! [`PpiRouter::new`] are touched by the engine.

use embassy_nrf::pac;
use embassy_nrf::{peripherals, Peri};
use hal_abstractions::{EventRouter, EventSource, TaskSink};

pub struct PpiRouter {
    _capture: Peri<'static, peripherals::PPI_CH0>,
    _correction: Peri<'static, peripherals::PPI_CH1>,
    _radio_start: Peri<'static, peripherals::PPI_CH2>,
    _group: Peri<'static, peripherals::PPI_GROUP0>,
}

impl PpiRouter {
    pub fn new(
        capture: Peri<'static, peripherals::PPI_CH0>,
        correction: Peri<'static, peripherals::PPI_CH1>,
        radio_start: Peri<'static, peripherals::PPI_CH2>,
        group: Peri<'static, peripherals::PPI_GROUP0>,
    ) -> Self {
        Self {
            _capture: capture,
            _correction: correction,
            _radio_start: radio_start,
            _group: group,
        }
    }
}

fn event_address(event: EventSource) -> u32 {
    match event {
        EventSource::ChainCompare(n) => pac::TIMER3.events_compare(n as usize).as_ptr() as u32,
        EventSource::ClockCompare(n) => pac::TIMER2.events_compare(n as usize).as_ptr() as u32,
    }
}

fn task_address(task: TaskSink) -> u32 {
    match task {
        TaskSink::ClockCapture(n) => pac::TIMER2.tasks_capture(n as usize).as_ptr() as u32,
        TaskSink::ClockClear => pac::TIMER2.tasks_clear().as_ptr() as u32,
        TaskSink::DisableGroup(g) => pac::PPI.tasks_chg(g as usize).dis().as_ptr() as u32,
        TaskSink::RadioStart => pac::RADIO.tasks_start().as_ptr() as u32,
    }
}

impl EventRouter for PpiRouter {
    fn bind(&mut self, channel: u8, event: EventSource, task: TaskSink) {
        let r = pac::PPI;
        let ch = channel as usize;
        r.ch(ch).eep().write_value(event_address(event));
        r.ch(ch).tep().write_value(task_address(task));
        r.fork(ch).tep().write_value(0);
    }

    fn fork(&mut self, channel: u8, task: TaskSink) {
        pac::PPI
            .fork(channel as usize)
            .tep()
            .write_value(task_address(task));
    }

    fn enable(&mut self, channel: u8) {
        pac::PPI
            .chenset()
            .write(|w| w.set_ch(channel as usize, true));
    }

    fn disable(&mut self, channel: u8) {
        pac::PPI
            .chenclr()
            .write(|w| w.set_ch(channel as usize, true));
    }

    fn is_enabled(&self, channel: u8) -> bool {
        pac::PPI.chen().read().ch(channel as usize)
    }

    fn set_group(&mut self, group: u8, channels: u32) {
        pac::PPI.chg(group as usize).write(|w| w.0 = channels);
    }

    fn enable_group(&mut self, group: u8) {
        pac::PPI.tasks_chg(group as usize).en().write_value(1);
    }

    fn disable_group(&mut self, group: u8) {
        pac::PPI.tasks_chg(group as usize).dis().write_value(1);
    }
}
