//! Recording hardware mocks for host tests

use core::cell::Cell;

use hal_abstractions::{
    ArbiterError, ChainTimer, DeviceIdentifier, EventRouter, EventSource, ExpiryTimer,
    RadioInterrupts, RadioPeripheral, RadioSettings, ReferenceClock, SessionId, TaskSink, Tick,
    WindowArbiter, WindowRequest,
};

use crate::config::SyncConfig;
use crate::dispatcher::WindowPeripherals;
use crate::engine::SyncEngine;
use crate::role::Role;

pub type MockPeripherals = WindowPeripherals<MockClock, MockRouter, MockRadio, MockTimers>;
pub type MockEngine = SyncEngine<MockClock, MockRouter, MockRadio, MockTimers>;

/// Engine over fresh mocks whose chain capture lands on the first poll
pub fn engine(role: Role) -> MockEngine {
    let mut hw = peripherals();
    hw.timers.complete_after = Some(1);
    SyncEngine::new(SyncConfig::default(), role, hw)
}

pub fn peripherals() -> MockPeripherals {
    WindowPeripherals {
        clock: MockClock::default(),
        router: MockRouter::default(),
        radio: MockRadio::default(),
        timers: MockTimers::default(),
    }
}

pub struct MockDevice(pub u64);

impl DeviceIdentifier for MockDevice {
    fn device_id(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
pub struct MockClock {
    pub now: Tick,
    pub modulus: Tick,
    pub running: bool,
    pub captures: [Tick; 4],
    pub compares: [Option<Tick>; 4],
    pub clears: u32,
    pub stops: u32,
}

impl MockClock {
    pub fn advance(&mut self, ticks: Tick) {
        self.now = (self.now + ticks) % self.modulus.max(1);
    }
}

impl ReferenceClock for MockClock {
    fn start(&mut self, modulus: Tick) {
        self.modulus = modulus;
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }

    fn clear(&mut self) {
        self.now = 0;
        self.clears += 1;
    }

    fn set_compare(&mut self, channel: u8, value: Tick) {
        self.compares[channel as usize] = Some(value);
    }

    fn capture(&mut self, channel: u8) -> Tick {
        self.captures[channel as usize] = self.now;
        self.now
    }

    fn read(&self, channel: u8) -> Tick {
        self.captures[channel as usize]
    }
}

#[derive(Default, Clone, Copy)]
pub struct Route {
    pub event: Option<EventSource>,
    pub task: Option<TaskSink>,
    pub fork: Option<TaskSink>,
    pub enabled: bool,
}

#[derive(Default)]
pub struct MockRouter {
    pub routes: [Route; 4],
    pub groups: [u32; 4],
}

impl MockRouter {
    /// Deliver `event` to every enabled route and return the tasks it
    /// triggered; group disables are applied here, clock tasks are left to
    /// the caller.
    pub fn fire(&mut self, event: EventSource) -> Vec<TaskSink> {
        let mut triggered = Vec::new();
        for route in self.routes.iter().filter(|r| r.enabled && r.event == Some(event)) {
            triggered.extend(route.task);
            triggered.extend(route.fork);
        }
        for task in &triggered {
            if let TaskSink::DisableGroup(group) = task {
                self.disable_group(*group);
            }
        }
        triggered
    }
}

impl EventRouter for MockRouter {
    fn bind(&mut self, channel: u8, event: EventSource, task: TaskSink) {
        let route = &mut self.routes[channel as usize];
        route.event = Some(event);
        route.task = Some(task);
        route.fork = None;
    }

    fn fork(&mut self, channel: u8, task: TaskSink) {
        self.routes[channel as usize].fork = Some(task);
    }

    fn enable(&mut self, channel: u8) {
        self.routes[channel as usize].enabled = true;
    }

    fn disable(&mut self, channel: u8) {
        self.routes[channel as usize].enabled = false;
    }

    fn is_enabled(&self, channel: u8) -> bool {
        self.routes[channel as usize].enabled
    }

    fn set_group(&mut self, group: u8, channels: u32) {
        self.groups[group as usize] = channels;
    }

    fn enable_group(&mut self, group: u8) {
        let mask = self.groups[group as usize];
        for (n, route) in self.routes.iter_mut().enumerate() {
            if mask & (1 << n) != 0 {
                route.enabled = true;
            }
        }
    }

    fn disable_group(&mut self, group: u8) {
        let mask = self.groups[group as usize];
        for (n, route) in self.routes.iter_mut().enumerate() {
            if mask & (1 << n) != 0 {
                route.enabled = false;
            }
        }
    }
}

#[derive(Default)]
pub struct MockRadio {
    pub settings: Option<RadioSettings>,
    pub payload: Vec<u8>,
    pub tx_ramp_ups: u32,
    pub rx_starts: u32,
    pub continuous: bool,
    pub interrupts: RadioInterrupts,
    pub inbox: Option<Vec<u8>>,
    pub enabled: bool,
    pub disables: u32,
    pub events_cleared: u32,
}

impl MockRadio {
    pub fn deliver(&mut self, payload: &[u8]) {
        self.inbox = Some(payload.to_vec());
    }
}

impl RadioPeripheral for MockRadio {
    fn configure(&mut self, settings: &RadioSettings) {
        self.settings = Some(*settings);
    }

    fn load_payload(&mut self, payload: &[u8]) {
        self.payload = payload.to_vec();
    }

    fn ramp_up_tx(&mut self) {
        self.tx_ramp_ups += 1;
        self.enabled = true;
    }

    fn start_rx(&mut self, continuous: bool) {
        self.rx_starts += 1;
        self.continuous = continuous;
        self.enabled = true;
    }

    fn take_received(&mut self, buf: &mut [u8]) -> Option<usize> {
        let payload = self.inbox.take()?;
        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Some(len)
    }

    fn enable_interrupts(&mut self, sources: RadioInterrupts) {
        self.interrupts = self.interrupts.union(sources);
    }

    fn disable_interrupts(&mut self) {
        self.interrupts = RadioInterrupts::NONE;
    }

    fn clear_events(&mut self) {
        self.events_cleared += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disables += 1;
    }
}

#[derive(Default)]
pub struct MockTimers {
    pub expiry_at: Option<u32>,
    pub expiry_disarms: u32,
    pub chain_capture_at: Option<Tick>,
    pub chain_start_at: Option<Tick>,
    pub chain_running: bool,
    /// Polls of `is_captured` after which the capture is reported done;
    /// `None` never captures
    pub complete_after: Option<u32>,
    pub polls: Cell<u32>,
    pub chain_resets: u32,
}

impl ExpiryTimer for MockTimers {
    fn arm_expiry(&mut self, after_us: u32) {
        self.expiry_at = Some(after_us);
    }

    fn disarm_expiry(&mut self) {
        self.expiry_at = None;
        self.expiry_disarms += 1;
    }
}

impl ChainTimer for MockTimers {
    fn prime(&mut self, capture_at: Tick, start_at: Tick) {
        self.chain_capture_at = Some(capture_at);
        self.chain_start_at = Some(start_at);
        self.chain_running = false;
        self.polls.set(0);
    }

    fn fire(&mut self) {
        self.chain_running = true;
    }

    fn is_captured(&self) -> bool {
        if !self.chain_running {
            return false;
        }
        self.polls.set(self.polls.get() + 1);
        self.complete_after
            .is_some_and(|after| self.polls.get() >= after)
    }

    fn reset(&mut self) {
        self.chain_running = false;
        self.chain_resets += 1;
    }
}

#[derive(Default)]
pub struct MockArbiter {
    pub opens: u32,
    pub next_session: SessionId,
    pub requests: Vec<(SessionId, WindowRequest)>,
    pub closes: Vec<SessionId>,
    pub open_status: i32,
    pub request_status: i32,
    pub close_status: i32,
}

impl WindowArbiter for MockArbiter {
    fn open(&mut self) -> Result<SessionId, ArbiterError> {
        self.opens += 1;
        ArbiterError::check(self.open_status)?;
        let session = self.next_session;
        self.next_session += 1;
        Ok(session)
    }

    fn request(&mut self, session: SessionId, request: &WindowRequest) -> Result<(), ArbiterError> {
        ArbiterError::check(self.request_status)?;
        self.requests.push((session, *request));
        Ok(())
    }

    fn close(&mut self, session: SessionId) -> Result<(), ArbiterError> {
        ArbiterError::check(self.close_status)?;
        self.closes.push(session);
        Ok(())
    }
}
