//! Shared engine context
//!
//! Holds the dispatcher and its peripherals behind a critical-section mutex
//! so the arbiter's signal callback and the session owner can both reach
//! them through one `&'static SyncEngine`. The arbiter delivers at most one
//! signal at a time, so the lock is never contended from the signal side.

use core::cell::RefCell;

use critical_section::Mutex;
use hal_abstractions::{
    ChainTimer, EventRouter, ExpiryTimer, RadioPeripheral, ReferenceClock, Signal, SignalAction,
    WindowRequest,
};

use crate::config::SyncConfig;
use crate::corrector::CorrectionState;
use crate::dispatcher::{DispatchState, WindowDispatcher, WindowPeripherals};
use crate::role::Role;
use crate::stats::SyncStats;

/// What the session owner needs from the engine
pub trait WindowSchedule {
    /// Request that opens a schedule
    fn earliest_request(&self) -> WindowRequest;

    /// The first request of a fresh session is about to be issued
    fn session_requested(&self);

    /// The arbiter rejected the first request
    fn session_request_failed(&self);

    /// The arbiter accepted the close of the session
    fn session_closing(&self);
}

pub struct SyncEngine<C, F, R, T> {
    dispatcher: Mutex<RefCell<WindowDispatcher<C, F, R, T>>>,
    stats: SyncStats,
    config: SyncConfig,
    role: Role,
}

impl<C, F, R, T> SyncEngine<C, F, R, T>
where
    C: ReferenceClock,
    F: EventRouter,
    R: RadioPeripheral,
    T: ExpiryTimer + ChainTimer,
{
    pub fn new(config: SyncConfig, role: Role, hw: WindowPeripherals<C, F, R, T>) -> Self {
        Self {
            dispatcher: Mutex::new(RefCell::new(WindowDispatcher::new(config, role, hw))),
            stats: SyncStats::new(),
            config,
            role,
        }
    }

    /// Entry point of the arbiter's signal callback
    pub fn on_signal(&self, signal: Signal) -> SignalAction {
        critical_section::with(|cs| {
            self.dispatcher
                .borrow_ref_mut(cs)
                .handle(signal, &self.stats)
        })
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> DispatchState {
        critical_section::with(|cs| self.dispatcher.borrow_ref(cs).state())
    }

    pub fn correction(&self) -> CorrectionState {
        critical_section::with(|cs| self.dispatcher.borrow_ref(cs).correction())
    }

    /// Start the reference clock; call once before opening a session
    pub fn start_reference_clock(&self) {
        critical_section::with(|cs| self.dispatcher.borrow_ref_mut(cs).start_clock());
        info!("Reference clock running, modulus {}", self.config.modulus);
    }

    /// Run `f` with exclusive access to the window peripherals
    pub fn with_peripherals<U>(
        &self,
        f: impl FnOnce(&mut WindowPeripherals<C, F, R, T>) -> U,
    ) -> U {
        critical_section::with(|cs| f(self.dispatcher.borrow_ref_mut(cs).peripherals()))
    }
}

impl<C, F, R, T> WindowSchedule for SyncEngine<C, F, R, T>
where
    C: ReferenceClock,
    F: EventRouter,
    R: RadioPeripheral,
    T: ExpiryTimer + ChainTimer,
{
    fn earliest_request(&self) -> WindowRequest {
        self.config.earliest_request(self.role)
    }

    fn session_requested(&self) {
        critical_section::with(|cs| self.dispatcher.borrow_ref_mut(cs).mark_requested());
    }

    fn session_request_failed(&self) {
        critical_section::with(|cs| self.dispatcher.borrow_ref_mut(cs).abandon_request());
    }

    fn session_closing(&self) {
        critical_section::with(|cs| self.dispatcher.borrow_ref_mut(cs).begin_close());
    }
}
