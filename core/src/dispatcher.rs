//! Window signal dispatcher
//!
//! State machine driven by the arbiter's window signals. Every handler runs
//! in the arbiter's signal context: it never blocks, sleeps or allocates,
//! and it answers each signal with the action the arbiter should take next.
//!
//! ```text
//!          open + request                Start
//!   Idle ─────────────────► Requested ─────────► InWindow
//!    ▲ ◄──── request failed   ▲   │ Cancelled        │
//!    │ SessionClosed          │   └──► Earliest      │ TimerExpiry
//!    │                        └──────────────────────┘  (Normal request)
//!  Closing ◄── close accepted
//! ```
//!
//! Once `Closing`, only `SessionClosed` moves the state. Window signals that
//! race the close are still served and still answered with a request.

use hal_abstractions::{
    ChainTimer, EventRouter, EventSource, ExpiryTimer, RadioInterrupts, RadioPeripheral,
    ReferenceClock, Signal, SignalAction, TaskSink,
};

use crate::config::resources::{CAPTURE_ROUTE, CHAIN_CAPTURE_CHANNEL, RADIO_START_ROUTE};
use crate::config::SyncConfig;
use crate::corrector::{CorrectionOutcome, CorrectionState, OffsetCorrector};
use crate::error::SyncError;
use crate::packet::SyncPacket;
use crate::role::Role;
use crate::stats::SyncStats;

/// Largest payload the receive path accepts
pub const RX_BUFFER_LEN: usize = 32;

/// Dispatcher lifecycle
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
    /// No session open
    Idle,
    /// A window request is outstanding
    Requested,
    /// A window is owned
    InWindow,
    /// Close issued, waiting for `SessionClosed`
    Closing,
}

/// Hardware the dispatcher drives inside a window
pub struct WindowPeripherals<C, F, R, T> {
    pub clock: C,
    pub router: F,
    pub radio: R,
    pub timers: T,
}

pub struct WindowDispatcher<C, F, R, T> {
    config: SyncConfig,
    role: Role,
    state: DispatchState,
    hw: WindowPeripherals<C, F, R, T>,
    corrector: OffsetCorrector,
    rx_buf: [u8; RX_BUFFER_LEN],
}

impl<C, F, R, T> WindowDispatcher<C, F, R, T>
where
    C: ReferenceClock,
    F: EventRouter,
    R: RadioPeripheral,
    T: ExpiryTimer + ChainTimer,
{
    pub fn new(config: SyncConfig, role: Role, hw: WindowPeripherals<C, F, R, T>) -> Self {
        Self {
            corrector: OffsetCorrector::new(&config),
            config,
            role,
            state: DispatchState::Idle,
            hw,
            rx_buf: [0; RX_BUFFER_LEN],
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn correction(&self) -> CorrectionState {
        self.corrector.state()
    }

    pub fn peripherals(&mut self) -> &mut WindowPeripherals<C, F, R, T> {
        &mut self.hw
    }

    /// (Re)start the reference clock from zero at the configured modulus
    pub fn start_clock(&mut self) {
        self.hw.clock.stop();
        self.hw.clock.clear();
        self.hw.clock.start(self.config.modulus);
    }

    /// The first request of a fresh session is about to be issued
    ///
    /// Called before the request so a `Start` delivered right after it is
    /// not overwritten.
    pub fn mark_requested(&mut self) {
        if self.state == DispatchState::Idle {
            self.state = DispatchState::Requested;
        }
    }

    /// The first request was rejected; no window will follow
    pub fn abandon_request(&mut self) {
        if self.state == DispatchState::Requested {
            self.state = DispatchState::Idle;
        }
    }

    /// The arbiter accepted a close of the session
    ///
    /// `SessionClosed` may already have been delivered, in which case the
    /// dispatcher stays `Idle`.
    pub fn begin_close(&mut self) {
        if self.state != DispatchState::Idle {
            self.state = DispatchState::Closing;
        }
    }

    fn await_next_window(&mut self) {
        if self.state != DispatchState::Closing {
            self.state = DispatchState::Requested;
        }
    }

    /// Handle one arbiter signal
    pub fn handle(&mut self, signal: Signal, stats: &SyncStats) -> SignalAction {
        trace!("Signal {} in {}", signal, self.state);
        match signal {
            Signal::Start => {
                self.on_start(stats);
                SignalAction::None
            }
            Signal::RadioEvent => {
                if self.role == Role::Rx {
                    self.on_receive(stats);
                }
                self.silence_radio();
                SignalAction::None
            }
            Signal::TimerExpiry => {
                self.silence_radio();
                self.hw.timers.disarm_expiry();
                self.corrector.refresh(&self.hw.router);
                self.await_next_window();
                SignalAction::Request(self.config.next_request(self.role))
            }
            Signal::Cancelled => {
                stats.record_cancelled();
                debug!("Window cancelled, requesting earliest");
                self.await_next_window();
                SignalAction::Request(self.config.earliest_request(self.role))
            }
            Signal::SessionIdle => SignalAction::None,
            Signal::SessionClosed => {
                self.silence_radio();
                self.state = DispatchState::Idle;
                SignalAction::None
            }
        }
    }

    fn on_start(&mut self, stats: &SyncStats) {
        if self.state != DispatchState::Closing {
            self.state = DispatchState::InWindow;
        }
        stats.record_window_started();

        self.hw
            .timers
            .arm_expiry(self.config.expiry_after_us(self.role));

        self.hw.radio.disable();
        self.hw.radio.clear_events();
        self.hw.radio.configure(&self.config.radio);

        match self.role {
            Role::Tx => match self.run_chain() {
                Ok(()) => stats.record_packet_sent(),
                Err(e) => {
                    self.silence_radio();
                    warn!("Sync packet skipped: {}", e);
                }
            },
            Role::Rx => {
                self.hw
                    .radio
                    .enable_interrupts(RadioInterrupts::CRC_OK.union(RadioInterrupts::END));
                self.hw.radio.start_rx(true);
            }
        }
    }

    /// Capture the reference clock and start the radio through the fabric
    ///
    /// ```text
    ///   0 µs          capture_delay          radio_start_delay
    ///   TXEN, fire ──► clock capture ──────► radio START
    ///                  (radio ready)   CPU writes the captured tick
    /// ```
    ///
    /// Both edges are hardware routes off the chain timer, so the time from
    /// capture to the first bit on air does not depend on the CPU. The chain
    /// timer stops itself at the radio start.
    fn run_chain(&mut self) -> Result<(), SyncError> {
        let hw = &mut self.hw;
        hw.timers
            .prime(self.config.capture_delay, self.config.radio_start_delay);
        hw.router.bind(
            CAPTURE_ROUTE,
            EventSource::ChainCompare(0),
            TaskSink::ClockCapture(CHAIN_CAPTURE_CHANNEL),
        );
        hw.router.bind(
            RADIO_START_ROUTE,
            EventSource::ChainCompare(1),
            TaskSink::RadioStart,
        );
        hw.router.enable(CAPTURE_ROUTE);
        hw.router.enable(RADIO_START_ROUTE);
        hw.radio.enable_interrupts(RadioInterrupts::END);
        hw.radio.ramp_up_tx();
        hw.timers.fire();

        let mut captured = false;
        for _ in 0..self.config.chain_spin_limit {
            if hw.timers.is_captured() {
                captured = true;
                break;
            }
            core::hint::spin_loop();
        }
        hw.router.disable(CAPTURE_ROUTE);
        if !captured {
            return Err(SyncError::ChainTimeout);
        }

        let tick = hw.clock.read(CHAIN_CAPTURE_CHANNEL);
        hw.radio.load_payload(&SyncPacket::new(tick).encode());
        Ok(())
    }

    fn disarm_chain(&mut self) {
        let hw = &mut self.hw;
        hw.router.disable(CAPTURE_ROUTE);
        hw.router.disable(RADIO_START_ROUTE);
        hw.timers.reset();
    }

    fn on_receive(&mut self, stats: &SyncStats) {
        let Some(len) = self.hw.radio.take_received(&mut self.rx_buf) else {
            stats.record_spurious();
            return;
        };

        let packet = match SyncPacket::decode(&self.rx_buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropped sync packet: {}", e);
                return;
            }
        };

        match self
            .corrector
            .correct(packet.captured_tick, &mut self.hw.clock, &mut self.hw.router)
        {
            Ok(outcome) => {
                stats.record_packet_received(outcome.offset());
                match outcome {
                    CorrectionOutcome::Aligned { .. } => stats.record_already_aligned(),
                    CorrectionOutcome::Armed { offset, target } => {
                        stats.record_correction_armed();
                        debug!("Offset {} corrected at tick {}", offset, target);
                    }
                }
            }
            Err(e) => warn!("Dropped sync packet: {}", e),
        }
    }

    fn silence_radio(&mut self) {
        if self.role == Role::Tx {
            self.disarm_chain();
        }
        self.hw.radio.disable_interrupts();
        self.hw.radio.clear_events();
        self.hw.radio.disable();
    }
}
