//! MPSL Timeslot Arbiter Module
//!
//! This module is the **ONLY** place in the firmware where `unsafe` code is
//! allowed. It binds the engine to the MPSL timeslot C API.
//!
//! # Why This Module Exists
//!
//! The timeslot API is a raw FFI surface:
//! 1. Session calls take raw pointers to request descriptors
//! 2. The signal callback is an `extern "C"` function called by MPSL at the
//!    highest interrupt priority
//! 3. The callback's return parameter and every chained request must stay
//!    valid after the callback returns, so they live in `static mut` storage
//!
//! Keeping all of it here lets every other module stay under
//! `#![deny(unsafe_code)]`.
//!
//! # Static Storage
//!
//! ```text
//! SESSION_MEM      MPSL session context, one session
//! OPEN_REQUEST     written by the session owner task only
//! NEXT_REQUEST     written by the signal callback only
//! CANCEL_REQUEST   written by the signal callback only
//! SIGNAL_RETURN    written by the signal callback only
//! ```
//!
//! # Safety Requirements
//!
//! 1. **One writer per static**: the table above must stay true
//! 2. **One session**: `init_sessions` reserves memory for exactly one
//! 3. **Callback context**: MPSL delivers one signal at a time, so the
//!    callback never re-enters itself
//! 4. **Session calls**: only the session owner task calls `open`,
//!    `request` and `close`; the callback calls `mpsl_timeslot_request` only
//!    on cancellation, as MPSL allows
#![allow(unsafe_code)]
#![deny(warnings)]

use core::cell::Cell;
use core::ptr::{self, addr_of_mut};

use critical_section::Mutex;
use defmt::{error, warn};
use hal_abstractions::{
    ArbiterError, ClockAccuracy, SessionId, Signal, SignalAction, WindowArbiter, WindowKind,
    WindowPriority, WindowRequest,
};
use nrf_mpsl::{raw, MultiprotocolServiceLayer};
use radio_sync_core::SyncEngine;

use crate::clock::Timer2Clock;
use crate::fabric::PpiRouter;
use crate::radio::NrfRadio;
use crate::timers::WindowTimers;

pub type BoardEngine = SyncEngine<Timer2Clock, PpiRouter, NrfRadio, WindowTimers>;

const SESSION_WORDS: usize = (raw::MPSL_TIMESLOT_CONTEXT_SIZE as usize + 3) / 4;

static mut SESSION_MEM: [u32; SESSION_WORDS] = [0; SESSION_WORDS];
static mut OPEN_REQUEST: raw::mpsl_timeslot_request_t = unsafe { core::mem::zeroed() };
static mut NEXT_REQUEST: raw::mpsl_timeslot_request_t = unsafe { core::mem::zeroed() };
static mut CANCEL_REQUEST: raw::mpsl_timeslot_request_t = unsafe { core::mem::zeroed() };
static mut SIGNAL_RETURN: raw::mpsl_timeslot_signal_return_param_t =
    unsafe { core::mem::zeroed() };

/// Engine the signal callback dispatches to
static ENGINE: Mutex<Cell<Option<&'static BoardEngine>>> = Mutex::new(Cell::new(None));

/// Reserve context memory for one timeslot session
///
/// Must be called once, after MPSL is initialized and before the first
/// `open`.
pub fn init_sessions() -> Result<(), ArbiterError> {
    let status = unsafe {
        raw::mpsl_timeslot_session_count_set(addr_of_mut!(SESSION_MEM).cast(), 1)
    };
    ArbiterError::check(status)
}

/// Route signals of every session to `engine`
pub fn attach(engine: &'static BoardEngine) {
    critical_section::with(|cs| ENGINE.borrow(cs).set(Some(engine)));
}

fn hfclk(clock: ClockAccuracy) -> u8 {
    match clock {
        ClockAccuracy::NoGuarantee => raw::MPSL_TIMESLOT_HFCLK_CFG_NO_GUARANTEE as u8,
        ClockAccuracy::Xtal => raw::MPSL_TIMESLOT_HFCLK_CFG_XTAL_GUARANTEED as u8,
    }
}

fn priority(priority: WindowPriority) -> u8 {
    match priority {
        WindowPriority::Normal => raw::MPSL_TIMESLOT_PRIORITY_NORMAL as u8,
        WindowPriority::High => raw::MPSL_TIMESLOT_PRIORITY_HIGH as u8,
    }
}

/// Fill `slot` with `request` and return it for MPSL
///
/// # Safety
///
/// `slot` must point to one of the request statics and the caller must be
/// its only writer.
unsafe fn write_request(
    slot: *mut raw::mpsl_timeslot_request_t,
    request: &WindowRequest,
) -> *mut raw::mpsl_timeslot_request_t {
    match request.kind {
        WindowKind::Earliest { timeout_us } => {
            (*slot).request_type = raw::MPSL_TIMESLOT_REQ_TYPE_EARLIEST as u8;
            (*slot).params.earliest = raw::mpsl_timeslot_request_earliest_t {
                hfclk: hfclk(request.clock),
                priority: priority(request.priority),
                length_us: request.length_us,
                timeout_us,
            };
        }
        WindowKind::Normal { distance_us } => {
            (*slot).request_type = raw::MPSL_TIMESLOT_REQ_TYPE_NORMAL as u8;
            (*slot).params.normal = raw::mpsl_timeslot_request_normal_t {
                hfclk: hfclk(request.clock),
                priority: priority(request.priority),
                distance_us,
                length_us: request.length_us,
            };
        }
    }
    slot
}

fn decode_signal(signal: u32) -> Option<Signal> {
    match signal {
        raw::MPSL_TIMESLOT_SIGNAL_START => Some(Signal::Start),
        raw::MPSL_TIMESLOT_SIGNAL_RADIO => Some(Signal::RadioEvent),
        raw::MPSL_TIMESLOT_SIGNAL_TIMER0 => Some(Signal::TimerExpiry),
        raw::MPSL_TIMESLOT_SIGNAL_SESSION_IDLE => Some(Signal::SessionIdle),
        raw::MPSL_TIMESLOT_SIGNAL_SESSION_CLOSED => Some(Signal::SessionClosed),
        // A blocked request is recovered the same way as a cancelled one
        raw::MPSL_TIMESLOT_SIGNAL_CANCELLED | raw::MPSL_TIMESLOT_SIGNAL_BLOCKED => {
            Some(Signal::Cancelled)
        }
        _ => None,
    }
}

unsafe extern "C" fn signal_callback(
    session: raw::mpsl_timeslot_session_id_t,
    signal: u32,
) -> *mut raw::mpsl_timeslot_signal_return_param_t {
    let Some(decoded) = decode_signal(signal) else {
        error!("Unexpected timeslot signal {}", signal);
        return ptr::null_mut();
    };
    let Some(engine) = critical_section::with(|cs| ENGINE.borrow(cs).get()) else {
        return ptr::null_mut();
    };

    let action = engine.on_signal(decoded);

    match decoded {
        // MPSL ignores the return value of these signals
        Signal::Cancelled => {
            if let SignalAction::Request(request) = action {
                let slot = write_request(addr_of_mut!(CANCEL_REQUEST), &request);
                let status = raw::mpsl_timeslot_request(session, slot);
                if let Err(e) = ArbiterError::check(status) {
                    warn!("Re-request after cancellation failed: {}", e);
                }
            }
            ptr::null_mut()
        }
        Signal::SessionIdle | Signal::SessionClosed => ptr::null_mut(),
        Signal::Start | Signal::RadioEvent | Signal::TimerExpiry => {
            let ret = addr_of_mut!(SIGNAL_RETURN);
            match action {
                SignalAction::None => {
                    (*ret).callback_action = raw::MPSL_TIMESLOT_SIGNAL_ACTION_NONE as u8;
                }
                SignalAction::Request(request) => {
                    (*ret).callback_action = raw::MPSL_TIMESLOT_SIGNAL_ACTION_REQUEST as u8;
                    (*ret).params.request.p_next =
                        write_request(addr_of_mut!(NEXT_REQUEST), &request);
                }
                SignalAction::End => {
                    (*ret).callback_action = raw::MPSL_TIMESLOT_SIGNAL_ACTION_END as u8;
                }
            }
            ret
        }
    }
}

/// [`WindowArbiter`] over the MPSL timeslot API
pub struct MpslArbiter {
    _mpsl: &'static MultiprotocolServiceLayer<'static>,
}

impl MpslArbiter {
    /// Holding the MPSL handle guarantees MPSL is initialized
    pub fn new(mpsl: &'static MultiprotocolServiceLayer<'static>) -> Self {
        Self { _mpsl: mpsl }
    }
}

impl WindowArbiter for MpslArbiter {
    fn open(&mut self) -> Result<SessionId, ArbiterError> {
        let mut session: raw::mpsl_timeslot_session_id_t = 0;
        let status = unsafe { raw::mpsl_timeslot_session_open(Some(signal_callback), &mut session) };
        ArbiterError::check(status)?;
        Ok(session)
    }

    fn request(&mut self, session: SessionId, request: &WindowRequest) -> Result<(), ArbiterError> {
        let status = unsafe {
            let slot = write_request(addr_of_mut!(OPEN_REQUEST), request);
            raw::mpsl_timeslot_request(session, slot)
        };
        ArbiterError::check(status)
    }

    fn close(&mut self, session: SessionId) -> Result<(), ArbiterError> {
        let status = unsafe { raw::mpsl_timeslot_session_close(session) };
        ArbiterError::check(status)
    }
}
