//! Time-division arbiter interface
//!
//! The arbiter owns the radio and lends it out in bounded, exclusive windows.
//! A session is opened once, then every window is obtained through a
//! [`WindowRequest`]. While a window is owned, the arbiter delivers
//! [`Signal`]s to the engine synchronously and the engine answers each one
//! with a [`SignalAction`].

/// Opaque session handle returned by [`WindowArbiter::open`]
pub type SessionId = u8;

/// Scheduling priority of a window request
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowPriority {
    /// May be preempted by the other radio user
    Normal,
    /// Competes with the other radio user's high priority activity
    High,
}

/// Clock accuracy the window requires from the arbiter
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockAccuracy {
    /// The high frequency clock may still be ramping when the window opens
    NoGuarantee,
    /// The crystal oscillator is running for the whole window
    Xtal,
}

/// Placement policy of a window request
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowKind {
    /// As soon as possible, or give up after `timeout_us`
    Earliest {
        /// How long the arbiter may search for a free slot
        timeout_us: u32,
    },
    /// Exactly `distance_us` after the start of the previous window
    Normal {
        /// Offset from the start of the previous window
        distance_us: u32,
    },
}

/// A request for one window of radio ownership
///
/// Immutable once issued; the arbiter alone decides whether and when it is
/// granted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowRequest {
    /// Earliest or Normal placement
    pub kind: WindowKind,
    /// Scheduling priority
    pub priority: WindowPriority,
    /// Clock accuracy requirement
    pub clock: ClockAccuracy,
    /// Window length in microseconds
    pub length_us: u32,
}

impl WindowRequest {
    /// Request the earliest available window
    pub const fn earliest(length_us: u32, timeout_us: u32) -> Self {
        Self {
            kind: WindowKind::Earliest { timeout_us },
            priority: WindowPriority::Normal,
            clock: ClockAccuracy::NoGuarantee,
            length_us,
        }
    }

    /// Request a window `distance_us` after the start of the current one
    pub const fn normal(length_us: u32, distance_us: u32) -> Self {
        Self {
            kind: WindowKind::Normal { distance_us },
            priority: WindowPriority::Normal,
            clock: ClockAccuracy::NoGuarantee,
            length_us,
        }
    }

    /// Override the scheduling priority
    pub const fn with_priority(mut self, priority: WindowPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Override the clock accuracy requirement
    pub const fn with_clock(mut self, clock: ClockAccuracy) -> Self {
        self.clock = clock;
        self
    }

    pub const fn is_earliest(&self) -> bool {
        matches!(self.kind, WindowKind::Earliest { .. })
    }
}

/// Window lifecycle signal delivered by the arbiter
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    /// A window has been granted and is now owned
    Start,
    /// The radio peripheral raised its interrupt line (possibly spuriously)
    RadioEvent,
    /// The expiry timer armed at window start has fired
    TimerExpiry,
    /// The session has no outstanding request
    SessionIdle,
    /// The session is closed; no further signals follow
    SessionClosed,
    /// The outstanding request was revoked before being granted
    Cancelled,
}

/// Action returned to the arbiter from the signal callback
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalAction {
    /// Keep the current window
    None,
    /// End the current window and request the given one
    Request(WindowRequest),
    /// End the current window without requesting another
    End,
}

impl SignalAction {
    /// The request carried by this action, if any
    pub fn request(&self) -> Option<&WindowRequest> {
        match self {
            Self::Request(request) => Some(request),
            _ => None,
        }
    }
}

/// Arbiter rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArbiterError {
    /// The arbiter returned a nonzero status
    Rejected(i32),
}

impl ArbiterError {
    /// Map a raw arbiter status code, zero meaning success
    pub fn check(status: i32) -> Result<(), Self> {
        match status {
            0 => Ok(()),
            code => Err(Self::Rejected(code)),
        }
    }
}

impl core::fmt::Display for ArbiterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Rejected(code) => write!(f, "Arbiter rejected call with status {}", code),
        }
    }
}

impl core::error::Error for ArbiterError {}

/// The external time-division arbiter
///
/// Every method must be called from the one execution context the arbiter
/// designates; callers outside it go through the call serializer. The
/// signal callback is fixed by the implementation when the session opens.
pub trait WindowArbiter {
    /// Open a session bound to the implementation's signal callback
    fn open(&mut self) -> Result<SessionId, ArbiterError>;

    /// Issue a window request on an open session
    fn request(&mut self, session: SessionId, request: &WindowRequest) -> Result<(), ArbiterError>;

    /// Close a session; a `SessionClosed` signal follows
    fn close(&mut self, session: SessionId) -> Result<(), ArbiterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let earliest = WindowRequest::earliest(5_000, 1_000_000);
        assert!(earliest.is_earliest());
        assert_eq!(earliest.length_us, 5_000);
        assert_eq!(
            earliest.kind,
            WindowKind::Earliest {
                timeout_us: 1_000_000
            }
        );

        let normal = WindowRequest::normal(90_000, 100_000).with_priority(WindowPriority::High);
        assert!(!normal.is_earliest());
        assert_eq!(normal.priority, WindowPriority::High);
        assert_eq!(normal.clock, ClockAccuracy::NoGuarantee);
    }

    #[test]
    fn test_status_check() {
        assert_eq!(ArbiterError::check(0), Ok(()));
        assert_eq!(ArbiterError::check(-22), Err(ArbiterError::Rejected(-22)));
    }
}
