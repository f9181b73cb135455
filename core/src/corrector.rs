//! Offset corrector
//!
//! Aligns the local reference clock to the peer's from one received sync
//! packet. The remote tick `R`, shifted by the calibrated chain delay `D`, is
//! what the peer's counter reads at the instant the local counter is
//! captured as `L`. The local counter is then `offset` ticks behind, modulo
//! `M`.
//!
//! Instead of writing the counter (which would race the running hardware),
//! a one-shot route clears it when it reaches `M - offset`. At that same
//! instant the peer's counter wraps to zero, so both read the same value
//! from then on. The route disables its own group when it fires, so a
//! correction is applied at most once.
//!
//! ```text
//! adjusted = (R + D) mod M
//! offset   = L > adjusted ? M - L + adjusted : adjusted - L
//! offset in {0, M}  => aligned, nothing armed
//! otherwise         => clear at compare M - offset, then self-disable
//! ```

use hal_abstractions::{EventRouter, EventSource, ReferenceClock, TaskSink, Tick};

use crate::config::resources::{
    CORRECTION_CHANNEL, CORRECTION_GROUP, CORRECTION_ROUTE, LOCAL_CAPTURE_CHANNEL,
};
use crate::config::SyncConfig;
use crate::error::SyncError;

/// Ticks the local clock must advance to match the peer
pub fn compute_offset(remote: Tick, local: Tick, chain_delay: Tick, modulus: Tick) -> Tick {
    let adjusted = ((remote as u64 + chain_delay as u64) % modulus as u64) as Tick;
    // A capture racing the wrap compare can read exactly `modulus`
    let local = local % modulus;
    if local > adjusted {
        modulus - local + adjusted
    } else {
        adjusted - local
    }
}

/// Compare value that realigns the clock, or `None` when already aligned
///
/// Both `0` and `modulus` mean aligned: a compare at `modulus` (or `0`)
/// would clear the counter on its own wrap and corrupt it.
pub fn correction_target(offset: Tick, modulus: Tick) -> Option<Tick> {
    modulus
        .checked_sub(offset)
        .filter(|target| *target != 0 && *target != modulus)
}

/// Software view of the one-shot correction route
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CorrectionState {
    pub armed: bool,
    pub target_tick: Tick,
}

/// Result of processing one sync packet
///
/// This is where a convergence detector would hook in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CorrectionOutcome {
    /// No correction needed
    Aligned { offset: Tick },
    /// Correction armed to fire at `target`
    Armed { offset: Tick, target: Tick },
}

impl CorrectionOutcome {
    pub fn offset(&self) -> Tick {
        match self {
            Self::Aligned { offset } | Self::Armed { offset, .. } => *offset,
        }
    }
}

pub struct OffsetCorrector {
    modulus: Tick,
    chain_delay: Tick,
    state: CorrectionState,
}

impl OffsetCorrector {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            modulus: config.modulus,
            chain_delay: config.chain_delay,
            state: CorrectionState::default(),
        }
    }

    pub fn state(&self) -> CorrectionState {
        self.state
    }

    /// Pick up a route that has fired and disabled itself
    pub fn refresh<F: EventRouter>(&mut self, router: &F) {
        if self.state.armed && !router.is_enabled(CORRECTION_ROUTE) {
            self.state.armed = false;
        }
    }

    /// Capture the local tick and arm a correction towards `remote`
    pub fn correct<C, F>(
        &mut self,
        remote: Tick,
        clock: &mut C,
        router: &mut F,
    ) -> Result<CorrectionOutcome, SyncError>
    where
        C: ReferenceClock,
        F: EventRouter,
    {
        if remote >= self.modulus {
            return Err(SyncError::TickOutOfRange {
                tick: remote,
                modulus: self.modulus,
            });
        }

        let local = clock.capture(LOCAL_CAPTURE_CHANNEL);
        let offset = compute_offset(remote, local, self.chain_delay, self.modulus);
        self.refresh(router);

        match correction_target(offset, self.modulus) {
            None => Ok(CorrectionOutcome::Aligned { offset }),
            Some(target) => {
                self.arm(target, clock, router);
                Ok(CorrectionOutcome::Armed { offset, target })
            }
        }
    }

    fn arm<C: ReferenceClock, F: EventRouter>(&mut self, target: Tick, clock: &mut C, router: &mut F) {
        // Re-arming replaces a correction that has not fired yet
        router.disable(CORRECTION_ROUTE);
        clock.set_compare(CORRECTION_CHANNEL, target);
        router.set_group(CORRECTION_GROUP, 1 << CORRECTION_ROUTE);
        router.bind(
            CORRECTION_ROUTE,
            EventSource::ClockCompare(CORRECTION_CHANNEL),
            TaskSink::ClockClear,
        );
        router.fork(CORRECTION_ROUTE, TaskSink::DisableGroup(CORRECTION_GROUP));
        // Armed through the same group the route disables itself with
        router.enable_group(CORRECTION_GROUP);
        self.state = CorrectionState {
            armed: true,
            target_tick: target,
        };
    }
}
