//! Call serializer
//!
//! The arbiter accepts session calls from one execution context only.
//! Application tasks enqueue [`Call`]s on a bounded [`CallSerializer`]; a
//! single [`SessionOwner`] task drains it and performs the open, request
//! and close calls. A full queue makes `start`/`stop` wait.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use hal_abstractions::{SessionId, WindowArbiter};

use crate::engine::WindowSchedule;
use crate::error::SyncError;

/// Capacity of the call queue
pub const CALL_QUEUE_DEPTH: usize = 4;

/// Request for the session owner
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Call {
    Start,
    Stop,
}

/// Bounded queue of session calls
pub struct CallSerializer<M: RawMutex, const N: usize = CALL_QUEUE_DEPTH> {
    queue: Channel<M, Call, N>,
}

impl<M: RawMutex, const N: usize> CallSerializer<M, N> {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Queue a schedule start, waiting for space
    pub async fn start_synchronized_schedule(&self) {
        self.queue.send(Call::Start).await
    }

    /// Queue a schedule stop, waiting for space
    pub async fn stop_synchronized_schedule(&self) {
        self.queue.send(Call::Stop).await
    }

    pub fn try_start(&self) -> Result<(), SyncError> {
        self.queue
            .try_send(Call::Start)
            .map_err(|_| SyncError::QueueFull)
    }

    pub fn try_stop(&self) -> Result<(), SyncError> {
        self.queue
            .try_send(Call::Stop)
            .map_err(|_| SyncError::QueueFull)
    }

    /// Wait for the next queued call
    pub async fn next_call(&self) -> Call {
        self.queue.receive().await
    }

    /// Number of queued calls
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<M: RawMutex, const N: usize> Default for CallSerializer<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The only caller of the arbiter's session API
pub struct SessionOwner<'e, A, E> {
    arbiter: A,
    schedule: &'e E,
    session: Option<SessionId>,
}

impl<'e, A, E> SessionOwner<'e, A, E>
where
    A: WindowArbiter,
    E: WindowSchedule,
{
    pub fn new(arbiter: A, schedule: &'e E) -> Self {
        Self {
            arbiter,
            schedule,
            session: None,
        }
    }

    /// Currently open session
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn arbiter(&self) -> &A {
        &self.arbiter
    }

    /// Perform one call against the arbiter
    pub fn process(&mut self, call: Call) -> Result<(), SyncError> {
        match call {
            Call::Start => self.open_session(),
            Call::Stop => self.close_session(),
        }
    }

    fn open_session(&mut self) -> Result<(), SyncError> {
        if self.session.is_some() {
            return Err(SyncError::AlreadyRunning);
        }

        let session = self.arbiter.open()?;
        // Kept even if the request below is rejected, so `Stop` can close it
        self.session = Some(session);

        let request = self.schedule.earliest_request();
        // The first window may start before `request` returns
        self.schedule.session_requested();
        if let Err(e) = self.arbiter.request(session, &request) {
            self.schedule.session_request_failed();
            return Err(e.into());
        }
        info!("Session {} opened, earliest window requested", session);
        Ok(())
    }

    fn close_session(&mut self) -> Result<(), SyncError> {
        let session = self.session.ok_or(SyncError::NotRunning)?;
        self.arbiter.close(session)?;
        self.session = None;
        self.schedule.session_closing();
        info!("Session {} closed", session);
        Ok(())
    }

    /// Drain `calls` forever
    pub async fn run<M: RawMutex, const N: usize>(&mut self, calls: &CallSerializer<M, N>) -> ! {
        loop {
            let call = calls.next_call().await;
            if let Err(e) = self.process(call) {
                warn!("{} rejected: {}", call, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatchState;
    use crate::role::Role;
    use crate::testing::{engine, MockArbiter};
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use hal_abstractions::{ArbiterError, Signal, SignalAction};

    type Calls = CallSerializer<CriticalSectionRawMutex>;

    #[test]
    fn test_full_queue_blocks_caller() {
        let calls = Calls::new();
        block_on(async {
            for _ in 0..CALL_QUEUE_DEPTH {
                calls.start_synchronized_schedule().await;
            }

            match select(calls.start_synchronized_schedule(), core::future::ready(())).await {
                Either::First(()) => panic!("fifth start should wait for space"),
                Either::Second(()) => {}
            }
            assert_eq!(calls.pending(), CALL_QUEUE_DEPTH);
            assert_eq!(calls.try_stop(), Err(SyncError::QueueFull));

            assert_eq!(calls.next_call().await, Call::Start);
            calls.stop_synchronized_schedule().await;
            assert_eq!(calls.pending(), CALL_QUEUE_DEPTH);
        });
    }

    #[test]
    fn test_calls_drain_in_order() {
        let calls = Calls::new();
        calls.try_start().unwrap();
        calls.try_stop().unwrap();

        let engine = engine(Role::Tx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);
        block_on(async {
            while calls.pending() > 0 {
                let call = calls.next_call().await;
                owner.process(call).unwrap();
            }
        });

        assert_eq!(owner.arbiter().opens, 1);
        assert_eq!(owner.arbiter().closes, [0]);
        assert_eq!(owner.session(), None);
        assert_eq!(engine.state(), DispatchState::Closing);
    }

    #[test]
    fn test_start_opens_and_requests_earliest() {
        let engine = engine(Role::Rx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);

        owner.process(Call::Start).unwrap();

        assert_eq!(owner.session(), Some(0));
        let (session, request) = owner.arbiter().requests[0];
        assert_eq!(session, 0);
        assert!(request.is_earliest());
        assert_eq!(request.length_us, 90_000);
        assert_eq!(engine.state(), DispatchState::Requested);
    }

    #[test]
    fn test_second_start_rejected() {
        let engine = engine(Role::Tx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);

        owner.process(Call::Start).unwrap();
        assert_eq!(owner.process(Call::Start), Err(SyncError::AlreadyRunning));

        assert_eq!(owner.arbiter().opens, 1);
        assert_eq!(owner.arbiter().requests.len(), 1);
    }

    #[test]
    fn test_open_rejection_leaves_no_session() {
        let engine = engine(Role::Tx);
        let arbiter = MockArbiter {
            open_status: -12,
            ..MockArbiter::default()
        };
        let mut owner = SessionOwner::new(arbiter, &engine);

        assert_eq!(
            owner.process(Call::Start),
            Err(SyncError::Arbiter(ArbiterError::Rejected(-12)))
        );
        assert_eq!(owner.session(), None);
        assert!(owner.arbiter().requests.is_empty());
        assert_eq!(engine.state(), DispatchState::Idle);
    }

    #[test]
    fn test_request_rejection_keeps_session_closable() {
        let engine = engine(Role::Tx);
        let arbiter = MockArbiter {
            request_status: -22,
            ..MockArbiter::default()
        };
        let mut owner = SessionOwner::new(arbiter, &engine);

        assert_eq!(
            owner.process(Call::Start),
            Err(SyncError::Arbiter(ArbiterError::Rejected(-22)))
        );
        assert_eq!(owner.session(), Some(0));
        assert_eq!(engine.state(), DispatchState::Idle);

        owner.process(Call::Stop).unwrap();
        assert_eq!(owner.arbiter().closes, [0]);
    }

    #[test]
    fn test_rejected_close_keeps_session() {
        let engine = engine(Role::Tx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);
        owner.process(Call::Start).unwrap();

        owner.arbiter.close_status = -5;
        assert_eq!(
            owner.process(Call::Stop),
            Err(SyncError::Arbiter(ArbiterError::Rejected(-5)))
        );
        assert_eq!(owner.session(), Some(0));
        assert_eq!(engine.state(), DispatchState::Requested);

        owner.arbiter.close_status = 0;
        assert_eq!(owner.process(Call::Start), Err(SyncError::AlreadyRunning));
        assert_eq!(owner.arbiter().opens, 1);

        owner.process(Call::Stop).unwrap();
        assert_eq!(owner.arbiter().closes, [0]);
        assert_eq!(owner.session(), None);
        assert_eq!(engine.state(), DispatchState::Closing);
    }

    #[test]
    fn test_first_window_before_request_returns() {
        let engine = engine(Role::Rx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);
        owner.process(Call::Start).unwrap();

        // Arbiter grants the window; the owner's bookkeeping must not undo it
        engine.on_signal(Signal::Start);
        engine.session_requested();

        assert_eq!(engine.state(), DispatchState::InWindow);
    }

    #[test]
    fn test_stop_without_session() {
        let engine = engine(Role::Rx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);

        assert_eq!(owner.process(Call::Stop), Err(SyncError::NotRunning));
        assert!(owner.arbiter().closes.is_empty());
    }

    #[test]
    fn test_cancel_while_requested_does_not_reopen() {
        let engine = engine(Role::Rx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);
        owner.process(Call::Start).unwrap();

        let action = engine.on_signal(Signal::Cancelled);

        let SignalAction::Request(request) = action else {
            panic!("cancellation must re-request");
        };
        assert!(request.is_earliest());
        assert_eq!(engine.state(), DispatchState::Requested);
        assert_eq!(owner.arbiter().opens, 1);
        assert_eq!(owner.arbiter().requests.len(), 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let engine = engine(Role::Tx);
        let mut owner = SessionOwner::new(MockArbiter::default(), &engine);

        owner.process(Call::Start).unwrap();
        owner.process(Call::Stop).unwrap();
        engine.on_signal(Signal::SessionClosed);
        owner.process(Call::Start).unwrap();

        assert_eq!(owner.session(), Some(1));
        assert_eq!(owner.arbiter().opens, 2);
        assert_eq!(engine.state(), DispatchState::Requested);
    }
}
