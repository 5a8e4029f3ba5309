//! Run state of an active build and its pause/resume/cancel transitions.
//!
//! [`BuildControl`] is shared between the drive loop and any number of
//! caller tasks holding a [`BuildHandle`](crate::engine::BuildHandle).
//! Callers only request transitions; the state itself changes solely inside
//! [`BuildControl::transition`], which also publishes the matching event.
//!
//! # Architecture
//!
//! The state is a single [`AtomicU8`] updated with compare-and-swap, so the
//! loop reads it without locking. A parked loop is woken through a
//! [`Notify`] when the build is resumed or cancelled.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use mason_types::{BuildEvent, BuildId, RunState};
use tokio::sync::Notify;
use tracing::info;

use crate::events::EventBus;

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const CANCELLED: u8 = 2;

const fn encode(state: RunState) -> u8 {
    match state {
        RunState::Running => RUNNING,
        RunState::Paused => PAUSED,
        RunState::Cancelled => CANCELLED,
    }
}

const fn decode(raw: u8) -> RunState {
    match raw {
        RUNNING => RunState::Running,
        PAUSED => RunState::Paused,
        _ => RunState::Cancelled,
    }
}

/// A requested run state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Running to paused.
    Pause,
    /// Paused to running.
    Resume,
    /// Any state to cancelled.
    Cancel,
}

/// Shared run state of one build.
#[derive(Debug)]
pub struct BuildControl {
    build_id: BuildId,
    state: AtomicU8,
    wake: Notify,
    events: EventBus,
}

impl BuildControl {
    /// A running build publishing transitions on `events`.
    pub fn new(build_id: BuildId, events: EventBus) -> Self {
        Self {
            build_id,
            state: AtomicU8::new(RUNNING),
            wake: Notify::new(),
            events,
        }
    }

    /// Identifier of the build this control belongs to.
    pub const fn build_id(&self) -> BuildId {
        self.build_id
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        decode(self.state.load(Ordering::Acquire))
    }

    /// Apply a transition. Returns the new state if it changed anything,
    /// `None` if the request was a no-op in the current state.
    pub fn transition(&self, request: Transition) -> Option<RunState> {
        let (next, event) = match request {
            Transition::Pause => {
                self.state
                    .compare_exchange(RUNNING, PAUSED, Ordering::AcqRel, Ordering::Acquire)
                    .ok()?;
                (RunState::Paused, BuildEvent::Paused)
            }
            Transition::Resume => {
                self.state
                    .compare_exchange(PAUSED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                    .ok()?;
                (RunState::Running, BuildEvent::Resumed)
            }
            Transition::Cancel => {
                let previous = self.state.swap(encode(RunState::Cancelled), Ordering::AcqRel);
                if previous == CANCELLED {
                    return None;
                }
                (RunState::Cancelled, BuildEvent::Cancelled)
            }
        };
        info!(build_id = %self.build_id, state = ?next, "Build state changed");
        if next != RunState::Paused {
            self.wake.notify_one();
        }
        self.events.publish(self.build_id, event);
        Some(next)
    }

    /// Pause a running build. Returns whether the state changed.
    pub fn pause(&self) -> bool {
        self.transition(Transition::Pause).is_some()
    }

    /// Pause after a failed action. Unlike [`Self::pause`], a build that an
    /// operator already paused announces `Paused` again so the error event
    /// is always followed by one. Returns `false` only for a cancelled build.
    pub fn pause_after_error(&self) -> bool {
        if self.pause() {
            return true;
        }
        if self.state() != RunState::Paused {
            return false;
        }
        info!(build_id = %self.build_id, "Build already paused, repeating pause");
        self.events.publish(self.build_id, BuildEvent::Paused);
        true
    }

    /// Resume a paused build. Returns whether the state changed.
    pub fn resume(&self) -> bool {
        self.transition(Transition::Resume).is_some()
    }

    /// Cancel the build for good. Returns whether the state changed.
    pub fn cancel(&self) -> bool {
        self.transition(Transition::Cancel).is_some()
    }

    /// Wait until resumed or cancelled, but at most `bound`.
    ///
    /// Returns immediately if the build is not paused. Callers re-check the
    /// state afterwards; a timeout is not an error.
    pub async fn wait_while_paused(&self, bound: Duration) {
        if self.state() != RunState::Paused {
            return;
        }
        let _ = tokio::time::timeout(bound, self.wake.notified()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn control() -> (BuildControl, tokio::sync::broadcast::Receiver<mason_types::BuildEventRecord>) {
        let bus = EventBus::new(16);
        let rx = bus.subscribe();
        (BuildControl::new(BuildId::new(), bus), rx)
    }

    #[test]
    fn initial_state_is_running() {
        let (control, _) = control();
        assert_eq!(control.state(), RunState::Running);
    }

    #[test]
    fn pause_and_resume() {
        let (control, mut rx) = control();
        assert!(control.pause());
        assert_eq!(control.state(), RunState::Paused);
        assert!(control.resume());
        assert_eq!(control.state(), RunState::Running);

        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Paused);
        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Resumed);
    }

    #[test]
    fn redundant_requests_are_no_ops() {
        let (control, mut rx) = control();
        assert!(!control.resume());
        assert!(control.pause());
        assert!(!control.pause());

        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Paused);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn cancel_is_terminal() {
        let (control, mut rx) = control();
        assert!(control.pause());
        assert!(control.cancel());
        assert!(!control.resume());
        assert!(!control.pause());
        assert!(!control.cancel());
        assert_eq!(control.state(), RunState::Cancelled);

        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Paused);
        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_pause_is_announced_even_when_already_paused() {
        let (control, mut rx) = control();
        assert!(control.pause());
        assert!(control.pause_after_error());
        assert_eq!(control.state(), RunState::Paused);
        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Paused);
        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Paused);

        assert!(control.cancel());
        assert!(!control.pause_after_error());
        assert_eq!(rx.try_recv().unwrap().event, BuildEvent::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_after_bound() {
        let (control, _) = control();
        control.pause();
        let started = tokio::time::Instant::now();
        control.wait_while_paused(Duration::from_millis(500)).await;
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(control.state(), RunState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_wakes_a_parked_waiter() {
        let (control, _) = control();
        let control = Arc::new(control);
        control.pause();

        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                control.wait_while_paused(Duration::from_secs(3600)).await;
            })
        };
        tokio::task::yield_now().await;
        control.resume();
        waiter.await.unwrap();
        assert_eq!(control.state(), RunState::Running);
    }

    #[tokio::test]
    async fn wait_is_immediate_when_running() {
        let (control, _) = control();
        control.wait_while_paused(Duration::from_secs(3600)).await;
    }
}
