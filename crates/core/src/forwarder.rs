//! Connectivity Forwarder Protocol
//!
//! A forwarder state parks the controller until some condition holds, then
//! resumes the plan that was in flight when it was entered. The parking logic
//! is shared; only the readiness predicate differs between forwarders.

use crate::{context::TransitionContext, session::Continuations, state::InteractionState};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Readiness predicate of a downstream device.
pub trait Readiness: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// For devices nothing is known about; always ready.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysReady;

impl Readiness for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}

/// Considers a device ready while its heartbeats keep arriving within `timeout`.
#[derive(Debug)]
pub struct Watchdog {
    name: String,
    timeout: Duration,
    last_seen: Mutex<Option<Instant>>,
}

impl Watchdog {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            last_seen: Mutex::new(None),
        }
    }

    /// Records a heartbeat.
    pub fn feed(&self) {
        match self.last_seen.lock() {
            Ok(mut last) => *last = Some(Instant::now()),
            Err(_) => warn!(watchdog = %self.name, "Watchdog lock poisoned; heartbeat dropped"),
        }
    }

    pub fn is_responsive(&self) -> bool {
        self.last_seen
            .lock()
            .ok()
            .and_then(|last| *last)
            .is_some_and(|seen| seen.elapsed() <= self.timeout)
    }
}

impl Readiness for Watchdog {
    fn is_ready(&self) -> bool {
        self.is_responsive()
    }
}

/// Outcome of one tick of a parked forwarder.
#[derive(Debug, Clone, PartialEq)]
pub enum Parked {
    /// Go to `next` with the restored context.
    Resume {
        next: InteractionState,
        context: TransitionContext,
    },
    /// Still waiting; re-enter the forwarder after an idle delay.
    Waiting,
}

/// The continuation-parking primitive.
///
/// On first entry (`came_from` differs from `own`) the incoming context is
/// saved verbatim. Once `ready`, the saved context is restored and the next
/// planned state popped from it; with nothing planned, `fallback` is used.
pub fn park(
    own: InteractionState,
    continuations: &mut Continuations,
    incoming: TransitionContext,
    ready: bool,
    fallback: InteractionState,
) -> Parked {
    if incoming.is_first_entry(own) {
        info!(state = %own, "STATE: {}", own);
        continuations.save(own, incoming);
    }
    if !ready {
        return Parked::Waiting;
    }
    let mut context = continuations.take(own).unwrap_or_default();
    let next = context.pop_next().unwrap_or_else(|| {
        debug!(state = %own, %fallback, "Nothing planned after forwarder");
        fallback
    });
    Parked::Resume { next, context }
}

/// A forwarder waiting for one device, parametrized by its readiness predicate.
#[derive(Clone)]
pub struct ConnectivityForwarder {
    state: InteractionState,
    readiness: Arc<dyn Readiness>,
}

impl ConnectivityForwarder {
    pub fn new(state: InteractionState, readiness: Arc<dyn Readiness>) -> Self {
        Self { state, readiness }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn tick(&self, continuations: &mut Continuations, incoming: TransitionContext) -> Parked {
        park(
            self.state,
            continuations,
            incoming,
            self.readiness.is_ready(),
            InteractionState::WaitingForFeedback,
        )
    }
}

impl std::fmt::Debug for ConnectivityForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityForwarder")
            .field("state", &self.state)
            .field("ready", &self.readiness.is_ready())
            .finish()
    }
}
