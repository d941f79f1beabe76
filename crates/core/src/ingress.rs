//! Event Ingress
//!
//! The only writer of the pending-event slots. Notifications may arrive from
//! any task at any time; each one is admitted or not based on the state that
//! is active when it arrives.

use crate::{
    event::{Admission, DemonstrationMessage, Device, Event, EventKind, admission},
    forwarder::Watchdog,
    geometry::Point,
    layout::SharedLayout,
    learner::DemonstrationSample,
    session::{PendingEvents, SharedSlots},
    state::InteractionState,
    trajectory::decode_flat_path,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cloneable handle used by transports to feed notifications to the controller.
#[derive(Clone)]
pub struct Ingress {
    slots: SharedSlots,
    layout: SharedLayout,
    watchdogs: HashMap<Device, Arc<Watchdog>>,
}

impl Ingress {
    pub fn new(slots: SharedSlots, layout: SharedLayout) -> Self {
        Self {
            slots,
            layout,
            watchdogs: HashMap::new(),
        }
    }

    /// Routes heartbeats of `device` to `watchdog`.
    pub fn with_watchdog(mut self, device: Device, watchdog: Arc<Watchdog>) -> Self {
        self.watchdogs.insert(device, watchdog);
        self
    }

    pub async fn current_state(&self) -> Option<InteractionState> {
        self.slots.lock().await.current
    }

    pub async fn pending(&self) -> PendingEvents {
        self.slots.lock().await.pending.clone()
    }

    /// Admits `event` against the active state and updates its slot.
    pub async fn submit(&self, event: Event) {
        if let Event::WordRequested(word) = &event {
            if word.trim().is_empty() {
                warn!("Ignoring empty word");
                return;
            }
        }
        let kind = event.kind();
        let current = self.current_state().await;
        match admission(current, kind) {
            Admission::Accept => {}
            Admission::Ignore => {
                debug!(?kind, state = ?current, "Ignoring event not accepted in this state");
                return;
            }
            Admission::Discard => {
                debug!(?kind, state = ?current, "Dropping pending event");
                self.discard(kind).await;
                return;
            }
        }

        match event {
            Event::WordRequested(word) => {
                let word = word.trim();
                info!(%word, "Received word");
                self.slots.lock().await.pending.word = Some(word.to_string());
            }
            Event::FeedbackReceived(raw) => {
                info!(feedback = %raw, "Received feedback");
                self.slots.lock().await.pending.feedback = Some(raw);
            }
            Event::DemonstrationReceived(msg) => self.route_demonstration(msg).await,
            Event::TestRequested => {
                info!("Received test request");
                self.slots.lock().await.pending.test = true;
            }
            Event::StopRequested => {
                info!("Received stop request");
                self.slots.lock().await.pending.stop = true;
            }
            Event::GestureHint(at) => self.resolve_gesture(at).await,
            Event::ShapeFinished => {
                self.slots.lock().await.pending.shape_finished = true;
            }
            Event::ClearSurface => {
                info!("Clearing display");
                self.layout.lock().await.clear();
            }
            Event::NewLearner => {
                info!("New learner joined");
                self.slots.lock().await.pending.new_learner = true;
            }
            Event::Heartbeat(device) => match self.watchdogs.get(&device) {
                Some(dog) => dog.feed(),
                None => debug!(?device, "Heartbeat from unwatched device"),
            },
        }
    }

    async fn discard(&self, kind: EventKind) {
        let mut slots = self.slots.lock().await;
        match kind {
            EventKind::WordRequested => slots.pending.word = None,
            EventKind::FeedbackReceived => slots.pending.feedback = None,
            _ => {}
        }
    }

    /// Attributes a demonstration to letters: template split, then the active
    /// letter hint, then the nearest placed letter. Unresolvable ones are dropped.
    async fn route_demonstration(&self, msg: DemonstrationMessage) {
        let drawn = match decode_flat_path(&msg.path) {
            Ok(points) => points,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed demonstration");
                return;
            }
        };
        let to_learner_frame =
            |path: &[Point]| -> Vec<Point> { path.iter().map(|p| p.flip_y()).collect() };

        let split = self.layout.lock().await.split_path_from_template(&drawn);
        if let Some(parts) = split.filter(|parts| !parts.is_empty()) {
            let letters: Vec<&str> = parts.iter().map(|(l, _)| l.as_str()).collect();
            info!(?letters, "Received template demonstration");
            let samples: Vec<DemonstrationSample> = parts
                .iter()
                .map(|(letter, path)| DemonstrationSample {
                    letter: letter.clone(),
                    path: to_learner_frame(path),
                })
                .collect();
            self.slots.lock().await.pending.demonstrations.extend(samples);
            return;
        }

        let hint = self.slots.lock().await.pending.active_letter.take();
        let letter = match hint {
            Some(letter) => {
                info!(%letter, "Received demonstration for selected letter");
                letter
            }
            None => match self.layout.lock().await.find_letter(&drawn) {
                Some((letter, _)) => {
                    info!(%letter, "Received demonstration");
                    letter
                }
                None => {
                    warn!(
                        shape_type = ?msg.shape_type,
                        "Received demonstration, but unable to find the letter that was demonstrated. Ignoring it."
                    );
                    return;
                }
            },
        };

        let sample = DemonstrationSample {
            letter,
            path: to_learner_frame(&drawn),
        };
        self.slots.lock().await.pending.demonstrations = vec![sample];
    }

    async fn resolve_gesture(&self, at: Point) {
        let hit = self.layout.lock().await.closest_letter(at, true);
        debug!(letter = ?hit.as_ref().map(|(l, _)| l), "Active letter from gesture");
        self.slots.lock().await.pending.active_letter = hit.map(|(letter, _)| letter);
    }
}
