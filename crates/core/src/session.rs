//! Session Context and the pending-event slots shared with Ingress.

use crate::{
    context::TransitionContext,
    event::EventKind,
    geometry::Shape,
    learner::DemonstrationSample,
    phrases::PhraseRotation,
    settings::Side,
    state::InteractionState,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// One slot per notification kind, filled by Ingress and drained by states.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingEvents {
    pub word: Option<String>,
    pub feedback: Option<String>,
    pub demonstrations: Vec<DemonstrationSample>,
    pub test: bool,
    /// Sticky: never cleared once set.
    pub stop: bool,
    pub active_letter: Option<String>,
    pub shape_finished: bool,
    pub new_learner: bool,
}

/// Winner of one arbitration round.
#[derive(Debug, Clone, PartialEq)]
pub enum Arbitration {
    Stop,
    Test,
    Word(String),
    Demonstration(Vec<DemonstrationSample>),
    Feedback(String),
    Idle,
}

impl PendingEvents {
    /// Picks the highest-priority pending event among the kinds a state
    /// handles: Stop > Test > Word > Demonstration > Feedback.
    ///
    /// Stop is always considered and never drained. The winner is drained;
    /// lower-priority handled events it pre-empted are discarded.
    pub fn arbitrate(&mut self, handled: &[EventKind]) -> Arbitration {
        if self.stop {
            return Arbitration::Stop;
        }
        let handles = |kind: EventKind| handled.contains(&kind);
        let mut outcome = Arbitration::Idle;

        if handles(EventKind::TestRequested) && std::mem::take(&mut self.test) {
            outcome = Arbitration::Test;
        }
        if handles(EventKind::WordRequested) {
            if let Some(word) = self.word.take() {
                if outcome == Arbitration::Idle {
                    outcome = Arbitration::Word(word);
                } else {
                    debug!(%word, "Discarding word pre-empted by a higher-priority event");
                }
            }
        }
        if handles(EventKind::DemonstrationReceived) && !self.demonstrations.is_empty() {
            let demos = std::mem::take(&mut self.demonstrations);
            if outcome == Arbitration::Idle {
                outcome = Arbitration::Demonstration(demos);
            } else {
                debug!(count = demos.len(), "Discarding pre-empted demonstrations");
            }
        }
        if handles(EventKind::FeedbackReceived) {
            if let Some(feedback) = self.feedback.take() {
                if outcome == Arbitration::Idle {
                    outcome = Arbitration::Feedback(feedback);
                } else {
                    debug!(%feedback, "Discarding pre-empted feedback");
                }
            }
        }
        outcome
    }
}

/// What Ingress and the control loop share: the active state and the slots.
#[derive(Debug, Default)]
pub struct Slots {
    /// State currently executing; `None` until the machine starts.
    pub current: Option<InteractionState>,
    pub pending: PendingEvents,
}

pub type SharedSlots = Arc<Mutex<Slots>>;

/// Saved contexts of parked forwarder states, keyed by forwarder.
#[derive(Debug, Default)]
pub struct Continuations {
    saved: HashMap<InteractionState, TransitionContext>,
}

impl Continuations {
    pub fn save(&mut self, forwarder: InteractionState, context: TransitionContext) {
        self.saved.insert(forwarder, context);
    }

    pub fn take(&mut self, forwarder: InteractionState) -> Option<TransitionContext> {
        self.saved.remove(&forwarder)
    }

    pub fn get(&self, forwarder: InteractionState) -> Option<&TransitionContext> {
        self.saved.get(&forwarder)
    }
}

/// Everything the state handlers know about the ongoing session.
#[derive(Debug, Default)]
pub struct SessionContext {
    word: Option<String>,
    letters: Vec<String>,
    shapes: Vec<Shape>,
    words_seen: HashSet<String>,
    pub rotation: PhraseRotation,
    pub next_side: Side,
    pub continuations: Continuations,
}

impl SessionContext {
    pub fn new(first_side: Side) -> Self {
        Self {
            next_side: first_side,
            ..Default::default()
        }
    }

    /// Makes `word` the current collection. Returns whether it was taught before.
    pub fn start_word(&mut self, word: &str) -> bool {
        self.word = Some(word.to_string());
        self.letters = word.chars().map(String::from).collect();
        self.shapes.clear();
        !self.words_seen.insert(word.to_string())
    }

    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn letters(&self) -> &[String] {
        &self.letters
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn push_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Replaces the shape at `index`; returns false when there is none.
    pub fn replace_shape(&mut self, index: usize, shape: Shape) -> bool {
        match self.shapes.get_mut(index) {
            Some(slot) => {
                *slot = shape;
                true
            }
            None => false,
        }
    }

    pub fn index_of(&self, letter: &str) -> Option<usize> {
        self.letters.iter().position(|l| l == letter)
    }

    pub fn letter_at(&self, index: usize) -> Option<&str> {
        self.letters.get(index).map(String::as_str)
    }

    /// Returns the side to look at and flips it for next time.
    pub fn alternate_side(&mut self) -> Side {
        let side = self.next_side;
        self.next_side = side.opposite();
        side
    }
}
