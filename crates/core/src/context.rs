//! The context value handed from one state to the next.

use crate::{
    geometry::Point,
    learner::DemonstrationSample,
    state::InteractionState,
};
use std::collections::VecDeque;

/// Context carried between states.
///
/// Each transition fills in only the fields its target reads; everything else
/// stays at its default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionContext {
    /// State that produced this context (`None` before the first state runs).
    pub came_from: Option<InteractionState>,
    /// States still to visit, consumed front to back and never reordered.
    pub go_to: VecDeque<InteractionState>,
    pub word_received: Option<String>,
    pub feedback_received: Option<String>,
    pub demonstrations: Vec<DemonstrationSample>,
    pub word_to_write: Option<String>,
    pub word_written: Option<String>,
    /// First point of the last published trajectory.
    pub centre: Option<Point>,
    /// Letter whose shape was just revised from feedback, when republishing.
    pub revised_letter: Option<String>,
}

impl TransitionContext {
    pub fn from_state(state: InteractionState) -> Self {
        Self {
            came_from: Some(state),
            ..Default::default()
        }
    }

    /// Context for the very first state, with the plan it should follow.
    pub fn initial(plan: impl IntoIterator<Item = InteractionState>) -> Self {
        Self {
            came_from: None,
            go_to: plan.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_plan(mut self, plan: impl IntoIterator<Item = InteractionState>) -> Self {
        self.go_to = plan.into_iter().collect();
        self
    }

    /// Removes and returns the next planned state.
    pub fn pop_next(&mut self) -> Option<InteractionState> {
        self.go_to.pop_front()
    }

    pub fn is_first_entry(&self, state: InteractionState) -> bool {
        self.came_from != Some(state)
    }
}
