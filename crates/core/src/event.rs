//! Typed notifications entering the controller, and the state-gated
//! admission decision applied to each of them.

use crate::{
    geometry::Point,
    state::{ACCEPTED_BEFORE_START, ALWAYS_ACCEPTED, InteractionState},
};
use serde::{Deserialize, Serialize};

/// A downstream device the controller may have to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Robot,
    Tablet,
}

/// A processed user demonstration as received from the bus.
///
/// `path` holds all x coordinates followed by all y coordinates, with y
/// sign-inverted relative to display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemonstrationMessage {
    pub path: Vec<f64>,
    #[serde(default)]
    pub shape_type: Option<String>,
}

/// Every notification the controller understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    WordRequested(String),
    /// Raw `<shapeIndex>_<bestShapeIndex>[_noNewShape]` string.
    FeedbackReceived(String),
    DemonstrationReceived(DemonstrationMessage),
    TestRequested,
    StopRequested,
    /// Pointer location used to pick the letter the next demonstration is for.
    GestureHint(Point),
    /// The renderer finished drawing the last published trajectory.
    ShapeFinished,
    ClearSurface,
    /// A new learner takes over; learning memory is kept.
    NewLearner,
    Heartbeat(Device),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    WordRequested,
    FeedbackReceived,
    DemonstrationReceived,
    TestRequested,
    StopRequested,
    GestureHint,
    ShapeFinished,
    ClearSurface,
    NewLearner,
    Heartbeat,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::WordRequested(_) => EventKind::WordRequested,
            Event::FeedbackReceived(_) => EventKind::FeedbackReceived,
            Event::DemonstrationReceived(_) => EventKind::DemonstrationReceived,
            Event::TestRequested => EventKind::TestRequested,
            Event::StopRequested => EventKind::StopRequested,
            Event::GestureHint(_) => EventKind::GestureHint,
            Event::ShapeFinished => EventKind::ShapeFinished,
            Event::ClearSurface => EventKind::ClearSurface,
            Event::NewLearner => EventKind::NewLearner,
            Event::Heartbeat(_) => EventKind::Heartbeat,
        }
    }
}

/// What ingress does with a notification, given the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Store it in its pending slot.
    Accept,
    /// Leave the pending slot untouched.
    Ignore,
    /// Clear whatever the pending slot holds.
    Discard,
}

/// Decides admission for `kind` while `state` is active (`None` before start).
pub fn admission(state: Option<InteractionState>, kind: EventKind) -> Admission {
    if ALWAYS_ACCEPTED.contains(&kind) {
        return Admission::Accept;
    }
    match state {
        None if ACCEPTED_BEFORE_START.contains(&kind) => Admission::Accept,
        None => Admission::Ignore,
        Some(s) if s.accepted_events().contains(&kind) => Admission::Accept,
        Some(s) if s.discarded_events().contains(&kind) => Admission::Discard,
        Some(_) => Admission::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InteractionState::*;

    #[test]
    fn words_accepted_while_listening_and_discarded_elsewhere() {
        for state in [WaitingForFeedback, WaitingForWord, AskingForFeedback, StartingInteraction] {
            assert_eq!(
                admission(Some(state), EventKind::WordRequested),
                Admission::Accept,
                "{state}"
            );
        }
        assert_eq!(admission(None, EventKind::WordRequested), Admission::Accept);
        for state in [PublishingWord, WaitingForRobotToConnect, RespondingToFeedback, Stopping] {
            assert_eq!(
                admission(Some(state), EventKind::WordRequested),
                Admission::Discard,
                "{state}"
            );
        }
    }

    #[test]
    fn feedback_gating() {
        for state in [AskingForFeedback, WaitingForFeedback, WaitingForLetterToFinish] {
            assert_eq!(
                admission(Some(state), EventKind::FeedbackReceived),
                Admission::Accept
            );
        }
        assert_eq!(
            admission(Some(RespondingToFeedback), EventKind::FeedbackReceived),
            Admission::Discard
        );
        assert_eq!(
            admission(Some(WaitingForWord), EventKind::FeedbackReceived),
            Admission::Ignore
        );
        assert_eq!(admission(None, EventKind::FeedbackReceived), Admission::Ignore);
    }

    #[test]
    fn stop_and_test_are_unconditional() {
        for state in InteractionState::ALL {
            assert_eq!(admission(Some(state), EventKind::StopRequested), Admission::Accept);
            assert_eq!(admission(Some(state), EventKind::TestRequested), Admission::Accept);
        }
        assert_eq!(admission(None, EventKind::StopRequested), Admission::Accept);
    }

    #[test]
    fn demonstration_message_defaults_shape_type() {
        let msg: DemonstrationMessage = serde_json::from_str(r#"{"path":[1.0,2.0]}"#).unwrap();
        assert_eq!(msg.shape_type, None);
        assert_eq!(Event::DemonstrationReceived(msg).kind(), EventKind::DemonstrationReceived);
    }
}
