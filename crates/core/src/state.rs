//! The fixed set of interaction states and the per-state event interest table.

use crate::event::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One state of the interaction controller. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionState {
    StartingInteraction,
    WaitingForRobotToConnect,
    WaitingForTabletToConnect,
    WaitingForWord,
    RespondingToNewWord,
    PublishingWord,
    WaitingForLetterToFinish,
    AskingForFeedback,
    WaitingForFeedback,
    RespondingToFeedback,
    RespondingToDemonstrationFullWord,
    RespondingToTestCard,
    Stopping,
    Exit,
}

/// Events accepted no matter which state is active.
pub const ALWAYS_ACCEPTED: &[EventKind] = &[
    EventKind::TestRequested,
    EventKind::StopRequested,
    EventKind::GestureHint,
    EventKind::ShapeFinished,
    EventKind::ClearSurface,
    EventKind::NewLearner,
    EventKind::Heartbeat,
];

/// Events accepted before the machine has run its first state.
pub const ACCEPTED_BEFORE_START: &[EventKind] = &[EventKind::WordRequested];

impl InteractionState {
    pub const ALL: [InteractionState; 14] = [
        InteractionState::StartingInteraction,
        InteractionState::WaitingForRobotToConnect,
        InteractionState::WaitingForTabletToConnect,
        InteractionState::WaitingForWord,
        InteractionState::RespondingToNewWord,
        InteractionState::PublishingWord,
        InteractionState::WaitingForLetterToFinish,
        InteractionState::AskingForFeedback,
        InteractionState::WaitingForFeedback,
        InteractionState::RespondingToFeedback,
        InteractionState::RespondingToDemonstrationFullWord,
        InteractionState::RespondingToTestCard,
        InteractionState::Stopping,
        InteractionState::Exit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::StartingInteraction => "STARTING_INTERACTION",
            InteractionState::WaitingForRobotToConnect => "WAITING_FOR_ROBOT_TO_CONNECT",
            InteractionState::WaitingForTabletToConnect => "WAITING_FOR_TABLET_TO_CONNECT",
            InteractionState::WaitingForWord => "WAITING_FOR_WORD",
            InteractionState::RespondingToNewWord => "RESPONDING_TO_NEW_WORD",
            InteractionState::PublishingWord => "PUBLISHING_WORD",
            InteractionState::WaitingForLetterToFinish => "WAITING_FOR_LETTER_TO_FINISH",
            InteractionState::AskingForFeedback => "ASKING_FOR_FEEDBACK",
            InteractionState::WaitingForFeedback => "WAITING_FOR_FEEDBACK",
            InteractionState::RespondingToFeedback => "RESPONDING_TO_FEEDBACK",
            InteractionState::RespondingToDemonstrationFullWord => {
                "RESPONDING_TO_DEMONSTRATION_FULL_WORD"
            }
            InteractionState::RespondingToTestCard => "RESPONDING_TO_TEST_CARD",
            InteractionState::Stopping => "STOPPING",
            InteractionState::Exit => "EXIT",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InteractionState::Exit)
    }

    /// Event kinds this state declares interest in, on top of [`ALWAYS_ACCEPTED`].
    ///
    /// Ingress consults this table at the moment a notification arrives.
    pub fn accepted_events(&self) -> &'static [EventKind] {
        use EventKind::*;
        match self {
            InteractionState::StartingInteraction => &[WordRequested],
            InteractionState::WaitingForWord => &[WordRequested],
            InteractionState::AskingForFeedback => {
                &[WordRequested, FeedbackReceived, DemonstrationReceived]
            }
            InteractionState::WaitingForFeedback => {
                &[WordRequested, FeedbackReceived, DemonstrationReceived]
            }
            InteractionState::WaitingForLetterToFinish => &[FeedbackReceived],
            _ => &[],
        }
    }

    /// Event kinds whose pending value is dropped, not kept, when they arrive
    /// in this state.
    ///
    /// A word arriving where words are not listened for also clears any word
    /// still pending from earlier.
    pub fn discarded_events(&self) -> &'static [EventKind] {
        use EventKind::*;
        match self {
            InteractionState::RespondingToFeedback => &[WordRequested, FeedbackReceived],
            s if s.accepted_events().contains(&WordRequested) => &[],
            _ => &[WordRequested],
        }
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_screaming() {
        let mut names: Vec<&str> = InteractionState::ALL.iter().map(|s| s.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), InteractionState::ALL.len());
        assert!(names.iter().all(|n| n.chars().all(|c| c.is_ascii_uppercase() || c == '_')));
    }

    #[test]
    fn serde_uses_state_names() {
        for state in InteractionState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.name()));
        }
    }

    #[test]
    fn only_exit_is_terminal() {
        let terminal: Vec<_> = InteractionState::ALL
            .into_iter()
            .filter(InteractionState::is_terminal)
            .collect();
        assert_eq!(terminal, vec![InteractionState::Exit]);
    }

    #[test]
    fn words_are_either_accepted_or_discarded() {
        for state in InteractionState::ALL {
            let accepted = state.accepted_events().contains(&EventKind::WordRequested);
            let discarded = state.discarded_events().contains(&EventKind::WordRequested);
            assert!(accepted != discarded, "{state}");
        }
    }

    #[test]
    fn demonstrations_only_accepted_while_collecting_feedback() {
        let accepting: Vec<_> = InteractionState::ALL
            .into_iter()
            .filter(|s| s.accepted_events().contains(&EventKind::DemonstrationReceived))
            .collect();
        assert_eq!(
            accepting,
            vec![
                InteractionState::AskingForFeedback,
                InteractionState::WaitingForFeedback
            ]
        );
    }
}
