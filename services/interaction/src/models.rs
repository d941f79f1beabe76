//! REST Models
//!
//! Request and response bodies of the REST surface, documented for OpenAPI
//! with `utoipa`.

use cowriter_core::{session::PendingEvents, state::InteractionState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema, Debug)]
pub struct WordPayload {
    #[schema(example = "cat")]
    pub word: String,
}

/// What is waiting to be picked up by the controller.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PendingSummary {
    pub word: Option<String>,
    pub feedback: Option<String>,
    pub demonstrations: usize,
    pub test: bool,
    pub stop: bool,
    pub active_letter: Option<String>,
}

impl From<&PendingEvents> for PendingSummary {
    fn from(pending: &PendingEvents) -> Self {
        Self {
            word: pending.word.clone(),
            feedback: pending.feedback.clone(),
            demonstrations: pending.demonstrations.len(),
            test: pending.test,
            stop: pending.stop,
            active_letter: pending.active_letter.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct StatusResponse {
    /// Active state; absent until the interaction has started.
    #[schema(example = "WAITING_FOR_WORD")]
    pub state: Option<String>,
    pub pending: PendingSummary,
}

impl StatusResponse {
    pub fn new(state: Option<InteractionState>, pending: &PendingEvents) -> Self {
        Self {
            state: state.map(|s| s.name().to_string()),
            pending: pending.into(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reports_state_name_and_pending_counts() {
        let pending = PendingEvents {
            word: Some("cat".into()),
            stop: true,
            ..Default::default()
        };
        let status = StatusResponse::new(Some(InteractionState::WaitingForWord), &pending);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "WAITING_FOR_WORD");
        assert_eq!(json["pending"]["word"], "cat");
        assert_eq!(json["pending"]["demonstrations"], 0);
        assert_eq!(json["pending"]["stop"], true);
    }
}
