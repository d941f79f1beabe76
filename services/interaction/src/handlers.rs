//! Axum Handlers for the REST API
//!
//! A small operator surface next to the bus: inspect the controller and
//! inject the notifications a card reader or a supervisor would send.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use cowriter_core::event::{Admission, Event, EventKind, admission};
use std::sync::Arc;
use tracing::info;

use crate::{
    models::{ErrorResponse, StatusResponse, WordPayload},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    /// The active state would not take the request.
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

async fn status_of(state: &AppState) -> StatusResponse {
    let current = state.ingress.current_state().await;
    let pending = state.ingress.pending().await;
    StatusResponse::new(current, &pending)
}

/// Report the active state and what is pending.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Current controller status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(status_of(&state).await)
}

/// Ask the robot to write a word.
#[utoipa::path(
    post,
    path = "/words",
    request_body = WordPayload,
    responses(
        (status = 202, description = "Word queued for the controller", body = StatusResponse),
        (status = 400, description = "Empty word", body = ErrorResponse),
        (status = 409, description = "The controller is not listening for words", body = ErrorResponse)
    )
)]
pub async fn submit_word(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WordPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let word = payload.word.trim().to_string();
    if word.is_empty() {
        return Err(ApiError::BadRequest("word must not be empty".to_string()));
    }

    let current = state.ingress.current_state().await;
    if admission(current, EventKind::WordRequested) != Admission::Accept {
        let name = current.map_or("NOT_STARTED", |s| s.name());
        return Err(ApiError::Conflict(format!(
            "words are not accepted while {name}"
        )));
    }

    info!(%word, "Word submitted over REST.");
    state.ingress.submit(Event::WordRequested(word)).await;
    Ok((StatusCode::ACCEPTED, Json(status_of(&state).await)))
}

/// Show the test card.
#[utoipa::path(
    post,
    path = "/test",
    responses(
        (status = 202, description = "Test request queued", body = StatusResponse)
    )
)]
pub async fn request_test(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.ingress.submit(Event::TestRequested).await;
    (StatusCode::ACCEPTED, Json(status_of(&state).await))
}

/// End the interaction.
#[utoipa::path(
    post,
    path = "/stop",
    responses(
        (status = 202, description = "Stop request queued", body = StatusResponse)
    )
)]
pub async fn request_stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Stop requested over REST.");
    state.ingress.submit(Event::StopRequested).await;
    (StatusCode::ACCEPTED, Json(status_of(&state).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::app_state;
    use cowriter_core::state::InteractionState;

    fn payload(word: &str) -> Json<WordPayload> {
        Json(WordPayload {
            word: word.to_string(),
        })
    }

    #[tokio::test]
    async fn word_is_queued_before_start() {
        let (state, slots) = app_state();
        let response = submit_word(State(state), payload(" cat "))
            .await
            .map_err(|_| "rejected")
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(slots.lock().await.pending.word.as_deref(), Some("cat"));
    }

    #[tokio::test]
    async fn empty_word_is_a_bad_request() {
        let (state, _) = app_state();
        let response = match submit_word(State(state), payload("   ")).await {
            Ok(_) => panic!("empty word accepted"),
            Err(e) => e.into_response(),
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn word_conflicts_while_publishing() {
        let (state, slots) = app_state();
        slots.lock().await.current = Some(InteractionState::PublishingWord);
        let response = match submit_word(State(state), payload("cat")).await {
            Ok(_) => panic!("word accepted while publishing"),
            Err(e) => e.into_response(),
        };
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(slots.lock().await.pending.word.is_none());
    }

    #[tokio::test]
    async fn stop_and_test_are_always_queued() {
        let (state, slots) = app_state();
        slots.lock().await.current = Some(InteractionState::PublishingWord);

        let response = request_test(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let response = request_stop(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let Json(status) = get_status(State(state)).await;
        assert_eq!(status.state.as_deref(), Some("PUBLISHING_WORD"));
        assert!(status.pending.test);
        assert!(status.pending.stop);
    }
}
