//! WebSocket bridge between the message bus and the controller.
//!
//! Every connected client receives every [`ServerMessage`] the runtime
//! broadcasts, and may publish [`BusMessage`]s which are handed to the
//! ingress. A frame that does not parse gets an `error` reply on that
//! connection only.

use crate::{
    protocol::{BusMessage, ServerMessage},
    state::AppState,
};
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

#[instrument(name = "bus_client", skip_all, fields(connection_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    tracing::Span::current().record("connection_id", &connection_id.to_string());
    info!("Bus client connected.");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut outgoing = state.bus.subscribe();

    loop {
        tokio::select! {
            broadcast = outgoing.recv() => match broadcast {
                Ok(msg) => {
                    if send_msg(&mut socket_tx, msg).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Bus client lagged behind; messages dropped.");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(reply) = handle_text(&state, text.as_str()).await {
                        if send_msg(&mut socket_tx, reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket receive error.");
                    break;
                }
            },
        }
    }

    info!("Bus client disconnected.");
}

/// Parses one client frame and forwards it to the ingress.
async fn handle_text(state: &AppState, text: &str) -> Result<(), ServerMessage> {
    let msg: BusMessage = serde_json::from_str(text).map_err(|e| {
        warn!(error = %e, "Unparseable bus message.");
        ServerMessage::Error {
            message: format!("invalid message: {e}"),
        }
    })?;
    debug!(?msg, "Bus message received.");
    state.ingress.submit(msg.into()).await;
    Ok(())
}

pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::app_state;

    #[tokio::test]
    async fn forwards_parsed_messages_to_ingress() {
        let (state, slots) = app_state();
        handle_text(&state, r#"{"topic":"words_to_write","word":"cat"}"#)
            .await
            .unwrap();
        handle_text(&state, r#"{"topic":"stop_learning"}"#)
            .await
            .unwrap();

        let slots = slots.lock().await;
        assert_eq!(slots.pending.word.as_deref(), Some("cat"));
        assert!(slots.pending.stop);
    }

    #[tokio::test]
    async fn blank_words_from_the_bus_are_not_queued() {
        let (state, slots) = app_state();
        handle_text(&state, r#"{"topic":"words_to_write","word":""}"#)
            .await
            .unwrap();
        handle_text(&state, r#"{"topic":"words_to_write","word":"   "}"#)
            .await
            .unwrap();
        assert!(slots.lock().await.pending.word.is_none());
    }

    #[tokio::test]
    async fn replies_with_error_on_garbage() {
        let (state, slots) = app_state();
        let reply = handle_text(&state, "not json").await.unwrap_err();
        assert!(matches!(reply, ServerMessage::Error { .. }));
        assert_eq!(
            slots.lock().await.pending,
            cowriter_core::session::PendingEvents::default()
        );
    }
}
