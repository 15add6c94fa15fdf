use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        sse::ServerEvent,
        ws::{ViewerError, ViewerInboundMessage, ViewerOutboundMessage},
    },
    error::ServiceError,
    services::{
        match_service,
        sse_events::{EVENT_MATCH_DELETED, EVENT_MATCH_FINISHED, EVENT_MATCH_STATE},
    },
    state::SharedState,
};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors ending a viewer session early.
#[derive(Debug, Error)]
enum ViewerSessionError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of one viewer WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("viewer join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let Some(mut match_id) = parse_join(&initial_message) else {
        reject(&outbound_tx, "first message must be a join");
        finalize(writer_task, outbound_tx).await;
        return;
    };

    // Subscribe before reading the snapshot so no update is missed.
    let mut events = state.sse().subscribe();
    if let Err(err) = send_current_state(&state, match_id, &outbound_tx).await {
        if let ViewerSessionError::Service(err) = err {
            reject(&outbound_tx, &err.to_string());
        }
        finalize(writer_task, outbound_tx).await;
        return;
    }
    info!(match_id = %match_id, "viewer joined");

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let Some(next_id) = parse_join(&text) else {
                            continue;
                        };
                        match send_current_state(&state, next_id, &outbound_tx).await {
                            Ok(()) => {
                                info!(from = %match_id, to = %next_id, "viewer switched match");
                                match_id = next_id;
                            }
                            Err(ViewerSessionError::ConnectionClosed) => break,
                            Err(ViewerSessionError::Service(err)) => {
                                let _ = send_json(&outbound_tx, &ViewerError::new(err.to_string()));
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = outbound_tx.send(Message::Pong(payload));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let _ = outbound_tx.send(Message::Close(frame));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(match_id = %match_id, error = %err, "websocket error");
                        break;
                    }
                    None => break,
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) if event.match_id == Some(match_id) => {
                        match forward(&outbound_tx, event) {
                            Ok(true) => {}
                            Ok(false) => {
                                let _ = outbound_tx.send(Message::Close(None));
                                break;
                            }
                            Err(_) => break,
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        // Catch up with a fresh snapshot instead of replaying.
                        warn!(match_id = %match_id, skipped, "viewer lagging behind");
                        if send_current_state(&state, match_id, &outbound_tx).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!(match_id = %match_id, "viewer disconnected");
    finalize(writer_task, outbound_tx).await;
}

fn parse_join(text: &str) -> Option<Uuid> {
    match serde_json::from_str::<ViewerInboundMessage>(text) {
        Ok(ViewerInboundMessage::Join { match_id }) => Some(match_id),
        Err(err) => {
            debug!(error = %err, "ignoring unrecognised viewer message");
            None
        }
    }
}

async fn send_current_state(
    state: &SharedState,
    id: Uuid,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), ViewerSessionError> {
    let snapshot = match_service::get_match(state, id).await?;
    let data = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
    send_json(
        tx,
        &ViewerOutboundMessage {
            kind: "state",
            data,
        },
    )
}

/// Relay one broadcast event. Returns `Ok(false)` when the session should end.
fn forward(
    tx: &mpsc::UnboundedSender<Message>,
    event: ServerEvent,
) -> Result<bool, ViewerSessionError> {
    let (kind, keep_open) = match event.event.as_deref() {
        Some(EVENT_MATCH_STATE) => ("state", true),
        Some(EVENT_MATCH_FINISHED) => ("finished", true),
        Some(EVENT_MATCH_DELETED) => ("deleted", false),
        _ => return Ok(true),
    };
    let data = serde_json::from_str(&event.data).unwrap_or(Value::Null);
    send_json(tx, &ViewerOutboundMessage { kind, data })?;
    Ok(keep_open)
}

/// Serialize a payload and push it onto the writer channel.
fn send_json<T>(tx: &mpsc::UnboundedSender<Message>, value: &T) -> Result<(), ViewerSessionError>
where
    T: ?Sized + serde::Serialize,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize viewer message");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ViewerSessionError::ConnectionClosed)
}

fn reject(tx: &mpsc::UnboundedSender<Message>, message: &str) {
    let _ = send_json(tx, &ViewerError::new(message));
    let _ = tx.send(Message::Close(None));
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
