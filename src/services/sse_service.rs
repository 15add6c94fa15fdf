use std::{convert::Infallible, time::SystemTime};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    services::{match_service, sse_events::EVENT_MATCH_STATE},
    state::SharedState,
};

const KEEP_ALIVE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15);

/// Events sent ahead of the live feed, plus the subscription feeding it.
pub struct Subscription {
    receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
    filter: Option<Uuid>,
}

/// Subscribe to every match event.
pub fn subscribe_all(state: &SharedState) -> Subscription {
    let receiver = state.sse().subscribe();
    Subscription {
        receiver,
        initial: handshake(state, "matches".into()).into_iter().collect(),
        filter: None,
    }
}

/// Subscribe to one match; its current snapshot is sent right after the handshake.
pub async fn subscribe_match(state: &SharedState, id: Uuid) -> Result<Subscription, ServiceError> {
    // Subscribe first so no mutation falls between the snapshot and the feed.
    let receiver = state.sse().subscribe();
    let snapshot = match_service::get_match(state, id).await?;

    let mut initial: Vec<ServerEvent> = handshake(state, format!("match:{id}")).into_iter().collect();
    match ServerEvent::json(EVENT_MATCH_STATE, Some(id), &snapshot) {
        Ok(event) => initial.push(event),
        Err(err) => warn!(match_id = %id, error = %err, "failed to serialize initial snapshot"),
    }

    Ok(Subscription {
        receiver,
        initial,
        filter: Some(id),
    })
}

fn handshake(state: &SharedState, stream: String) -> Option<ServerEvent> {
    let payload = Handshake {
        message: format!("{stream} stream connected"),
        stream,
        degraded: state.is_degraded(),
    };
    ServerEvent::json("handshake", None, &payload)
        .inspect_err(|err| warn!(error = %err, "failed to serialize handshake"))
        .ok()
}

/// Convert a subscription into an SSE response, forwarding events until the client disconnects.
pub fn to_sse_stream(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        initial,
        filter,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        let opened_at = SystemTime::now();

        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if filter.is_some_and(|id| !payload.concerns(id)) {
                                continue;
                            }
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(skipped, "SSE subscriber lagging behind");
                            continue;
                        }
                    }
                }
            }
        }

        let open_secs = opened_at.elapsed().map(|d| d.as_secs()).unwrap_or_default();
        match filter {
            Some(id) => info!(match_id = %id, open_secs, "match SSE stream disconnected"),
            None => info!(open_secs, "matches SSE stream disconnected"),
        }
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::matches::CreateMatchRequest,
        state::AppState,
    };

    #[tokio::test]
    async fn match_subscription_starts_with_handshake_and_snapshot() {
        let state = AppState::new(AppConfig::default());
        let created = match_service::create_match(&state, CreateMatchRequest::default())
            .await
            .unwrap();

        let subscription = subscribe_match(&state, created.id).await.unwrap();
        let names: Vec<_> = subscription
            .initial
            .iter()
            .map(|event| event.event.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, ["handshake", "match.state"]);
        assert_eq!(subscription.filter, Some(created.id));
    }

    #[tokio::test]
    async fn unknown_match_cannot_be_followed() {
        let state = AppState::new(AppConfig::default());
        assert!(subscribe_match(&state, Uuid::new_v4()).await.is_err());
    }
}
