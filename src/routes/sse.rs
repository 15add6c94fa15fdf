use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/matches",
    tag = "sse",
    responses((status = 200, description = "Events of every match", content_type = "text/event-stream", body = String))
)]
/// Stream every match event to scoreboards and operator consoles.
pub async fn matches_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New matches SSE connection");
    sse_service::to_sse_stream(sse_service::subscribe_all(&state))
}

#[utoipa::path(
    get,
    path = "/sse/matches/{id}",
    tag = "sse",
    params(("id" = String, Path, description = "Identifier of the match to follow")),
    responses(
        (status = 200, description = "Events of one match, current snapshot first", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown match")
    )
)]
/// Stream the events of one match, starting with its current snapshot.
pub async fn match_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_match(&state, id).await?;
    info!(match_id = %id, "New match SSE connection");
    Ok(sse_service::to_sse_stream(subscription))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/matches", get(matches_stream))
        .route("/sse/matches/{id}", get(match_stream))
}
