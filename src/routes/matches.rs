use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::matches::{
        CreateMatchRequest, CreateMatchResponse, EditMatchRequest, MatchListQuery,
        MatchListResponse, MatchSnapshot,
    },
    error::AppError,
    services::match_service,
    state::SharedState,
};

/// Routes driving match creation, scoring and history.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/matches", post(create_match).get(list_matches))
        .route(
            "/api/matches/{id}",
            get(get_match).patch(edit_match).delete(delete_match),
        )
        .route("/api/matches/{id}/start", post(start_match))
        .route("/api/matches/{id}/pause", post(pause_match))
        .route("/api/matches/{id}/resume", post(resume_match))
        .route("/api/matches/{id}/finish", post(finish_match))
        .route("/api/matches/{id}/point/{side}", post(award_point))
        .route("/api/matches/{id}/reset-game", post(reset_current_game))
        .route("/api/matches/{id}/toggle-server", post(toggle_server))
}

/// Create a scheduled match.
#[utoipa::path(
    post,
    path = "/api/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = CreateMatchResponse),
        (status = 400, description = "Invalid rules, names or stage")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<CreateMatchResponse>), AppError> {
    payload.validate()?;
    let created = match_service::create_match(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List active and/or finished matches.
#[utoipa::path(
    get,
    path = "/api/matches",
    tag = "matches",
    params(MatchListQuery),
    responses(
        (status = 200, description = "Matching matches", body = MatchListResponse)
    )
)]
pub async fn list_matches(
    State(state): State<SharedState>,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<MatchListResponse>, AppError> {
    let listing = match_service::list_matches(&state, query).await?;
    Ok(Json(listing))
}

/// Fetch the current snapshot of a match, active or finished.
#[utoipa::path(
    get,
    path = "/api/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match snapshot", body = MatchSnapshot),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    let snapshot = match_service::get_match(&state, id).await?;
    Ok(Json(snapshot))
}

/// Edit the name, teams, stage or court of an unfinished match.
#[utoipa::path(
    patch,
    path = "/api/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = EditMatchRequest,
    responses(
        (status = 200, description = "Match updated", body = MatchSnapshot),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Unknown or finished match")
    )
)]
pub async fn edit_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditMatchRequest>,
) -> Result<Json<MatchSnapshot>, AppError> {
    payload.validate()?;
    let snapshot = match_service::edit_match(&state, id, payload).await?;
    Ok(Json(snapshot))
}

/// Delete a match that is not running.
#[utoipa::path(
    delete,
    path = "/api/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 204, description = "Match deleted"),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Match is running")
    )
)]
pub async fn delete_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    match_service::delete_match(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/start",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match running", body = MatchSnapshot),
        (status = 404, description = "Unknown or finished match")
    )
)]
/// Start the match clock.
pub async fn start_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::start_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/pause",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match paused", body = MatchSnapshot),
        (status = 404, description = "Unknown or finished match")
    )
)]
/// Pause the match clock.
pub async fn pause_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::pause_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/resume",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match running again", body = MatchSnapshot),
        (status = 404, description = "Unknown or finished match")
    )
)]
/// Resume a paused match.
pub async fn resume_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::resume_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/finish",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match finished", body = MatchSnapshot),
        (status = 404, description = "Unknown or already finished match")
    )
)]
/// End the match by hand, whatever the score.
pub async fn finish_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::finish_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/point/{side}",
    tag = "matches",
    params(
        ("id" = String, Path, description = "Identifier of the match"),
        ("side" = String, Path, description = "Side winning the point: `A` or `B`")
    ),
    responses(
        (status = 200, description = "Point recorded", body = MatchSnapshot),
        (status = 400, description = "Unknown side"),
        (status = 404, description = "Unknown or finished match")
    )
)]
/// Award the next point to one side.
pub async fn award_point(
    State(state): State<SharedState>,
    Path((id, side)): Path<(Uuid, String)>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::award_point(&state, id, &side).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/reset-game",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Current game cleared", body = MatchSnapshot),
        (status = 404, description = "Unknown or finished match")
    )
)]
/// Clear the points of the game in progress.
pub async fn reset_current_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::reset_current_game(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/toggle-server",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Server switched", body = MatchSnapshot),
        (status = 404, description = "Unknown or finished match")
    )
)]
/// Hand the serve to the other side.
pub async fn toggle_server(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::toggle_server(&state, id).await?))
}
