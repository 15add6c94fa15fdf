use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::meta::StagesResponse, services::match_service, state::SharedState};

/// Reference data for operator frontends.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/meta/stages", get(list_stages))
}

#[utoipa::path(
    get,
    path = "/api/meta/stages",
    tag = "meta",
    responses((status = 200, description = "Configured tournament stages", body = StagesResponse))
)]
/// Stages a match can be assigned to, in display order.
pub async fn list_stages(State(state): State<SharedState>) -> Json<StagesResponse> {
    Json(match_service::stages(&state))
}
