use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Courtside Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::create_match,
        crate::routes::matches::list_matches,
        crate::routes::matches::get_match,
        crate::routes::matches::edit_match,
        crate::routes::matches::delete_match,
        crate::routes::matches::start_match,
        crate::routes::matches::pause_match,
        crate::routes::matches::resume_match,
        crate::routes::matches::finish_match,
        crate::routes::matches::award_point,
        crate::routes::matches::reset_current_game,
        crate::routes::matches::toggle_server,
        crate::routes::meta::list_stages,
        crate::routes::sse::matches_stream,
        crate::routes::sse::match_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::CreateMatchResponse,
            crate::dto::matches::EditMatchRequest,
            crate::dto::matches::RulesInput,
            crate::dto::matches::MatchSnapshot,
            crate::dto::matches::MatchListResponse,
            crate::dto::meta::StagesResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::MatchDeletedEvent,
            crate::dto::ws::ViewerInboundMessage,
            crate::dto::ws::ViewerError,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Match lifecycle and scoring"),
        (name = "meta", description = "Reference data"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "viewers", description = "WebSocket operations for match viewers"),
    )
)]
pub struct ApiDoc;
