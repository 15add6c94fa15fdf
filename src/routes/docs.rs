use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Location of the raw OpenAPI document served next to the UI.
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Serve the Swagger UI at `/docs`.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new("/docs")
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into()
}
