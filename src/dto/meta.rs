use serde::Serialize;
use utoipa::ToSchema;

/// Tournament stages an operator can assign, in display order.
#[derive(Debug, Serialize, ToSchema)]
pub struct StagesResponse {
    /// Configured stages.
    pub stages: Vec<String>,
    /// Stage used when a match is created without one.
    pub default_stage: String,
}
