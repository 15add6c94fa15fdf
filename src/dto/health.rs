use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of matches currently held in memory.
    pub active_matches: usize,
}

impl HealthResponse {
    /// Build the response from the degraded flag and the active match count.
    pub fn new(degraded: bool, active_matches: usize) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            active_matches,
        }
    }
}
