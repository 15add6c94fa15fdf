/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Match creation, scoring and history operations.
pub mod match_service;
/// Background writer flushing match snapshots to storage.
pub mod persistence;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor and degraded mode tracking.
pub mod storage_supervisor;
/// Viewer WebSocket sessions.
pub mod websocket_service;
