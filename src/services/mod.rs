/// Answer intake for player sockets.
pub mod answer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Host commands driving the session phases.
pub mod host_service;
/// Frame builders and channel broadcasters.
pub mod live_events;
/// Read-only recovery projections.
pub mod public_service;
/// Session provisioning, joins and cleanup.
pub mod session_service;
/// Server-Sent Events streaming for spectators.
pub mod sse_service;
/// WebSocket gateway for the lobby and play channels.
pub mod websocket_service;
