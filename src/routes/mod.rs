use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI JSON.
pub mod docs;
/// Health check.
pub mod health;
/// Host-only session control.
pub mod host;
/// Session provisioning, joins and recovery.
pub mod sessions;
/// Spectator event streams.
pub mod sse;
/// Lobby and play sockets.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sessions::router())
        .merge(host::router(state.clone()))
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
