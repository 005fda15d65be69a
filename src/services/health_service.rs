use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of active sessions.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let sessions = state.session_count();
    debug!(sessions, "health check");
    HealthResponse::ok(sessions)
}
