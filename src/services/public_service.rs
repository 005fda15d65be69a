//! Read-only projections used by reconnecting clients.

use std::time::SystemTime;

use crate::{
    dto::public::SessionStateResponse, error::ServiceError, services::live_events,
    services::session_service, state::SharedState,
};

/// Snapshot a client can rebuild its screen from after a reconnect.
pub async fn session_state(
    state: &SharedState,
    code: &str,
) -> Result<SessionStateResponse, ServiceError> {
    let handle = session_service::resolve(state, code)?;
    let session = handle.read().await;
    Ok(live_events::session_state(
        &session,
        &state.config(),
        SystemTime::now(),
    ))
}
