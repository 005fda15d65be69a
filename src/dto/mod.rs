use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Question, roster and leaderboard views.
pub mod common;
/// Health check payload.
pub mod health;
pub mod host;
/// Client-facing phase and finish reason.
pub mod phase;
/// Recovery snapshot.
pub mod public;
pub mod session;
/// Event envelope shared by sockets and SSE.
pub mod sse;
pub mod validation;
/// Socket frames.
pub mod ws;

pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
