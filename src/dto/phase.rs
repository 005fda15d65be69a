use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::{FinishReason, SessionPhase};

/// Session phase exposed to clients (REST/WS/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Players are joining.
    Lobby,
    /// A question is open for answers.
    Question,
    /// The current question is being revealed.
    Reveal,
    /// Final standings are available.
    Finished,
}

impl From<SessionPhase> for VisiblePhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Lobby => VisiblePhase::Lobby,
            SessionPhase::Question => VisiblePhase::Question,
            SessionPhase::Reveal => VisiblePhase::Reveal,
            SessionPhase::Finished => VisiblePhase::Finished,
        }
    }
}

/// Why the session finished, as sent in the `finished` frame.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleFinishReason {
    /// Every question was played.
    Completed,
    /// The host ended the session early.
    HostFinished,
}

impl From<FinishReason> for VisibleFinishReason {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::Completed => VisibleFinishReason::Completed,
            FinishReason::HostFinished => VisibleFinishReason::HostFinished,
        }
    }
}
