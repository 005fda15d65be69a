//! DTO definitions used by the host command surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Commands a host may issue, over REST or the play socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    /// Freeze the roster and open the first question.
    Start,
    /// Close the open question and reveal it.
    #[serde(alias = "reveal", alias = "endQuestion")]
    EndQuestion,
    /// Open the next question, or finish after the last one.
    #[serde(alias = "next", alias = "nextQuestion")]
    NextQuestion,
    /// End the session early.
    Finish,
}

impl HostCommand {
    /// Wire name of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            HostCommand::Start => "start",
            HostCommand::EndQuestion => "end_question",
            HostCommand::NextQuestion => "next_question",
            HostCommand::Finish => "finish",
        }
    }
}

/// Optional body of the `start` command.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartRequest {
    /// Play only the first N questions of the feed.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub question_count: Option<usize>,
}

/// Acknowledgement returned by every host command.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct CommandResponse {
    /// Whether the command was applied.
    pub ok: bool,
    /// Short description of the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    /// Successful command with a short description of the new state.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
        }
    }

    /// Rejected command.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}
