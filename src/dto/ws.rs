use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    common::{LeaderboardEntry, LobbyPlayer, QuestionView, ResultEntry},
    host::{CommandResponse, HostCommand},
    phase::VisibleFinishReason,
    public::SessionStateResponse,
};

/// Role claimed by a socket in its identify frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Session owner holding the host token.
    Host,
    /// Lobby participant holding a player token.
    Player,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Messages accepted from lobby and play sockets.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Must be the first frame of every connection.
    Identify {
        /// Claimed role.
        role: Role,
        /// Host or player token.
        token: String,
        /// Must match the player token when present.
        #[serde(default)]
        player_id: Option<Uuid>,
    },
    /// Player answer for the open question.
    Answer {
        /// Question being answered.
        question_id: u32,
        /// Single choice selection.
        #[serde(default)]
        option_id: Option<u32>,
        /// Multi choice selection.
        #[serde(default)]
        option_ids: Option<Vec<u32>>,
        /// Client-measured answer time in milliseconds.
        #[serde(default)]
        answer_ms: Option<i64>,
    },
    /// Host command issued over the play socket.
    Command {
        /// Command to run.
        command: HostCommand,
        /// Only used by `start`.
        #[serde(default)]
        question_count: Option<usize>,
    },
    /// Any other `type`, answered with an `unsupported` error.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Parse one text frame.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Merge the single and multi selection fields of an answer frame.
pub fn selection(option_id: Option<u32>, option_ids: Option<Vec<u32>>) -> Vec<u32> {
    let mut selected = option_ids.unwrap_or_default();
    if let Some(id) = option_id {
        selected.push(id);
    }
    selected
}

/// Frames sent to sockets and SSE subscribers, discriminated by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Roster update on the lobby channel.
    LobbyState(LobbyStatePayload),
    /// Roster frozen, clients move to the play page.
    GameStarted(GameStartedPayload),
    /// A question opened.
    QuestionPublished(QuestionPublishedPayload),
    /// Answer count of the open question.
    AnswerProgress(AnswerProgressPayload),
    /// Correct options and standings of a closed question.
    Reveal(RevealPayload),
    /// Final leaderboard.
    Finished(FinishedPayload),
    /// Answer stored for the submitting player.
    AnswerAccepted(AnswerAcceptedPayload),
    /// Personal outcome of the last revealed question.
    MyResult(MyResultPayload),
    /// Recovery snapshot.
    Sync(SessionStateResponse),
    /// Outcome of a host command sent over the socket.
    CommandResult(CommandResponse),
    /// Rejected frame.
    Error(ErrorPayload),
}

impl OutboundMessage {
    /// Value of the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::LobbyState(_) => "lobby_state",
            OutboundMessage::GameStarted(_) => "game_started",
            OutboundMessage::QuestionPublished(_) => "question_published",
            OutboundMessage::AnswerProgress(_) => "answer_progress",
            OutboundMessage::Reveal(_) => "reveal",
            OutboundMessage::Finished(_) => "finished",
            OutboundMessage::AnswerAccepted(_) => "answer_accepted",
            OutboundMessage::MyResult(_) => "my_result",
            OutboundMessage::Sync(_) => "sync",
            OutboundMessage::CommandResult(_) => "command_result",
            OutboundMessage::Error(_) => "error",
        }
    }

    /// Error frame addressed to one socket.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        OutboundMessage::Error(ErrorPayload {
            code: code.to_string(),
            message: message.into(),
        })
    }
}

/// Roster snapshot; `count` is always the full roster size.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LobbyStatePayload {
    /// Total number of players.
    pub count: usize,
    /// Newest players first, capped by configuration.
    pub players: Vec<LobbyPlayer>,
}

/// Sent once on the lobby channel when the host starts the game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStartedPayload {
    /// Path of the play page.
    pub redirect: String,
}

/// Sent on the play channel whenever a question opens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionPublishedPayload {
    /// Question without correctness.
    pub question: QuestionView,
}

/// Sent on the play channel after each accepted answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerProgressPayload {
    /// Open question.
    pub question_id: u32,
    /// Players who answered so far.
    pub answered_count: usize,
    /// Roster size.
    pub total_players: usize,
}

/// Sent on the play channel when the host reveals a question.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealPayload {
    /// Revealed question.
    pub question_id: u32,
    /// Identifiers of the correct options.
    pub correct_option_ids: Vec<u32>,
    /// Leading players.
    pub top: Vec<LeaderboardEntry>,
    /// Per-player outcomes, ranked.
    pub results: Vec<ResultEntry>,
}

/// Sent on the play channel when the session ends.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinishedPayload {
    /// Why the session ended.
    pub reason: VisibleFinishReason,
    /// Final leaderboard.
    pub top: Vec<LeaderboardEntry>,
}

/// Acknowledgement sent to the submitting socket only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerAcceptedPayload {
    /// Question the answer was stored for.
    pub question_id: u32,
    /// Players who answered so far.
    pub answered_count: usize,
    /// Roster size.
    pub total_players: usize,
}

/// Personal outcome sent to each player socket after a reveal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyResultPayload {
    /// Revealed question.
    pub question_id: u32,
    /// Exact set match with the correct options.
    pub is_correct: bool,
    /// Points earned on this question.
    pub awarded_points: u32,
    /// Cumulative score.
    pub score: u64,
}

/// Rejection reported to the offending socket only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorPayload {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}
