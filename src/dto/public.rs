use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{
    common::{LeaderboardEntry, QuestionView},
    phase::{VisibleFinishReason, VisiblePhase},
};

/// Recovery snapshot letting a (re)connected client resynchronise at any time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStateResponse {
    /// Join code.
    pub code: String,
    /// Current phase.
    pub state: VisiblePhase,
    /// Number of committed transitions; increases with every phase change.
    pub version: u64,
    /// 1-based index of the current question, 0 in the lobby.
    pub question_index: u32,
    /// Number of questions played in this session.
    pub total_questions: usize,
    /// Current question without correctness, in `question` and `reveal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Only present in `reveal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option_ids: Option<Vec<u32>>,
    /// RFC 3339 server clock, for client-side deadline correction.
    pub server_time: String,
    /// Milliseconds left before the deadline of a timed open question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
    /// Roster size.
    pub players_count: usize,
    /// Hint for host clients that advance after each deadline.
    pub auto_advance: bool,
    /// Only present in `finished`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<VisibleFinishReason>,
    /// Final leaderboard, only present in `finished`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<Vec<LeaderboardEntry>>,
}
