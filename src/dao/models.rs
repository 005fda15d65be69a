use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// How an archived session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReasonEntity {
    /// Every question was played.
    Completed,
    /// The host ended the session early.
    HostFinished,
}

/// Final leaderboard line kept after a session is cleaned up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandingEntity {
    /// 1-based position in the final leaderboard.
    pub rank: u32,
    /// Player identifier used during the session.
    pub player_id: Uuid,
    /// Display name at the end of the session.
    pub nickname: String,
    /// Avatar chosen by the player.
    pub avatar_key: String,
    /// Final cumulative score.
    pub score: u64,
}

/// Final results of a finished session, retained after the live state is dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchivedResult {
    /// Join code; never reused while the archive entry exists.
    pub code: String,
    /// Optional session title.
    pub title: Option<String>,
    /// How the session ended.
    pub reason: FinishReasonEntity,
    /// Number of questions played (after `start` truncation).
    pub question_count: usize,
    /// Full final leaderboard.
    pub standings: Vec<StandingEntity>,
    /// Session creation time.
    pub created_at: SystemTime,
    /// Time the session reached `finished`.
    pub finished_at: SystemTime,
    /// Time the entry was written.
    pub archived_at: SystemTime,
}
