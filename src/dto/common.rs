use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        feed::Question,
        scoring::Standing,
        session::{ConnectionStatus, Player, PlayerResult, QuestionWindow},
    },
};

/// Option as shown to clients: never carries correctness.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct OptionView {
    /// Option identifier.
    pub id: u32,
    /// Display text.
    pub text: String,
}

/// Question as shown to clients while it is open or being revealed.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// Question identifier.
    pub id: u32,
    /// 1-based position.
    pub index: u32,
    /// Number of questions in the session.
    pub total: usize,
    /// Question prompt.
    pub text: String,
    /// Options in presentation order.
    pub options: Vec<OptionView>,
    /// Several options may be selected.
    pub multi: bool,
    /// Maximum number of selected options.
    pub max_select: u32,
    /// Time limit in seconds, `null` when untimed.
    pub time_limit: Option<u64>,
    /// Base points of the question when it overrides the session default.
    pub points: Option<u32>,
    /// RFC 3339 opening time.
    pub started_at: String,
    /// RFC 3339 deadline, `null` when untimed.
    pub ends_at: Option<String>,
}

impl QuestionView {
    /// Project `question` using the presentation order and timing of `window`.
    pub fn project(question: &Question, window: &QuestionWindow, total: usize) -> Self {
        let mut options: Vec<OptionView> = window
            .option_order
            .iter()
            .filter_map(|id| question.options.iter().find(|option| option.id == *id))
            .map(|option| OptionView {
                id: option.id,
                text: option.text.clone(),
            })
            .collect();
        if options.len() != question.options.len() {
            options = question
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id,
                    text: option.text.clone(),
                })
                .collect();
        }

        Self {
            id: question.id,
            index: question.index,
            total,
            text: question.text.clone(),
            options,
            multi: question.multi,
            max_select: question.max_select,
            time_limit: question.time_limit.map(|limit| limit.as_secs()),
            points: question.points,
            started_at: format_system_time(window.started_at),
            ends_at: window.ends_at.map(format_system_time),
        }
    }
}

/// Roster entry broadcast on the lobby channel.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct LobbyPlayer {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Avatar key.
    pub avatar_key: String,
    /// A socket is attached for this player.
    pub connected: bool,
}

impl From<&Player> for LobbyPlayer {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname.clone(),
            avatar_key: player.avatar_key.clone(),
            connected: player.connection == ConnectionStatus::Connected,
        }
    }
}

/// Leaderboard line.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Display name.
    pub nickname: String,
    /// Avatar key.
    pub avatar_key: String,
    /// Cumulative score.
    pub score: u64,
}

impl From<&Standing> for LeaderboardEntry {
    fn from(standing: &Standing) -> Self {
        Self {
            nickname: standing.nickname.clone(),
            avatar_key: standing.avatar_key.clone(),
            score: standing.score,
        }
    }
}

/// Per-player outcome of a revealed question.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    /// Display name.
    pub nickname: String,
    /// Avatar key.
    pub avatar_key: String,
    /// Exact set match with the correct options.
    pub is_correct: bool,
    /// Points earned on this question.
    pub awarded_points: u32,
    /// Cumulative score after this question.
    pub total_score: u64,
}

impl From<&PlayerResult> for ResultEntry {
    fn from(result: &PlayerResult) -> Self {
        Self {
            nickname: result.nickname.clone(),
            avatar_key: result.avatar_key.clone(),
            is_correct: result.is_correct,
            awarded_points: result.awarded_points,
            total_score: result.score,
        }
    }
}

/// Take the first `limit` entries of `items`, projected through `From`.
pub fn top<'a, S, T>(items: &'a [S], limit: usize) -> Vec<T>
where
    T: From<&'a S>,
{
    items.iter().take(limit).map(T::from).collect()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::state::feed::QuestionOption;

    fn question() -> Question {
        Question {
            id: 4,
            index: 2,
            text: "Capital of France?".into(),
            options: vec![
                QuestionOption {
                    id: 10,
                    text: "Lyon".into(),
                    is_correct: false,
                },
                QuestionOption {
                    id: 11,
                    text: "Paris".into(),
                    is_correct: true,
                },
            ],
            multi: false,
            max_select: 1,
            time_limit: Some(Duration::from_secs(20)),
            points: None,
        }
    }

    #[test]
    fn projection_follows_window_order_and_hides_correctness() {
        let started = SystemTime::UNIX_EPOCH;
        let window = QuestionWindow {
            question_id: 4,
            started_at: started,
            ends_at: Some(started + Duration::from_secs(20)),
            option_order: vec![11, 10],
        };

        let view = QuestionView::project(&question(), &window, 5);

        assert_eq!(view.options.iter().map(|o| o.id).collect::<Vec<_>>(), vec![11, 10]);
        assert_eq!(view.total, 5);
        assert_eq!(view.time_limit, Some(20));
        assert_eq!(view.started_at, "1970-01-01T00:00:00Z");
        assert_eq!(view.ends_at.as_deref(), Some("1970-01-01T00:00:20Z"));

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("is_correct"));
    }

    #[test]
    fn stale_order_falls_back_to_authoring_order() {
        let window = QuestionWindow {
            question_id: 4,
            started_at: SystemTime::UNIX_EPOCH,
            ends_at: None,
            option_order: vec![1, 2],
        };
        let view = QuestionView::project(&question(), &window, 1);
        assert_eq!(view.options.iter().map(|o| o.id).collect::<Vec<_>>(), vec![10, 11]);
        assert!(view.ends_at.is_none());
    }
}
