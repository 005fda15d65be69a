//! DTO definitions used to provision sessions and join them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::validate_nickname,
    state::feed::{OptionDraft, QuestionDraft, TimeLimitDraft},
};

/// Payload used to provision a new live session with its question feed.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Optional display title, trimmed before storage.
    #[validate(length(max = 120))]
    #[serde(default)]
    pub title: Option<String>,
    /// Ordered question feed.
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuestionInput>,
    /// Hint for host clients that advance automatically after each deadline.
    #[serde(default)]
    pub auto_advance: bool,
}

/// Question supplied at provisioning time.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct QuestionInput {
    /// Question prompt.
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    /// Candidate options in display order.
    #[validate(length(min = 2, max = 10), nested)]
    pub options: Vec<OptionInput>,
    /// Inferred from the number of correct options when omitted.
    #[serde(default)]
    pub multi: Option<bool>,
    /// Selection cap for multi questions.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub max_select: Option<u32>,
    /// Falls back to the configured default when omitted; `null` means untimed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<u32>, minimum = 1, maximum = 3600)]
    pub time_limit_seconds: Option<Option<u32>>,
    /// Base points overriding the configured default.
    #[validate(range(min = 1, max = 100000))]
    #[serde(default)]
    pub points: Option<u32>,
}

/// Answer option supplied at provisioning time.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct OptionInput {
    /// Display text.
    #[validate(length(min = 1, max = 200))]
    pub text: String,
    /// Whether the option is (part of) the right answer.
    #[serde(default)]
    pub is_correct: bool,
}

impl From<QuestionInput> for QuestionDraft {
    fn from(value: QuestionInput) -> Self {
        let time_limit_seconds = match value.time_limit_seconds {
            None => TimeLimitDraft::Default,
            Some(None) => TimeLimitDraft::Untimed,
            Some(Some(seconds)) => TimeLimitDraft::Seconds(seconds),
        };
        Self {
            text: value.text,
            options: value
                .options
                .into_iter()
                .map(|option| OptionDraft {
                    text: option.text,
                    is_correct: option.is_correct,
                })
                .collect(),
            multi: value.multi,
            max_select: value.max_select,
            time_limit_seconds,
            points: value.points,
        }
    }
}

/// Credentials handed to the host once a session is provisioned.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    /// Join code shared with players.
    pub code: String,
    /// Secret required for host commands and the host socket.
    pub host_token: String,
    /// Number of questions in the feed.
    pub total_questions: usize,
}

/// Request to join a session's lobby, or to re-attach an existing identity.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRequest {
    /// Display name, whitespace-collapsed before storage.
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    /// Avatar key; unknown keys fall back to the first configured one.
    #[serde(default)]
    pub avatar_key: Option<String>,
    /// Token from a previous join; re-attaches that player instead of creating one.
    #[serde(default)]
    pub player_token: Option<String>,
}

/// Player identity returned after joining.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Stable player identifier.
    pub player_id: Uuid,
    /// Secret to present when identifying on the sockets.
    pub player_token: String,
    /// Normalized nickname.
    pub nickname: String,
    /// Resolved avatar key.
    pub avatar_key: String,
    /// Where the client should navigate next.
    pub redirect: String,
    /// An existing identity was re-attached.
    pub rejoined: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_questions_and_options() {
        let empty: CreateSessionRequest =
            serde_json::from_str(r#"{"questions": []}"#).unwrap();
        assert!(empty.validate().is_err());

        let one_option: CreateSessionRequest = serde_json::from_str(
            r#"{"questions": [{"text": "q", "options": [{"text": "a", "is_correct": true}]}]}"#,
        )
        .unwrap();
        assert!(one_option.validate().is_err());

        let valid: CreateSessionRequest = serde_json::from_str(
            r#"{"title": "Geo", "questions": [{"text": "q", "options": [
                {"text": "a", "is_correct": true}, {"text": "b"}
            ], "time_limit_seconds": 10}]}"#,
        )
        .unwrap();
        assert!(valid.validate().is_ok());
        assert!(!valid.auto_advance);
    }

    #[test]
    fn null_time_limit_differs_from_omitted() {
        let request: CreateSessionRequest = serde_json::from_str(
            r#"{"questions": [
                {"text": "a", "options": [{"text": "x", "is_correct": true}, {"text": "y"}]},
                {"text": "b", "options": [{"text": "x", "is_correct": true}, {"text": "y"}],
                 "time_limit_seconds": null},
                {"text": "c", "options": [{"text": "x", "is_correct": true}, {"text": "y"}],
                 "time_limit_seconds": 12}
            ]}"#,
        )
        .unwrap();
        let drafts: Vec<TimeLimitDraft> = request
            .questions
            .into_iter()
            .map(|question| QuestionDraft::from(question).time_limit_seconds)
            .collect();
        assert_eq!(
            drafts,
            vec![
                TimeLimitDraft::Default,
                TimeLimitDraft::Untimed,
                TimeLimitDraft::Seconds(12)
            ]
        );
    }

    #[test]
    fn join_request_validates_nickname() {
        let blank: JoinRequest = serde_json::from_str(r#"{"nickname": "   "}"#).unwrap();
        assert!(blank.validate().is_err());

        let ok: JoinRequest =
            serde_json::from_str(r#"{"nickname": "Ada", "avatar_key": "avatar_3"}"#).unwrap();
        assert!(ok.validate().is_ok());
    }
}
