//! Question feed attached to a live session.
//!
//! The feed is validated once when the session is provisioned and never
//! mutated afterwards, except for the one-shot truncation performed by
//! `start(question_count)`.

use std::{collections::BTreeSet, time::Duration};

use thiserror::Error;

/// Maximum number of options a single question may carry.
pub const MAX_OPTIONS: usize = 10;

/// Longest answer window an author may request.
pub const MAX_TIME_LIMIT_SECONDS: u32 = 3600;

/// Answer option as stored server side, including correctness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOption {
    /// Identifier unique within the session.
    pub id: u32,
    /// Display text.
    pub text: String,
    /// Whether selecting this option is (part of) the right answer.
    pub is_correct: bool,
}

/// Immutable question definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Identifier unique within the session.
    pub id: u32,
    /// 1-based position in the feed.
    pub index: u32,
    /// Question prompt.
    pub text: String,
    /// Options in authoring order.
    pub options: Vec<QuestionOption>,
    /// Whether several options may be selected.
    pub multi: bool,
    /// Upper bound on the selection size (always 1 for single choice).
    pub max_select: u32,
    /// Answer window, `None` when untimed.
    pub time_limit: Option<Duration>,
    /// Per-question base points overriding the session default.
    pub points: Option<u32>,
}

impl Question {
    /// Identifiers of the correct options, in ascending order.
    pub fn correct_option_ids(&self) -> BTreeSet<u32> {
        self.options
            .iter()
            .filter(|option| option.is_correct)
            .map(|option| option.id)
            .collect()
    }

    /// Whether `option_id` belongs to this question.
    pub fn has_option(&self, option_id: u32) -> bool {
        self.options.iter().any(|option| option.id == option_id)
    }
}

/// Author-supplied option before ids are assigned.
#[derive(Debug, Clone)]
pub struct OptionDraft {
    /// Display text.
    pub text: String,
    /// Correctness flag.
    pub is_correct: bool,
}

/// Answer window requested by the author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeLimitDraft {
    /// Field omitted: use the configured default.
    #[default]
    Default,
    /// Explicit `null`: no deadline.
    Untimed,
    /// Explicit window in seconds.
    Seconds(u32),
}

/// Author-supplied question before ids and indexes are assigned.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    /// Question prompt.
    pub text: String,
    /// Candidate options.
    pub options: Vec<OptionDraft>,
    /// Explicit multi-select flag; inferred from the correct count when absent.
    pub multi: Option<bool>,
    /// Explicit selection cap for multi questions.
    pub max_select: Option<u32>,
    /// Requested answer window.
    pub time_limit_seconds: TimeLimitDraft,
    /// Per-question base points.
    pub points: Option<u32>,
}

/// Reasons a feed is rejected at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// No question at all.
    #[error("a session needs at least one question")]
    Empty,
    /// Blank prompt.
    #[error("question {index} has an empty prompt")]
    EmptyText {
        /// 1-based question position.
        index: u32,
    },
    /// Too few or too many options.
    #[error("question {index} needs between 2 and {MAX_OPTIONS} options (got {count})")]
    OptionCount {
        /// 1-based question position.
        index: u32,
        /// Options supplied.
        count: usize,
    },
    /// Blank option text.
    #[error("question {index} has an option without text")]
    EmptyOption {
        /// 1-based question position.
        index: u32,
    },
    /// Nothing marked correct.
    #[error("question {index} has no correct option")]
    NoCorrectOption {
        /// 1-based question position.
        index: u32,
    },
    /// Single choice question with several correct options.
    #[error("single choice question {index} must have exactly one correct option (got {count})")]
    AmbiguousSingleChoice {
        /// 1-based question position.
        index: u32,
        /// Options marked correct.
        count: usize,
    },
    /// Selection cap below the number of correct options.
    #[error("question {index} allows {max_select} selections but has {correct} correct options")]
    MaxSelectTooSmall {
        /// 1-based question position.
        index: u32,
        /// Requested cap.
        max_select: u32,
        /// Options marked correct.
        correct: usize,
    },
    /// Explicit zero-second window.
    #[error("question {index} has a zero time limit")]
    ZeroTimeLimit {
        /// 1-based question position.
        index: u32,
    },
    /// Window above [`MAX_TIME_LIMIT_SECONDS`].
    #[error("question {index} time limit exceeds {MAX_TIME_LIMIT_SECONDS} seconds (got {seconds})")]
    TimeLimitTooLong {
        /// 1-based question position.
        index: u32,
        /// Requested window.
        seconds: u32,
    },
}

/// Ordered, validated sequence of questions.
#[derive(Debug, Clone, Default)]
pub struct QuestionFeed {
    questions: Vec<Question>,
}

impl QuestionFeed {
    /// Validate drafts and assign 1-based indexes plus session-unique option ids.
    pub fn build(
        drafts: Vec<QuestionDraft>,
        default_time_limit: Option<Duration>,
    ) -> Result<Self, FeedError> {
        if drafts.is_empty() {
            return Err(FeedError::Empty);
        }

        let mut next_option_id = 1u32;
        let mut questions = Vec::with_capacity(drafts.len());

        for (position, draft) in drafts.into_iter().enumerate() {
            let index = position as u32 + 1;
            let text = draft.text.trim().to_string();
            if text.is_empty() {
                return Err(FeedError::EmptyText { index });
            }

            let count = draft.options.len();
            if !(2..=MAX_OPTIONS).contains(&count) {
                return Err(FeedError::OptionCount { index, count });
            }

            let mut options = Vec::with_capacity(count);
            for option in draft.options {
                let option_text = option.text.trim().to_string();
                if option_text.is_empty() {
                    return Err(FeedError::EmptyOption { index });
                }
                options.push(QuestionOption {
                    id: next_option_id,
                    text: option_text,
                    is_correct: option.is_correct,
                });
                next_option_id += 1;
            }

            let correct = options.iter().filter(|option| option.is_correct).count();
            if correct == 0 {
                return Err(FeedError::NoCorrectOption { index });
            }

            let multi = draft.multi.unwrap_or(correct > 1);
            let max_select = if multi {
                let max_select = draft.max_select.unwrap_or((correct as u32).max(2));
                if (max_select as usize) < correct {
                    return Err(FeedError::MaxSelectTooSmall {
                        index,
                        max_select,
                        correct,
                    });
                }
                max_select.min(count as u32)
            } else {
                if correct != 1 {
                    return Err(FeedError::AmbiguousSingleChoice {
                        index,
                        count: correct,
                    });
                }
                1
            };

            let time_limit = match draft.time_limit_seconds {
                TimeLimitDraft::Seconds(0) => return Err(FeedError::ZeroTimeLimit { index }),
                TimeLimitDraft::Seconds(seconds) if seconds > MAX_TIME_LIMIT_SECONDS => {
                    return Err(FeedError::TimeLimitTooLong { index, seconds });
                }
                TimeLimitDraft::Seconds(seconds) => Some(Duration::from_secs(u64::from(seconds))),
                TimeLimitDraft::Untimed => None,
                TimeLimitDraft::Default => default_time_limit,
            };

            questions.push(Question {
                id: index,
                index,
                text,
                options,
                multi,
                max_select,
                time_limit,
                points: draft.points,
            });
        }

        Ok(Self { questions })
    }

    /// Number of questions in the feed.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the feed holds no question.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at the 1-based `index`.
    pub fn get(&self, index: u32) -> Option<&Question> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        self.questions.get(position)
    }

    /// Question with the given identifier.
    pub fn find(&self, question_id: u32) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }

    /// Keep only the first `count` questions.
    pub fn truncate(&mut self, count: usize) {
        self.questions.truncate(count);
    }

    /// Iterate over the questions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}
