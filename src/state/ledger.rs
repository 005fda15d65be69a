//! Append-only record of answers, keyed by question then player.

use std::{
    collections::{BTreeSet, HashMap},
    time::SystemTime,
};

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    feed::Question,
    scoring::{Outcome, ScoringPolicy},
};

/// Reasons an answer submission is refused. The ledger is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The question is not the open one, or its window has closed.
    #[error("answers are not accepted for this question")]
    OutOfWindow,
    /// The player already answered this question.
    #[error("an answer was already recorded for this question")]
    DuplicateAnswer,
    /// The selection does not fit the question.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    /// The player is not part of the session roster.
    #[error("unknown player")]
    UnknownPlayer,
}

impl SubmitError {
    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::OutOfWindow => "out_of_window",
            SubmitError::DuplicateAnswer => "duplicate_answer",
            SubmitError::InvalidSelection(_) => "invalid_selection",
            SubmitError::UnknownPlayer => "unknown_player",
        }
    }
}

/// A recorded answer. Only `outcome` is filled in later, by scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Answering player.
    pub player_id: Uuid,
    /// Answered question.
    pub question_id: u32,
    /// Deduplicated option ids.
    pub selected: BTreeSet<u32>,
    /// Server receive time.
    pub submitted_at: SystemTime,
    /// Latency used for the speed factor, clamped to the time limit.
    pub latency_ms: u64,
    /// Filled in when the question is scored.
    pub outcome: Option<Outcome>,
}

/// Answers for every question of one session.
#[derive(Debug, Clone, Default)]
pub struct AnswerLedger {
    answers: HashMap<u32, IndexMap<Uuid, Answer>>,
}

impl AnswerLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer for `question`, enforcing at-most-once per player.
    ///
    /// Callers are responsible for checking that `question` is the open one.
    pub fn record(
        &mut self,
        question: &Question,
        player_id: Uuid,
        selection: &[u32],
        latency_ms: u64,
        submitted_at: SystemTime,
    ) -> Result<&Answer, SubmitError> {
        if self.answer(question.id, player_id).is_some() {
            return Err(SubmitError::DuplicateAnswer);
        }

        let selected = validate_selection(question, selection)?;
        let answer = self
            .answers
            .entry(question.id)
            .or_default()
            .entry(player_id)
            .or_insert(Answer {
                player_id,
                question_id: question.id,
                selected,
                submitted_at,
                latency_ms,
                outcome: None,
            });

        Ok(&*answer)
    }

    /// Answer recorded by `player_id` for `question_id`, if any.
    pub fn answer(&self, question_id: u32, player_id: Uuid) -> Option<&Answer> {
        self.answers
            .get(&question_id)
            .and_then(|answers| answers.get(&player_id))
    }

    /// Number of answers recorded for `question_id`.
    pub fn answered_count(&self, question_id: u32) -> usize {
        self.answers.get(&question_id).map_or(0, IndexMap::len)
    }

    /// Score every answer of `question`.
    ///
    /// Outcomes are a pure function of the stored answer, so running this
    /// again yields identical values.
    pub fn score_question(&mut self, question: &Question, policy: &ScoringPolicy) {
        let Some(answers) = self.answers.get_mut(&question.id) else {
            return;
        };
        for answer in answers.values_mut() {
            answer.outcome = Some(policy.evaluate(question, &answer.selected, answer.latency_ms));
        }
    }

    /// Outcome for `player_id` on `question_id`; missing answers count as [`Outcome::MISSED`].
    pub fn outcome(&self, question_id: u32, player_id: Uuid) -> Outcome {
        self.answer(question_id, player_id)
            .and_then(|answer| answer.outcome)
            .unwrap_or(Outcome::MISSED)
    }

    /// Sum of awarded points across every scored answer of `player_id`.
    pub fn total_points(&self, player_id: Uuid) -> u64 {
        self.answers
            .values()
            .filter_map(|answers| answers.get(&player_id))
            .filter_map(|answer| answer.outcome)
            .map(|outcome| u64::from(outcome.awarded_points))
            .sum()
    }
}

fn validate_selection(question: &Question, selection: &[u32]) -> Result<BTreeSet<u32>, SubmitError> {
    let selected: BTreeSet<u32> = selection.iter().copied().collect();
    if selected.is_empty() {
        return Err(SubmitError::InvalidSelection("no option selected".into()));
    }

    if let Some(unknown) = selected.iter().find(|id| !question.has_option(**id)) {
        return Err(SubmitError::InvalidSelection(format!(
            "option {unknown} does not belong to question {}",
            question.id
        )));
    }

    if !question.multi && selected.len() > 1 {
        return Err(SubmitError::InvalidSelection(
            "single choice question accepts exactly one option".into(),
        ));
    }

    if question.multi && selected.len() > question.max_select as usize {
        return Err(SubmitError::InvalidSelection(format!(
            "at most {} options may be selected",
            question.max_select
        )));
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::feed::QuestionOption;

    fn question(id: u32, correct: &[u32], multi: bool) -> Question {
        Question {
            id,
            index: id,
            text: format!("question {id}"),
            options: (1..=4)
                .map(|option| QuestionOption {
                    id: id * 10 + option,
                    text: format!("opt_{option}"),
                    is_correct: correct.contains(&(id * 10 + option)),
                })
                .collect(),
            multi,
            max_select: if multi { 2 } else { 1 },
            time_limit: Some(Duration::from_secs(10)),
            points: None,
        }
    }

    #[test]
    fn second_submission_is_rejected_and_first_kept() {
        let q = question(1, &[12], false);
        let mut ledger = AnswerLedger::new();
        let player = Uuid::new_v4();
        let now = SystemTime::now();

        ledger.record(&q, player, &[12], 1200, now).unwrap();
        let err = ledger.record(&q, player, &[13], 300, now).unwrap_err();

        assert_eq!(err, SubmitError::DuplicateAnswer);
        let kept = ledger.answer(1, player).unwrap();
        assert_eq!(kept.selected, BTreeSet::from([12]));
        assert_eq!(kept.latency_ms, 1200);
        assert_eq!(ledger.answered_count(1), 1);
    }

    #[test]
    fn duplicate_check_precedes_selection_check() {
        let q = question(1, &[12], false);
        let mut ledger = AnswerLedger::new();
        let player = Uuid::new_v4();
        ledger.record(&q, player, &[12], 0, SystemTime::now()).unwrap();

        assert_eq!(
            ledger.record(&q, player, &[], 0, SystemTime::now()).unwrap_err(),
            SubmitError::DuplicateAnswer
        );
    }

    #[test]
    fn rejects_invalid_selections() {
        let single = question(1, &[12], false);
        let multi = question(2, &[21, 23], true);
        let mut ledger = AnswerLedger::new();
        let player = Uuid::new_v4();
        let now = SystemTime::now();

        for (q, selection) in [
            (&single, vec![]),
            (&single, vec![99]),
            (&single, vec![11, 12]),
            (&multi, vec![21, 22, 23]),
            (&multi, vec![12]),
        ] {
            let err = ledger.record(q, player, &selection, 0, now).unwrap_err();
            assert!(matches!(err, SubmitError::InvalidSelection(_)), "{selection:?}");
        }
        assert_eq!(ledger.answered_count(1), 0);
        assert_eq!(ledger.answered_count(2), 0);
    }

    #[test]
    fn repeated_ids_collapse_into_one_selection() {
        let q = question(1, &[12], false);
        let mut ledger = AnswerLedger::new();
        let answer = ledger
            .record(&q, Uuid::new_v4(), &[12, 12], 0, SystemTime::now())
            .unwrap();
        assert_eq!(answer.selected.len(), 1);
    }

    #[test]
    fn scoring_is_idempotent_and_feeds_totals() {
        let policy = ScoringPolicy::default();
        let first = question(1, &[12], false);
        let second = question(2, &[21, 23], true);
        let mut ledger = AnswerLedger::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let now = SystemTime::now();

        ledger.record(&first, alice, &[12], 4000, now).unwrap();
        ledger.record(&first, bob, &[11], 1000, now).unwrap();
        ledger.score_question(&first, &policy);
        let scored = (ledger.outcome(1, alice), ledger.outcome(1, bob));
        ledger.score_question(&first, &policy);
        assert_eq!((ledger.outcome(1, alice), ledger.outcome(1, bob)), scored);

        ledger.record(&second, alice, &[21], 0, now).unwrap();
        ledger.record(&second, bob, &[21, 23], 0, now).unwrap();
        ledger.score_question(&second, &policy);

        assert_eq!(ledger.total_points(alice), 800);
        assert_eq!(ledger.total_points(bob), 1000);
        assert_eq!(ledger.outcome(2, alice), Outcome::MISSED);
        assert_eq!(ledger.outcome(3, alice), Outcome::MISSED);
    }
}
