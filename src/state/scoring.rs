//! Correctness, speed-based points and leaderboard ordering.

use std::{collections::BTreeSet, time::SystemTime};

use uuid::Uuid;

use crate::state::feed::Question;

/// Result of scoring one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the selection matches the correct set exactly.
    pub is_correct: bool,
    /// Points granted for this answer (0 when incorrect).
    pub awarded_points: u32,
}

impl Outcome {
    /// Outcome recorded for players who never answered.
    pub const MISSED: Outcome = Outcome {
        is_correct: false,
        awarded_points: 0,
    };
}

/// Tunable scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    /// Points for a correct answer at zero latency.
    pub base_points: u32,
    /// Lowest speed factor reached at the end of the answer window.
    pub speed_floor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_points: 1000,
            speed_floor: 0.5,
        }
    }
}

impl ScoringPolicy {
    /// Speed factor in `[speed_floor, 1.0]`, decaying linearly with latency.
    ///
    /// Untimed questions always yield `1.0`.
    pub fn speed_factor(&self, question: &Question, latency_ms: u64) -> f64 {
        let Some(limit) = question.time_limit else {
            return 1.0;
        };
        let limit_ms = limit.as_millis() as f64;
        if limit_ms <= 0.0 {
            return 1.0;
        }

        let floor = self.speed_floor.clamp(0.0, 1.0);
        let progress = (latency_ms as f64 / limit_ms).clamp(0.0, 1.0);
        1.0 - (1.0 - floor) * progress
    }

    /// Score a selection for `question` answered after `latency_ms`.
    pub fn evaluate(
        &self,
        question: &Question,
        selected: &BTreeSet<u32>,
        latency_ms: u64,
    ) -> Outcome {
        if !is_correct(question, selected) {
            return Outcome::MISSED;
        }

        let base = question.points.unwrap_or(self.base_points);
        let awarded = (f64::from(base) * self.speed_factor(question, latency_ms)).round();
        Outcome {
            is_correct: true,
            awarded_points: awarded as u32,
        }
    }
}

/// Exact set equality against the correct options; no partial credit.
pub fn is_correct(question: &Question, selected: &BTreeSet<u32>) -> bool {
    !selected.is_empty() && *selected == question.correct_option_ids()
}

/// One row of a leaderboard snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Player identifier.
    pub player_id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Avatar key chosen at join time.
    pub avatar_key: String,
    /// Cumulative score at snapshot time.
    pub score: u64,
    /// Join timestamp used to break ties.
    pub joined_at: SystemTime,
}

/// Sort standings by descending score, earlier joiners first on ties.
///
/// The sort is stable so entries that also share a join instant keep roster order.
pub fn rank(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });
    standings
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::feed::QuestionOption;

    fn question(correct: &[u32], multi: bool, limit: Option<u64>) -> Question {
        Question {
            id: 1,
            index: 1,
            text: "q".into(),
            options: (1..=4)
                .map(|id| QuestionOption {
                    id,
                    text: format!("opt_{id}"),
                    is_correct: correct.contains(&id),
                })
                .collect(),
            multi,
            max_select: if multi { 2 } else { 1 },
            time_limit: limit.map(Duration::from_secs),
            points: None,
        }
    }

    fn selection(ids: &[u32]) -> BTreeSet<u32> {
        ids.iter().copied().collect()
    }

    #[test]
    fn correct_single_choice_inside_window_scores_between_bounds() {
        let policy = ScoringPolicy::default();
        let q = question(&[2], false, Some(10));

        let outcome = policy.evaluate(&q, &selection(&[2]), 4000);
        assert!(outcome.is_correct);
        assert_eq!(outcome.awarded_points, 800);
        assert!(outcome.awarded_points > 500 && outcome.awarded_points < 1000);
    }

    #[test]
    fn speed_factor_hits_boundaries() {
        let policy = ScoringPolicy::default();
        let q = question(&[1], false, Some(10));

        assert_eq!(policy.speed_factor(&q, 0), 1.0);
        assert_eq!(policy.speed_factor(&q, 10_000), 0.5);
        assert_eq!(policy.speed_factor(&q, 60_000), 0.5);
    }

    #[test]
    fn speed_factor_is_monotonic() {
        let policy = ScoringPolicy::default();
        let q = question(&[1], false, Some(7));
        let mut previous = f64::MAX;
        for latency in (0..=7_000).step_by(250) {
            let factor = policy.speed_factor(&q, latency);
            assert!(factor <= previous);
            previous = factor;
        }
    }

    #[test]
    fn untimed_questions_award_full_points() {
        let policy = ScoringPolicy::default();
        let q = question(&[3], false, None);
        assert_eq!(
            policy.evaluate(&q, &selection(&[3]), 99_000).awarded_points,
            1000
        );
    }

    #[test]
    fn multi_choice_requires_exact_set() {
        let policy = ScoringPolicy::default();
        let q = question(&[1, 3], true, Some(10));

        assert_eq!(policy.evaluate(&q, &selection(&[1]), 0), Outcome::MISSED);
        assert_eq!(policy.evaluate(&q, &selection(&[1, 2]), 0), Outcome::MISSED);
        assert!(policy.evaluate(&q, &selection(&[3, 1]), 0).is_correct);
    }

    #[test]
    fn question_points_override_base() {
        let policy = ScoringPolicy::default();
        let mut q = question(&[1], false, None);
        q.points = Some(250);
        assert_eq!(policy.evaluate(&q, &selection(&[1]), 0).awarded_points, 250);
    }

    #[test]
    fn rank_orders_by_score_then_join_time() {
        let base = SystemTime::UNIX_EPOCH;
        let standing = |name: &str, score: u64, joined: u64| Standing {
            player_id: Uuid::new_v4(),
            nickname: name.into(),
            avatar_key: "avatar_1".into(),
            score,
            joined_at: base + Duration::from_secs(joined),
        };

        let ranked = rank(vec![
            standing("late", 500, 3),
            standing("top", 900, 5),
            standing("early", 500, 1),
        ]);
        let names: Vec<_> = ranked.iter().map(|s| s.nickname.as_str()).collect();
        assert_eq!(names, vec!["top", "early", "late"]);
    }
}
