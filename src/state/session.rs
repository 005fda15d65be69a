//! Authoritative per-session state and the host-driven transitions applied to it.
//!
//! A [`LiveSession`] is only ever mutated through `&mut self` methods, which the
//! registry serialises behind one write lock per session. Every transition plans
//! the state machine event first, performs its bookkeeping, then commits the plan.

use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    feed::{Question, QuestionFeed},
    ledger::{AnswerLedger, SubmitError},
    scoring::{ScoringPolicy, Standing, rank},
    state_machine::{
        ApplyError, FinishReason, InvalidTransition, SessionEvent, SessionPhase,
        SessionStateMachine,
    },
};

/// Longest nickname accepted, in characters.
pub const MAX_NICKNAME_CHARS: usize = 32;

/// Per-session knobs copied from the application configuration at creation.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Points and speed curve.
    pub policy: ScoringPolicy,
    /// Shuffle option order when a question opens.
    pub shuffle_options: bool,
    /// Allowed avatar keys; the first one is the fallback.
    pub avatar_keys: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            policy: ScoringPolicy::default(),
            shuffle_options: false,
            avatar_keys: vec!["avatar_1".into()],
        }
    }
}

/// Whether at least one socket is currently attached to a player identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// At least one socket is attached.
    Connected,
    /// No socket is attached.
    Disconnected,
}

/// A roster entry. Players are never removed once joined.
#[derive(Debug, Clone)]
pub struct Player {
    /// Stable identifier.
    pub id: Uuid,
    /// Secret used to identify on sockets and to rejoin.
    pub token: String,
    /// Normalized display name.
    pub nickname: String,
    /// Resolved avatar key.
    pub avatar_key: String,
    /// Sum of awarded points, refreshed by the scoring step only.
    pub score: u64,
    /// Derived from the number of attached sockets.
    pub connection: ConnectionStatus,
    /// Join time, used to break score ties.
    pub joined_at: SystemTime,
    sockets: usize,
}

/// Timing and presentation of the currently opened question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWindow {
    /// Open question.
    pub question_id: u32,
    /// Publication time.
    pub started_at: SystemTime,
    /// Deadline, `None` when untimed.
    pub ends_at: Option<SystemTime>,
    /// Option ids in the order presented to clients.
    pub option_order: Vec<u32>,
}

/// Per-player line of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerResult {
    /// Player the line belongs to.
    pub player_id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Avatar key.
    pub avatar_key: String,
    /// Exact set match with the correct options.
    pub is_correct: bool,
    /// Points earned on this question.
    pub awarded_points: u32,
    /// Cumulative score right after this reveal.
    pub score: u64,
}

/// Leaderboard and per-player results pinned at `end_question` time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSnapshot {
    /// Revealed question.
    pub question_id: u32,
    /// Identifiers of the correct options.
    pub correct_option_ids: Vec<u32>,
    /// Full ranking after scoring.
    pub standings: Vec<Standing>,
    /// Results in leaderboard order.
    pub results: Vec<PlayerResult>,
}

/// Final leaderboard once the session is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    /// Why the session ended.
    pub reason: FinishReason,
    /// Full final ranking.
    pub standings: Vec<Standing>,
    /// Time of the finishing transition.
    pub finished_at: SystemTime,
}

/// Reasons a join request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// Joins are refused once the game started.
    #[error("the game has already started")]
    RosterFrozen,
    /// Another player already uses this nickname.
    #[error("nickname `{0}` is already taken")]
    NicknameTaken(String),
    /// Nickname is blank or too long.
    #[error("nickname must be between 1 and {MAX_NICKNAME_CHARS} characters")]
    InvalidNickname,
}

/// Identity handed back to a joining client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Player identifier.
    pub player_id: Uuid,
    /// Player token.
    pub player_token: String,
    /// An existing identity was re-attached rather than created.
    pub rejoined: bool,
    /// Roster membership or presentation changed and should be broadcast.
    pub roster_changed: bool,
}

/// Errors raised by host-issued transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// Command not allowed in the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// `start` asked for more questions than the feed holds.
    #[error("question_count must be between 1 and {available} (got {requested})")]
    InvalidQuestionCount {
        /// Requested count.
        requested: usize,
        /// Questions in the feed.
        available: usize,
    },
    /// Stale plan.
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// What a successful transition did, used to pick the broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A question window was opened (after `start` or `next_question`).
    QuestionOpened {
        /// Opened question.
        question_id: u32,
        /// Opened by `start`.
        first: bool,
    },
    /// The open question was scored and revealed.
    Revealed {
        /// Revealed question.
        question_id: u32,
    },
    /// The session reached its terminal phase.
    Finished(FinishReason),
}

/// Acknowledgement for an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerReceipt {
    /// Question the answer was stored for.
    pub question_id: u32,
    /// Players who answered so far.
    pub answered_count: usize,
    /// Roster size.
    pub total_players: usize,
}

/// One live game addressed by its join code.
#[derive(Debug)]
pub struct LiveSession {
    code: String,
    host_token: String,
    title: Option<String>,
    machine: SessionStateMachine,
    feed: QuestionFeed,
    question_index: u32,
    window: Option<QuestionWindow>,
    roster: IndexMap<Uuid, Player>,
    ledger: AnswerLedger,
    reveals: Vec<RevealSnapshot>,
    result: Option<FinalResult>,
    auto_advance: bool,
    created_at: SystemTime,
    settings: SessionSettings,
}

impl LiveSession {
    /// Create a session in the lobby with an attached, validated feed.
    pub fn new(
        code: String,
        host_token: String,
        title: Option<String>,
        feed: QuestionFeed,
        auto_advance: bool,
        settings: SessionSettings,
        now: SystemTime,
    ) -> Self {
        Self {
            code,
            host_token,
            title,
            machine: SessionStateMachine::new(),
            feed,
            question_index: 0,
            window: None,
            roster: IndexMap::new(),
            ledger: AnswerLedger::new(),
            reveals: Vec::new(),
            result: None,
            auto_advance,
            created_at: now,
            settings,
        }
    }

    /// Join code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display title, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Whether host clients advance automatically after deadlines.
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    /// Provisioning time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Whether `token` is the host credential of this session.
    pub fn is_host_token(&self, token: &str) -> bool {
        !token.is_empty() && self.host_token == token
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Number of transitions committed so far.
    pub fn version(&self) -> u64 {
        self.machine.version()
    }

    /// 1-based index of the current question, 0 while in the lobby.
    pub fn question_index(&self) -> u32 {
        self.question_index
    }

    /// Number of questions played in this session.
    pub fn total_questions(&self) -> usize {
        self.feed.len()
    }

    /// Question currently open or being revealed.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase() {
            SessionPhase::Question | SessionPhase::Reveal => self.feed.get(self.question_index),
            SessionPhase::Lobby | SessionPhase::Finished => None,
        }
    }

    /// Timing window of the current question.
    pub fn window(&self) -> Option<&QuestionWindow> {
        self.window.as_ref()
    }

    /// Time left before the current deadline; `None` when untimed or not in `question`.
    pub fn remaining(&self, now: SystemTime) -> Option<Duration> {
        if self.phase() != SessionPhase::Question {
            return None;
        }
        let ends_at = self.window.as_ref()?.ends_at?;
        Some(ends_at.duration_since(now).unwrap_or(Duration::ZERO))
    }

    /// Players in join order.
    pub fn roster(&self) -> impl DoubleEndedIterator<Item = &Player> {
        self.roster.values()
    }

    /// Roster size.
    pub fn players_count(&self) -> usize {
        self.roster.len()
    }

    /// Roster entry for `player_id`.
    pub fn player(&self, player_id: Uuid) -> Option<&Player> {
        self.roster.get(&player_id)
    }

    /// Roster entry holding `token`.
    pub fn player_by_token(&self, token: &str) -> Option<&Player> {
        if token.is_empty() {
            return None;
        }
        self.roster.values().find(|player| player.token == token)
    }

    /// Answers recorded so far.
    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    /// Reveal snapshot recorded for `question_id`.
    pub fn reveal(&self, question_id: u32) -> Option<&RevealSnapshot> {
        self.reveals
            .iter()
            .find(|reveal| reveal.question_id == question_id)
    }

    /// Most recent reveal snapshot.
    pub fn last_reveal(&self) -> Option<&RevealSnapshot> {
        self.reveals.last()
    }

    /// Final leaderboard, once finished.
    pub fn final_result(&self) -> Option<&FinalResult> {
        self.result.as_ref()
    }

    /// Live leaderboard built from the current player scores.
    pub fn standings(&self) -> Vec<Standing> {
        rank(
            self.roster
                .values()
                .map(|player| Standing {
                    player_id: player.id,
                    nickname: player.nickname.clone(),
                    avatar_key: player.avatar_key.clone(),
                    score: player.score,
                    joined_at: player.joined_at,
                })
                .collect(),
        )
    }

    /// Add a player to the lobby, or re-attach an existing identity by token.
    pub fn join(
        &mut self,
        nickname: &str,
        avatar_key: Option<&str>,
        player_token: Option<&str>,
        now: SystemTime,
    ) -> Result<JoinOutcome, JoinError> {
        let in_lobby = self.phase() == SessionPhase::Lobby;

        if let Some(existing) = player_token.and_then(|token| self.player_by_token(token)) {
            let player_id = existing.id;
            let player_token = existing.token.clone();
            let roster_changed = if in_lobby {
                self.update_player(player_id, nickname, avatar_key)?
            } else {
                false
            };
            return Ok(JoinOutcome {
                player_id,
                player_token,
                rejoined: true,
                roster_changed,
            });
        }

        if !in_lobby {
            return Err(JoinError::RosterFrozen);
        }

        let nickname = normalize_nickname(nickname)?;
        self.ensure_nickname_free(&nickname, None)?;

        let player = Player {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().simple().to_string(),
            nickname,
            avatar_key: self.resolve_avatar(avatar_key),
            score: 0,
            connection: ConnectionStatus::Disconnected,
            joined_at: now,
            sockets: 0,
        };
        let outcome = JoinOutcome {
            player_id: player.id,
            player_token: player.token.clone(),
            rejoined: false,
            roster_changed: true,
        };
        self.roster.insert(player.id, player);
        Ok(outcome)
    }

    /// Record a new socket for `player_id`, returning whether the status flipped.
    pub fn attach_socket(&mut self, player_id: Uuid) -> bool {
        let Some(player) = self.roster.get_mut(&player_id) else {
            return false;
        };
        player.sockets += 1;
        if player.connection == ConnectionStatus::Disconnected {
            player.connection = ConnectionStatus::Connected;
            return true;
        }
        false
    }

    /// Drop a socket of `player_id`, returning whether the status flipped.
    pub fn detach_socket(&mut self, player_id: Uuid) -> bool {
        let Some(player) = self.roster.get_mut(&player_id) else {
            return false;
        };
        player.sockets = player.sockets.saturating_sub(1);
        if player.sockets == 0 && player.connection == ConnectionStatus::Connected {
            player.connection = ConnectionStatus::Disconnected;
            return true;
        }
        false
    }

    /// Freeze the roster and open the first question.
    ///
    /// `question_count` keeps only the leading questions of the feed.
    pub fn start(
        &mut self,
        question_count: Option<usize>,
        now: SystemTime,
    ) -> Result<Transition, ControlError> {
        let plan = self.machine.plan(SessionEvent::Start)?;

        let available = self.feed.len();
        let requested = question_count.unwrap_or(available);
        if requested == 0 || requested > available {
            return Err(ControlError::InvalidQuestionCount {
                requested,
                available,
            });
        }

        self.feed.truncate(requested);
        let question_id = self.open_question(1, now);
        self.machine.apply(plan)?;
        Ok(Transition::QuestionOpened {
            question_id,
            first: true,
        })
    }

    /// Freeze answers for the open question, score it and pin the leaderboard.
    pub fn end_question(&mut self, _now: SystemTime) -> Result<Transition, ControlError> {
        let plan = self.machine.plan(SessionEvent::EndQuestion)?;

        let question_id = self.score_current_question();
        let snapshot = self.build_reveal(question_id);
        self.reveals.push(snapshot);

        self.machine.apply(plan)?;
        Ok(Transition::Revealed { question_id })
    }

    /// Open the following question, or finish when the feed is exhausted.
    pub fn next_question(&mut self, now: SystemTime) -> Result<Transition, ControlError> {
        let plan = self.machine.plan(SessionEvent::NextQuestion)?;

        if self.question_index as usize >= self.feed.len() {
            let plan = self
                .machine
                .plan(SessionEvent::Finish(FinishReason::Completed))?;
            self.close(FinishReason::Completed, now);
            self.machine.apply(plan)?;
            return Ok(Transition::Finished(FinishReason::Completed));
        }

        let question_id = self.open_question(self.question_index + 1, now);
        self.machine.apply(plan)?;
        Ok(Transition::QuestionOpened {
            question_id,
            first: false,
        })
    }

    /// Force-end the session from any non-terminal phase.
    pub fn finish(&mut self, now: SystemTime) -> Result<Transition, ControlError> {
        let plan = self
            .machine
            .plan(SessionEvent::Finish(FinishReason::HostFinished))?;

        if self.phase() == SessionPhase::Question {
            self.score_current_question();
        }
        self.close(FinishReason::HostFinished, now);

        self.machine.apply(plan)?;
        Ok(Transition::Finished(FinishReason::HostFinished))
    }

    /// Record an answer from `player_id` for `question_id`.
    ///
    /// `client_latency_ms` is the client-reported answer time; it falls back to
    /// the server-measured delay and is clamped to the question time limit.
    pub fn submit(
        &mut self,
        player_id: Uuid,
        question_id: u32,
        selection: &[u32],
        client_latency_ms: Option<u64>,
        now: SystemTime,
    ) -> Result<AnswerReceipt, SubmitError> {
        if !self.roster.contains_key(&player_id) {
            return Err(SubmitError::UnknownPlayer);
        }

        if self.phase() != SessionPhase::Question {
            return Err(SubmitError::OutOfWindow);
        }
        let window = self.window.as_ref().ok_or(SubmitError::OutOfWindow)?;
        if window.question_id != question_id {
            return Err(SubmitError::OutOfWindow);
        }
        if window.ends_at.is_some_and(|ends_at| now > ends_at) {
            return Err(SubmitError::OutOfWindow);
        }

        let question = self
            .feed
            .get(self.question_index)
            .ok_or(SubmitError::OutOfWindow)?;

        let elapsed_ms = now
            .duration_since(window.started_at)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64;
        let mut latency_ms = client_latency_ms.unwrap_or(elapsed_ms);
        if let Some(limit) = question.time_limit {
            latency_ms = latency_ms.min(limit.as_millis() as u64);
        }

        self.ledger
            .record(question, player_id, selection, latency_ms, now)?;

        Ok(AnswerReceipt {
            question_id,
            answered_count: self.ledger.answered_count(question_id),
            total_players: self.roster.len(),
        })
    }

    fn open_question(&mut self, index: u32, now: SystemTime) -> u32 {
        self.question_index = index;
        let Some(question) = self.feed.get(index) else {
            self.window = None;
            return 0;
        };

        let mut option_order: Vec<u32> = question.options.iter().map(|option| option.id).collect();
        if self.settings.shuffle_options {
            option_order.shuffle(&mut rand::rng());
        }

        let question_id = question.id;
        self.window = Some(QuestionWindow {
            question_id,
            started_at: now,
            ends_at: question.time_limit.map(|limit| now + limit),
            option_order,
        });
        question_id
    }

    /// Score the current question and refresh cumulative scores from the ledger.
    fn score_current_question(&mut self) -> u32 {
        let Some(question) = self.feed.get(self.question_index) else {
            return 0;
        };
        self.ledger
            .score_question(question, &self.settings.policy);

        for player in self.roster.values_mut() {
            player.score = self.ledger.total_points(player.id);
        }
        question.id
    }

    fn build_reveal(&self, question_id: u32) -> RevealSnapshot {
        let correct_option_ids = self
            .feed
            .find(question_id)
            .map(|question| question.correct_option_ids().into_iter().collect())
            .unwrap_or_default();

        let standings = self.standings();
        let results = standings
            .iter()
            .map(|standing| {
                let outcome = self.ledger.outcome(question_id, standing.player_id);
                PlayerResult {
                    player_id: standing.player_id,
                    nickname: standing.nickname.clone(),
                    avatar_key: standing.avatar_key.clone(),
                    is_correct: outcome.is_correct,
                    awarded_points: outcome.awarded_points,
                    score: standing.score,
                }
            })
            .collect();

        RevealSnapshot {
            question_id,
            correct_option_ids,
            standings,
            results,
        }
    }

    fn close(&mut self, reason: FinishReason, now: SystemTime) {
        self.window = None;
        self.result = Some(FinalResult {
            reason,
            standings: self.standings(),
            finished_at: now,
        });
    }

    fn update_player(
        &mut self,
        player_id: Uuid,
        nickname: &str,
        avatar_key: Option<&str>,
    ) -> Result<bool, JoinError> {
        let nickname = normalize_nickname(nickname)?;
        self.ensure_nickname_free(&nickname, Some(player_id))?;
        let avatar = avatar_key.map(|key| self.resolve_avatar(Some(key)));

        let Some(player) = self.roster.get_mut(&player_id) else {
            return Ok(false);
        };
        let mut changed = false;
        if player.nickname != nickname {
            player.nickname = nickname;
            changed = true;
        }
        if let Some(avatar) = avatar.filter(|avatar| *avatar != player.avatar_key) {
            player.avatar_key = avatar;
            changed = true;
        }
        Ok(changed)
    }

    fn ensure_nickname_free(&self, nickname: &str, except: Option<Uuid>) -> Result<(), JoinError> {
        let wanted = nickname.to_lowercase();
        let taken = self
            .roster
            .values()
            .filter(|player| Some(player.id) != except)
            .any(|player| player.nickname.to_lowercase() == wanted);
        if taken {
            return Err(JoinError::NicknameTaken(nickname.to_string()));
        }
        Ok(())
    }

    fn resolve_avatar(&self, requested: Option<&str>) -> String {
        requested
            .and_then(|key| self.settings.avatar_keys.iter().find(|known| *known == key))
            .or_else(|| self.settings.avatar_keys.first())
            .cloned()
            .unwrap_or_default()
    }
}

/// Trim and collapse internal whitespace, then enforce the length bounds.
pub fn normalize_nickname(raw: &str) -> Result<String, JoinError> {
    let nickname = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let length = nickname.chars().count();
    if length == 0 || length > MAX_NICKNAME_CHARS {
        return Err(JoinError::InvalidNickname);
    }
    Ok(nickname)
}
