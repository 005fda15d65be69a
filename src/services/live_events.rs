//! Builders and broadcasters for the lobby and play channel frames.
//!
//! Every broadcaster is called by the controller while it still holds the
//! session write guard. `broadcast::Sender::send` never waits, so holding the
//! guard only pins the emission order; socket writes happen in the per-connection
//! forwarders.

use std::time::SystemTime;

use tracing::warn;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::{
        common::{LobbyPlayer, QuestionView, top},
        format_system_time,
        phase::VisiblePhase,
        public::SessionStateResponse,
        sse::ServerEvent,
        ws::{
            AnswerProgressPayload, FinishedPayload, GameStartedPayload, LobbyStatePayload,
            MyResultPayload, OutboundMessage, QuestionPublishedPayload, RevealPayload,
        },
    },
    state::{
        ChannelHub, SessionHub, SessionPhase,
        session::{AnswerReceipt, LiveSession, Transition},
    },
};

/// Roster snapshot, newest joiners first, capped at the configured limit.
pub fn lobby_state(session: &LiveSession, config: &AppConfig) -> OutboundMessage {
    OutboundMessage::LobbyState(LobbyStatePayload {
        count: session.players_count(),
        players: session
            .roster()
            .rev()
            .take(config.lobby_roster_limit())
            .map(LobbyPlayer::from)
            .collect(),
    })
}

/// Current question view, if a question is open or being revealed.
pub fn question_view(session: &LiveSession) -> Option<QuestionView> {
    let question = session.current_question()?;
    let window = session.window()?;
    Some(QuestionView::project(
        question,
        window,
        session.total_questions(),
    ))
}

/// `question_published` frame for the open question.
pub fn question_published(session: &LiveSession) -> Option<OutboundMessage> {
    question_view(session)
        .map(|question| OutboundMessage::QuestionPublished(QuestionPublishedPayload { question }))
}

/// `reveal` frame built from the pinned snapshot of `question_id`.
pub fn reveal(session: &LiveSession, config: &AppConfig, question_id: u32) -> Option<OutboundMessage> {
    let snapshot = session.reveal(question_id)?;
    Some(OutboundMessage::Reveal(RevealPayload {
        question_id,
        correct_option_ids: snapshot.correct_option_ids.clone(),
        top: top(&snapshot.standings, config.reveal_top()),
        results: top(&snapshot.results, config.reveal_results()),
    }))
}

/// `finished` frame with the final leaderboard.
pub fn finished(session: &LiveSession, config: &AppConfig) -> Option<OutboundMessage> {
    let result = session.final_result()?;
    Some(OutboundMessage::Finished(FinishedPayload {
        reason: result.reason.into(),
        top: top(&result.standings, config.finished_top()),
    }))
}

/// Personal outcome of `player_id` for a revealed question.
pub fn my_result(session: &LiveSession, question_id: u32, player_id: Uuid) -> Option<OutboundMessage> {
    let result = session
        .reveal(question_id)?
        .results
        .iter()
        .find(|result| result.player_id == player_id)?;
    Some(OutboundMessage::MyResult(MyResultPayload {
        question_id,
        is_correct: result.is_correct,
        awarded_points: result.awarded_points,
        score: result.score,
    }))
}

/// Recovery snapshot of `session` at `now`.
pub fn session_state(session: &LiveSession, config: &AppConfig, now: SystemTime) -> SessionStateResponse {
    let phase = session.phase();
    let correct_option_ids = match phase {
        SessionPhase::Reveal => session
            .last_reveal()
            .map(|reveal| reveal.correct_option_ids.clone()),
        _ => None,
    };
    let result = session.final_result();

    SessionStateResponse {
        code: session.code().to_string(),
        state: VisiblePhase::from(phase),
        version: session.version(),
        question_index: session.question_index(),
        total_questions: session.total_questions(),
        question: question_view(session),
        correct_option_ids,
        server_time: format_system_time(now),
        remaining_ms: session
            .remaining(now)
            .map(|remaining| remaining.as_millis() as u64),
        players_count: session.players_count(),
        auto_advance: session.auto_advance(),
        finish_reason: result.map(|result| result.reason.into()),
        top: result.map(|result| top(&result.standings, config.finished_top())),
    }
}

/// Broadcast the roster on the lobby channel.
pub fn broadcast_lobby_state(hub: &SessionHub, session: &LiveSession, config: &AppConfig) {
    send_event(hub.lobby(), &lobby_state(session, config));
}

/// Broadcast an accepted answer count on the play channel.
pub fn broadcast_answer_progress(hub: &SessionHub, receipt: &AnswerReceipt) {
    let payload = OutboundMessage::AnswerProgress(AnswerProgressPayload {
        question_id: receipt.question_id,
        answered_count: receipt.answered_count,
        total_players: receipt.total_players,
    });
    send_event(hub.play(), &payload);
}

/// Emit the frames that follow a committed transition.
pub fn broadcast_transition(
    hub: &SessionHub,
    session: &LiveSession,
    config: &AppConfig,
    transition: Transition,
) {
    let message = match transition {
        Transition::QuestionOpened { first, .. } => {
            if first {
                let started = OutboundMessage::GameStarted(GameStartedPayload {
                    redirect: config.player_redirect(session.code()),
                });
                send_event(hub.lobby(), &started);
            }
            question_published(session)
        }
        Transition::Revealed { question_id } => reveal(session, config, question_id),
        Transition::Finished(_) => finished(session, config),
    };

    match message {
        Some(message) => send_event(hub.play(), &message),
        None => warn!(
            code = %session.code(),
            transition = ?transition,
            "no frame could be built for transition"
        ),
    }
}

/// Serialise and push `message` on `hub`, logging serialisation failures.
pub fn send_event(hub: &ChannelHub, message: &OutboundMessage) {
    match ServerEvent::from_message(message) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(error = %err, kind = message.kind(), "failed to serialise event"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::state::{
        feed::{TimeLimitDraft, tests::single},
        session::tests::{epoch, session_with},
    };

    fn timed_session() -> LiveSession {
        let mut first = single("first", 1, 3);
        first.time_limit_seconds = TimeLimitDraft::Seconds(10);
        session_with(vec![first, single("second", 0, 2)])
    }

    async fn next_json(receiver: &mut tokio::sync::broadcast::Receiver<ServerEvent>) -> Value {
        let event = receiver.recv().await.unwrap();
        serde_json::from_str(&event.data).unwrap()
    }

    #[tokio::test]
    async fn start_emits_game_started_then_question_published() {
        let config = AppConfig::default();
        let hub = SessionHub::new(8);
        let mut lobby = hub.lobby().subscribe();
        let mut play = hub.play().subscribe();
        let mut session = timed_session();
        session.join("alice", None, None, epoch(0)).unwrap();

        let transition = session.start(None, epoch(1_000)).unwrap();
        broadcast_transition(&hub, &session, &config, transition);

        let started = next_json(&mut lobby).await;
        assert_eq!(started["type"], "game_started");
        assert_eq!(started["redirect"], "/live/ABCD23/play");

        let published = next_json(&mut play).await;
        assert_eq!(published["type"], "question_published");
        assert_eq!(published["question"]["index"], 1);
        assert_eq!(published["question"]["total"], 2);
        assert!(published["question"]["ends_at"].is_string());
        assert!(!published.to_string().contains("is_correct"));
    }

    #[tokio::test]
    async fn reveal_and_finish_frames() {
        let config = AppConfig::default();
        let hub = SessionHub::new(8);
        let mut play = hub.play().subscribe();
        let mut session = timed_session();
        let alice = session.join("alice", None, None, epoch(0)).unwrap().player_id;
        session.start(None, epoch(0)).unwrap();
        session.submit(alice, 1, &[2], Some(4_000), epoch(4_000)).unwrap();

        let transition = session.end_question(epoch(5_000)).unwrap();
        broadcast_transition(&hub, &session, &config, transition);
        let revealed = next_json(&mut play).await;
        assert_eq!(revealed["type"], "reveal");
        assert_eq!(revealed["question_id"], 1);
        assert_eq!(revealed["correct_option_ids"], serde_json::json!([2]));
        assert_eq!(revealed["top"][0]["score"], 800);
        assert_eq!(revealed["results"][0]["awarded_points"], 800);

        let OutboundMessage::MyResult(mine) = my_result(&session, 1, alice).unwrap() else {
            panic!("expected my_result");
        };
        assert!(mine.is_correct);
        assert_eq!(mine.score, 800);

        let transition = session.finish(epoch(6_000)).unwrap();
        broadcast_transition(&hub, &session, &config, transition);
        let done = next_json(&mut play).await;
        assert_eq!(done["type"], "finished");
        assert_eq!(done["reason"], "host_finished");
        assert_eq!(done["top"][0]["nickname"], "alice");
    }

    #[test]
    fn recovery_matches_published_question() {
        let config = AppConfig::default();
        let mut session = timed_session();
        session.start(None, epoch(0)).unwrap();

        let Some(OutboundMessage::QuestionPublished(published)) = question_published(&session)
        else {
            panic!("expected question_published");
        };
        let snapshot = session_state(&session, &config, epoch(2_500));

        assert_eq!(snapshot.state, VisiblePhase::Question);
        assert_eq!(snapshot.question.as_ref(), Some(&published.question));
        assert_eq!(snapshot.remaining_ms, Some(7_500));
        assert!(snapshot.correct_option_ids.is_none());

        session.end_question(epoch(3_000)).unwrap();
        let revealed = session_state(&session, &config, epoch(3_000));
        assert_eq!(revealed.state, VisiblePhase::Reveal);
        assert_eq!(revealed.correct_option_ids, Some(vec![2]));
        assert_eq!(revealed.question.unwrap().ends_at, published.question.ends_at);
        assert!(revealed.remaining_ms.is_none());
    }

    #[test]
    fn lobby_state_lists_newest_first_with_full_count() {
        let config = AppConfig::default();
        let mut session = timed_session();
        session.join("first", None, None, epoch(0)).unwrap();
        session.join("second", None, None, epoch(1)).unwrap();

        let OutboundMessage::LobbyState(state) = lobby_state(&session, &config) else {
            panic!("expected lobby_state");
        };
        assert_eq!(state.count, 2);
        assert_eq!(state.players[0].nickname, "second");
        assert!(!state.players[0].connected);
    }
}
