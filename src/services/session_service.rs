//! Session provisioning, lobby joins and cleanup of finished sessions.

use std::{sync::Arc, time::SystemTime};

use axum::extract::ws::Message;
use rand::{Rng, rng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{ArchivedResult, FinishReasonEntity, StandingEntity},
    dto::{
        session::{CreateSessionRequest, CreateSessionResponse, JoinRequest, JoinResponse},
        validation::{JOIN_CODE_ALPHABET, JOIN_CODE_LENGTH, validate_join_code},
    },
    error::ServiceError,
    services::live_events,
    state::{
        SessionHandle, SessionPhase, SharedState,
        feed::{QuestionDraft, QuestionFeed},
        session::LiveSession,
        state_machine::FinishReason,
    },
};

/// Attempts made to draw a join code that is neither live nor archived.
const CODE_ATTEMPTS: usize = 32;

/// Resolve an active session, rejecting malformed codes without a lookup.
pub fn resolve(state: &SharedState, code: &str) -> Result<Arc<SessionHandle>, ServiceError> {
    if validate_join_code(code).is_err() {
        return Err(ServiceError::UnknownSession(code.to_string()));
    }
    state.session(code)
}

/// Check `token` against the host secret of `handle`.
pub async fn authorize_host(handle: &SessionHandle, token: Option<&str>) -> Result<(), ServiceError> {
    let Some(token) = token.filter(|token| !token.is_empty()) else {
        return Err(ServiceError::Unauthorized("missing host token".into()));
    };
    if handle.read().await.is_host_token(token) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized("invalid host token".into()))
    }
}

/// Validate the feed and register a new session in the lobby.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<CreateSessionResponse, ServiceError> {
    let config = state.config();
    let drafts: Vec<QuestionDraft> = request.questions.into_iter().map(Into::into).collect();
    let feed = QuestionFeed::build(drafts, config.default_time_limit())?;
    let total_questions = feed.len();
    let title = request
        .title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty());

    let code = allocate_code(state).await?;
    let host_token = Uuid::new_v4().simple().to_string();
    let session = LiveSession::new(
        code.clone(),
        host_token.clone(),
        title,
        feed,
        request.auto_advance,
        config.session_settings(),
        SystemTime::now(),
    );

    state.insert_session(Arc::new(SessionHandle::new(
        session,
        config.channel_capacity(),
    )))?;
    info!(code = %code, questions = total_questions, "session created");

    Ok(CreateSessionResponse {
        code,
        host_token,
        total_questions,
    })
}

/// Add a player to the lobby, or re-attach an identity presented by token.
pub async fn join_session(
    state: &SharedState,
    code: &str,
    request: JoinRequest,
) -> Result<JoinResponse, ServiceError> {
    let handle = resolve(state, code)?;
    let config = state.config();

    let mut session = handle.write().await;
    let outcome = session.join(
        &request.nickname,
        request.avatar_key.as_deref(),
        request.player_token.as_deref(),
        SystemTime::now(),
    )?;
    if outcome.roster_changed {
        live_events::broadcast_lobby_state(handle.hub(), &session, &config);
    }

    let player = session
        .player(outcome.player_id)
        .ok_or_else(|| ServiceError::UnknownPlayer(outcome.player_id.to_string()))?;
    let redirect = match session.phase() {
        SessionPhase::Lobby => config.lobby_redirect(session.code()),
        _ => config.player_redirect(session.code()),
    };

    info!(
        code = %session.code(),
        player_id = %player.id,
        rejoined = outcome.rejoined,
        "player joined"
    );

    Ok(JoinResponse {
        player_id: player.id,
        player_token: outcome.player_token,
        nickname: player.nickname.clone(),
        avatar_key: player.avatar_key.clone(),
        redirect,
        rejoined: outcome.rejoined,
    })
}

/// Archive the final results of a finished session and drop its live state.
pub async fn delete_session(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    let handle = resolve(state, code)?;

    let archived = {
        let session = handle.read().await;
        if session.phase() != SessionPhase::Finished {
            return Err(ServiceError::InvalidTransition(format!(
                "session can only be deleted once finished (current phase {:?})",
                session.phase()
            )));
        }
        archive_entry(&session)?
    };

    state.archive().save(archived).await?;

    state.remove_session(handle.code());
    handle.close();
    handle.send_to_all(Message::Close(None));
    info!(code = %handle.code(), "session archived and removed");
    Ok(())
}

/// Draw a join code unused by live sessions and the archive.
async fn allocate_code(state: &SharedState) -> Result<String, ServiceError> {
    let archive = state.archive();
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_code();
        if state.has_session(&code) {
            debug!(code = %code, "join code collides with a live session");
            continue;
        }
        if archive.contains(code.clone()).await? {
            debug!(code = %code, "join code collides with an archived session");
            continue;
        }
        return Ok(code);
    }
    warn!(attempts = CODE_ATTEMPTS, "could not allocate a free join code");
    Err(ServiceError::Conflict("no free join code available".into()))
}

fn generate_code() -> String {
    let mut rng = rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

fn archive_entry(session: &LiveSession) -> Result<ArchivedResult, ServiceError> {
    let result = session.final_result().ok_or_else(|| {
        ServiceError::InvalidTransition("finished session has no final result".into())
    })?;

    Ok(ArchivedResult {
        code: session.code().to_string(),
        title: session.title().map(str::to_string),
        reason: match result.reason {
            FinishReason::Completed => FinishReasonEntity::Completed,
            FinishReason::HostFinished => FinishReasonEntity::HostFinished,
        },
        question_count: session.total_questions(),
        standings: result
            .standings
            .iter()
            .enumerate()
            .map(|(position, standing)| StandingEntity {
                rank: position as u32 + 1,
                player_id: standing.player_id,
                nickname: standing.nickname.clone(),
                avatar_key: standing.avatar_key.clone(),
                score: standing.score,
            })
            .collect(),
        created_at: session.created_at(),
        finished_at: result.finished_at,
        archived_at: SystemTime::now(),
    })
}
