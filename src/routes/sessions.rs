use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        public::SessionStateResponse,
        session::{CreateSessionRequest, CreateSessionResponse, JoinRequest, JoinResponse},
    },
    error::AppError,
    services::{public_service, session_service},
    state::SharedState,
};

/// Session provisioning, lobby joins and the recovery snapshot.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/live/sessions", post(create_session))
        .route("/live/{code}/join", post(join_session))
        .route("/live/{code}/state", get(session_state))
}

/// Provision a session from a validated question feed.
#[utoipa::path(
    post,
    path = "/live/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created in the lobby", body = CreateSessionResponse),
        (status = 400, description = "Invalid question feed")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    payload.validate()?;
    let created = session_service::create_session(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Join the lobby, or re-attach an identity with its player token.
#[utoipa::path(
    post,
    path = "/live/{code}/join",
    tag = "sessions",
    params(("code" = String, Path, description = "Join code")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Player identity", body = JoinResponse),
        (status = 400, description = "Invalid nickname"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Nickname taken or game already started")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        session_service::join_session(&state, &code, payload).await?,
    ))
}

/// Snapshot of the session for clients that (re)connect mid-game.
#[utoipa::path(
    get,
    path = "/live/{code}/state",
    tag = "sessions",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Current session state", body = SessionStateResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn session_state(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionStateResponse>, AppError> {
    Ok(Json(public_service::session_state(&state, &code).await?))
}
