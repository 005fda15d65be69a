use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, post},
};
use validator::Validate;

use crate::{
    dto::host::{CommandResponse, HostCommand, StartRequest},
    error::AppError,
    services::{host_service, session_service},
    state::SharedState,
};

const HOST_TOKEN_HEADER: &str = "x-host-token";

/// Host-only endpoints driving a session through its phases.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/live/{code}/start", post(start))
        .route("/live/{code}/end_question", post(end_question))
        .route("/live/{code}/next_question", post(next_question))
        .route("/live/{code}/finish", post(finish))
        .route("/live/{code}", delete(delete_session))
        .route_layer(middleware::from_fn_with_state(state, require_host_token))
}

/// Freeze the roster and open the first question.
#[utoipa::path(
    post,
    path = "/live/{code}/start",
    tag = "host",
    params(
        ("code" = String, Path, description = "Join code"),
        ("X-Host-Token" = String, Header, description = "Host token returned at creation")
    ),
    request_body(content = StartRequest, description = "Optional; an empty body plays every question"),
    responses(
        (status = 200, description = "Game started", body = CommandResponse),
        (status = 409, description = "Session is not in the lobby", body = CommandResponse)
    )
)]
pub async fn start(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    body: Bytes,
) -> Result<Json<CommandResponse>, AppError> {
    let request = if body.is_empty() {
        StartRequest::default()
    } else {
        serde_json::from_slice::<StartRequest>(&body)
            .map_err(|err| AppError::BadRequest(format!("invalid start payload: {err}")))?
    };
    request.validate()?;
    run(&state, &code, HostCommand::Start, request.question_count).await
}

/// Close the open question and reveal its answer.
#[utoipa::path(
    post,
    path = "/live/{code}/end_question",
    tag = "host",
    params(
        ("code" = String, Path, description = "Join code"),
        ("X-Host-Token" = String, Header, description = "Host token returned at creation")
    ),
    responses(
        (status = 200, description = "Question revealed", body = CommandResponse),
        (status = 409, description = "No question is open", body = CommandResponse)
    )
)]
pub async fn end_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<CommandResponse>, AppError> {
    run(&state, &code, HostCommand::EndQuestion, None).await
}

/// Open the next question, finishing the session after the last one.
#[utoipa::path(
    post,
    path = "/live/{code}/next_question",
    tag = "host",
    params(
        ("code" = String, Path, description = "Join code"),
        ("X-Host-Token" = String, Header, description = "Host token returned at creation")
    ),
    responses(
        (status = 200, description = "Next question opened or session completed", body = CommandResponse),
        (status = 409, description = "Current question not revealed yet", body = CommandResponse)
    )
)]
pub async fn next_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<CommandResponse>, AppError> {
    run(&state, &code, HostCommand::NextQuestion, None).await
}

/// End the session early with the current standings.
#[utoipa::path(
    post,
    path = "/live/{code}/finish",
    tag = "host",
    params(
        ("code" = String, Path, description = "Join code"),
        ("X-Host-Token" = String, Header, description = "Host token returned at creation")
    ),
    responses(
        (status = 200, description = "Session finished", body = CommandResponse),
        (status = 409, description = "Session already finished", body = CommandResponse)
    )
)]
pub async fn finish(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<CommandResponse>, AppError> {
    run(&state, &code, HostCommand::Finish, None).await
}

/// Archive the final results of a finished session and release its code slot.
#[utoipa::path(
    delete,
    path = "/live/{code}",
    tag = "host",
    params(
        ("code" = String, Path, description = "Join code"),
        ("X-Host-Token" = String, Header, description = "Host token returned at creation")
    ),
    responses(
        (status = 204, description = "Session archived and removed"),
        (status = 409, description = "Session not finished yet")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    session_service::delete_session(&state, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run(
    state: &SharedState,
    code: &str,
    command: HostCommand,
    question_count: Option<usize>,
) -> Result<Json<CommandResponse>, AppError> {
    let handle = session_service::resolve(state, code)?;
    let response = host_service::run_command(state, &handle, command, question_count).await?;
    Ok(Json(response))
}

async fn require_host_token(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(HOST_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing host token header `X-Host-Token`".into())
        })?;

    let handle = session_service::resolve(&state, &code)?;
    session_service::authorize_host(&handle, Some(&provided)).await?;
    Ok(next.run(req).await)
}
