use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service,
    state::{Channel, SharedState},
};

#[utoipa::path(
    get,
    path = "/sse/live/{code}/lobby",
    tag = "sse",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Lobby event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream lobby events to spectators such as a projector screen.
pub async fn lobby_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe(&state, &code, Channel::Lobby).await?;
    info!(code = %code, "New lobby SSE connection");
    Ok(sse_service::to_sse_stream(subscription))
}

#[utoipa::path(
    get,
    path = "/sse/live/{code}/play",
    tag = "sse",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Play event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream question lifecycle events to spectators.
pub async fn play_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe(&state, &code, Channel::Play).await?;
    info!(code = %code, "New play SSE connection");
    Ok(sse_service::to_sse_stream(subscription))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/live/{code}/lobby", get(lobby_stream))
        .route("/sse/live/{code}/play", get(play_stream))
}
