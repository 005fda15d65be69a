use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    error::AppError,
    services::{session_service, websocket_service},
    state::{Channel, SharedState},
};

#[utoipa::path(
    get,
    path = "/ws/live/{code}/lobby",
    tag = "sockets",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 404, description = "Unknown session")
    )
)]
/// Upgrade into a lobby socket: roster updates and the start signal.
pub async fn lobby_socket(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    upgrade(state, &code, Channel::Lobby, ws)
}

#[utoipa::path(
    get,
    path = "/ws/live/{code}/play",
    tag = "sockets",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 404, description = "Unknown session")
    )
)]
/// Upgrade into a play socket: question lifecycle, answers and host commands.
pub async fn play_socket(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    upgrade(state, &code, Channel::Play, ws)
}

fn upgrade(
    state: SharedState,
    code: &str,
    channel: Channel,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let handle = session_service::resolve(&state, code)?;
    Ok(ws
        .on_upgrade(move |socket| websocket_service::handle_socket(state, handle, channel, socket))
        .into_response())
}

/// Configure the WebSocket endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/ws/live/{code}/lobby", get(lobby_socket))
        .route("/ws/live/{code}/play", get(play_socket))
}
