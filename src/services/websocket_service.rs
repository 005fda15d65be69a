use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::{
        sse::ServerEvent,
        ws::{
            AnswerAcceptedPayload, GameStartedPayload, InboundMessage, OutboundMessage, Role,
            selection,
        },
    },
    error::ServiceError,
    services::{answer_service, host_service, live_events, session_service},
    state::{
        Channel, Connection, Identity, SessionHandle, SessionPhase, SharedState,
        session::LiveSession,
    },
};

/// Internal error type for socket frame handling.
///
/// Service failures are reported to the client as `error` frames; only a
/// closed writer ends the connection.
#[derive(Debug, Error)]
enum GatewayError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of a lobby or play socket.
pub async fn handle_socket(
    state: SharedState,
    handle: Arc<SessionHandle>,
    channel: Channel,
    socket: WebSocket,
) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let config = state.config();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message =
        match tokio::time::timeout(config.identify_timeout(), receiver.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => text,
            Ok(Some(Ok(Message::Close(_)))) => {
                finalize(writer_task, outbound_tx).await;
                return;
            }
            Ok(Some(Ok(_))) => {
                let _ = outbound_tx.send(Message::Close(None));
                finalize(writer_task, outbound_tx).await;
                return;
            }
            Ok(Some(Err(err))) => {
                warn!(error = %err, "websocket receive error");
                finalize(writer_task, outbound_tx).await;
                return;
            }
            Ok(None) | Err(_) => {
                warn!(code = %handle.code(), channel = channel.as_str(), "websocket identification timed out");
                let _ = outbound_tx.send(Message::Close(None));
                finalize(writer_task, outbound_tx).await;
                return;
            }
        };

    let identity = match identify(&handle, &initial_message).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(
                code = %handle.code(),
                channel = channel.as_str(),
                error = %err,
                "websocket identification rejected"
            );
            let _ = send_message_to_websocket(
                &outbound_tx,
                &OutboundMessage::error(err.code(), err.to_string()),
            );
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let events = match attach(&handle, &config, channel, identity, &outbound_tx).await {
        Ok(events) => events,
        Err(GatewayError::ConnectionClosed) => {
            detach(&handle, &config, identity).await;
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id = Uuid::new_v4();
    handle.connections().insert(
        connection_id,
        Connection {
            identity,
            channel,
            tx: outbound_tx.clone(),
        },
    );
    info!(
        code = %handle.code(),
        channel = channel.as_str(),
        identity = ?identity,
        "socket connected"
    );

    let forwarder = tokio::spawn(forward_events(
        handle.clone(),
        config.clone(),
        channel,
        identity,
        events,
        outbound_tx.clone(),
    ));

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(code = %handle.code(), payload = %text, "received socket frame");
                let result =
                    handle_frame(&state, &handle, channel, identity, &outbound_tx, &text).await;
                if let Err(GatewayError::ConnectionClosed) = result {
                    info!(code = %handle.code(), "connection closed while replying, terminating");
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(code = %handle.code(), error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder.abort();
    let _ = forwarder.await;
    handle.connections().remove(&connection_id);
    detach(&handle, &config, identity).await;
    info!(
        code = %handle.code(),
        channel = channel.as_str(),
        identity = ?identity,
        "socket disconnected"
    );

    finalize(writer_task, outbound_tx).await;
}

/// Authenticate the first frame of a connection.
async fn identify(handle: &SessionHandle, raw: &str) -> Result<Identity, ServiceError> {
    let inbound = InboundMessage::from_json_str(raw)
        .map_err(|err| ServiceError::InvalidInput(format!("malformed identify frame: {err}")))?;

    let InboundMessage::Identify {
        role,
        token,
        player_id,
    } = inbound
    else {
        return Err(ServiceError::InvalidInput(
            "first message must be identify".into(),
        ));
    };

    match role {
        Role::Host => {
            session_service::authorize_host(handle, Some(&token)).await?;
            Ok(Identity::Host)
        }
        Role::Player => {
            let session = handle.read().await;
            let player = session
                .player_by_token(&token)
                .ok_or_else(|| ServiceError::Unauthorized("unknown player token".into()))?;
            if player_id.is_some_and(|claimed| claimed != player.id) {
                return Err(ServiceError::Unauthorized(
                    "player id does not match token".into(),
                ));
            }
            Ok(Identity::Player(player.id))
        }
    }
}

/// Subscribe to `channel`, mark the player connected and send the initial frame.
///
/// Runs under the session write guard so nothing is emitted between the
/// snapshot and the subscription.
async fn attach(
    handle: &SessionHandle,
    config: &AppConfig,
    channel: Channel,
    identity: Identity,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<broadcast::Receiver<ServerEvent>, GatewayError> {
    let mut session = handle.write().await;
    let events = handle.hub().channel(channel).subscribe();

    let flipped = identity
        .player_id()
        .is_some_and(|player_id| session.attach_socket(player_id));
    if flipped {
        live_events::broadcast_lobby_state(handle.hub(), &session, config);
    }

    // The lobby broadcast above already reaches this subscriber.
    if flipped && channel == Channel::Lobby && session.phase() == SessionPhase::Lobby {
        return Ok(events);
    }
    send_message_to_websocket(tx, &snapshot(&session, config, channel))?;
    Ok(events)
}

/// Mark a player socket as gone, broadcasting the roster when the status flips.
async fn detach(handle: &SessionHandle, config: &AppConfig, identity: Identity) {
    let Some(player_id) = identity.player_id() else {
        return;
    };
    let mut session = handle.write().await;
    if session.detach_socket(player_id) {
        live_events::broadcast_lobby_state(handle.hub(), &session, config);
    }
}

/// Frame that brings a fresh or lagging subscriber of `channel` up to date.
fn snapshot(session: &LiveSession, config: &AppConfig, channel: Channel) -> OutboundMessage {
    match (channel, session.phase()) {
        (Channel::Lobby, SessionPhase::Lobby) => live_events::lobby_state(session, config),
        (Channel::Lobby, _) => OutboundMessage::GameStarted(GameStartedPayload {
            redirect: config.player_redirect(session.code()),
        }),
        (Channel::Play, _) => OutboundMessage::Sync(live_events::session_state(
            session,
            config,
            std::time::SystemTime::now(),
        )),
    }
}

/// Relay channel events to one socket, appending the personal result after reveals.
async fn forward_events(
    handle: Arc<SessionHandle>,
    config: Arc<AppConfig>,
    channel: Channel,
    identity: Identity,
    mut events: broadcast::Receiver<ServerEvent>,
    tx: mpsc::UnboundedSender<Message>,
) {
    let closed = handle.closed();
    tokio::pin!(closed);

    loop {
        let received = tokio::select! {
            _ = &mut closed => break,
            received = events.recv() => received,
        };
        match received {
            Ok(event) => {
                if tx.send(Message::Text(event.data.into())).is_err() {
                    break;
                }
                let (Some(question_id), Some(player_id)) = (event.question_id, identity.player_id())
                else {
                    continue;
                };
                let personal = live_events::my_result(&*handle.read().await, question_id, player_id);
                if let Some(message) = personal {
                    if send_message_to_websocket(&tx, &message).is_err() {
                        break;
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    code = %handle.code(),
                    channel = channel.as_str(),
                    skipped,
                    "socket lagged behind; sending snapshot"
                );
                let message = snapshot(&*handle.read().await, &config, channel);
                if send_message_to_websocket(&tx, &message).is_err() {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Dispatch one inbound frame after identification.
async fn handle_frame(
    state: &SharedState,
    handle: &SessionHandle,
    channel: Channel,
    identity: Identity,
    tx: &mpsc::UnboundedSender<Message>,
    text: &str,
) -> Result<(), GatewayError> {
    let inbound = match InboundMessage::from_json_str(text) {
        Ok(inbound) => inbound,
        Err(err) => {
            warn!(code = %handle.code(), error = %err, "failed to parse socket frame");
            return send_message_to_websocket(
                tx,
                &OutboundMessage::error("invalid_message", err.to_string()),
            );
        }
    };

    match (inbound, identity) {
        (
            InboundMessage::Answer {
                question_id,
                option_id,
                option_ids,
                answer_ms,
            },
            Identity::Player(player_id),
        ) if channel == Channel::Play => {
            let selected = selection(option_id, option_ids);
            let reply = match answer_service::submit_answer(
                handle,
                player_id,
                question_id,
                &selected,
                answer_ms,
            )
            .await
            {
                Ok(receipt) => OutboundMessage::AnswerAccepted(AnswerAcceptedPayload {
                    question_id: receipt.question_id,
                    answered_count: receipt.answered_count,
                    total_players: receipt.total_players,
                }),
                Err(err) => OutboundMessage::error(err.code(), err.to_string()),
            };
            send_message_to_websocket(tx, &reply)
        }
        (
            InboundMessage::Command {
                command,
                question_count,
            },
            Identity::Host,
        ) if channel == Channel::Play => {
            let response =
                match host_service::run_command(state, handle, command, question_count).await {
                    Ok(response) => response,
                    Err(err) => host_service::rejection(&err),
                };
            send_message_to_websocket(tx, &OutboundMessage::CommandResult(response))
        }
        (InboundMessage::Identify { .. }, _) => {
            warn!(code = %handle.code(), "ignoring duplicate identification message");
            Ok(())
        }
        (InboundMessage::Answer { .. } | InboundMessage::Command { .. }, _) => {
            send_message_to_websocket(
                tx,
                &OutboundMessage::error(
                    "unauthorized",
                    format!("message not allowed for this connection on the {} channel", channel.as_str()),
                ),
            )
        }
        (InboundMessage::Unknown, _) => send_message_to_websocket(
            tx,
            &OutboundMessage::error("unsupported", "unsupported message type"),
        ),
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialisation failures are logged and swallowed; only a closed writer is
/// reported back.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), GatewayError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| GatewayError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
