use std::{convert::Infallible, sync::Arc, time::Duration, time::SystemTime};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{sse::ServerEvent, ws::OutboundMessage},
    error::ServiceError,
    services::{live_events, session_service},
    state::{Channel, SessionHandle, SharedState},
};

/// Receiver for one channel of a session plus the snapshot sent first.
pub struct Subscription {
    receiver: broadcast::Receiver<ServerEvent>,
    initial: Option<ServerEvent>,
    handle: Arc<SessionHandle>,
    channel: Channel,
}

/// Subscribe a spectator to one channel of a session.
///
/// The first event is a snapshot of the channel so late subscribers can render
/// immediately: the roster on the lobby channel, a `sync` frame on the play channel.
pub async fn subscribe(
    state: &SharedState,
    code: &str,
    channel: Channel,
) -> Result<Subscription, ServiceError> {
    let handle = session_service::resolve(state, code)?;
    let config = state.config();

    let (receiver, initial) = {
        let session = handle.read().await;
        let receiver = handle.hub().channel(channel).subscribe();
        let initial = match channel {
            Channel::Lobby => live_events::lobby_state(&session, &config),
            Channel::Play => OutboundMessage::Sync(live_events::session_state(
                &session,
                &config,
                SystemTime::now(),
            )),
        };
        (receiver, ServerEvent::from_message(&initial).ok())
    };

    Ok(Subscription {
        receiver,
        initial,
        handle,
        channel,
    })
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(subscription: Subscription) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        initial,
        handle,
        channel,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        let closed = handle.closed();
        tokio::pin!(closed);

        if let Some(payload) = initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = &mut closed => {
                    info!(code = %handle.code(), channel = channel.as_str(), "session removed, ending SSE stream");
                    break;
                }
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(code = %handle.code(), channel = channel.as_str(), skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(code = %handle.code(), channel = channel.as_str(), "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    Event::default().event(payload.event).data(payload.data)
}
