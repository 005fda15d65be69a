//! Broadcast hub: one lobby and one play channel per session.

use axum::extract::ws::Message;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Logical channel a subscriber listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Roster updates and the one-shot `game_started`.
    Lobby,
    /// Question lifecycle events.
    Play,
}

impl Channel {
    /// Name used in paths and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Lobby => "lobby",
            Channel::Play => "play",
        }
    }
}

/// Identity a socket authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Authenticated with the host token.
    Host,
    /// Authenticated with a player token.
    Player(Uuid),
}

impl Identity {
    /// Player behind this identity, if any.
    pub fn player_id(self) -> Option<Uuid> {
        match self {
            Identity::Player(id) => Some(id),
            Identity::Host => None,
        }
    }
}

#[derive(Clone)]
/// Handle used to push frames to one connected socket.
pub struct Connection {
    /// Who the socket authenticated as.
    pub identity: Identity,
    /// Channel the socket is attached to.
    pub channel: Channel,
    /// Writer queue of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Simple broadcast hub wrapper around a Tokio broadcast channel.
pub struct ChannelHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl ChannelHub {
    /// Construct a new hub backed by a broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring the no-subscriber case.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Lobby and play channels of one session.
pub struct SessionHub {
    lobby: ChannelHub,
    play: ChannelHub,
}

impl SessionHub {
    /// Create both channels with the same capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            lobby: ChannelHub::new(capacity),
            play: ChannelHub::new(capacity),
        }
    }

    /// Roster channel.
    pub fn lobby(&self) -> &ChannelHub {
        &self.lobby
    }

    /// Question lifecycle channel.
    pub fn play(&self) -> &ChannelHub {
        &self.play
    }

    /// Hub backing `channel`.
    pub fn channel(&self, channel: Channel) -> &ChannelHub {
        match channel {
            Channel::Lobby => &self.lobby,
            Channel::Play => &self.play,
        }
    }
}
