pub mod feed;
pub mod hub;
pub mod ledger;
pub mod scoring;
pub mod session;
/// Phase transitions and their version counter.
pub mod state_machine;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::archive::{InMemoryArchive, ResultArchive},
    error::ServiceError,
};

pub use self::hub::{Channel, ChannelHub, Connection, Identity, SessionHub};
pub use self::session::LiveSession;
pub use self::state_machine::{ApplyError, InvalidTransition, SessionPhase};

/// Application state shared across handlers.
pub type SharedState = Arc<AppState>;

/// Live session plus the channels and sockets attached to it.
///
/// The `RwLock` is the single-writer gate for the session: every mutation
/// holds the write guard, recovery reads take the read guard.
pub struct SessionHandle {
    code: String,
    session: RwLock<LiveSession>,
    hub: SessionHub,
    connections: DashMap<Uuid, Connection>,
    closed: watch::Sender<bool>,
}

impl SessionHandle {
    /// Wrap a freshly provisioned session.
    pub fn new(session: LiveSession, channel_capacity: usize) -> Self {
        Self {
            code: session.code().to_string(),
            session: RwLock::new(session),
            hub: SessionHub::new(channel_capacity),
            connections: DashMap::new(),
            closed: watch::Sender::new(false),
        }
    }

    /// Join code addressing this session.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Shared access for projections.
    pub async fn read(&self) -> RwLockReadGuard<'_, LiveSession> {
        self.session.read().await
    }

    /// Exclusive access for transitions.
    pub async fn write(&self) -> RwLockWriteGuard<'_, LiveSession> {
        self.session.write().await
    }

    /// Lobby and play channels.
    pub fn hub(&self) -> &SessionHub {
        &self.hub
    }

    /// Registry of sockets attached to this session keyed by connection id.
    pub fn connections(&self) -> &DashMap<Uuid, Connection> {
        &self.connections
    }

    /// Mark the session as removed so every stream attached to it ends.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Resolves once the session is closed.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut signal = self.closed.subscribe();
        async move {
            while !*signal.borrow_and_update() {
                if signal.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Push `message` to every socket attached to this session.
    pub fn send_to_all(&self, message: Message) {
        for connection in self.connections.iter() {
            let _ = connection.tx.send(message.clone());
        }
    }
}

/// Central application state: the session registry, the result archive and configuration.
pub struct AppState {
    sessions: DashMap<String, Arc<SessionHandle>>,
    archive: Arc<dyn ResultArchive>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] with an in-memory archive.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_archive(config, Arc::new(InMemoryArchive::new()))
    }

    /// Construct the state around a specific archive implementation.
    pub fn with_archive(config: AppConfig, archive: Arc<dyn ResultArchive>) -> SharedState {
        Arc::new(Self {
            sessions: DashMap::new(),
            archive,
            config: Arc::new(config),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Archive receiving the final results of cleaned-up sessions.
    pub fn archive(&self) -> Arc<dyn ResultArchive> {
        self.archive.clone()
    }

    /// Number of active sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether `code` is currently used by an active session.
    pub fn has_session(&self, code: &str) -> bool {
        self.sessions.contains_key(code)
    }

    /// Look up an active session by join code.
    pub fn session(&self, code: &str) -> Result<Arc<SessionHandle>, ServiceError> {
        self.sessions
            .get(&normalize_code(code))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::UnknownSession(code.to_string()))
    }

    /// Register a session, failing if its code is already in use.
    pub fn insert_session(&self, handle: Arc<SessionHandle>) -> Result<(), ServiceError> {
        match self.sessions.entry(handle.code().to_string()) {
            Entry::Occupied(_) => Err(ServiceError::Conflict(format!(
                "join code `{}` is already in use",
                handle.code()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Drop a session from the registry.
    pub fn remove_session(&self, code: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.remove(code).map(|(_, handle)| handle)
    }
}

/// Join codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
