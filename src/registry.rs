//! Live connection bookkeeping: the session directory (identity -> connections)
//! and room membership (conversation -> subscribed connections).
//!
//! One `Registry` is built at startup and shared as `Arc<Registry>`. All maps
//! are `DashMap`s and no guard is ever held across an `.await`. Delivery is a
//! non-blocking push onto each connection's unbounded channel, so a dead or
//! slow subscriber never holds up the others.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{
    chat::protocol::ServerEvent,
    db::{ConversationId, Identity, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle to one live session. Clones share the outbound sender and the
/// torn-down flag.
#[derive(Clone, Debug)]
pub struct Connection {
    id: ConnectionId,
    identity: Arc<Identity>,
    tx: mpsc::UnboundedSender<ServerEvent>,
    torn_down: Arc<AtomicBool>,
}

impl Connection {
    pub fn new(identity: Identity) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                identity: Arc::new(identity),
                tx,
                torn_down: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.identity.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queue an event for this connection. `false` if the connection is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Closed once its receiver is gone or the registry has torn it down.
    pub fn is_closed(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// How many directory entries an identity may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// The latest connection replaces the previous one (last writer wins).
    /// Older connections stay open and keep their rooms, but no longer get
    /// directed pushes.
    #[default]
    Single,
    /// Every connection of an identity is kept and gets every directed push.
    Multi,
}

impl FromStr for SessionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(SessionMode::Single),
            "multi" => Ok(SessionMode::Multi),
            _ => Err(()),
        }
    }
}

pub struct Registry {
    mode: SessionMode,
    sessions: DashMap<UserId, Vec<Connection>>,
    rooms: DashMap<ConversationId, HashMap<ConnectionId, Connection>>,
    subscriptions: DashMap<ConnectionId, HashSet<ConversationId>>,
    shutdown: broadcast::Sender<()>,
}

impl Registry {
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            sessions: DashMap::new(),
            rooms: DashMap::new(),
            subscriptions: DashMap::new(),
            shutdown: broadcast::channel(1).0,
        }
    }

    // --- session directory ---

    pub fn register(&self, conn: &Connection) {
        let mut entry = self.sessions.entry(conn.user_id()).or_default();
        match self.mode {
            SessionMode::Single => {
                for displaced in entry.drain(..) {
                    tracing::debug!(
                        user_id = conn.user_id(),
                        connection_id = %displaced.id,
                        "directory entry replaced by a newer connection"
                    );
                }
                entry.push(conn.clone());
            }
            SessionMode::Multi => entry.push(conn.clone()),
        }
    }

    /// The most recently registered connection of `user_id`.
    pub fn lookup(&self, user_id: UserId) -> Option<Connection> {
        self.sessions.get(&user_id).and_then(|conns| conns.last().cloned())
    }

    pub fn connections_of(&self, user_id: UserId) -> Vec<Connection> {
        self.sessions
            .get(&user_id)
            .map(|conns| conns.clone())
            .unwrap_or_default()
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.sessions.get(&user_id).is_some_and(|conns| !conns.is_empty())
    }

    /// Remove `conn_id` from `user_id`'s entry. A no-op when the entry points
    /// at another connection, so a late disconnect can't evict a fresh reconnect.
    pub fn unregister(&self, user_id: UserId, conn_id: ConnectionId) -> bool {
        let (removed, now_empty) = match self.sessions.get_mut(&user_id) {
            Some(mut conns) => {
                let before = conns.len();
                conns.retain(|c| c.id != conn_id);
                (conns.len() != before, conns.is_empty())
            }
            None => (false, false),
        };
        if now_empty {
            self.sessions.remove_if(&user_id, |_, conns| conns.is_empty());
        }
        removed
    }

    /// Push an event to the directory entry of `user_id`. Returns how many
    /// connections accepted it; zero for an offline identity.
    pub fn send_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        let Some(conns) = self.sessions.get(&user_id) else {
            return 0;
        };
        conns.iter().filter(|c| c.send(event.clone())).count()
    }

    pub fn online_count(&self) -> usize {
        self.sessions.len()
    }

    // --- rooms ---

    /// Subscribe `conn` to a conversation's room. `false` if it already was,
    /// or if the connection has closed.
    pub fn join_room(&self, conversation_id: ConversationId, conn: &Connection) -> bool {
        if conn.is_closed() {
            return false;
        }
        let fresh = self.subscriptions.entry(conn.id).or_default().insert(conversation_id);
        if !fresh {
            return false;
        }
        self.rooms
            .entry(conversation_id)
            .or_default()
            .insert(conn.id, conn.clone());

        // a teardown may have run between the check and the inserts
        if conn.is_closed() {
            self.leave_room(conversation_id, conn.id);
            self.subscriptions.remove_if(&conn.id, |_, rooms| rooms.is_empty());
            return false;
        }
        true
    }

    fn leave_room(&self, conversation_id: ConversationId, conn_id: ConnectionId) {
        if let Some(mut rooms) = self.subscriptions.get_mut(&conn_id) {
            rooms.remove(&conversation_id);
        }
        let now_empty = match self.rooms.get_mut(&conversation_id) {
            Some(mut room) => {
                room.remove(&conn_id);
                room.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(&conversation_id, |_, room| room.is_empty());
        }
    }

    pub fn is_subscribed(&self, conn_id: ConnectionId, conversation_id: ConversationId) -> bool {
        self.subscriptions
            .get(&conn_id)
            .is_some_and(|rooms| rooms.contains(&conversation_id))
    }

    pub fn room_size(&self, conversation_id: ConversationId) -> usize {
        self.rooms.get(&conversation_id).map(|room| room.len()).unwrap_or(0)
    }

    /// Fan an event out to every subscriber of a room, optionally skipping
    /// every connection of one identity. Returns how many subscribers accepted it.
    pub fn broadcast(&self, conversation_id: ConversationId, event: &ServerEvent, except: Option<UserId>) -> usize {
        let Some(room) = self.rooms.get(&conversation_id) else {
            return 0;
        };
        room.values()
            .filter(|c| Some(c.user_id()) != except)
            .filter(|c| c.send(event.clone()))
            .count()
    }

    // --- lifecycle ---

    /// Tear down everything a connection holds: its directory entry (if still
    /// current) and all of its room subscriptions.
    /// A torn-down connection refuses any later `join_room`.
    pub fn disconnect(&self, conn: &Connection) {
        conn.torn_down.store(true, Ordering::SeqCst);
        self.unregister(conn.user_id(), conn.id);

        let joined = self
            .subscriptions
            .remove(&conn.id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default();
        for conversation_id in joined {
            self.leave_room(conversation_id, conn.id);
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Ask every live connection to close.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}
