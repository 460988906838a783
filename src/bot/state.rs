//! Per-bot session state machine
//!
//! Pure state: no sockets, no clocks. The transport task feeds it decoded
//! messages and the tick loop reads snapshots out of it.

use std::sync::Arc;

use crate::game::map::{GameMap, MapError};
use crate::game::snapshot::Snapshot;
use crate::game::world::WorldState;
use crate::ws::codec::ProtocolError;
use crate::ws::protocol::{Message, RoomCode, SystemKind};

/// Connection lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Active,
    /// Terminal; reached only through a transport failure
    Inactive { reason: String },
}

/// Room participation, driven by server messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomPhase {
    #[default]
    Idle,
    InRoom,
    Playing,
}

/// Identity bound once by the server's `Connected` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i16,
    pub username: String,
}

/// Session errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("map patch received before any map")]
    MapNotInitialized,

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("identity already bound to player {0}")]
    IdentityAlreadyBound(i16),

    #[error("session is not active")]
    NotActive,

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Something the caller should log after a message was applied
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    IdentityBound(Identity),
    Hosted(RoomCode),
    Joined(RoomCode),
    Left,
    PhaseChanged { from: RoomPhase, to: RoomPhase },
    MapReplaced { width: i32, height: i32 },
    MapPatched { cells: usize },
    Chat { from: i16, message: String },
    System { kind: SystemKind, message: String },
    ServerError(String),
}

/// Cheap copy of the lifecycle fields, published to waiters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub connection: ConnectionState,
    pub phase: RoomPhase,
    pub room: Option<RoomCode>,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        self.connection == ConnectionState::Active
    }

    pub fn is_playing(&self) -> bool {
        self.is_active() && self.phase == RoomPhase::Playing
    }

    pub fn in_room(&self) -> bool {
        matches!(self.phase, RoomPhase::InRoom | RoomPhase::Playing)
    }
}

/// Connection + room state of one bot
#[derive(Debug, Default)]
pub struct SessionState {
    connection: ConnectionState,
    phase: RoomPhase,
    identity: Option<Identity>,
    room: Option<RoomCode>,
    map: Option<Arc<GameMap>>,
    world: Option<Arc<WorldState>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn room(&self) -> Option<RoomCode> {
        self.room
    }

    pub fn is_active(&self) -> bool {
        self.connection == ConnectionState::Active
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            connection: self.connection.clone(),
            phase: self.phase,
            room: self.room,
        }
    }

    /// Socket opened. Ignored unless still connecting.
    pub fn on_open(&mut self) -> bool {
        if self.connection == ConnectionState::Connecting {
            self.connection = ConnectionState::Active;
            true
        } else {
            false
        }
    }

    /// Socket failed. Moves to the terminal state; the first reason wins.
    pub fn on_transport_error(&mut self, reason: impl Into<String>) -> bool {
        if matches!(self.connection, ConnectionState::Inactive { .. }) {
            return false;
        }
        self.connection = ConnectionState::Inactive {
            reason: reason.into(),
        };
        true
    }

    /// Drop map and world state (teardown)
    pub fn clear_world(&mut self) {
        self.map = None;
        self.world = None;
    }

    /// Apply one decoded server message
    pub fn apply(&mut self, message: Message) -> Result<Option<SessionEvent>, SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }

        let event = match message {
            Message::Connected { id, username } => {
                if let Some(existing) = &self.identity {
                    return Err(SessionError::IdentityAlreadyBound(existing.id));
                }
                let identity = Identity { id, username };
                self.identity = Some(identity.clone());
                Some(SessionEvent::IdentityBound(identity))
            }
            Message::Hosted { room } => {
                self.enter_room(room);
                Some(SessionEvent::Hosted(room))
            }
            Message::Joined { room } => {
                self.enter_room(room);
                Some(SessionEvent::Joined(room))
            }
            Message::Left => {
                self.phase = RoomPhase::Idle;
                self.room = None;
                self.world = None;
                Some(SessionEvent::Left)
            }
            Message::State(world) => {
                let from = self.phase;
                let to = match (from, world.is_playing()) {
                    (RoomPhase::InRoom, true) => RoomPhase::Playing,
                    (RoomPhase::Playing, false) => RoomPhase::InRoom,
                    (phase, _) => phase,
                };
                self.phase = to;
                self.world = Some(Arc::new(world));
                (from != to).then_some(SessionEvent::PhaseChanged { from, to })
            }
            Message::Map(map) => {
                let (width, height) = (map.width(), map.height());
                self.map = Some(Arc::new(map));
                Some(SessionEvent::MapReplaced { width, height })
            }
            Message::Shot { cells } => {
                let map = self.map.as_mut().ok_or(SessionError::MapNotInitialized)?;
                // Copy-on-write: snapshots holding the old Arc keep the old map
                Arc::make_mut(map).apply_patch(&cells)?;
                Some(SessionEvent::MapPatched { cells: cells.len() })
            }
            Message::Chatted { from, message } => Some(SessionEvent::Chat { from, message }),
            Message::System { kind, message } => Some(SessionEvent::System { kind, message }),
            Message::Error { message } => Some(SessionEvent::ServerError(message)),
            other => {
                return Err(ProtocolError::NotReceivable(other.kind()).into());
            }
        };

        Ok(event)
    }

    fn enter_room(&mut self, room: RoomCode) {
        self.room = Some(room);
        if self.phase == RoomPhase::Idle {
            self.phase = RoomPhase::InRoom;
        }
    }

    /// Consistent read view; `None` until identity, map and world all exist
    pub fn snapshot(&self) -> Option<Snapshot> {
        Some(Snapshot {
            id: self.identity.as_ref()?.id,
            map: Arc::clone(self.map.as_ref()?),
            world: Arc::clone(self.world.as_ref()?),
        })
    }
}
