//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::fmt;

use crate::game::map::{CellUpdate, GameMap};
use crate::game::world::WorldState;

/// Number of message kinds; every valid tag is below this
pub const KIND_COUNT: u8 = 24;

/// Room codes are always this many bytes on the wire
pub const ROOM_CODE_LEN: usize = 4;

/// Longest chat body the one-byte length prefix can carry
pub const MAX_CHAT_LEN: usize = u8::MAX as usize;

/// Leading byte of every frame. The order is pinned to the server's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Connected = 0,
    Host,
    Hosted,
    Join,
    Joined,
    Leave,
    Left,
    Start,
    Started,
    Team,
    Teamed,
    Weapon,
    Move,
    Moved,
    Shoot,
    Shot,
    Chat,
    Chatted,
    Map,
    State,
    Mouse,
    Sync,
    System,
    Error,
}

/// Which side of the connection may send a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindDirection {
    /// Server to client
    Inbound,
    /// Client to server
    Outbound,
    /// Allocated by the server but never exchanged with this client
    Reserved,
}

impl MessageKind {
    const ALL: [MessageKind; KIND_COUNT as usize] = [
        Self::Connected,
        Self::Host,
        Self::Hosted,
        Self::Join,
        Self::Joined,
        Self::Leave,
        Self::Left,
        Self::Start,
        Self::Started,
        Self::Team,
        Self::Teamed,
        Self::Weapon,
        Self::Move,
        Self::Moved,
        Self::Shoot,
        Self::Shot,
        Self::Chat,
        Self::Chatted,
        Self::Map,
        Self::State,
        Self::Mouse,
        Self::Sync,
        Self::System,
        Self::Error,
    ];

    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn all() -> impl Iterator<Item = MessageKind> {
        Self::ALL.into_iter()
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn direction(self) -> KindDirection {
        match self {
            Self::Connected
            | Self::Hosted
            | Self::Joined
            | Self::Left
            | Self::Shot
            | Self::Chatted
            | Self::Map
            | Self::State
            | Self::System
            | Self::Error => KindDirection::Inbound,
            Self::Host
            | Self::Join
            | Self::Leave
            | Self::Start
            | Self::Team
            | Self::Weapon
            | Self::Move
            | Self::Shoot
            | Self::Chat
            | Self::Mouse => KindDirection::Outbound,
            Self::Started | Self::Teamed | Self::Moved | Self::Sync => KindDirection::Reserved,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Four-byte room code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomCode([u8; ROOM_CODE_LEN]);

impl RoomCode {
    pub fn from_bytes(bytes: [u8; ROOM_CODE_LEN]) -> Self {
        Self(bytes)
    }

    /// Lenient conversion: longer input is truncated, shorter input is
    /// padded with spaces.
    pub fn new(room: &str) -> Self {
        let mut bytes = [b' '; ROOM_CODE_LEN];
        for (dst, src) in bytes.iter_mut().zip(room.as_bytes()) {
            *dst = *src;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ROOM_CODE_LEN] {
        &self.0
    }
}

impl From<&str> for RoomCode {
    fn from(room: &str) -> Self {
        Self::new(room)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Cardinal movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    /// Bit set in the `Move` flag byte
    pub fn flag(self) -> u8 {
        match self {
            Self::Up => 1 << 0,
            Self::Down => 1 << 1,
            Self::Left => 1 << 2,
            Self::Right => 1 << 3,
        }
    }

    /// Unit grid step; y grows downwards
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// `Move` flag bit for press (set) / release (clear)
pub const MOVE_PRESS_FLAG: u8 = 1 << 4;

/// System message subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemKind {
    Info = 0,
}

impl SystemKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Info),
            _ => None,
        }
    }
}

/// Every message the protocol can carry, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Server -> client
    /// Identity assigned by the server after the socket opens
    Connected { id: i16, username: String },
    Hosted { room: RoomCode },
    Joined { room: RoomCode },
    Left,
    /// Sparse map patch
    Shot { cells: Vec<CellUpdate> },
    Chatted { from: i16, message: String },
    Map(GameMap),
    State(WorldState),
    System { kind: SystemKind, message: String },
    Error { message: String },

    // Client -> server
    Host,
    Join { room: RoomCode },
    Leave,
    Start,
    Team,
    Weapon { weapon: u8 },
    /// Press or release one direction key
    Move { direction: Direction, pressed: bool },
    Shoot,
    Chat { message: String },
    /// Aim point in grid coordinates
    Mouse { x: i32, y: i32 },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Connected { .. } => MessageKind::Connected,
            Self::Hosted { .. } => MessageKind::Hosted,
            Self::Joined { .. } => MessageKind::Joined,
            Self::Left => MessageKind::Left,
            Self::Shot { .. } => MessageKind::Shot,
            Self::Chatted { .. } => MessageKind::Chatted,
            Self::Map(_) => MessageKind::Map,
            Self::State(_) => MessageKind::State,
            Self::System { .. } => MessageKind::System,
            Self::Error { .. } => MessageKind::Error,
            Self::Host => MessageKind::Host,
            Self::Join { .. } => MessageKind::Join,
            Self::Leave => MessageKind::Leave,
            Self::Start => MessageKind::Start,
            Self::Team => MessageKind::Team,
            Self::Weapon { .. } => MessageKind::Weapon,
            Self::Move { .. } => MessageKind::Move,
            Self::Shoot => MessageKind::Shoot,
            Self::Chat { .. } => MessageKind::Chat,
            Self::Mouse { .. } => MessageKind::Mouse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_follow_wire_order() {
        assert_eq!(MessageKind::Connected.tag(), 0);
        assert_eq!(MessageKind::Join.tag(), 3);
        assert_eq!(MessageKind::Move.tag(), 12);
        assert_eq!(MessageKind::State.tag(), 19);
        assert_eq!(MessageKind::Error.tag(), KIND_COUNT - 1);
        for kind in MessageKind::all() {
            assert_eq!(MessageKind::from_u8(kind.tag()), Some(kind));
        }
        assert_eq!(MessageKind::from_u8(KIND_COUNT), None);
    }

    #[test]
    fn room_code_pads_and_truncates() {
        assert_eq!(RoomCode::new("AB").as_bytes(), b"AB  ");
        assert_eq!(RoomCode::new("ABCDEFG").as_bytes(), b"ABCD");
        assert_eq!(RoomCode::new("").to_string(), "    ");
    }

    #[test]
    fn direction_flags_are_distinct_bits() {
        let mut seen = 0u8;
        for dir in Direction::ALL {
            assert_eq!(dir.flag().count_ones(), 1);
            assert_eq!(seen & dir.flag(), 0);
            seen |= dir.flag();
        }
        assert_eq!(seen & MOVE_PRESS_FLAG, 0);
    }
}
