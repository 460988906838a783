//! Binary codec for the game protocol
//!
//! Every frame is one kind tag byte followed by a kind-specific payload.
//! Multi-byte numbers are little-endian; strings are UTF-8 with their byte
//! length carried in a preceding field.

use bytes::{Buf, BufMut};
use chrono::{DateTime, Utc};

use crate::game::map::{CellUpdate, GameMap, Tile};
use crate::game::world::{Aggregate, GamePhase, PlayerState, Team, WorldState};
use crate::ws::protocol::{
    KindDirection, Message, MessageKind, RoomCode, SystemKind, MAX_CHAT_LEN, MOVE_PRESS_FLAG,
    ROOM_CODE_LEN,
};

/// Codec errors. Each one is fatal to a single frame only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown message kind {0}")]
    UnknownMessageKind(u8),

    #[error("{0} messages are not receivable")]
    NotReceivable(MessageKind),

    #[error("{0} messages are not sendable")]
    NotSendable(MessageKind),

    #[error("{kind} frame truncated: needed {needed} bytes, {remaining} left")]
    Truncated {
        kind: MessageKind,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid map size {width}x{height}")]
    InvalidMapSize { width: i32, height: i32 },

    #[error("unknown tile state {0}")]
    UnknownTile(u8),

    #[error("unknown team {0}")]
    UnknownTeam(u8),

    #[error("unknown game phase {0}")]
    UnknownPhase(u8),

    #[error("unknown system message {0}")]
    UnknownSystemMessage(u8),
}

/// Bounds-checked cursor over a frame payload
struct Reader<'a> {
    kind: MessageKind,
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(kind: MessageKind, buf: &'a [u8]) -> Self {
        Self { kind, buf }
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::Truncated {
                kind: self.kind,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn string(&mut self, len: usize) -> Result<String, ProtocolError> {
        let raw = self.bytes(len)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// String preceded by its one-byte length
    fn short_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.u8()? as usize;
        self.string(len)
    }

    fn room(&mut self) -> Result<RoomCode, ProtocolError> {
        let raw = self.bytes(ROOM_CODE_LEN)?;
        let mut code = [0u8; ROOM_CODE_LEN];
        code.copy_from_slice(raw);
        Ok(RoomCode::from_bytes(code))
    }

    fn tile(&mut self) -> Result<Tile, ProtocolError> {
        let raw = self.u8()?;
        Tile::from_u8(raw).ok_or(ProtocolError::UnknownTile(raw))
    }
}

/// Decode one inbound frame
pub fn decode(frame: &[u8]) -> Result<Message, ProtocolError> {
    let (&tag, payload) = frame.split_first().ok_or(ProtocolError::EmptyFrame)?;
    let kind = MessageKind::from_u8(tag).ok_or(ProtocolError::UnknownMessageKind(tag))?;
    if kind.direction() != KindDirection::Inbound {
        return Err(ProtocolError::NotReceivable(kind));
    }

    let mut r = Reader::new(kind, payload);
    let message = match kind {
        MessageKind::Connected => {
            let id = r.i16()?;
            let username = r.short_string()?;
            Message::Connected { id, username }
        }
        MessageKind::Hosted => Message::Hosted { room: r.room()? },
        MessageKind::Joined => Message::Joined { room: r.room()? },
        MessageKind::Left => Message::Left,
        MessageKind::Shot => {
            let count = r.u8()?;
            let mut cells = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let x = r.i32()?;
                let y = r.i32()?;
                let tile = r.tile()?;
                cells.push(CellUpdate { x, y, tile });
            }
            Message::Shot { cells }
        }
        MessageKind::Chatted => {
            let from = r.i16()?;
            let message = r.short_string()?;
            Message::Chatted { from, message }
        }
        MessageKind::Map => Message::Map(decode_map(&mut r)?),
        MessageKind::State => Message::State(decode_state(&mut r)?),
        MessageKind::System => {
            let raw = r.u8()?;
            let kind = SystemKind::from_u8(raw).ok_or(ProtocolError::UnknownSystemMessage(raw))?;
            let message = r.short_string()?;
            Message::System { kind, message }
        }
        MessageKind::Error => Message::Error {
            message: r.short_string()?,
        },
        other => return Err(ProtocolError::NotReceivable(other)),
    };

    Ok(message)
}

fn decode_map(r: &mut Reader<'_>) -> Result<GameMap, ProtocolError> {
    let width = r.i32()?;
    let height = r.i32()?;
    let invalid = ProtocolError::InvalidMapSize { width, height };
    if width < 0 || height < 0 {
        return Err(invalid);
    }
    let len = (width as usize)
        .checked_mul(height as usize)
        .ok_or(invalid.clone())?;

    let tiles = r
        .bytes(len)?
        .iter()
        .map(|&raw| Tile::from_u8(raw).ok_or(ProtocolError::UnknownTile(raw)))
        .collect::<Result<Vec<_>, _>>()?;

    GameMap::new(width, height, tiles).map_err(|_| invalid)
}

fn decode_state(r: &mut Reader<'_>) -> Result<WorldState, ProtocolError> {
    let host_id = r.i16()?;
    let room = r.room()?;
    let unix_seconds = r.i32()?;
    let started_at = if unix_seconds == 0 {
        None
    } else {
        DateTime::<Utc>::from_timestamp(unix_seconds as i64, 0)
    };

    let team_a_paint = r.i32()?;
    let team_b_paint = r.i32()?;
    let score_a = r.i32()?;
    let score_b = r.i32()?;
    let raw_phase = r.u8()?;
    let phase = GamePhase::from_u8(raw_phase).ok_or(ProtocolError::UnknownPhase(raw_phase))?;

    let count = r.u8()?;
    let mut players = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let user_id = r.i16()?;
        let raw_team = r.u8()?;
        let team = Team::from_u8(raw_team).ok_or(ProtocolError::UnknownTeam(raw_team))?;
        let weapon = r.u8()?;
        let x = r.f32()?;
        let y = r.f32()?;
        let vx = r.i32()?;
        let vy = r.i32()?;
        let theta = r.f32()?;
        let cooldown = r.u8()?;
        let username = r.short_string()?;
        players.push(PlayerState {
            user_id,
            username,
            team,
            weapon,
            x,
            y,
            vx,
            vy,
            theta,
            cooldown,
        });
    }

    Ok(WorldState {
        host_id,
        room,
        started_at,
        aggregate: Aggregate {
            team_a_paint,
            team_b_paint,
            score_a,
            score_b,
            phase,
        },
        players,
    })
}

/// Encode one outbound message
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let kind = message.kind();
    let mut buf = Vec::with_capacity(16);
    buf.put_u8(kind.tag());

    match message {
        Message::Host | Message::Leave | Message::Start | Message::Team | Message::Shoot => {}
        Message::Join { room } => buf.put_slice(room.as_bytes()),
        Message::Weapon { weapon } => buf.put_u8(*weapon),
        Message::Move { direction, pressed } => {
            let mut flags = direction.flag();
            if *pressed {
                flags |= MOVE_PRESS_FLAG;
            }
            buf.put_u8(flags);
        }
        Message::Chat { message } => {
            let body = truncate_utf8(message, MAX_CHAT_LEN);
            buf.put_u8(body.len() as u8);
            buf.put_slice(body.as_bytes());
        }
        Message::Mouse { x, y } => {
            buf.put_i32_le(*x);
            buf.put_i32_le(*y);
        }
        _ => return Err(ProtocolError::NotSendable(kind)),
    }

    Ok(buf)
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
