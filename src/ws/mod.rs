//! Wire protocol and WebSocket transport

pub mod codec;
pub(crate) mod connection;
pub mod protocol;

pub use codec::{decode, encode, ProtocolError};
pub use protocol::{Direction, Message, MessageKind, RoomCode, SystemKind};
