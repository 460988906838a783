//! Fake game server pieces shared by the integration tests

#![allow(dead_code)]

use std::net::SocketAddr;

use paint_bots::ws::protocol::MessageKind;
use tokio::net::TcpListener;
use url::Url;

/// Little-endian server frame builder
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(kind: MessageKind) -> Self {
        Self(vec![kind.tag()])
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    pub fn i16(mut self, v: i16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn short_string(self, s: &str) -> Self {
        self.u8(s.len() as u8).raw(s.as_bytes())
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

pub fn connected(id: i16, username: &str) -> Vec<u8> {
    Frame::new(MessageKind::Connected)
        .i16(id)
        .short_string(username)
        .build()
}

pub fn hosted(room: &[u8; 4]) -> Vec<u8> {
    Frame::new(MessageKind::Hosted).raw(room).build()
}

pub fn joined(room: &[u8; 4]) -> Vec<u8> {
    Frame::new(MessageKind::Joined).raw(room).build()
}

/// All-empty map
pub fn empty_map(width: i32, height: i32) -> Vec<u8> {
    Frame::new(MessageKind::Map)
        .i32(width)
        .i32(height)
        .raw(&vec![0u8; (width * height) as usize])
        .build()
}

/// Single cell patch
pub fn shot(x: i32, y: i32, tile: u8) -> Vec<u8> {
    Frame::new(MessageKind::Shot)
        .u8(1)
        .i32(x)
        .i32(y)
        .u8(tile)
        .build()
}

/// World state with one team A player standing still at `(x, y)`
pub fn state_with_player(room: &[u8; 4], phase: u8, id: i16, x: f32, y: f32) -> Vec<u8> {
    Frame::new(MessageKind::State)
        .i16(1)
        .raw(room)
        .i32(0)
        .i32(0)
        .i32(0)
        .i32(0)
        .i32(0)
        .u8(phase)
        .u8(1)
        .i16(id)
        .u8(0)
        .u8(0)
        .f32(x)
        .f32(y)
        .i32(0)
        .i32(0)
        .f32(0.0)
        .u8(0)
        .short_string(&format!("bot{id}"))
        .build()
}

pub const PHASE_PLAYING: u8 = 2;

/// Listener on an ephemeral local port and its WebSocket URL
pub async fn listen() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    (listener, url)
}
