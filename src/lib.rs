//! Paint Bots - autonomous players for the arena painting game
//!
//! Each bot holds one WebSocket session to the game server, keeps a
//! client-side copy of the map and world state, and on every tick turns a
//! snapshot of that state into one action through a pluggable strategy.

pub mod app;
pub mod bot;
pub mod config;
pub mod game;
pub mod strategy;
pub mod util;
pub mod ws;
