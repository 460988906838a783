//! Read-only world view handed to strategies

use std::sync::Arc;

use super::map::GameMap;
use super::world::{PlayerState, WorldState};

/// Immutable view of one bot's world at a tick boundary.
///
/// Map and world state are shared behind `Arc`s; the session swaps or
/// copies-on-write its own handles, so a snapshot never observes a later
/// update.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Server-assigned id of the bot's own player
    pub id: i16,
    pub map: Arc<GameMap>,
    pub world: Arc<WorldState>,
}

impl Snapshot {
    pub fn new(id: i16, map: GameMap, world: WorldState) -> Self {
        Self {
            id,
            map: Arc::new(map),
            world: Arc::new(world),
        }
    }

    /// The bot's own player entry, if the server listed it
    pub fn me(&self) -> Option<&PlayerState> {
        self.world.player(self.id)
    }
}
