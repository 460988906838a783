//! Client-side game model: grid map, world state and snapshots

pub mod map;
pub mod snapshot;
pub mod world;

pub use map::{Cell, CellUpdate, GameMap, MapError, Tile};
pub use snapshot::Snapshot;
pub use world::{Aggregate, GamePhase, PlayerState, Team, WorldState};
