//! Greedy local painter: paint the neighbouring cells, wander otherwise

use std::collections::HashMap;
use std::f32::consts::PI;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::{aim_error, direction_from_velocity, own_player, random_direction};
use super::{Action, Strategy, StrategyError};
use crate::game::map::{Cell, GameMap, Tile};
use crate::game::snapshot::Snapshot;
use crate::game::world::PlayerState;

/// A tile targeted more often than this is skipped
const MAX_SHOTS_PER_TILE: u32 = 3;

/// Heading error under which the bot fires instead of turning
const AIM_TOLERANCE: f32 = PI / 8.0;

pub struct EasyStrategy {
    rng: ChaCha8Rng,
    /// Times each tile (keyed `x + y * width`) has been shot at
    shot_tiles: HashMap<usize, u32>,
    /// Dimensions the shot memory was recorded against
    memory_dims: (i32, i32),
}

impl EasyStrategy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            shot_tiles: HashMap::new(),
            memory_dims: (0, 0),
        }
    }

    /// Times `cell` has been shot at
    pub fn shot_count(&self, map: &GameMap, cell: Cell) -> u32 {
        map.index(cell.x, cell.y)
            .and_then(|idx| self.shot_tiles.get(&idx).copied())
            .unwrap_or(0)
    }

    fn sync_memory(&mut self, map: &GameMap) {
        let dims = (map.width(), map.height());
        if self.memory_dims != dims {
            self.shot_tiles.clear();
            self.memory_dims = dims;
        }
    }

    /// Neighbouring cells that are neither walls nor already ours and have
    /// not been shot at too often
    fn candidates(&self, map: &GameMap, player: &PlayerState) -> Vec<Cell> {
        let own_tile = player.team.tile();
        neighbours(map, Cell::containing(player.x, player.y))
            .filter(|&(_, tile)| tile != Tile::Wall && tile != own_tile)
            .map(|(cell, _)| cell)
            .filter(|&cell| self.shot_count(map, cell) <= MAX_SHOTS_PER_TILE)
            .collect()
    }
}

/// The up to eight in-bounds cells around `center`
fn neighbours(map: &GameMap, center: Cell) -> impl Iterator<Item = (Cell, Tile)> + '_ {
    (-1..=1)
        .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            // Saturated far-off positions have no neighbours
            let cell = Cell::new(center.x.checked_add(dx)?, center.y.checked_add(dy)?);
            map.get_cell(cell).map(|tile| (cell, tile))
        })
}

impl Strategy for EasyStrategy {
    fn name(&self) -> &'static str {
        "Easy"
    }

    fn decide(&mut self, snapshot: &Snapshot) -> Result<Action, StrategyError> {
        let player = own_player(snapshot)?;
        let map = snapshot.map.as_ref();
        self.sync_memory(map);

        let heading = direction_from_velocity(player.vx, player.vy);
        let candidates = self.candidates(map, player);

        if !candidates.is_empty() {
            // Stand still before painting
            if let Some(dir) = heading {
                return Ok(Action::Stop(dir));
            }

            let target = candidates[self.rng.gen_range(0..candidates.len())];
            if aim_error(player, target) < AIM_TOLERANCE {
                if let Some(idx) = map.index(target.x, target.y) {
                    *self.shot_tiles.entry(idx).or_insert(0) += 1;
                }
                return Ok(Action::Shoot);
            }
            return Ok(Action::look_at(target));
        }

        match heading {
            Some(dir) => {
                let next = Cell::containing(
                    player.x + player.vx as f32 * 0.5,
                    player.y + player.vy as f32 * 0.5,
                );
                if map.is_walkable(next.x, next.y) {
                    Ok(Action::Idle)
                } else {
                    Ok(Action::Stop(dir))
                }
            }
            None => Ok(Action::Move(random_direction(&mut self.rng))),
        }
    }
}
