//! Tactical painter: expansion, defense and aggression over A* paths

use std::collections::VecDeque;

use rand_chacha::ChaCha8Rng;
use tracing::trace;

use super::pathfinding::{find_path, path_still_valid};
use super::{aim_error, direction_from_velocity, own_player, random_direction};
use super::{Action, Strategy, StrategyError};
use crate::game::map::{Cell, GameMap};
use crate::game::snapshot::Snapshot;
use crate::game::world::{PlayerState, WorldState};
use crate::ws::protocol::Direction;

/// Enemy closer than this forces defense
const DEFENSE_RANGE: f32 = 1.5;
/// Enemy closer than this triggers a score-dependent engagement
const ENGAGE_RANGE: f32 = 3.0;
/// How far to back off from the nearest enemy
const RETREAT_DISTANCE: f32 = 2.0;
/// Distance to a node center at which the node counts as reached
const ARRIVAL_RADIUS: f32 = 0.3;
/// Heading error under which the bot fires
const AIM_TOLERANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Expansion,
    Defense,
    Aggressive,
}

pub struct HardStrategy {
    rng: ChaCha8Rng,
    mode: Mode,
    path: VecDeque<Cell>,
}

impl HardStrategy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            mode: Mode::default(),
            path: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Remaining cached path, next node first
    pub fn path(&self) -> impl Iterator<Item = &Cell> {
        self.path.iter()
    }

    fn select_mode(world: &WorldState, player: &PlayerState) -> Mode {
        let Some((_, distance)) = nearest_enemy(world, player) else {
            return Mode::Expansion;
        };

        if distance < DEFENSE_RANGE {
            Mode::Defense
        } else if distance < ENGAGE_RANGE {
            let own = world.aggregate.score_of(player.team);
            let enemy = world.aggregate.score_of(player.team.opponent());
            if own >= enemy {
                Mode::Aggressive
            } else {
                Mode::Defense
            }
        } else {
            Mode::Expansion
        }
    }

    fn target(&self, map: &GameMap, world: &WorldState, player: &PlayerState) -> Option<Cell> {
        match self.mode {
            Mode::Expansion => expansion_target(map, player),
            Mode::Defense => {
                nearest_enemy(world, player).map(|(enemy, _)| retreat_target(map, player, enemy))
            }
            Mode::Aggressive => nearest_enemy(world, player)
                .map(|(enemy, _)| clamp_to_map(map, Cell::containing(enemy.x, enemy.y))),
        }
    }

    fn refresh_path(&mut self, map: &GameMap, player: &PlayerState, target: Cell) {
        let cached = self.path.make_contiguous();
        if path_still_valid(map, cached, target) {
            return;
        }
        let start = Cell::containing(player.x, player.y);
        self.path = find_path(map, start, target).into();
        trace!(?start, ?target, len = self.path.len(), "path recomputed");
    }
}

impl Strategy for HardStrategy {
    fn name(&self) -> &'static str {
        "Hard"
    }

    fn decide(&mut self, snapshot: &Snapshot) -> Result<Action, StrategyError> {
        let player = own_player(snapshot)?;
        let map = snapshot.map.as_ref();

        self.mode = Self::select_mode(&snapshot.world, player);
        let Some(target) = self.target(map, &snapshot.world, player) else {
            self.path.clear();
            return Ok(Action::Move(random_direction(&mut self.rng)));
        };

        self.refresh_path(map, player, target);

        let Some(&front) = self.path.front() else {
            return Ok(Action::Move(random_direction(&mut self.rng)));
        };
        let (fx, fy) = front.center();
        if player.distance_to(fx, fy) < ARRIVAL_RADIUS {
            self.path.pop_front();
        }

        if let Some(&next) = self.path.front() {
            let desired = direction_to(player, next);
            match direction_from_velocity(player.vx, player.vy) {
                None => return Ok(Action::Move(desired)),
                Some(current) if current != desired => return Ok(Action::Stop(current)),
                Some(_) => {}
            }
        }

        if aim_error(player, target) < AIM_TOLERANCE {
            Ok(Action::Shoot)
        } else {
            Ok(Action::look_at(target))
        }
    }
}

/// Closest player of the other team and its distance; first one wins ties
fn nearest_enemy<'a>(world: &'a WorldState, player: &PlayerState) -> Option<(&'a PlayerState, f32)> {
    world
        .enemies_of(player.team)
        .map(|enemy| (enemy, player.distance_to(enemy.x, enemy.y)))
        .fold(None, |best, (enemy, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((enemy, distance)),
        })
}

/// Nearest tile that is neither a wall nor ours, scanning row by row
fn expansion_target(map: &GameMap, player: &PlayerState) -> Option<Cell> {
    let own_tile = player.team.tile();
    let mut best: Option<(Cell, f32)> = None;
    for y in 0..map.height() {
        for x in 0..map.width() {
            let cell = Cell::new(x, y);
            match map.get_cell(cell) {
                Some(tile) if !tile.is_wall() && tile != own_tile => {}
                _ => continue,
            }
            let (cx, cy) = cell.center();
            let distance = player.distance_to(cx, cy);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((cell, distance));
            }
        }
    }
    best.map(|(cell, _)| cell)
}

/// Cell a fixed distance straight away from `enemy`
fn retreat_target(map: &GameMap, player: &PlayerState, enemy: &PlayerState) -> Cell {
    let (mut dx, mut dy) = (player.x - enemy.x, player.y - enemy.y);
    let len = dx.hypot(dy);
    if len > 0.0 {
        dx /= len;
        dy /= len;
    }
    clamp_to_map(
        map,
        Cell::containing(
            player.x + dx * RETREAT_DISTANCE,
            player.y + dy * RETREAT_DISTANCE,
        ),
    )
}

fn clamp_to_map(map: &GameMap, cell: Cell) -> Cell {
    Cell::new(
        cell.x.clamp(0, (map.width() - 1).max(0)),
        cell.y.clamp(0, (map.height() - 1).max(0)),
    )
}

/// Axis-dominant cardinal direction toward a node center
fn direction_to(player: &PlayerState, node: Cell) -> Direction {
    let (cx, cy) = node.center();
    let (dx, dy) = (cx - player.x, cy - player.y);
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}
