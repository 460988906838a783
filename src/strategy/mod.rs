//! Decision engines: one action per bot per tick

pub mod easy;
pub mod hard;
pub mod pathfinding;
pub mod random;

use std::f32::consts::PI;
use std::fmt;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::game::map::Cell;
use crate::game::snapshot::Snapshot;
use crate::game::world::PlayerState;
use crate::ws::protocol::Direction;

pub use easy::EasyStrategy;
pub use hard::HardStrategy;
pub use random::RandomStrategy;

/// Physical intent produced by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Press a direction key
    Move(Direction),
    /// Release a direction key
    Stop(Direction),
    Shoot,
    /// Aim at a grid coordinate
    Look { x: i32, y: i32 },
    Idle,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(dir) => write!(f, "move {dir:?}"),
            Self::Stop(dir) => write!(f, "stop {dir:?}"),
            Self::Shoot => f.write_str("shoot"),
            Self::Look { x, y } => write!(f, "look ({x}, {y})"),
            Self::Idle => f.write_str("idle"),
        }
    }
}

/// Strategy errors; callers degrade to `Action::Idle`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("player {0} not found in world state")]
    PlayerNotFound(i16),
}

/// Per-bot decision engine. Implementations keep their own memory and are
/// never shared between bots.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    fn decide(&mut self, snapshot: &Snapshot) -> Result<Action, StrategyError>;
}

/// Selectable strategy implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StrategyKind {
    Random,
    #[default]
    Easy,
    Hard,
}

impl StrategyKind {
    /// Build a strategy with its own deterministic RNG
    pub fn build(self, seed: u64) -> Box<dyn Strategy> {
        let rng = ChaCha8Rng::seed_from_u64(seed);
        match self {
            Self::Random => Box::new(RandomStrategy::new(rng)),
            Self::Easy => Box::new(EasyStrategy::new(rng)),
            Self::Hard => Box::new(HardStrategy::new(rng)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Random => "random",
            Self::Easy => "easy",
            Self::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// Own player entry or `PlayerNotFound`
fn own_player(snapshot: &Snapshot) -> Result<&PlayerState, StrategyError> {
    snapshot
        .me()
        .ok_or(StrategyError::PlayerNotFound(snapshot.id))
}

fn random_direction(rng: &mut impl Rng) -> Direction {
    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
}

/// Direction of a velocity, horizontal component first
fn direction_from_velocity(vx: i32, vy: i32) -> Option<Direction> {
    if vx > 0 {
        Some(Direction::Right)
    } else if vx < 0 {
        Some(Direction::Left)
    } else if vy > 0 {
        Some(Direction::Down)
    } else if vy < 0 {
        Some(Direction::Up)
    } else {
        None
    }
}

/// Wrap an angle into [-π, π]
fn normalize_angle(mut angle: f32) -> f32 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Absolute heading error between `theta` and the bearing to the point a
/// `Look` at `cell` sends, which is the cell's integer corner
fn aim_error(player: &PlayerState, cell: Cell) -> f32 {
    let bearing = (cell.y as f32 - player.y).atan2(cell.x as f32 - player.x);
    normalize_angle(bearing - player.theta).abs()
}

impl Action {
    /// Aim at `cell`; pairs with [`aim_error`]
    pub fn look_at(cell: Cell) -> Self {
        Self::Look {
            x: cell.x,
            y: cell.y,
        }
    }
}
