//! Authoritative world state as asserted by the server

use chrono::{DateTime, Utc};

use crate::game::map::Tile;
use crate::ws::protocol::RoomCode;

/// Team a player belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Team {
    TeamA = 0,
    TeamB = 1,
}

impl Team {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::TeamA),
            1 => Some(Self::TeamB),
            _ => None,
        }
    }

    /// Tile painted by this team
    pub fn tile(self) -> Tile {
        match self {
            Self::TeamA => Tile::TeamA,
            Self::TeamB => Tile::TeamB,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::TeamA => Self::TeamB,
            Self::TeamB => Self::TeamA,
        }
    }
}

/// Room phase carried in the `State` aggregate block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GamePhase {
    #[default]
    WaitingForPlayers = 0,
    GettingReady = 1,
    Playing = 2,
    GameOver = 3,
}

impl GamePhase {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::WaitingForPlayers),
            1 => Some(Self::GettingReady),
            2 => Some(Self::Playing),
            3 => Some(Self::GameOver),
            _ => None,
        }
    }
}

/// One player entry of a `State` message.
///
/// `x`/`y` are continuous sub-tile coordinates; `vx`/`vy` are directional
/// step counts (sign carries the direction), not a continuous vector.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub user_id: i16,
    pub username: String,
    pub team: Team,
    pub weapon: u8,
    pub x: f32,
    pub y: f32,
    pub vx: i32,
    pub vy: i32,
    pub theta: f32,
    pub cooldown: u8,
}

impl PlayerState {
    pub fn is_moving(&self) -> bool {
        self.vx != 0 || self.vy != 0
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Room-wide paint totals, scores and phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aggregate {
    pub team_a_paint: i32,
    pub team_b_paint: i32,
    pub score_a: i32,
    pub score_b: i32,
    pub phase: GamePhase,
}

impl Aggregate {
    pub fn score_of(&self, team: Team) -> i32 {
        match team {
            Team::TeamA => self.score_a,
            Team::TeamB => self.score_b,
        }
    }
}

/// Full room snapshot; replaced wholesale on every `State` message
#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub host_id: i16,
    pub room: RoomCode,
    pub started_at: Option<DateTime<Utc>>,
    pub aggregate: Aggregate,
    pub players: Vec<PlayerState>,
}

impl WorldState {
    pub fn player(&self, user_id: i16) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_playing(&self) -> bool {
        self.aggregate.phase == GamePhase::Playing
    }

    /// Players not on `team`
    pub fn enemies_of(&self, team: Team) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(move |p| p.team != team)
    }
}
