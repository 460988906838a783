//! Uniformly random actions

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::{random_direction, Action, Strategy, StrategyError};
use crate::game::snapshot::Snapshot;

pub struct RandomStrategy {
    rng: ChaCha8Rng,
}

impl RandomStrategy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }
}

impl Strategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn decide(&mut self, snapshot: &Snapshot) -> Result<Action, StrategyError> {
        let action = match self.rng.gen_range(0..4) {
            0 => Action::Move(random_direction(&mut self.rng)),
            1 => Action::Stop(random_direction(&mut self.rng)),
            2 => Action::Shoot,
            _ => Action::Look {
                x: self.rng.gen_range(0..snapshot.map.width().max(1)),
                y: self.rng.gen_range(0..snapshot.map.height().max(1)),
            },
        };
        Ok(action)
    }
}
