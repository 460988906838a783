//! Application layer: the bot swarm

pub mod swarm;

pub use swarm::{run, SwarmStats};
