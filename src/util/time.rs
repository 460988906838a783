//! Time utilities for the bot tick loop

use std::time::{Duration, Instant};

/// Tick rate configuration
pub const DEFAULT_TICK_RATE: u32 = 60; // decisions per second per bot

/// Pause between joining the room and the first tick
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Pause between leaving the tick loop and closing sockets
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(50);

/// How long `close()` waits for queued frames to flush
pub const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// How long the swarm waits for the host bot's room code
pub const HOSTED_ROOM_TIMEOUT: Duration = Duration::from_secs(5);

/// Duration of one tick at `tick_rate` Hz
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1) as u64)
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_duration_matches_rate() {
        assert_eq!(tick_duration(60), Duration::from_micros(16_666));
        assert_eq!(tick_duration(1), Duration::from_secs(1));
        assert_eq!(tick_duration(0), Duration::from_secs(1));
    }
}
