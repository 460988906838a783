//! Configuration module - command line flags with environment fallbacks

use std::path::{Path, PathBuf};

use clap::Parser;
use url::Url;

use crate::strategy::StrategyKind;
use crate::util::time::DEFAULT_TICK_RATE;
use crate::ws::protocol::ROOM_CODE_LEN;

/// Game server WebSocket endpoint used when none is given
pub const DEFAULT_URL: &str = "ws://localhost:3000/ws";

/// Swarm configuration
#[derive(Parser, Clone, Debug)]
#[command(name = "paint-bots", version, about = "Bot swarm for the arena painting game")]
pub struct Config {
    /// Game server WebSocket URL
    #[arg(long, env = "PAINT_BOTS_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Number of bots to spawn
    #[arg(short = 'n', long, env = "PAINT_BOTS_AMOUNT", default_value_t = 10)]
    pub amount: u32,

    /// Room code to join; when absent bot 1 hosts a new room
    #[arg(long, env = "PAINT_BOTS_ROOM")]
    pub room: Option<String>,

    /// Start the game once every bot is in the hosted room
    #[arg(long)]
    pub start: bool,

    /// Decision engine used by every bot
    #[arg(long, value_enum, env = "PAINT_BOTS_STRATEGY", default_value_t = StrategyKind::Easy)]
    pub strategy: StrategyKind,

    /// Decisions per second per bot
    #[arg(long, env = "PAINT_BOTS_TICK_RATE", default_value_t = DEFAULT_TICK_RATE)]
    pub tick_rate: u32,

    /// Base RNG seed; bot `n` uses `seed + n`. Random when absent.
    #[arg(long, env = "PAINT_BOTS_SEED")]
    pub seed: Option<u64>,

    /// Directory receiving one `<bot_id>.log` per bot
    #[arg(long, env = "PAINT_BOTS_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Only log through tracing, no per-bot files
    #[arg(long)]
    pub no_log_files: bool,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit JSON log lines
    #[arg(long)]
    pub log_json: bool,
}

impl Config {
    /// Parse process arguments and validate them
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amount == 0 {
            return Err(ConfigError::ZeroAmount);
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if let Some(room) = &self.room {
            if room.is_empty() || room.len() > ROOM_CODE_LEN {
                return Err(ConfigError::InvalidRoom(room.clone()));
            }
        }
        self.server_url().map(|_| ())
    }

    /// Server URL; must use the `ws` or `wss` scheme
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme `{scheme}`"),
            }),
        }
    }

    /// Per-bot log directory, unless file logging is off
    pub fn bot_log_dir(&self) -> Option<&Path> {
        (!self.no_log_files).then_some(self.log_dir.as_path())
    }

    /// Configured seed, or a fresh random one
    pub fn base_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Bot amount must be at least 1")]
    ZeroAmount,

    #[error("Tick rate must be at least 1")]
    ZeroTickRate,

    #[error("Invalid room code `{0}`: expected 1 to 4 bytes")]
    InvalidRoom(String),

    #[error("Invalid server URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let argv = std::iter::once("paint-bots").chain(args.iter().copied());
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn explicit_flags_are_parsed() {
        let config = parse(&[
            "--url",
            "wss://paint.example/ws",
            "--amount",
            "3",
            "--room",
            "ABCD",
            "--strategy",
            "hard",
            "--tick-rate",
            "30",
            "--seed",
            "99",
            "--no-log-files",
        ]);
        assert!(config.validate().is_ok());
        assert_eq!(config.amount, 3);
        assert_eq!(config.room.as_deref(), Some("ABCD"));
        assert_eq!(config.strategy, StrategyKind::Hard);
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.base_seed(), 99);
        assert_eq!(config.bot_log_dir(), None);
        assert_eq!(config.server_url().unwrap().host_str(), Some("paint.example"));
    }

    #[test]
    fn zero_amount_and_tick_rate_are_rejected() {
        let config = parse(&["--url", DEFAULT_URL, "--amount", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroAmount)));

        let config = parse(&["--url", DEFAULT_URL, "--amount", "1", "--tick-rate", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTickRate)));
    }

    #[test]
    fn non_websocket_urls_are_rejected() {
        for url in ["http://localhost:3000/ws", "not a url"] {
            let config = parse(&["--url", url, "--amount", "1", "--tick-rate", "60"]);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })),
                "{url}"
            );
        }
    }

    #[test]
    fn room_codes_longer_than_four_bytes_are_rejected() {
        let config = parse(&["--url", DEFAULT_URL, "--amount", "1", "--room", "TOOLONG"]);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRoom(_))));
    }

    #[test]
    fn log_dir_defaults_to_logs() {
        let config = parse(&["--url", DEFAULT_URL, "--log-dir", "logs"]);
        assert_eq!(config.bot_log_dir(), Some(Path::new("logs")));
    }
}
