//! Runtime Configuration
//!
//! Clock parameters must match the deployed contract; the rest tunes the
//! local client.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::epoch::{EpochClock, ACTION_PERIOD, PERIOD, START_TIMESTAMP};
use crate::game::pathfinding::DEFAULT_SEARCH_LIMIT;

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    /// Epoch clock parameters.
    pub clock: EpochClock,
    /// How often the time source is polled.
    pub poll_interval: Duration,
    /// Rooms visited before click-to-move gives up.
    pub path_limit: usize,
    /// Directory for persisted account data.
    pub data_dir: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            clock: EpochClock::default(),
            poll_interval: Duration::from_secs(1),
            path_limit: DEFAULT_SEARCH_LIMIT,
            data_dir: PathBuf::from(".jolly-roger"),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl GameConfig {
    /// Create config from environment variables. Unset or unparseable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let clock = EpochClock {
            start_timestamp: env_or("DUNGEON_START_TIMESTAMP", START_TIMESTAMP),
            period: env_or("DUNGEON_PERIOD", PERIOD),
            action_period: env_or("DUNGEON_ACTION_PERIOD", ACTION_PERIOD),
        };
        Self {
            clock: if clock.period == 0 || clock.action_period > clock.period {
                defaults.clock
            } else {
                clock
            },
            poll_interval: std::env::var("DUNGEON_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            path_limit: env_or("DUNGEON_PATH_LIMIT", defaults.path_limit),
            data_dir: std::env::var("DUNGEON_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-global; keep all env manipulation in one test.
    #[test]
    fn test_from_env() {
        std::env::set_var("DUNGEON_PERIOD", "3600");
        std::env::set_var("DUNGEON_ACTION_PERIOD", "3000");
        std::env::set_var("DUNGEON_POLL_INTERVAL_MS", "250");
        std::env::set_var("DUNGEON_PATH_LIMIT", "not a number");
        let config = GameConfig::from_env();
        assert_eq!(config.clock.period, 3600);
        assert_eq!(config.clock.action_period, 3000);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.path_limit, DEFAULT_SEARCH_LIMIT);

        // A commit window longer than the epoch is rejected as a whole.
        std::env::set_var("DUNGEON_ACTION_PERIOD", "7200");
        assert_eq!(GameConfig::from_env().clock, EpochClock::default());

        for name in [
            "DUNGEON_PERIOD",
            "DUNGEON_ACTION_PERIOD",
            "DUNGEON_POLL_INTERVAL_MS",
            "DUNGEON_PATH_LIMIT",
        ] {
            std::env::remove_var(name);
        }
        assert_eq!(GameConfig::from_env(), GameConfig::default());
    }
}
