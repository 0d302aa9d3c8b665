//! Epochs and the Epoch Clock
//!
//! An epoch is one 24h generation of the dungeon. The clock maps a
//! timestamp to the epoch number and to the commit / reveal window.
//!
//! ```text
//! START + (n-1)*PERIOD                     START + n*PERIOD
//! ├──────────── commit (ACTION_PERIOD) ────────┼── reveal ──┤
//! ```

use serde::{Deserialize, Serialize};

use crate::core::bytes::H256;
use crate::core::hash::epoch_hash;

/// Default epoch length in seconds (24h).
pub const PERIOD: u64 = 24 * 3600;

/// Default commit window in seconds (23h).
pub const ACTION_PERIOD: u64 = 23 * 3600;

/// Default clock origin.
pub const START_TIMESTAMP: i64 = 0;

/// One generation instance of the dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    /// Seed hash for room generation.
    pub hash: H256,
    /// Epoch number (0 = not started).
    pub number: u64,
}

impl Epoch {
    /// Epoch with the hash derived the way the contract derives it.
    pub fn from_number(number: u64) -> Self {
        Self {
            hash: epoch_hash(number),
            number,
        }
    }
}

/// Clock configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    /// Origin of epoch 1.
    pub start_timestamp: i64,
    /// Epoch length in seconds.
    pub period: u64,
    /// Commit window length in seconds.
    pub action_period: u64,
}

impl Default for EpochClock {
    fn default() -> Self {
        Self {
            start_timestamp: START_TIMESTAMP,
            period: PERIOD,
            action_period: ACTION_PERIOD,
        }
    }
}

/// Derived phase information at a given time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Current epoch number.
    pub epoch: u64,
    /// Whether actions may be committed.
    pub committing: bool,
    /// Seconds until the commit window closes (negative once closed).
    pub time_left_to_commit: i64,
    /// Seconds until reveals close, `None` while committing.
    pub time_left_to_reveal: Option<u64>,
    /// Seconds until the epoch ends.
    pub time_left_to_epoch_end: u64,
}

impl EpochClock {
    /// Seconds elapsed since the clock origin, `None` before it. A clock
    /// with a zero period never starts.
    fn elapsed(&self, now: i64) -> Option<u64> {
        if self.period == 0 {
            return None;
        }
        now.checked_sub(self.start_timestamp)
            .filter(|elapsed| *elapsed >= 0)
            .map(|elapsed| elapsed as u64)
    }

    /// `floor((now - START) / PERIOD) + 1`, or 0 before the origin.
    pub fn epoch(&self, now: i64) -> u64 {
        match self.elapsed(now) {
            Some(elapsed) => elapsed / self.period + 1,
            None => 0,
        }
    }

    /// Seconds into the current epoch.
    pub fn time_in_epoch(&self, now: i64) -> u64 {
        self.elapsed(now).map(|elapsed| elapsed % self.period).unwrap_or(0)
    }

    /// Whether `now` is inside the commit window.
    pub fn is_committing(&self, now: i64) -> bool {
        self.elapsed(now).is_some() && self.time_in_epoch(now) < self.action_period
    }

    /// Full phase snapshot. `synced` is false until the authoritative time
    /// has been fetched at least once; an unsynced clock never reports the
    /// commit window as open.
    pub fn phase(&self, now: i64, synced: bool) -> Phase {
        let into = self.time_in_epoch(now);
        let committing = synced && self.is_committing(now);
        Phase {
            epoch: self.epoch(now),
            committing,
            time_left_to_commit: self.action_period as i64 - into as i64,
            time_left_to_reveal: if committing { None } else { Some(self.period - into) },
            time_left_to_epoch_end: self.period - into,
        }
    }

    /// Epoch identity at `now`.
    pub fn current_epoch(&self, now: i64) -> Epoch {
        Epoch::from_number(self.epoch(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_numbering_is_one_indexed() {
        let clock = EpochClock::default();
        assert_eq!(clock.epoch(0), 1);
        assert_eq!(clock.epoch(PERIOD as i64 - 1), 1);
        assert_eq!(clock.epoch(PERIOD as i64), 2);
        assert_eq!(clock.epoch(10 * PERIOD as i64 + 5), 11);
    }

    #[test]
    fn test_before_start_is_epoch_zero() {
        let clock = EpochClock { start_timestamp: 1_000, ..EpochClock::default() };
        assert_eq!(clock.epoch(999), 0);
        assert!(!clock.is_committing(999));
        assert_eq!(clock.epoch(1_000), 1);
    }

    #[test]
    fn test_zero_period_never_starts() {
        let clock = EpochClock { period: 0, ..EpochClock::default() };
        assert_eq!(clock.epoch(1_000_000), 0);
        assert_eq!(clock.time_in_epoch(1_000_000), 0);
        let phase = clock.phase(1_000_000, true);
        assert!(!phase.committing);
        assert_eq!(phase.epoch, 0);
        assert_eq!(phase.time_left_to_epoch_end, 0);
    }

    #[test]
    fn test_commit_window() {
        let clock = EpochClock::default();
        assert!(clock.is_committing(0));
        assert!(clock.is_committing(ACTION_PERIOD as i64 - 1));
        assert!(!clock.is_committing(ACTION_PERIOD as i64));
        assert!(!clock.is_committing(PERIOD as i64 - 1));
        assert!(clock.is_committing(PERIOD as i64));
    }

    #[test]
    fn test_phase_time_left() {
        let clock = EpochClock::default();
        let phase = clock.phase(PERIOD as i64 + 3600, true);
        assert_eq!(phase.epoch, 2);
        assert!(phase.committing);
        assert_eq!(phase.time_left_to_commit, 22 * 3600);
        assert_eq!(phase.time_left_to_reveal, None);
        assert_eq!(phase.time_left_to_epoch_end, 23 * 3600);

        let reveal = clock.phase(ACTION_PERIOD as i64 + 60, true);
        assert!(!reveal.committing);
        assert_eq!(reveal.time_left_to_commit, -60);
        assert_eq!(reveal.time_left_to_reveal, Some(3600 - 60));
        assert_eq!(reveal.time_left_to_epoch_end, 3600 - 60);
    }

    #[test]
    fn test_unsynced_never_commits() {
        let clock = EpochClock::default();
        let phase = clock.phase(10, false);
        assert!(!phase.committing);
        assert_eq!(phase.time_left_to_reveal, Some(PERIOD - 10));
    }

    #[test]
    fn test_current_epoch_hash() {
        let clock = EpochClock::default();
        let epoch = clock.current_epoch(5);
        assert_eq!(epoch.number, 1);
        assert_eq!(epoch.hash, epoch_hash(1));
    }
}
