//! Time Sources
//!
//! The epoch clock must follow the chain's notion of time, not the local
//! wall clock. A [`TimeSource`] returns the authoritative timestamp; the
//! feed interpolates between fetches.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Time source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The source could not be reached.
    #[error("time source unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative timestamp provider (latest block, RPC, wall clock).
pub trait TimeSource: Send + Sync {
    /// Current timestamp in unix seconds.
    fn fetch(&self) -> impl Future<Output = Result<i64, TimeError>> + Send;
}

/// Local wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Current unix time.
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl TimeSource for SystemClock {
    async fn fetch(&self) -> Result<i64, TimeError> {
        Ok(Self::now())
    }
}

/// Externally driven clock. Useful for tests and for replaying a chain.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    timestamp: Arc<AtomicI64>,
    offline: Arc<AtomicBool>,
}

impl ManualClock {
    /// Clock reading `timestamp`.
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp: Arc::new(AtomicI64::new(timestamp)),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Jump to `timestamp`.
    pub fn set(&self, timestamp: i64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.timestamp.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Make fetches fail until set back online.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    async fn fetch(&self) -> Result<i64, TimeError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TimeError::Unavailable("manual clock offline".to_string()));
        }
        Ok(self.timestamp.load(Ordering::SeqCst))
    }
}

/// Last known chain time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainTime {
    /// Unix seconds.
    pub timestamp: i64,
    /// Whether the timestamp came from the authoritative source at least once.
    pub synced: bool,
}
