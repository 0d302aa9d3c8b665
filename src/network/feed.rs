//! Epoch Feed
//!
//! Polls a [`TimeSource`] and publishes the current epoch and phase to
//! subscribers over a `watch` channel. Between fetches the last chain
//! timestamp is advanced by local elapsed time. Until the first successful
//! fetch the wall clock is used and the phase is reported unsynced.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::epoch::{Epoch, EpochClock, Phase};
use crate::network::time::{ChainTime, SystemClock, TimeError, TimeSource};

/// Snapshot published to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochView {
    /// Time the snapshot was computed at.
    pub time: ChainTime,
    /// Current epoch.
    pub epoch: Epoch,
    /// Commit / reveal phase.
    pub phase: Phase,
}

/// Time poller publishing [`EpochView`]s.
pub struct EpochFeed<T: TimeSource> {
    source: T,
    clock: EpochClock,
    anchor: Option<(i64, Instant)>,
    view_tx: watch::Sender<EpochView>,
}

impl<T: TimeSource> EpochFeed<T> {
    /// Feed over `source`. The initial view is computed from the wall clock.
    pub fn new(source: T, clock: EpochClock) -> Self {
        let time = ChainTime {
            timestamp: SystemClock::now(),
            synced: false,
        };
        let (view_tx, _) = watch::channel(Self::view_at(&clock, time));
        Self {
            source,
            clock,
            anchor: None,
            view_tx,
        }
    }

    fn view_at(clock: &EpochClock, time: ChainTime) -> EpochView {
        EpochView {
            time,
            epoch: clock.current_epoch(time.timestamp),
            phase: clock.phase(time.timestamp, time.synced),
        }
    }

    /// Observe published views.
    pub fn subscribe(&self) -> watch::Receiver<EpochView> {
        self.view_tx.subscribe()
    }

    /// Last published view.
    pub fn current(&self) -> EpochView {
        *self.view_tx.borrow()
    }

    /// Estimated chain time now.
    pub fn chain_time(&self) -> ChainTime {
        match self.anchor {
            Some((timestamp, fetched_at)) => ChainTime {
                timestamp: timestamp + fetched_at.elapsed().as_secs() as i64,
                synced: true,
            },
            None => ChainTime {
                timestamp: SystemClock::now(),
                synced: false,
            },
        }
    }

    /// Fetch once and publish. A failed fetch keeps the previous anchor and
    /// still publishes the interpolated view.
    pub async fn poll_once(&mut self) -> Result<EpochView, TimeError> {
        let fetched = self.source.fetch().await;
        if let Ok(timestamp) = &fetched {
            self.anchor = Some((*timestamp, Instant::now()));
        }
        let view = Self::view_at(&self.clock, self.chain_time());

        let previous = self.current();
        if previous.epoch != view.epoch {
            info!("Epoch {} started", view.epoch.number);
        }
        if previous.phase.committing != view.phase.committing {
            debug!(
                "Epoch {} commit window {}",
                view.epoch.number,
                if view.phase.committing { "open" } else { "closed" }
            );
        }
        self.view_tx.send_replace(view);

        fetched.map(|_| view)
    }

    /// Poll every `period` until `shutdown` fires.
    pub async fn run(mut self, period: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!("Time poll failed: {}", e);
                    }
                }
                _ = shutdown.recv() => {
                    debug!("Epoch feed shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::epoch::{ACTION_PERIOD, PERIOD};
    use crate::network::time::ManualClock;

    const MIDDAY_EPOCH_3: i64 = 2 * PERIOD as i64 + 3600;

    #[tokio::test]
    async fn test_unsynced_until_first_fetch() {
        let source = ManualClock::new(MIDDAY_EPOCH_3);
        let feed = EpochFeed::new(source, EpochClock::default());
        let view = feed.current();
        assert!(!view.time.synced);
        assert!(!view.phase.committing);
    }

    #[tokio::test]
    async fn test_poll_publishes_chain_epoch() {
        let source = ManualClock::new(MIDDAY_EPOCH_3);
        let mut feed = EpochFeed::new(source.clone(), EpochClock::default());
        let mut rx = feed.subscribe();

        let view = feed.poll_once().await.unwrap();
        assert!(view.time.synced);
        assert_eq!(view.epoch, Epoch::from_number(3));
        assert!(view.phase.committing);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().epoch.number, 3);

        source.set(2 * PERIOD as i64 + ACTION_PERIOD as i64 + 10);
        let view = feed.poll_once().await.unwrap();
        assert_eq!(view.epoch.number, 3);
        assert!(!view.phase.committing);
        assert!(view.phase.time_left_to_reveal.is_some());

        source.advance(PERIOD as i64);
        let view = feed.poll_once().await.unwrap();
        assert_eq!(view.epoch.number, 4);
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_anchor() {
        let source = ManualClock::new(MIDDAY_EPOCH_3);
        let mut feed = EpochFeed::new(source.clone(), EpochClock::default());
        feed.poll_once().await.unwrap();

        source.set_offline(true);
        assert!(feed.poll_once().await.is_err());
        let view = feed.current();
        assert!(view.time.synced);
        assert_eq!(view.epoch.number, 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let source = ManualClock::new(MIDDAY_EPOCH_3);
        let feed = EpochFeed::new(source, EpochClock::default());
        let mut rx = feed.subscribe();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(feed.run(Duration::from_millis(10), shutdown_rx));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().epoch.number, 3);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
