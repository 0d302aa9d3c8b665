//! Network Layer
//!
//! Chain time and the epoch feed built on it.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod feed;
pub mod time;

pub use feed::{EpochFeed, EpochView};
pub use time::{ChainTime, ManualClock, SystemClock, TimeError, TimeSource};
