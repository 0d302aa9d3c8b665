//! Game Logic Module
//!
//! Dungeon generation and the offchain move log. Everything except the
//! controller is deterministic.
//!
//! ## Module Structure
//!
//! - `epoch`: Epoch identity and the commit / reveal clock
//! - `room`: Per-room attribute derivation from the epoch hash
//! - `dungeon`: Memoized, exit-symmetrized room graph for one epoch
//! - `action`: Offchain actions and their reveal encoding
//! - `pathfinding`: Click-to-move breadth-first search
//! - `offchain`: Epoch-scoped pending move log
//! - `controller`: Input handling over game state and persisted log

pub mod action;
pub mod controller;
pub mod dungeon;
pub mod epoch;
pub mod offchain;
pub mod pathfinding;
pub mod room;

// Re-export key types
pub use action::{Action, RevealAction, TreasureChoice};
pub use controller::{ControllerError, GameController, GameState, Key, Player};
pub use dungeon::{Dungeon, Topology};
pub use epoch::{Epoch, EpochClock, Phase};
pub use offchain::{LogUpdate, OffchainState, MAX_ACTIONS};
pub use pathfinding::{find_path, DEFAULT_SEARCH_LIMIT};
pub use room::{Exits, RawRoom, Room, RoomGenerator};
