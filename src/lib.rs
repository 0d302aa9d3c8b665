//! # Jolly Roger Dungeon Core
//!
//! Deterministic dungeon generation and commit-reveal move log for the
//! Jolly Roger on-chain dungeon.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    JOLLY ROGER CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Contract-compatible primitives            │
//! │  ├── bytes.rs    - Hex byte newtypes, decimal serde codec    │
//! │  ├── coords.rs   - Room / cell positions, RoomId packing     │
//! │  └── hash.rs     - keccak256, ABI words, bitfield extraction │
//! │                                                              │
//! │  game/           - Game logic                                │
//! │  ├── epoch.rs    - Epoch identity and commit/reveal clock    │
//! │  ├── room.rs     - Room generation from the epoch hash       │
//! │  ├── dungeon.rs  - Per-epoch room graph with symmetric exits │
//! │  ├── pathfinding.rs - Click-to-move BFS                      │
//! │  ├── offchain.rs - Pending move log                          │
//! │  └── controller.rs - Keys, clicks, commit preparation        │
//! │                                                              │
//! │  proof/          - Commit-reveal encoding                    │
//! │  storage/        - Write-through account persistence         │
//! │  network/        - Chain time polling (non-deterministic)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/` and the generation half of `game/` are pure functions of the
//! epoch hash:
//! - No floating-point arithmetic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from keccak256 bitfields
//!
//! Given the same epoch hash, every room matches what the contract derives.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod proof;
pub mod storage;

// Re-export commonly used types
pub use crate::config::GameConfig;
pub use crate::core::bytes::{Address, H256};
pub use crate::core::coords::{CellPosition, Direction, Position, RoomId};
pub use crate::game::dungeon::Dungeon;
pub use crate::game::epoch::{Epoch, EpochClock};
pub use crate::game::offchain::OffchainState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
