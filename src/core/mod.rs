//! Core deterministic primitives.
//!
//! Everything here is a pure function of its inputs and must match the
//! Dungeon contract bit-for-bit.

pub mod bytes;
pub mod coords;
pub mod hash;

// Re-export core types
pub use bytes::{Address, Bytes24, HexError, H256};
pub use coords::{decode, direction, encode, CellPosition, CoordError, Direction, GridPosition, Position, RoomId};
pub use hash::{epoch_hash, field, field_mod, keccak256, room_hash, PackedHasher};
