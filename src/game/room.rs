//! Room Generation
//!
//! Derives a room's intrinsic attributes from `(epoch hash, position)`.
//! The only source of randomness is the room digest; every attribute is an
//! independent bitfield of it.
//!
//! ## Bit layout (least significant bit first)
//!
//! ```text
//! primary digest   [0,2)   first exit
//!                  [2,7)   second-exit roll   (< 3 of 32)
//!                  [7,9)   second exit        (3 = none)
//! content digest   [9,19)  treasure roll      (< 7 of 1024)
//!                  [19,26) monster roll       (< 30 or < 1 of 128)
//! ```
//!
//! Thresholds and offsets are part of the contract's hash derivation and
//! must not change.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::core::bytes::H256;
use crate::core::coords::{Direction, Position};
use crate::core::hash::{field, room_hash, PackedHasher};

/// Second exit is present when its 5-bit roll is below this.
pub const SECOND_EXIT_THRESHOLD: u64 = 3;

/// Treasure is present when its 10-bit roll is below this.
pub const TREASURE_THRESHOLD: u64 = 7;

/// Monster threshold (7-bit roll) in treasure rooms.
pub const MONSTER_THRESHOLD_TREASURE: u64 = 30;

/// Monster threshold (7-bit roll) in empty rooms.
pub const MONSTER_THRESHOLD_EMPTY: u64 = 1;

/// Exit flags indexed by [`Direction`]: `[N, E, S, W]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exits(pub [bool; 4]);

impl Exits {
    /// Whether an exit exists in a direction.
    #[inline]
    pub fn has(&self, dir: Direction) -> bool {
        self.0[dir.index()]
    }

    /// Directions with an exit, in index order.
    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|dir| self.has(*dir))
    }

    /// Number of exits.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|e| **e).count()
    }
}

impl Index<Direction> for Exits {
    type Output = bool;

    fn index(&self, dir: Direction) -> &bool {
        &self.0[dir.index()]
    }
}

/// Attributes intrinsic to one room, before neighbour symmetrization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRoom {
    /// Exits declared by this room.
    pub exits: Exits,
    /// Room holds treasure.
    pub treasure: bool,
    /// Room holds a monster.
    pub monster: bool,
}

/// A room with exits symmetrized against its neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Room {
    /// Where the room is.
    pub position: Position,
    /// Exits declared by this room or the facing neighbour.
    pub exits: Exits,
    /// Room holds treasure.
    pub treasure: bool,
    /// Room holds a monster.
    pub monster: bool,
}

/// Pure generator for one epoch hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoomGenerator {
    epoch_hash: H256,
    content_salt: Option<H256>,
}

impl RoomGenerator {
    /// Generator matching the contract: treasure and monster read the same
    /// digest as the exits.
    pub fn new(epoch_hash: H256) -> Self {
        Self { epoch_hash, content_salt: None }
    }

    /// Generator whose treasure/monster layer reads a separately salted
    /// digest, leaving the exit layout untouched.
    pub fn with_content_salt(epoch_hash: H256, salt: H256) -> Self {
        Self { epoch_hash, content_salt: Some(salt) }
    }

    /// Seed hash.
    pub fn epoch_hash(&self) -> H256 {
        self.epoch_hash
    }

    /// Digest feeding the treasure/monster fields.
    fn content_digest(&self, position: Position, primary: &H256) -> H256 {
        match &self.content_salt {
            None => *primary,
            Some(salt) => {
                let mut hasher = PackedHasher::new();
                hasher.update_bytes32(salt);
                hasher.update_bytes32(&self.epoch_hash);
                hasher.update_uint256(position.id());
                hasher.finalize()
            }
        }
    }

    /// Derive the raw room at a position.
    pub fn raw_room(&self, position: Position) -> RawRoom {
        let digest = room_hash(&self.epoch_hash, position.id());

        let first_exit = Direction::from_index(field(&digest, 0, 2));
        let has_second_exit = field(&digest, 2, 5) < SECOND_EXIT_THRESHOLD;
        let second_exit_raw = field(&digest, 7, 2);
        let second_exit = if has_second_exit {
            // Raw value 3 means no second exit.
            Direction::from_index(second_exit_raw).filter(|dir| *dir != Direction::West)
        } else {
            None
        };

        let mut exits = [false; 4];
        for dir in Direction::ALL {
            exits[dir.index()] = first_exit == Some(dir) || second_exit == Some(dir);
        }

        let content = self.content_digest(position, &digest);
        let treasure = field(&content, 9, 10) < TREASURE_THRESHOLD;
        let monster_raw = field(&content, 19, 7);
        let monster = if treasure {
            monster_raw < MONSTER_THRESHOLD_TREASURE
        } else {
            monster_raw < MONSTER_THRESHOLD_EMPTY
        };

        RawRoom {
            exits: Exits(exits),
            treasure,
            monster,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::epoch_hash;

    #[test]
    fn test_raw_room_is_deterministic() {
        let generator = RoomGenerator::new(epoch_hash(7));
        let p = Position::new(3, -9);
        assert_eq!(generator.raw_room(p), generator.raw_room(p));
    }

    #[test]
    fn test_independent_generators_agree() {
        let a = RoomGenerator::new(epoch_hash(1));
        let b = RoomGenerator::new(epoch_hash(1));
        assert_eq!(a.raw_room(Position::new(0, 0)), b.raw_room(Position::new(0, 0)));
    }

    #[test]
    fn test_every_room_has_one_or_two_exits() {
        let generator = RoomGenerator::new(epoch_hash(3));
        for x in -10..10 {
            for y in -10..10 {
                let count = generator.raw_room(Position::new(x, y)).exits.count();
                assert!((1..=2).contains(&count), "room {x},{y} has {count} exits");
            }
        }
    }

    #[test]
    fn test_raw_room_matches_digest_fields() {
        let hash = epoch_hash(11);
        let generator = RoomGenerator::new(hash);
        for x in -5..5 {
            let p = Position::new(x, 2 * x);
            let digest = room_hash(&hash, p.id());
            let room = generator.raw_room(p);
            let first = field(&digest, 0, 2) as usize;
            assert!(room.exits.0[first]);
            assert_eq!(room.treasure, field(&digest, 9, 10) < TREASURE_THRESHOLD);
        }
    }

    #[test]
    fn test_content_salt_keeps_exits() {
        let hash = epoch_hash(5);
        let plain = RoomGenerator::new(hash);
        let salted = RoomGenerator::with_content_salt(hash, H256([9; 32]));
        for x in -8..8 {
            let p = Position::new(x, -x);
            assert_eq!(plain.raw_room(p).exits, salted.raw_room(p).exits);
        }
    }

    #[test]
    fn test_monsters_only_without_treasure_are_rare() {
        let generator = RoomGenerator::new(epoch_hash(2));
        let mut empty_rooms = 0;
        let mut empty_monsters = 0;
        for x in -30..30 {
            for y in -30..30 {
                let room = generator.raw_room(Position::new(x, y));
                if !room.treasure {
                    empty_rooms += 1;
                    empty_monsters += room.monster as u32;
                }
            }
        }
        // Expected rate is 1/128.
        assert!(empty_monsters * 20 < empty_rooms);
    }

    #[test]
    fn test_exits_helpers() {
        let exits = Exits([true, false, true, false]);
        assert!(exits[Direction::North]);
        assert!(!exits.has(Direction::East));
        assert_eq!(exits.iter().collect::<Vec<_>>(), vec![Direction::North, Direction::South]);
        assert_eq!(exits.count(), 2);
    }
}
