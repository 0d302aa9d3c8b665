//! Dungeon Graph
//!
//! One [`Dungeon`] per epoch. Wraps the room generator with per-instance
//! memoization and exit symmetrization: the exit between two neighbours
//! exists if either side declares it.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::core::coords::{direction, CellPosition, Direction, GridPosition, Position, RoomId};
use crate::game::epoch::Epoch;
use crate::game::room::{Exits, RawRoom, Room, RoomGenerator};

/// Room-level connectivity.
pub trait Topology {
    /// Symmetrized exits of a room.
    fn exits(&self, room: Position) -> Exits;

    /// Whether a single step is legal.
    ///
    /// Non-adjacent steps are illegal. Steps between cells of the same room
    /// are always legal; otherwise the source room needs an exit facing the
    /// target.
    fn is_valid_move<P: GridPosition>(&self, from: P, to: P) -> bool {
        let Some(dir) = direction(from, to) else {
            return false;
        };
        let from_room = from.room();
        if from_room == to.room() {
            return true;
        }
        self.exits(from_room).has(dir)
    }
}

/// Dungeon for one epoch.
///
/// Caches are owned by this instance and dropped with it on rollover.
/// Not `Sync`: all access happens on the controller's thread.
pub struct Dungeon {
    epoch: Epoch,
    generator: RoomGenerator,
    raw_rooms: RefCell<BTreeMap<RoomId, RawRoom>>,
    rooms: RefCell<BTreeMap<RoomId, Room>>,
}

impl Dungeon {
    /// Dungeon for an epoch, generated from its hash.
    pub fn new(epoch: Epoch) -> Self {
        Self::with_generator(epoch, RoomGenerator::new(epoch.hash))
    }

    /// Dungeon with an explicit generator.
    pub fn with_generator(epoch: Epoch, generator: RoomGenerator) -> Self {
        Self {
            epoch,
            generator,
            raw_rooms: RefCell::new(BTreeMap::new()),
            rooms: RefCell::new(BTreeMap::new()),
        }
    }

    /// Epoch this dungeon belongs to.
    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    /// Memoized raw room.
    pub fn raw_room(&self, position: Position) -> RawRoom {
        let id = position.id();
        if let Some(room) = self.raw_rooms.borrow().get(&id) {
            return *room;
        }
        let room = self.generator.raw_room(position);
        self.raw_rooms.borrow_mut().insert(id, room);
        room
    }

    /// Memoized room with symmetrized exits.
    pub fn room(&self, position: Position) -> Room {
        let id = position.id();
        if let Some(room) = self.rooms.borrow().get(&id) {
            return *room;
        }

        let raw = self.raw_room(position);
        let mut exits = [false; 4];
        for dir in Direction::ALL {
            let neighbor = self.raw_room(position.neighbor(dir));
            exits[dir.index()] = raw.exits.has(dir) || neighbor.exits.has(dir.opposite());
        }

        let room = Room {
            position,
            exits: Exits(exits),
            treasure: raw.treasure,
            monster: raw.monster,
        };
        self.rooms.borrow_mut().insert(id, room);
        room
    }

    /// Room containing a cell.
    pub fn room_at_cell(&self, cell: CellPosition) -> Room {
        self.room(cell.room())
    }

    /// Number of memoized rooms (raw, symmetrized).
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.raw_rooms.borrow().len(), self.rooms.borrow().len())
    }
}

impl Topology for Dungeon {
    fn exits(&self, room: Position) -> Exits {
        self.room(room).exits
    }
}

/// Hand-built topology for tests: rooms missing from the map have no exits.
#[cfg(test)]
pub(crate) struct FixedTopology(pub BTreeMap<Position, Exits>);

#[cfg(test)]
impl FixedTopology {
    /// Straight east-west corridor from `x = 0` to `x = len`, at `y = 0`.
    pub fn corridor(len: i32) -> Self {
        let mut map = BTreeMap::new();
        for x in 0..=len {
            let exits = Exits([false, x < len, false, x > 0]);
            map.insert(Position::new(x, 0), exits);
        }
        Self(map)
    }
}

#[cfg(test)]
impl Topology for FixedTopology {
    fn exits(&self, room: Position) -> Exits {
        self.0.get(&room).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dungeon(n: u64) -> Dungeon {
        Dungeon::new(Epoch::from_number(n))
    }

    #[test]
    fn test_room_is_cached() {
        let d = dungeon(1);
        let a = d.room(Position::new(2, 3));
        let (raw, rooms) = d.cache_sizes();
        assert_eq!(rooms, 1);
        assert_eq!(raw, 5);
        assert_eq!(d.room(Position::new(2, 3)), a);
        assert_eq!(d.cache_sizes(), (5, 1));
    }

    #[test]
    fn test_fresh_instances_agree() {
        let a = dungeon(9);
        let b = dungeon(9);
        // Warm `a` with other rooms first; order must not matter.
        for x in -3..3 {
            a.room(Position::new(x, 7));
        }
        assert_eq!(a.room(Position::new(0, 0)), b.room(Position::new(0, 0)));
        assert_eq!(a.raw_room(Position::new(0, 0)), b.raw_room(Position::new(0, 0)));
    }

    #[test]
    fn test_room_keeps_raw_exits() {
        let d = dungeon(4);
        for x in -5..5 {
            let p = Position::new(x, x);
            let raw = d.raw_room(p);
            let room = d.room(p);
            for dir in raw.exits.iter() {
                assert!(room.exits.has(dir));
            }
            assert_eq!(room.treasure, raw.treasure);
            assert_eq!(room.monster, raw.monster);
        }
    }

    proptest! {
        #[test]
        fn prop_exit_symmetry(n in 0u64..1_000, x in -1_000i32..1_000, y in -1_000i32..1_000) {
            let d = dungeon(n);
            let p = Position::new(x, y);
            let room = d.room(p);
            for dir in Direction::ALL {
                let other = d.room(p.neighbor(dir));
                prop_assert_eq!(room.exits.has(dir), other.exits.has(dir.opposite()));
            }
        }
    }

    #[test]
    fn test_non_adjacent_moves_are_invalid() {
        let d = dungeon(2);
        let o = Position::new(0, 0);
        assert!(!d.is_valid_move(o, o));
        assert!(!d.is_valid_move(o, Position::new(1, 1)));
        assert!(!d.is_valid_move(o, Position::new(0, 2)));
    }

    #[test]
    fn test_room_moves_follow_exits() {
        let d = dungeon(2);
        for x in -4..4 {
            for y in -4..4 {
                let p = Position::new(x, y);
                let room = d.room(p);
                for dir in Direction::ALL {
                    assert_eq!(d.is_valid_move(p, p.neighbor(dir)), room.exits.has(dir));
                }
            }
        }
    }

    #[test]
    fn test_same_room_cell_moves_are_valid() {
        // A topology with no exits at all still allows moving inside a room.
        let t = FixedTopology(BTreeMap::new());
        let c = Position::new(5, 5).center_cell();
        assert!(t.is_valid_move(c, c.offset(1, 0)));
        assert!(t.is_valid_move(c, c.offset(0, -1)));
        assert!(t.is_valid_move(c.offset(1, 1), c.offset(1, 0)));
        // Leaving the room is blocked.
        assert!(!t.is_valid_move(c.offset(1, 0), c.offset(2, 0)));
        // Identical cells have no direction.
        assert!(!t.is_valid_move(c, c));
    }

    #[test]
    fn test_cell_moves_across_rooms_use_exits() {
        let t = FixedTopology::corridor(2);
        let edge = Position::new(0, 0).center_cell().offset(1, 0);
        assert!(t.is_valid_move(edge, edge.offset(1, 0)));
        let west_edge = Position::new(0, 0).center_cell().offset(-1, 0);
        assert!(!t.is_valid_move(west_edge, west_edge.offset(-1, 0)));
    }

    #[test]
    fn test_room_at_cell() {
        let d = dungeon(6);
        let room = d.room_at_cell(CellPosition::new(4, -1));
        assert_eq!(room.position, Position::new(1, 0));
    }
}
