//! Player Actions
//!
//! Steps recorded in the offchain log and, once committed, revealed to the
//! contract as `(uint64 position, bool pickTreasure)` tuples.

use serde::{Deserialize, Serialize};

use crate::core::bytes::decimal;
use crate::core::coords::{Position, RoomId};

/// What to do with treasure in the destination room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreasureChoice {
    /// Take it.
    Pick,
    /// Leave it.
    Ignore,
}

/// One step in the offchain log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Move between adjacent rooms.
    Move {
        /// Source room.
        from: Position,
        /// Destination room.
        to: Position,
        /// Treasure decision in `to`, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        treasure: Option<TreasureChoice>,
    },
}

impl Action {
    /// Plain move.
    pub fn move_to(from: Position, to: Position) -> Self {
        Self::Move { from, to, treasure: None }
    }

    /// Source room.
    pub fn from(&self) -> Position {
        match self {
            Self::Move { from, .. } => *from,
        }
    }

    /// Destination room.
    pub fn to(&self) -> Position {
        match self {
            Self::Move { to, .. } => *to,
        }
    }

    /// Treasure decision.
    pub fn treasure(&self) -> Option<TreasureChoice> {
        match self {
            Self::Move { treasure, .. } => *treasure,
        }
    }

    /// Same action with a treasure decision attached.
    pub fn with_treasure(self, choice: TreasureChoice) -> Self {
        match self {
            Self::Move { from, to, .. } => Self::Move { from, to, treasure: Some(choice) },
        }
    }

    /// Form sent to the contract on reveal.
    pub fn to_reveal(&self) -> RevealAction {
        RevealAction {
            position: self.to().id(),
            pick_treasure: self.treasure() == Some(TreasureChoice::Pick),
        }
    }
}

/// Contract-side action tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealAction {
    /// Packed destination room id.
    #[serde(with = "decimal")]
    pub position: RoomId,
    /// Whether to pick up treasure there.
    pub pick_treasure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_shape() {
        let action = Action::move_to(Position::new(0, 0), Position::new(1, 0));
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "move", "from": {"x": 0, "y": 0}, "to": {"x": 1, "y": 0}})
        );

        let picked = action.with_treasure(TreasureChoice::Pick);
        let json = serde_json::to_string(&picked).unwrap();
        assert!(json.contains(r#""treasure":"pick""#));
        assert_eq!(serde_json::from_str::<Action>(&json).unwrap(), picked);
    }

    #[test]
    fn test_to_reveal() {
        let action = Action::move_to(Position::new(0, 0), Position::new(-1, 0));
        assert_eq!(
            action.to_reveal(),
            RevealAction { position: Position::new(-1, 0).id(), pick_treasure: false }
        );
        let ignored = action.with_treasure(TreasureChoice::Ignore);
        assert!(!ignored.to_reveal().pick_treasure);
        assert!(action.with_treasure(TreasureChoice::Pick).to_reveal().pick_treasure);
    }

    #[test]
    fn test_reveal_action_position_is_string() {
        let reveal = RevealAction { position: u64::MAX, pick_treasure: true };
        let json = serde_json::to_string(&reveal).unwrap();
        assert_eq!(json, r#"{"position":"18446744073709551615","pickTreasure":true}"#);
    }
}
