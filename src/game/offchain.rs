//! Offchain Action Log
//!
//! Moves a player has made locally but not yet committed. The log is bound
//! to one epoch and clears itself when used with a different one.
//!
//! Invalid pushes (full log, illegal step) are silent no-ops: the contract
//! re-checks legality at reveal time.

use serde::{Deserialize, Serialize};

use crate::core::coords::Position;
use crate::game::action::{Action, TreasureChoice};
use crate::game::dungeon::{Dungeon, Topology};
use crate::game::epoch::Epoch;

/// Maximum actions per commitment.
pub const MAX_ACTIONS: usize = 64;

/// Outcome of a log mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogUpdate {
    /// The log changed.
    Applied,
    /// The log was cleared for a new epoch, then changed.
    RolledOver,
    /// Nothing changed.
    Rejected,
}

impl LogUpdate {
    /// Whether anything changed.
    pub fn changed(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Epoch-scoped queue of pending moves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainState {
    /// Epoch the actions were made in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<Epoch>,
    /// Pending actions, each starting where the previous one ended.
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl OffchainState {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether there are no pending actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether another action fits.
    pub fn is_full(&self) -> bool {
        self.actions.len() >= MAX_ACTIONS
    }

    /// Last action's destination, or `onchain` when the log is empty.
    pub fn current_position(&self, onchain: Position) -> Position {
        self.actions.last().map(Action::to).unwrap_or(onchain)
    }

    /// Clear the log if it belongs to another epoch, then bind it to
    /// `epoch`. Returns true on rollover.
    fn enter_epoch(&mut self, epoch: &Epoch) -> bool {
        let rolled = match &self.epoch {
            Some(current) => current.hash != epoch.hash,
            None => false,
        };
        if rolled {
            self.reset();
        }
        self.epoch = Some(*epoch);
        rolled
    }

    /// Whether the log was made in another epoch than `epoch`.
    pub fn is_stale(&self, epoch: &Epoch) -> bool {
        self.epoch.is_some_and(|current| current.hash != epoch.hash)
    }

    /// Whether `from` continues the chain of pending actions.
    fn continues_chain(&self, from: Position) -> bool {
        self.actions.last().map_or(true, |last| last.to() == from)
    }

    /// Append a move if it is legal, continues the chain and fits.
    ///
    /// A rejected move leaves the log untouched unless it was stale, in
    /// which case it is still cleared.
    pub fn push_move<T: Topology>(&mut self, topology: &T, epoch: &Epoch, from: Position, to: Position) -> LogUpdate {
        let rolled = self.is_stale(epoch);
        if rolled {
            self.reset();
        }
        if self.is_full() || !self.continues_chain(from) || !topology.is_valid_move(from, to) {
            return if rolled { LogUpdate::RolledOver } else { LogUpdate::Rejected };
        }
        self.epoch = Some(*epoch);
        self.actions.push(Action::move_to(from, to));
        if rolled {
            LogUpdate::RolledOver
        } else {
            LogUpdate::Applied
        }
    }

    /// Replace all actions, truncating to [`MAX_ACTIONS`]. An empty
    /// replacement leaves the log unbound, like a fresh one.
    pub fn set(&mut self, epoch: &Epoch, actions: Vec<Action>) -> LogUpdate {
        let rolled = self.enter_epoch(epoch);
        self.actions = actions;
        self.actions.truncate(MAX_ACTIONS);
        if self.actions.is_empty() {
            self.epoch = None;
        }
        if rolled {
            LogUpdate::RolledOver
        } else {
            LogUpdate::Applied
        }
    }

    /// Record a treasure decision on the last action, if the room it ends
    /// in holds treasure.
    pub fn pick_treasure(&mut self, dungeon: &Dungeon, epoch: &Epoch, pick: bool) -> LogUpdate {
        if self.is_stale(epoch) {
            self.reset();
            return LogUpdate::RolledOver;
        }
        let Some(last) = self.actions.last_mut() else {
            return LogUpdate::Rejected;
        };
        if !dungeon.room(last.to()).treasure {
            return LogUpdate::Rejected;
        }
        let choice = if pick { TreasureChoice::Pick } else { TreasureChoice::Ignore };
        *last = last.with_treasure(choice);
        LogUpdate::Applied
    }

    /// Remove the last action. Undoing the only action also unbinds the
    /// epoch, so a log emptied by undo equals a fresh one.
    pub fn back(&mut self) -> Option<Action> {
        let popped = self.actions.pop();
        if popped.is_some() && self.actions.is_empty() {
            self.epoch = None;
        }
        popped
    }

    /// Clear all actions and the recorded epoch.
    pub fn reset(&mut self) {
        self.actions.clear();
        self.epoch = None;
    }
}
