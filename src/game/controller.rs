//! Game Controller
//!
//! Glue between the authoritative game state (epoch, player position), the
//! dungeon for the current epoch and the persisted offchain log. Owns the
//! dungeon and rebuilds it when the epoch hash changes.
//!
//! Acting before game state or a player is known is a sequencing bug in the
//! caller and is reported as [`ControllerError`]. Illegal moves are not
//! errors; they come back as [`LogUpdate::Rejected`].

use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::bytes::{Address, Bytes24, H256};
use crate::core::coords::{Direction, Position};
use crate::game::action::Action;
use crate::game::dungeon::Dungeon;
use crate::game::epoch::{Epoch, Phase};
use crate::game::offchain::{LogUpdate, OffchainState};
use crate::game::pathfinding::{find_path, DEFAULT_SEARCH_LIMIT};
use crate::proof::commitment::{CommitRecord, CommitmentBuilder, CommitmentError, RevealCall};
use crate::storage::account::{AccountStore, TxMetadata};
use crate::storage::kv::{KeyValueStore, StorageError};

/// Controller errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// No game state has been applied yet.
    #[error("Game not initialised")]
    GameNotInitialised,

    /// Game state has no player.
    #[error("No player")]
    NoPlayer,

    /// Persisting the account failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Building the commitment failed.
    #[error("Commitment error: {0}")]
    Commitment(#[from] CommitmentError),
}

/// On-chain player snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Player {
    /// Player account.
    pub address: Address,
    /// Last resolved position.
    pub position: Position,
}

/// Authoritative game state, as read from the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameState {
    /// Current epoch.
    pub epoch: Epoch,
    /// Connected player, if any.
    pub player: Option<Player>,
}

/// Keyboard input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Move north.
    Up,
    /// Move east.
    Right,
    /// Move south.
    Down,
    /// Move west.
    Left,
    /// Undo the last action.
    Back,
}

impl Key {
    /// Parse a DOM-style key name. Arrows and WASD move, Backspace undoes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" | "Up" | "w" | "W" => Some(Self::Up),
            "ArrowRight" | "Right" | "d" | "D" => Some(Self::Right),
            "ArrowDown" | "Down" | "s" | "S" => Some(Self::Down),
            "ArrowLeft" | "Left" | "a" | "A" => Some(Self::Left),
            "Backspace" => Some(Self::Back),
            _ => None,
        }
    }

    /// Movement direction, `None` for non-movement keys.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Up => Some(Direction::North),
            Self::Right => Some(Direction::East),
            Self::Down => Some(Direction::South),
            Self::Left => Some(Direction::West),
            Self::Back => None,
        }
    }
}

/// Drives the offchain log from player input.
pub struct GameController<S: KeyValueStore> {
    account: AccountStore<S>,
    dungeon: Option<Dungeon>,
    state: Option<GameState>,
    phase: Option<Phase>,
    path_limit: usize,
}

impl<S: KeyValueStore> GameController<S> {
    /// Controller over a loaded account store.
    pub fn new(account: AccountStore<S>) -> Self {
        Self {
            account,
            dungeon: None,
            state: None,
            phase: None,
            path_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Override the pathfinding search limit.
    pub fn with_path_limit(mut self, limit: usize) -> Self {
        self.path_limit = limit;
        self
    }

    /// Account store.
    pub fn account(&self) -> &AccountStore<S> {
        &self.account
    }

    /// Mutable account store, for tx bookkeeping.
    pub fn account_mut(&mut self) -> &mut AccountStore<S> {
        &mut self.account
    }

    /// Dungeon of the current epoch.
    pub fn dungeon(&self) -> Option<&Dungeon> {
        self.dungeon.as_ref()
    }

    /// Last applied game state.
    pub fn game_state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Last applied phase.
    pub fn phase(&self) -> Option<&Phase> {
        self.phase.as_ref()
    }

    /// Pending offchain moves.
    pub fn offchain(&self) -> &OffchainState {
        self.account.offchain()
    }

    /// Apply new authoritative state. Rebuilds the dungeon and clears a
    /// stale offchain log when the epoch changed.
    pub fn apply_game_state(&mut self, state: GameState) -> Result<(), ControllerError> {
        let rebuild = self
            .dungeon
            .as_ref()
            .map_or(true, |dungeon| dungeon.epoch().hash != state.epoch.hash);
        if rebuild {
            info!("Generating dungeon for epoch {}", state.epoch.number);
            self.dungeon = Some(Dungeon::new(state.epoch));
        }
        if self.account.reset_if_stale(&state.epoch)? {
            info!("Epoch {} started, offchain actions reset", state.epoch.number);
        }
        self.account.reconcile(&state.epoch)?;
        self.state = Some(state);
        Ok(())
    }

    /// Apply a new phase snapshot.
    pub fn apply_phase(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }

    /// Whether input is currently accepted.
    pub fn is_committing(&self) -> bool {
        self.phase.is_some_and(|phase| phase.committing)
    }

    fn player(&self) -> Result<Player, ControllerError> {
        let state = self.state.as_ref().ok_or(ControllerError::GameNotInitialised)?;
        state.player.ok_or(ControllerError::NoPlayer)
    }

    fn current_dungeon(dungeon: &Option<Dungeon>) -> Result<&Dungeon, ControllerError> {
        dungeon.as_ref().ok_or(ControllerError::GameNotInitialised)
    }

    /// Where the player will be after the pending moves.
    pub fn current_position(&self) -> Result<Position, ControllerError> {
        let player = self.player()?;
        Ok(self.account.offchain().current_position(player.position))
    }

    /// Step from the current position to `to`.
    pub fn move_to(&mut self, to: Position) -> Result<LogUpdate, ControllerError> {
        let from = self.current_position()?;
        let dungeon = Self::current_dungeon(&self.dungeon)?;
        let update = self.account.push_move(dungeon, from, to)?;
        if update == LogUpdate::Rejected {
            debug!("Rejected move {} -> {}", from, to);
        }
        Ok(update)
    }

    /// Step one room in `dir`.
    pub fn move_direction(&mut self, dir: Direction) -> Result<LogUpdate, ControllerError> {
        let to = self.current_position()?.neighbor(dir);
        self.move_to(to)
    }

    /// Handle a key press. Ignored outside the commit window.
    pub fn handle_key(&mut self, key: Key) -> Result<LogUpdate, ControllerError> {
        if !self.is_committing() {
            debug!("Ignoring {:?} outside commit window", key);
            return Ok(LogUpdate::Rejected);
        }
        self.player()?;
        match key.direction() {
            Some(dir) => self.move_direction(dir),
            None => Ok(match self.back()? {
                Some(_) => LogUpdate::Applied,
                None => LogUpdate::Rejected,
            }),
        }
    }

    /// Replace the pending moves with the shortest route from the on-chain
    /// position to `target`. Returns the route length, or `None` if
    /// `target` is unreachable.
    pub fn click_room(&mut self, target: Position) -> Result<Option<usize>, ControllerError> {
        let player = self.player()?;
        let dungeon = Self::current_dungeon(&self.dungeon)?;
        let Some(path) = find_path(dungeon, player.position, target, self.path_limit) else {
            debug!("No path {} -> {}", player.position, target);
            return Ok(None);
        };
        let len = path.len();
        let epoch = *dungeon.epoch();
        self.account.set_actions(&epoch, path)?;
        Ok(Some(len))
    }

    /// Decide on the treasure in the room the last move ends in.
    pub fn pick_treasure(&mut self, pick: bool) -> Result<LogUpdate, ControllerError> {
        self.player()?;
        let dungeon = Self::current_dungeon(&self.dungeon)?;
        Ok(self.account.pick_treasure(dungeon, pick)?)
    }

    /// Undo the last pending move.
    pub fn back(&mut self) -> Result<Option<Action>, ControllerError> {
        Ok(self.account.back()?)
    }

    /// Drop all pending moves.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        Ok(self.account.reset()?)
    }

    /// Build a commitment over the pending moves. The caller submits it
    /// and reports the tx hash through [`Self::on_commit_sent`].
    pub fn prepare_commit<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        combat_stance: u16,
    ) -> Result<CommitRecord, ControllerError> {
        let player = self.player()?;
        let dungeon = Self::current_dungeon(&self.dungeon)?;
        Ok(CommitmentBuilder::new(player.address, *dungeon.epoch())
            .actions(&self.account.offchain().actions)
            .combat_stance(combat_stance)
            .build(rng)?)
    }

    /// Track a broadcast commit.
    pub fn on_commit_sent(&mut self, tx: H256, record: CommitRecord) -> Result<(), ControllerError> {
        Ok(self.account.on_tx_sent(tx, TxMetadata::Commit { record })?)
    }

    /// Reveal for the current epoch's successful commit, if one is waiting.
    pub fn prepare_reveal(&self, extra_data: Bytes24) -> Result<Option<(H256, RevealCall)>, ControllerError> {
        let state = self.state.as_ref().ok_or(ControllerError::GameNotInitialised)?;
        Ok(self
            .account
            .pending_commit(&state.epoch)
            .map(|(tx, record)| (tx, record.reveal_call(extra_data))))
    }

    /// Track a broadcast reveal.
    pub fn on_reveal_sent(&mut self, tx: H256, commit_tx: H256) -> Result<(), ControllerError> {
        let state = self.state.as_ref().ok_or(ControllerError::GameNotInitialised)?;
        let epoch = state.epoch;
        Ok(self.account.on_tx_sent(tx, TxMetadata::Reveal { epoch, commit_tx })?)
    }
}
