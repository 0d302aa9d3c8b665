//! Account Data
//!
//! Per-account state persisted under
//! `account_<address>_<chainId>_<genesisHash>`:
//!
//! ```json
//! { "onchainActions": { "<txHash>": { "tx": ..., "inclusion": ... } },
//!   "offchainState": { "epoch": ..., "actions": [...] } }
//! ```
//!
//! Every mutation is written through to the backend before returning.
//! Observers receive the new offchain state over a `watch` channel.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::bytes::{decimal, Address, H256};
use crate::core::coords::Position;
use crate::game::action::Action;
use crate::game::dungeon::Dungeon;
use crate::game::epoch::Epoch;
use crate::game::offchain::{LogUpdate, OffchainState};
use crate::proof::commitment::CommitRecord;
use crate::storage::kv::{KeyValueStore, StorageError};

/// Identifies one account on one chain deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountKey {
    /// Player address.
    pub address: Address,
    /// Chain id.
    pub chain_id: u64,
    /// Genesis block hash, distinguishes redeployed dev chains.
    pub genesis_hash: Option<H256>,
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account_{}_{}_", self.address, self.chain_id)?;
        match &self.genesis_hash {
            Some(hash) => write!(f, "{hash}"),
            None => f.write_str("undefined"),
        }
    }
}

/// Transaction inclusion status, as reported by the tx observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inclusion {
    /// Waiting for the node to return the tx.
    BeingFetched,
    /// In the mempool.
    Broadcasted,
    /// Dropped by the node.
    NotFound,
    /// Replaced or cancelled by the user.
    Cancelled,
    /// Mined.
    Included,
}

/// Execution result of an included transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Executed.
    Success,
    /// Reverted.
    Failure,
}

/// What a tracked transaction does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TxMetadata {
    /// `makeCommitment`, with everything needed to reveal later.
    Commit {
        /// Local commitment record.
        record: CommitRecord,
    },
    /// `resolve` for an earlier commit.
    #[serde(rename_all = "camelCase")]
    Reveal {
        /// Epoch being revealed.
        epoch: Epoch,
        /// Hash of the commit transaction.
        commit_tx: H256,
    },
}

impl TxMetadata {
    /// Target epoch.
    pub fn epoch(&self) -> &Epoch {
        match self {
            Self::Commit { record } => &record.epoch,
            Self::Reveal { epoch, .. } => epoch,
        }
    }
}

/// A submitted transaction being tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainAction {
    /// What the transaction does.
    pub tx: TxMetadata,
    /// Inclusion status.
    pub inclusion: Inclusion,
    /// Execution result once included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
    /// Block number at which the result became final.
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub r#final: Option<u64>,
}

impl OnChainAction {
    /// Whether the transaction executed successfully.
    pub fn succeeded(&self) -> bool {
        self.inclusion == Inclusion::Included && self.status == Some(TxStatus::Success)
    }
}

/// Status report for a tracked transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxUpdate {
    /// Transaction hash.
    pub hash: H256,
    /// New inclusion status.
    pub inclusion: Inclusion,
    /// Execution result, if included.
    pub status: Option<TxStatus>,
    /// Finality block, if final.
    pub r#final: Option<u64>,
}

/// Everything persisted for an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    /// Tracked transactions by hash.
    #[serde(default)]
    pub onchain_actions: BTreeMap<H256, OnChainAction>,
    /// Pending offchain moves.
    #[serde(default)]
    pub offchain_state: OffchainState,
}

/// Write-through account store.
pub struct AccountStore<S: KeyValueStore> {
    store: S,
    key: Option<String>,
    data: AccountData,
    offchain_tx: watch::Sender<OffchainState>,
}

impl<S: KeyValueStore> AccountStore<S> {
    /// Store with no account loaded.
    pub fn new(store: S) -> Self {
        let (offchain_tx, _) = watch::channel(OffchainState::default());
        Self {
            store,
            key: None,
            data: AccountData::default(),
            offchain_tx,
        }
    }

    /// Load an account. Absent or corrupt data yields empty defaults.
    pub fn load(&mut self, account: &AccountKey) {
        let key = account.to_string();
        self.data = match self.store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<AccountData>(&raw) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Discarding unreadable account data for {}: {}", key, e);
                    AccountData::default()
                }
            },
            Ok(None) => AccountData::default(),
            Err(e) => {
                warn!("Failed to read account data for {}: {}", key, e);
                AccountData::default()
            }
        };
        info!(
            "Loaded {} ({} pending actions, {} tracked txs)",
            key,
            self.data.offchain_state.len(),
            self.data.onchain_actions.len()
        );
        self.key = Some(key);
        self.publish();
    }

    /// Save and forget the current account.
    pub fn unload(&mut self) -> Result<(), StorageError> {
        self.save()?;
        self.key = None;
        self.data = AccountData::default();
        self.publish();
        Ok(())
    }

    /// Delete the current account's data from the backend.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        if let Some(key) = self.key.take() {
            self.store.remove(&key)?;
        }
        self.data = AccountData::default();
        self.publish();
        Ok(())
    }

    /// Persist the current data. No-op without a loaded account.
    pub fn save(&mut self) -> Result<(), StorageError> {
        Self::write(&mut self.store, self.key.as_deref(), &self.data)
    }

    fn write(store: &mut S, key: Option<&str>, data: &AccountData) -> Result<(), StorageError> {
        if let Some(key) = key {
            let json = serde_json::to_string(data)?;
            store.set(key, &json)?;
        }
        Ok(())
    }

    /// Persist `next`, then make it current. On a failed write the current
    /// data stays as it was.
    fn commit(&mut self, next: AccountData) -> Result<(), StorageError> {
        Self::write(&mut self.store, self.key.as_deref(), &next)?;
        let offchain_changed = next.offchain_state != self.data.offchain_state;
        self.data = next;
        if offchain_changed {
            self.publish();
        }
        Ok(())
    }

    fn publish(&self) {
        self.offchain_tx.send_replace(self.data.offchain_state.clone());
    }

    /// Observe offchain state changes.
    pub fn subscribe(&self) -> watch::Receiver<OffchainState> {
        self.offchain_tx.subscribe()
    }

    /// Loaded key, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Current data.
    pub fn data(&self) -> &AccountData {
        &self.data
    }

    /// Pending offchain moves.
    pub fn offchain(&self) -> &OffchainState {
        &self.data.offchain_state
    }

    /// Backend, for inspection.
    pub fn backend(&self) -> &S {
        &self.store
    }

    fn update_offchain<F>(&mut self, f: F) -> Result<LogUpdate, StorageError>
    where
        F: FnOnce(&mut OffchainState) -> LogUpdate,
    {
        let mut next = self.data.clone();
        let update = f(&mut next.offchain_state);
        if update.changed() {
            self.commit(next)?;
        }
        if update == LogUpdate::RolledOver {
            info!("Offchain actions cleared for new epoch");
        }
        Ok(update)
    }

    /// See [`OffchainState::push_move`].
    pub fn push_move(&mut self, dungeon: &Dungeon, from: Position, to: Position) -> Result<LogUpdate, StorageError> {
        let epoch = *dungeon.epoch();
        self.update_offchain(|state| state.push_move(dungeon, &epoch, from, to))
    }

    /// See [`OffchainState::set`].
    pub fn set_actions(&mut self, epoch: &Epoch, actions: Vec<Action>) -> Result<LogUpdate, StorageError> {
        self.update_offchain(|state| state.set(epoch, actions))
    }

    /// See [`OffchainState::pick_treasure`].
    pub fn pick_treasure(&mut self, dungeon: &Dungeon, pick: bool) -> Result<LogUpdate, StorageError> {
        let epoch = *dungeon.epoch();
        self.update_offchain(|state| state.pick_treasure(dungeon, &epoch, pick))
    }

    /// See [`OffchainState::back`].
    pub fn back(&mut self) -> Result<Option<Action>, StorageError> {
        let mut popped = None;
        self.update_offchain(|state| {
            popped = state.back();
            if popped.is_some() {
                LogUpdate::Applied
            } else {
                LogUpdate::Rejected
            }
        })?;
        Ok(popped)
    }

    /// See [`OffchainState::reset`].
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.update_offchain(|state| {
            state.reset();
            LogUpdate::Applied
        })?;
        Ok(())
    }

    /// Clear the offchain log if it was made in another epoch.
    pub fn reset_if_stale(&mut self, epoch: &Epoch) -> Result<bool, StorageError> {
        if !self.data.offchain_state.is_stale(epoch) {
            return Ok(false);
        }
        self.update_offchain(|state| {
            state.reset();
            LogUpdate::RolledOver
        })?;
        Ok(true)
    }

    /// Start tracking a broadcast transaction.
    pub fn on_tx_sent(&mut self, hash: H256, tx: TxMetadata) -> Result<(), StorageError> {
        debug!("Tracking tx {} for epoch {}", hash, tx.epoch().number);
        let mut next = self.data.clone();
        next.onchain_actions.insert(
            hash,
            OnChainAction {
                tx,
                inclusion: Inclusion::Broadcasted,
                status: None,
                r#final: None,
            },
        );
        self.commit(next)
    }

    /// Apply status updates. Final transactions stop being tracked, except
    /// successful commits, which are kept until their reveal is final or
    /// their epoch has passed.
    pub fn update_txs(&mut self, updates: &[TxUpdate]) -> Result<(), StorageError> {
        let mut next = self.data.clone();
        for update in updates {
            Self::apply_tx_update(&mut next.onchain_actions, update);
        }
        self.commit(next)
    }

    fn apply_tx_update(actions: &mut BTreeMap<H256, OnChainAction>, update: &TxUpdate) {
        let Some(action) = actions.get_mut(&update.hash) else {
            return;
        };
        action.inclusion = update.inclusion;
        action.status = update.status;
        action.r#final = update.r#final;

        if action.r#final.is_none() {
            return;
        }
        match &action.tx {
            TxMetadata::Commit { .. } if action.succeeded() => {}
            TxMetadata::Commit { .. } => {
                warn!("Commit {} failed on chain", update.hash);
                actions.remove(&update.hash);
            }
            TxMetadata::Reveal { commit_tx, .. } => {
                let commit_tx = *commit_tx;
                if action.succeeded() {
                    actions.remove(&commit_tx);
                } else {
                    warn!("Reveal {} failed on chain", update.hash);
                }
                actions.remove(&update.hash);
            }
        }
    }

    /// Successful commit for `epoch` that has no reveal in flight.
    pub fn pending_commit(&self, epoch: &Epoch) -> Option<(H256, &CommitRecord)> {
        let revealing: Vec<H256> = self
            .data
            .onchain_actions
            .values()
            .filter_map(|action| match &action.tx {
                TxMetadata::Reveal { commit_tx, .. } => Some(*commit_tx),
                TxMetadata::Commit { .. } => None,
            })
            .collect();

        self.data.onchain_actions.iter().find_map(|(hash, action)| match &action.tx {
            TxMetadata::Commit { record }
                if record.epoch.hash == epoch.hash && action.succeeded() && !revealing.contains(hash) =>
            {
                Some((*hash, record))
            }
            _ => None,
        })
    }

    /// Stop tracking every transaction, commit or reveal, whose epoch is
    /// before `current`. Returns how many were dropped.
    pub fn reconcile(&mut self, current: &Epoch) -> Result<usize, StorageError> {
        let expired: Vec<H256> = self
            .data
            .onchain_actions
            .iter()
            .filter(|(_, action)| action.tx.epoch().number < current.number)
            .map(|(hash, _)| *hash)
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }
        let mut next = self.data.clone();
        for hash in &expired {
            info!("Dropping expired tx {}", hash);
            next.onchain_actions.remove(hash);
        }
        self.commit(next)?;
        Ok(expired.len())
    }
}
