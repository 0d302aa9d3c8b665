//! Commit-Reveal Protocol
//!
//! During the commit window a player publishes a truncated hash of their
//! actions. During the reveal window they publish the preimage; the
//! contract recomputes the hash and resolves the actions.
//!
//! ## Commitment encoding
//!
//! ```text
//! keccak256(abi.encode(
//!     bytes32 secret,
//!     (uint64 position, bool pickTreasure)[] actions,
//!     uint16 combatStance
//! ))[0..24]
//! ```

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::bytes::{Address, Bytes24, H256};
use crate::core::hash::{encode_uint256, keccak256};
use crate::game::action::{Action, RevealAction};
use crate::game::epoch::Epoch;
use crate::game::offchain::MAX_ACTIONS;

/// Offset of the dynamic actions array in the encoded head (3 words).
const ACTIONS_OFFSET: u64 = 3 * 32;

/// Generate a fresh one-time secret.
pub fn generate_secret<R: RngCore + ?Sized>(rng: &mut R) -> H256 {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    H256(bytes)
}

/// Everything that is hashed into a commitment. Kept secret until reveal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPreimage {
    /// One-time secret.
    pub secret: H256,
    /// Actions to resolve.
    pub actions: Vec<RevealAction>,
    /// Combat stance for this epoch.
    pub combat_stance: u16,
}

impl CommitmentPreimage {
    /// ABI encoding of `(bytes32, (uint64,bool)[], uint16)`.
    pub fn abi_encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * (4 + 2 * self.actions.len()));
        out.extend_from_slice(&self.secret.0);
        out.extend_from_slice(&encode_uint256(ACTIONS_OFFSET));
        out.extend_from_slice(&encode_uint256(self.combat_stance as u64));
        out.extend_from_slice(&encode_uint256(self.actions.len() as u64));
        for action in &self.actions {
            out.extend_from_slice(&encode_uint256(action.position));
            out.extend_from_slice(&encode_uint256(action.pick_treasure as u64));
        }
        out
    }

    /// Truncated commitment hash.
    pub fn commitment_hash(&self) -> Bytes24 {
        let digest = keccak256(&self.abi_encode());
        let mut out = [0u8; 24];
        out.copy_from_slice(&digest.0[..24]);
        Bytes24(out)
    }
}

/// Arguments of the contract's `makeCommitment`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitCall {
    /// Committing account.
    pub committer: Address,
    /// Truncated commitment hash.
    pub commitment_hash: Bytes24,
}

/// Arguments of the contract's `resolve`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealCall {
    /// Committing account.
    pub committer: Address,
    /// Secret from the commitment.
    pub secret: H256,
    /// Actions from the commitment.
    pub actions: Vec<RevealAction>,
    /// Combat stance from the commitment.
    pub combat_stance: u16,
    /// Opaque extra data forwarded to the contract.
    pub extra_data: Bytes24,
}

impl RevealCall {
    /// Preimage this reveal claims.
    pub fn preimage(&self) -> CommitmentPreimage {
        CommitmentPreimage {
            secret: self.secret,
            actions: self.actions.clone(),
            combat_stance: self.combat_stance,
        }
    }

    /// Check a reveal against the published commitment, the way the
    /// contract does before resolving.
    pub fn verify(&self, commit: &CommitCall) -> Result<(), CommitmentError> {
        if self.committer != commit.committer {
            return Err(CommitmentError::CommitterMismatch);
        }
        if self.actions.len() > MAX_ACTIONS {
            return Err(CommitmentError::TooManyActions(self.actions.len()));
        }
        let computed = self.preimage().commitment_hash();
        if computed != commit.commitment_hash {
            return Err(CommitmentError::HashMismatch {
                expected: commit.commitment_hash,
                got: computed,
            });
        }
        Ok(())
    }
}

/// Locally held record of a commitment, kept until it is revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Epoch the commitment targets.
    pub epoch: Epoch,
    /// Committing account.
    pub committer: Address,
    /// Hashed data.
    pub preimage: CommitmentPreimage,
}

impl CommitRecord {
    /// Published part.
    pub fn commit_call(&self) -> CommitCall {
        CommitCall {
            committer: self.committer,
            commitment_hash: self.preimage.commitment_hash(),
        }
    }

    /// Reveal for this commitment.
    pub fn reveal_call(&self, extra_data: Bytes24) -> RevealCall {
        RevealCall {
            committer: self.committer,
            secret: self.preimage.secret,
            actions: self.preimage.actions.clone(),
            combat_stance: self.preimage.combat_stance,
            extra_data,
        }
    }
}

/// Errors that can occur during reveal verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// Recomputed hash does not match the commitment.
    #[error("commitment mismatch: expected {expected}, got {got}")]
    HashMismatch {
        /// Published hash.
        expected: Bytes24,
        /// Hash of the revealed preimage.
        got: Bytes24,
    },

    /// Reveal is for another account.
    #[error("committer mismatch")]
    CommitterMismatch,

    /// More actions than a commitment may hold.
    #[error("too many actions: {0}")]
    TooManyActions(usize),

    /// Nothing to commit.
    #[error("no actions to commit")]
    NoActions,
}

/// Builder for commitments.
pub struct CommitmentBuilder {
    committer: Address,
    epoch: Epoch,
    actions: Vec<RevealAction>,
    combat_stance: u16,
    secret: Option<H256>,
}

impl CommitmentBuilder {
    /// Start a commitment for an account and epoch.
    pub fn new(committer: Address, epoch: Epoch) -> Self {
        Self {
            committer,
            epoch,
            actions: Vec::new(),
            combat_stance: 0,
            secret: None,
        }
    }

    /// Add the actions of an offchain log.
    pub fn actions(mut self, actions: &[Action]) -> Self {
        self.actions.extend(actions.iter().map(Action::to_reveal));
        self
    }

    /// Set the combat stance.
    pub fn combat_stance(mut self, stance: u16) -> Self {
        self.combat_stance = stance;
        self
    }

    /// Use a fixed secret instead of a random one.
    pub fn secret(mut self, secret: H256) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Build the record, drawing a secret from `rng` if none was set.
    pub fn build<R: RngCore + ?Sized>(self, rng: &mut R) -> Result<CommitRecord, CommitmentError> {
        if self.actions.is_empty() {
            return Err(CommitmentError::NoActions);
        }
        if self.actions.len() > MAX_ACTIONS {
            return Err(CommitmentError::TooManyActions(self.actions.len()));
        }
        let secret = match self.secret {
            Some(secret) => secret,
            None => generate_secret(rng),
        };
        Ok(CommitRecord {
            epoch: self.epoch,
            committer: self.committer,
            preimage: CommitmentPreimage {
                secret,
                actions: self.actions,
                combat_stance: self.combat_stance,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coords::Position;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_test_record() -> CommitRecord {
        let actions = [
            Action::move_to(Position::new(0, 0), Position::new(1, 0)),
            Action::move_to(Position::new(1, 0), Position::new(1, -1)),
        ];
        CommitmentBuilder::new(Address([1; 20]), Epoch::from_number(3))
            .actions(&actions)
            .combat_stance(7)
            .secret(H256([5; 32]))
            .build(&mut StdRng::seed_from_u64(0))
            .unwrap()
    }

    #[test]
    fn test_abi_layout() {
        let record = create_test_record();
        let encoded = record.preimage.abi_encode();
        assert_eq!(encoded.len(), 32 * (4 + 2 * 2));
        assert_eq!(&encoded[..32], &[5u8; 32]);
        assert_eq!(encoded[63], 0x60);
        assert_eq!(encoded[95], 7);
        assert_eq!(encoded[127], 2);
        // First tuple: position of (1,0) then pickTreasure = false.
        assert_eq!(&encoded[128..160], &encode_uint256(Position::new(1, 0).id()));
        assert_eq!(&encoded[160..192], &[0u8; 32]);
    }

    #[test]
    fn test_commitment_hash_is_truncated_keccak() {
        let record = create_test_record();
        let full = keccak256(&record.preimage.abi_encode());
        assert_eq!(record.preimage.commitment_hash().0[..], full.0[..24]);
    }

    #[test]
    fn test_reveal_verification() {
        let record = create_test_record();
        let commit = record.commit_call();
        let reveal = record.reveal_call(Bytes24::default());
        assert!(reveal.verify(&commit).is_ok());
    }

    #[test]
    fn test_tampered_reveal_fails() {
        let record = create_test_record();
        let commit = record.commit_call();

        let mut reveal = record.reveal_call(Bytes24::default());
        reveal.combat_stance = 8;
        assert!(matches!(reveal.verify(&commit), Err(CommitmentError::HashMismatch { .. })));

        let mut reveal = record.reveal_call(Bytes24::default());
        reveal.actions[1].pick_treasure = true;
        assert!(matches!(reveal.verify(&commit), Err(CommitmentError::HashMismatch { .. })));

        let mut reveal = record.reveal_call(Bytes24::default());
        reveal.committer = Address([2; 20]);
        assert_eq!(reveal.verify(&commit), Err(CommitmentError::CommitterMismatch));
    }

    #[test]
    fn test_random_secrets_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_ne!(generate_secret(&mut rng), generate_secret(&mut rng));
    }

    #[test]
    fn test_builder_rejects_empty() {
        let result = CommitmentBuilder::new(Address::default(), Epoch::from_number(1))
            .build(&mut StdRng::seed_from_u64(1));
        assert_eq!(result, Err(CommitmentError::NoActions));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = create_test_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"combatStance\":7"));
        let back: CommitRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
