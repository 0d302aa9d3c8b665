//! Commit-Reveal Proofs
//!
//! Commitment hashing and reveal construction, bit-compatible with the
//! Dungeon contract.

pub mod commitment;

// Re-export key types
pub use commitment::{
    generate_secret, CommitCall, CommitRecord, CommitmentBuilder, CommitmentError, CommitmentPreimage, RevealCall,
};
