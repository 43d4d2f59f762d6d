// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Error taxonomy for skip lists, proofs, and the integrity check.

use thiserror::Error;

use crate::key::Basis;
use crate::key::Key;
use crate::proof::Proof;

/// Errors raised while loading a `Config`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("max_tower_height {0} leaves no room for the sentinel towers")]
    TowerHeight(u8),
}

/// Errors raised by an authenticated skip list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipListError {
    /// Sentinels can never be inserted, updated or deleted.
    #[error("operation on sentinel {0:?}")]
    Sentinel(Key),
    #[error("pathname {0:?} already present")]
    AlreadyPresent(Key),
    #[error("pathname {0:?} not present")]
    Absent(Key),
    #[error("empty filehash for {0:?}")]
    EmptyFilehash(Key),
    /// The node graph is inconsistent. The instance must be discarded.
    #[error("malformed skip list: {0}")]
    Malformed(String),
    /// Proxy labels are fixed; they cannot be outdated or recomputed.
    #[error("proxy node ({key:?}, {height}) cannot be recomputed")]
    ProxyOutdated { key: Key, height: u8 },
    /// Any failure while computing the root label.
    #[error("unexpected basis: {0}")]
    UnexpectedBasis(Box<SkipListError>),
}

impl SkipListError {
    /// True for caller misuse, as opposed to a broken structure.
    pub fn is_handling(&self) -> bool {
        return matches!(
            self,
            SkipListError::Sentinel(_)
                | SkipListError::AlreadyPresent(_)
                | SkipListError::Absent(_)
                | SkipListError::EmptyFilehash(_)
        );
    }
}

/// Errors raised while validating or applying a server proof.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("malformed proof: {0}")]
    Malformed(String),
    /// The proof was built for another operation or pathname.
    #[error("unrelated proof: expected {expected}, found {found}")]
    Unrelated { expected: String, found: String },
    #[error(transparent)]
    Structure(#[from] SkipListError),
}

/// Errors surfaced to the network layer.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("invalid pathname {0:?}")]
    InvalidPathname(String),
    #[error(transparent)]
    Proof(#[from] ProofError),
    /// The proof is well formed but disagrees with the trusted basis.
    #[error("basis mismatch for {pathname:?}: proof implies {basis}")]
    BasisMismatch {
        pathname: String,
        basis: Basis,
        proof: Box<Proof>,
    },
    /// The server's post-commit basis cannot be reproduced locally.
    #[error("commit basis mismatch: computed {computed}, server declared {declared}")]
    CommitMismatch { computed: Basis, declared: Basis },
    /// The accepted operations cannot be replayed into a candidate basis.
    #[error("pending operations cannot be replayed: {0}")]
    Replay(ProofError),
    #[error("no trusted basis and trust on first use is disabled")]
    UntrustedBasis,
}

impl IntegrityError {
    /// Critical errors mean possible tampering and call for a full resync.
    pub fn is_critical(&self) -> bool {
        return matches!(
            self,
            IntegrityError::CommitMismatch { .. } | IntegrityError::Replay(_)
        );
    }
}
