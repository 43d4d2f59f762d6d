// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! The trusted basis and the two checks made against it.
//!
//! Per operation, the basis implied by the server's proof must equal the
//! trusted basis. Per commit, the basis obtained by replaying every pending
//! operation must equal the basis the server declares; only then does the
//! trusted basis advance.

use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::asl::AuthSkipList;
use crate::config::Config;
use crate::error::IntegrityError;
use crate::error::ProofError;
use crate::key::Basis;
use crate::proof::Operation;
use crate::proof::Proof;
use crate::proof_manager::ProofManager;

pub struct IntegrityManager {
    config: Config,
    trusted: Option<Basis>,
    proofs: ProofManager,
}

impl IntegrityManager {
    /// A manager with nothing trusted yet.
    pub fn new(config: Config) -> IntegrityManager {
        let proofs = ProofManager::new(config.max_tower_height);
        return IntegrityManager {
            config,
            trusted: None,
            proofs,
        };
    }

    /// A manager resuming from a basis persisted by the caller.
    pub fn with_basis(config: Config, basis: Basis) -> IntegrityManager {
        let mut manager = IntegrityManager::new(config);
        manager.trusted = Some(basis);
        return manager;
    }

    /// The basis of a storage holding no pathnames at all.
    pub fn empty_basis(config: &Config) -> Result<Basis, IntegrityError> {
        let mut list = AuthSkipList::with_config(config);
        return Ok(list.basis(false).map_err(ProofError::from)?);
    }

    pub fn current_basis(&self) -> Option<&Basis> {
        return self.trusted.as_ref();
    }

    pub fn set_current_basis(&mut self, basis: Basis) {
        self.trusted = Some(basis);
    }

    pub fn is_current(&self, basis: &Basis) -> bool {
        return self.trusted.as_ref() == Some(basis);
    }

    /// Number of operations waiting for a commit.
    pub fn pending(&self) -> usize {
        return self.proofs.pending().len();
    }

    /// Check an operation's proof against the trusted basis and queue it.
    ///
    /// Any UTF-8 pathname is accepted, the empty one included, except those
    /// containing NUL.
    pub fn add_operation(
        &mut self,
        operation: Operation,
        pathname: &str,
        proof: Proof,
        filehash: Option<Vec<u8>>,
    ) -> Result<(), IntegrityError> {
        if pathname.contains('\0') {
            return Err(IntegrityError::InvalidPathname(pathname.to_string()));
        }
        if proof.operation != operation || proof.pathname != pathname {
            return Err(ProofError::Unrelated {
                expected: format!("{:?} {}", operation, pathname),
                found: format!("{:?} {}", proof.operation, proof.pathname),
            }
            .into());
        }

        let evaluation = match self.proofs.evaluate(&proof, filehash.as_deref()) {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(?operation, pathname, %err, "proof rejected");
                return Err(err.into());
            }
        };

        if let Some(trusted) = &self.trusted {
            if *trusted != evaluation.basis {
                warn!(
                    ?operation,
                    pathname,
                    trusted = %trusted,
                    basis = %evaluation.basis,
                    "proof disagrees with trusted basis"
                );
                return Err(IntegrityError::BasisMismatch {
                    pathname: pathname.to_string(),
                    basis: evaluation.basis,
                    proof: Box::new(proof),
                });
            }
        } else if self.config.trust_on_first_use {
            warn!(basis = %evaluation.basis, "no trusted basis, trusting first proof");
            self.trusted = Some(evaluation.basis.clone());
        } else {
            return Err(IntegrityError::UntrustedBasis);
        }

        debug!(?operation, pathname, verb = ?evaluation.verb, "operation queued");
        self.proofs.push(proof, evaluation.verb, filehash);
        return Ok(());
    }

    /// Compare the server's post-commit basis with the locally replayed one.
    ///
    /// Pending operations are flushed whatever the outcome. On a mismatch or a
    /// failed replay the trusted basis stays put and the caller should
    /// resynchronize.
    pub fn check_commit_result(&mut self, server_basis: &Basis) -> Result<(), IntegrityError> {
        let candidate = self.proofs.get_basis();
        let count = self.proofs.pending().len();
        self.proofs.flush();

        let candidate = match candidate {
            Ok(Some(basis)) => basis,
            Ok(None) => {
                if let Some(trusted) = &self.trusted {
                    trusted.clone()
                } else if self.config.trust_on_first_use {
                    warn!(basis = %server_basis, "no trusted basis, trusting server commit");
                    self.trusted = Some(server_basis.clone());
                    return Ok(());
                } else {
                    return Err(IntegrityError::UntrustedBasis);
                }
            }
            Err(err) => {
                error!(operations = count, %err, "pending operations cannot be replayed");
                return Err(IntegrityError::Replay(err));
            }
        };

        if candidate != *server_basis {
            error!(
                operations = count,
                computed = %candidate,
                declared = %server_basis,
                "commit basis mismatch"
            );
            return Err(IntegrityError::CommitMismatch {
                computed: candidate,
                declared: server_basis.clone(),
            });
        }

        debug!(operations = count, basis = %candidate, "commit verified");
        self.trusted = Some(candidate);
        return Ok(());
    }
}
