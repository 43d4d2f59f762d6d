// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Validation of server proofs and replay of pending operations.
//!
//! Every proof is checked on its own first: it is rebuilt into a disposable
//! client list, classified, shape-checked, and reduced to the basis it
//! implies. At commit time all pending proofs are merged into one fresh
//! list, the mutations are replayed in order, and the resulting basis is the
//! candidate the server's claim is compared against.

use tracing::debug;

use crate::asl::AuthSkipList;
use crate::error::ProofError;
use crate::error::SkipListError;
use crate::key::Basis;
use crate::key::Key;
use crate::proof::Proof;
use crate::proof::ProofPath;
use crate::proof::Verb;

/// An operation accepted but not yet confirmed by a commit.
#[derive(Clone, Debug)]
pub struct PendingOperation {
    pub proof: Proof,
    pub verb: Verb,
    pub filehash: Option<Vec<u8>>,
}

/// Outcome of checking a single proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub verb: Verb,
    /// The basis implied by this proof alone.
    pub basis: Basis,
}

pub struct ProofManager {
    max_tower_height: u8,
    pending: Vec<PendingOperation>,
}

impl ProofManager {
    pub fn new(max_tower_height: u8) -> ProofManager {
        return ProofManager {
            max_tower_height,
            pending: Vec::new(),
        };
    }

    pub fn pending(&self) -> &[PendingOperation] {
        return &self.pending;
    }

    pub fn is_empty(&self) -> bool {
        return self.pending.is_empty();
    }

    /// Validate a proof and return its verb and the basis it implies,
    /// without queuing it.
    pub fn evaluate(&self, proof: &Proof, filehash: Option<&[u8]>) -> Result<Evaluation, ProofError> {
        let target = proof.target();
        if target.is_sentinel() {
            return Err(SkipListError::Sentinel(target).into());
        }
        if proof.paths.is_empty() {
            return Err(ProofError::Malformed(format!("no paths for {:?}", target)));
        }

        let paths: Vec<&ProofPath> = proof.paths.iter().collect();
        let mut list = AuthSkipList::from_proof_paths(&paths, self.max_tower_height)?;
        let verb = consolidate(proof.operation.verb(), &list, &target);

        match verb {
            Verb::Verify => check_membership(proof, &target, filehash)?,
            Verb::Verify2 => check_gap(proof, &list, &target)?,
            Verb::Insert | Verb::Update => {
                if filehash.is_none_or(|filehash| filehash.is_empty()) {
                    return Err(SkipListError::EmptyFilehash(target).into());
                }
            }
            Verb::Delete => {}
        }

        let basis = list.basis(true)?;
        // The list is disposable: replaying here rejects proofs too thin for
        // the mutation before they reach the commit.
        if verb.is_mutation() {
            apply(&mut list, verb, &target, filehash)?;
        }

        debug!(
            operation = ?proof.operation,
            pathname = %proof.pathname,
            ?verb,
            basis = %basis,
            "proof evaluated"
        );
        return Ok(Evaluation { verb, basis });
    }

    /// Validate and queue an operation. Returns the basis its proof implies.
    pub fn add_operation(&mut self, proof: Proof, filehash: Option<Vec<u8>>) -> Result<Basis, ProofError> {
        let evaluation = self.evaluate(&proof, filehash.as_deref())?;
        self.push(proof, evaluation.verb, filehash);
        return Ok(evaluation.basis);
    }

    pub fn push(&mut self, proof: Proof, verb: Verb, filehash: Option<Vec<u8>>) {
        self.pending.push(PendingOperation { proof, verb, filehash });
    }

    /// The basis after replaying every pending operation, or `None` when
    /// nothing is pending.
    pub fn get_basis(&self) -> Result<Option<Basis>, ProofError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let paths: Vec<&ProofPath> = self
            .pending
            .iter()
            .flat_map(|op| op.proof.paths.iter())
            .collect();
        let mut list = AuthSkipList::from_proof_paths(&paths, self.max_tower_height)?;
        let mut mutations = 0;
        for op in &self.pending {
            // Earlier operations in the batch may have created the target.
            let target = op.proof.target();
            let verb = consolidate(op.proof.operation.verb(), &list, &target);
            if verb.is_mutation() {
                apply(&mut list, verb, &target, op.filehash.as_deref())?;
                mutations += 1;
            }
        }
        let basis = list.basis(true)?;
        debug!(operations = self.pending.len(), mutations, basis = %basis, "candidate basis");
        return Ok(Some(basis));
    }

    pub fn flush(&mut self) {
        self.pending.clear();
    }
}

/// Tell insert from update: an upload of a pathname the proof shows to
/// exist is an update.
fn consolidate(verb: Verb, list: &AuthSkipList, target: &Key) -> Verb {
    if verb == Verb::Insert && list.contains(target) {
        return Verb::Update;
    }
    return verb;
}

fn apply(list: &mut AuthSkipList, verb: Verb, target: &Key, filehash: Option<&[u8]>) -> Result<(), SkipListError> {
    return match verb {
        Verb::Insert => list.insert(target, filehash.unwrap_or_default().to_vec()),
        Verb::Update => list.update(target, filehash.unwrap_or_default().to_vec()),
        Verb::Delete => list.delete(target),
        Verb::Verify | Verb::Verify2 => Ok(()),
    };
}

/// The target's leaf must be in the proof, with the expected content.
fn check_membership(proof: &Proof, target: &Key, filehash: Option<&[u8]>) -> Result<(), ProofError> {
    let Some(leaf) = proof.leaves().into_iter().find(|leaf| leaf.key == *target) else {
        return Err(ProofError::Malformed(format!("no leaf for {:?}", target)));
    };
    if leaf.height != 0 || leaf.filehash.as_deref() != filehash {
        return Err(ProofError::Malformed(format!(
            "leaf of {:?} does not carry the expected filehash",
            target
        )));
    }
    return Ok(());
}

/// The proof must show that nothing sits at `target`: either two adjacent
/// pathnames strictly around it, or the greatest pathname below it.
fn check_gap(proof: &Proof, list: &AuthSkipList, target: &Key) -> Result<(), ProofError> {
    let Some((low, high)) = proof.bracket() else {
        return Err(ProofError::Malformed(format!("gap proof for {:?} has no paths", target)));
    };
    let high = match proof.paths.len() {
        1 => {
            if low >= *target {
                return Err(ProofError::Malformed(format!(
                    "{:?} is not below {:?}",
                    low, target
                )));
            }
            None
        }
        2 => {
            if !(low < *target && *target < high) {
                return Err(ProofError::Malformed(format!(
                    "{:?} is not strictly between {:?} and {:?}",
                    target, low, high
                )));
            }
            Some(high)
        }
        count => {
            return Err(ProofError::Malformed(format!(
                "gap proof for {:?} has {} paths",
                target, count
            )));
        }
    };

    let gap = list.find_gap(target).map_err(|err| {
        return ProofError::Malformed(format!("gap around {:?} is not covered: {}", target, err));
    })?;
    if gap.below != low {
        return Err(ProofError::Malformed(format!(
            "{:?} is not the greatest pathname below {:?}",
            low, target
        )));
    }
    match high {
        Some(high) if gap.above != high => {
            return Err(ProofError::Malformed(format!("{:?} and {:?} are not adjacent", low, high)));
        }
        None if gap.above == *target => {
            return Err(ProofError::Malformed(format!("{:?} is present", target)));
        }
        _ => {}
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::hash;
    use crate::proof::Operation;
    use crate::prover;

    fn filehash(name: &str) -> Vec<u8> {
        return hash(&[b"file:", name.as_bytes()]).0;
    }

    fn server(names: &[&str]) -> AuthSkipList {
        let mut list = AuthSkipList::new();
        for name in names {
            list.insert(&Key::path(name), filehash(name)).unwrap();
        }
        return list;
    }

    #[test]
    fn nothing_pending_means_no_basis() {
        let manager = ProofManager::new(16);
        assert_eq!(manager.get_basis(), Ok(None));
    }

    #[test]
    fn verify_checks_filehash() {
        let mut list = server(&["a", "b", "c"]);
        let basis = list.basis(false).unwrap();
        let proof = prover::prove(&mut list, Operation::Download, "b").unwrap();
        let mut manager = ProofManager::new(16);

        let wrong = manager.add_operation(proof.clone(), Some(filehash("x")));
        assert!(matches!(wrong, Err(ProofError::Malformed(_))));
        assert!(manager.is_empty());

        let implied = manager.add_operation(proof, Some(filehash("b"))).unwrap();
        assert_eq!(implied, basis);
        assert_eq!(manager.pending()[0].verb, Verb::Verify);
    }

    #[test]
    fn verify_needs_the_target_leaf() {
        let mut list = server(&["a", "b"]);
        let mut proof = prover::prove(&mut list, Operation::Download, "a").unwrap();
        proof.pathname = "b".into();
        let manager = ProofManager::new(16);
        let result = manager.evaluate(&proof, Some(&filehash("b")));
        assert!(matches!(result, Err(ProofError::Malformed(_))));
    }

    #[test]
    fn upload_of_existing_pathname_is_an_update() {
        let mut list = server(&["a", "b"]);
        let proof = prover::prove(&mut list, Operation::Upload, "b").unwrap();
        let manager = ProofManager::new(16);
        let evaluation = manager.evaluate(&proof, Some(&filehash("new"))).unwrap();
        assert_eq!(evaluation.verb, Verb::Update);

        let proof = prover::prove(&mut list, Operation::Upload, "c").unwrap();
        let evaluation = manager.evaluate(&proof, Some(&filehash("c"))).unwrap();
        assert_eq!(evaluation.verb, Verb::Insert);
    }

    #[test]
    fn insert_without_filehash_is_rejected() {
        let mut list = server(&["a"]);
        let proof = prover::prove(&mut list, Operation::Upload, "b").unwrap();
        let manager = ProofManager::new(16);
        let result = manager.evaluate(&proof, None);
        assert_eq!(
            result,
            Err(ProofError::Structure(SkipListError::EmptyFilehash(Key::path("b"))))
        );
    }

    #[test]
    fn gap_proof_between_neighbors() {
        let mut list = server(&["a", "c"]);
        let basis = list.basis(false).unwrap();
        let proof = prover::prove(&mut list, Operation::DeleteLocal, "b").unwrap();
        let manager = ProofManager::new(16);
        let evaluation = manager.evaluate(&proof, None).unwrap();
        assert_eq!(evaluation.verb, Verb::Verify2);
        assert_eq!(evaluation.basis, basis);
    }

    #[test]
    fn gap_proof_rejects_target_on_a_bracket() {
        let mut list = server(&["a", "c"]);
        let mut proof = prover::prove(&mut list, Operation::DeleteLocal, "b").unwrap();
        proof.pathname = "a".into();
        let manager = ProofManager::new(16);
        assert!(matches!(manager.evaluate(&proof, None), Err(ProofError::Malformed(_))));
    }

    #[test]
    fn gap_proof_rejects_non_adjacent_brackets() {
        let mut list = server(&["a", "b", "c"]);
        let a = prover::prove_path(&mut list, &Key::path("a")).unwrap();
        let c = prover::prove_path(&mut list, &Key::path("c")).unwrap();
        let proof = Proof {
            operation: Operation::DeleteLocal,
            pathname: "bb".into(),
            paths: vec![a, c],
        };
        let manager = ProofManager::new(16);
        assert!(matches!(manager.evaluate(&proof, None), Err(ProofError::Malformed(_))));
    }

    #[test]
    fn single_path_gap_proof_must_be_the_closest() {
        let mut list = server(&["a", "b"]);
        let proof = prover::prove(&mut list, Operation::DeleteLocal, "c").unwrap();
        let manager = ProofManager::new(16);
        assert_eq!(manager.evaluate(&proof, None).unwrap().verb, Verb::Verify2);

        let a = prover::prove_path(&mut list, &Key::path("a")).unwrap();
        let far = Proof {
            operation: Operation::DeleteLocal,
            pathname: "c".into(),
            paths: vec![a],
        };
        assert!(matches!(manager.evaluate(&far, None), Err(ProofError::Malformed(_))));
    }

    #[test]
    fn replayed_batch_matches_server() {
        let mut list = server(&["a", "c", "e"]);
        let mut manager = ProofManager::new(16);
        let insert = prover::prove(&mut list, Operation::Upload, "b").unwrap();
        let update = prover::prove(&mut list, Operation::Upload, "c").unwrap();
        let delete = prover::prove(&mut list, Operation::Delete, "e").unwrap();
        manager.add_operation(insert, Some(filehash("b"))).unwrap();
        manager.add_operation(update, Some(filehash("c2"))).unwrap();
        manager.add_operation(delete, None).unwrap();

        list.insert(&Key::path("b"), filehash("b")).unwrap();
        list.update(&Key::path("c"), filehash("c2")).unwrap();
        list.delete(&Key::path("e")).unwrap();
        let expected = list.basis(false).unwrap();

        assert_eq!(manager.get_basis(), Ok(Some(expected)));
        manager.flush();
        assert!(manager.is_empty());
    }

    #[test]
    fn sentinel_target_is_a_handling_error() {
        let mut list = server(&["a"]);
        let mut proof = prover::prove(&mut list, Operation::Download, "a").unwrap();
        proof.pathname = "+INF".into();
        let manager = ProofManager::new(16);
        assert_eq!(
            manager.evaluate(&proof, None),
            Err(ProofError::Structure(SkipListError::Sentinel(Key::PosInf)))
        );
    }
}
