// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Proof extraction from a complete skip list, as the server does it.

use crate::asl::AuthSkipList;
use crate::asl::NodeId;
use crate::error::SkipListError;
use crate::key::Key;
use crate::proof::Link;
use crate::proof::Operation;
use crate::proof::Proof;
use crate::proof::ProofNode;
use crate::proof::ProofPath;
use crate::proof::Verb;

/// The path from the leaf of `key` up to the root. Every child off the path
/// becomes a proxy carrying its current label.
pub fn prove_path(list: &mut AuthSkipList, key: &Key) -> Result<ProofPath, SkipListError> {
    let Some(leaf) = list.leaf(key) else {
        return Err(SkipListError::Absent(key.clone()));
    };
    // Fill in every outdated label so the proxies below can read them.
    list.basis(false)?;

    let mut nodes = Vec::new();
    let mut prev: Option<NodeId> = None;
    let mut current = Some(leaf);
    while let Some(id) = current {
        let node = list.node(id);
        if node.is_proxy() {
            return Err(SkipListError::Malformed(format!(
                "path of {:?} crosses proxy ({:?}, {})",
                key, node.key, node.height
            )));
        }
        nodes.push(ProofNode {
            key: node.key.clone(),
            height: node.height,
            filehash: node.filehash().map(|filehash| filehash.to_vec()),
            lower: link(list, node.lower(), prev)?,
            right: link(list, node.right(), prev)?,
        });
        prev = Some(id);
        current = node.father;
    }
    return Ok(ProofPath { nodes });
}

fn link(list: &AuthSkipList, child: Option<NodeId>, prev: Option<NodeId>) -> Result<Link, SkipListError> {
    let Some(child) = child else {
        return Ok(Link::None);
    };
    if Some(child) == prev {
        return Ok(Link::Path);
    }
    let node = list.node(child);
    let Some(label) = node.label.clone() else {
        return Err(SkipListError::Malformed(format!(
            "({:?}, {}) has no label",
            node.key, node.height
        )));
    };
    return Ok(Link::Proxy {
        key: node.key.clone(),
        height: node.height,
        label,
    });
}

/// Build the proof the client needs for `operation` on `pathname`.
///
/// - insert: the predecessor's path, which holds every left buddy
/// - update and verify: the target's path
/// - delete: the target's and the predecessor's paths
/// - verify2: the predecessor's path, plus the successor's unless it is +INF
pub fn prove(list: &mut AuthSkipList, operation: Operation, pathname: &str) -> Result<Proof, SkipListError> {
    let key = Key::parse(pathname);
    if key.is_sentinel() {
        return Err(SkipListError::Sentinel(key));
    }
    let mut verb = operation.verb();
    if verb == Verb::Insert && list.contains(&key) {
        verb = Verb::Update;
    }

    let gap = list.find_gap(&key)?;
    let mut paths = Vec::new();
    match verb {
        Verb::Insert => paths.push(prove_path(list, &gap.below)?),
        Verb::Update | Verb::Verify => paths.push(prove_path(list, &key)?),
        Verb::Delete => {
            paths.push(prove_path(list, &key)?);
            paths.push(prove_path(list, &gap.below)?);
        }
        Verb::Verify2 => {
            if gap.above == key {
                return Err(SkipListError::AlreadyPresent(key));
            }
            paths.push(prove_path(list, &gap.below)?);
            if gap.above != Key::PosInf {
                paths.push(prove_path(list, &gap.above)?);
            }
        }
    }

    return Ok(Proof {
        operation,
        pathname: pathname.to_string(),
        paths,
    });
}
