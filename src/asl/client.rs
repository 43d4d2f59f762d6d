// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Client-side skip lists, rebuilt from proof paths.
//!
//! The server never sends the whole list. Each proof path carries the real
//! nodes from one leaf up to the root, and proxies for everything hanging off
//! that chain. Paths are merged by position: a proxy at `(key, height)` in one
//! path and a real node at the same position in another are the same place
//! in the list, so the real node replaces the proxy.
//!
//! 1. Sort paths by their leaf's pathname; the lowest becomes the skeleton.
//! 2. Every proxy in the skeleton is an open slot.
//! 3. Walk each other path bottom-up until a node lands on an open slot, then
//!    splice that part of the path in. Its proxies become open slots too.
//!
//! Positions that no path reveals stay proxies and contribute their fixed
//! labels to the basis.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tracing::trace;

use super::node::Node;
use super::node::NodeId;
use super::skip_list::AuthSkipList;
use crate::config::sentinel_height;
use crate::error::ProofError;
use crate::error::SkipListError;
use crate::key::Key;
use crate::proof::Link;
use crate::proof::ProofNode;
use crate::proof::ProofPath;

type Position = (Key, u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Lower,
    Right,
}

/// Where a proxy hangs in the tree being merged.
#[derive(Clone, Copy, Debug)]
struct Slot {
    parent: NodeId,
    side: Side,
    proxy: NodeId,
}

/// Accumulates proof paths into one tree.
struct Merge {
    list: AuthSkipList,
    /// Proxies that a real node may still replace.
    slots: FxHashMap<Position, Slot>,
    /// Positions already held by real nodes.
    real: FxHashMap<Position, NodeId>,
    /// Positions that were spliced once and must never be replaced again.
    resolved: FxHashSet<Position>,
    root: Option<NodeId>,
}

impl Merge {
    fn new(max_tower_height: u8) -> Merge {
        return Merge {
            list: AuthSkipList::bare(max_tower_height),
            slots: FxHashMap::default(),
            real: FxHashMap::default(),
            resolved: FxHashSet::default(),
            root: None,
        };
    }

    /// Materialize `nodes` bottom-up, chaining each to the previous one.
    /// Returns the id of the last node.
    fn materialize(&mut self, nodes: &[ProofNode]) -> Result<NodeId, SkipListError> {
        let mut prev: Option<NodeId> = None;
        for node in nodes {
            let id = self.list.alloc(Node::real(node.key.clone(), node.height, node.filehash.clone()));
            let lower = self.child(id, &node.lower, prev, Side::Lower);
            let right = self.child(id, &node.right, prev, Side::Right);
            self.list.set_lower(id, lower)?;
            self.list.set_right(id, right)?;
            self.real.insert((node.key.clone(), node.height), id);
            prev = Some(id);
        }
        return prev.ok_or_else(|| SkipListError::Malformed("empty path".into()));
    }

    fn child(&mut self, parent: NodeId, link: &Link, prev: Option<NodeId>, side: Side) -> Option<NodeId> {
        return match link {
            Link::None => None,
            Link::Path => prev,
            Link::Proxy { key, height, label } => {
                let proxy = self.list.alloc(Node::proxy(key.clone(), *height, label.clone()));
                let position = (key.clone(), *height);
                if !self.real.contains_key(&position) && !self.resolved.contains(&position) {
                    self.slots.insert(position, Slot { parent, side, proxy });
                }
                Some(proxy)
            }
        };
    }

    fn add_skeleton(&mut self, path: &ProofPath) -> Result<(), ProofError> {
        self.root = Some(self.materialize(&path.nodes)?);
        return Ok(());
    }

    /// Splice the lower part of `path` into the skeleton.
    fn add_path(&mut self, path: &ProofPath) -> Result<(), ProofError> {
        let mut splice = None;
        for (i, node) in path.nodes.iter().enumerate() {
            let position = (node.key.clone(), node.height);
            if self.real.contains_key(&position) {
                if i == 0 {
                    // Same leaf as a path merged earlier.
                    return Ok(());
                }
                return Err(ProofError::Malformed(format!(
                    "path rejoins the tree at ({:?}, {}) without meeting a proxy",
                    node.key, node.height
                )));
            }
            if self.slots.contains_key(&position) {
                splice = Some(i);
                break;
            }
        }

        let Some(end) = splice else {
            let leaf = path.leaf().map(|leaf| leaf.key.clone());
            return Err(ProofError::Malformed(format!(
                "path from {:?} does not connect to the other paths",
                leaf
            )));
        };

        let position = (path.nodes[end].key.clone(), path.nodes[end].height);
        let Some(slot) = self.slots.remove(&position) else {
            return Err(ProofError::Malformed("open slot vanished".into()));
        };
        let id = self.materialize(&path.nodes[..=end])?;
        match slot.side {
            Side::Lower => self.list.set_lower(slot.parent, Some(id))?,
            Side::Right => self.list.set_right(slot.parent, Some(id))?,
        }
        self.list.release(slot.proxy);
        self.resolved.insert(position);
        trace!(key = ?path.nodes[end].key, height = path.nodes[end].height, "splice");
        return Ok(());
    }

    fn finish(mut self) -> Result<AuthSkipList, ProofError> {
        let Some(root) = self.root else {
            return Err(ProofError::Malformed("no proof paths".into()));
        };
        let top = self.list.node(root);
        if top.key != Key::NegInf || top.height != sentinel_height(self.list.max_tower_height()) {
            return Err(ProofError::Malformed(format!(
                "paths end at ({:?}, {}) instead of the root",
                top.key, top.height
            )));
        }
        self.list.set_root(root);
        self.list.normalize()?;
        return Ok(self.list);
    }
}

impl AuthSkipList {
    /// Build a client-side list from one or more proof paths.
    ///
    /// Paths are validated, merged, and normalized; the result supports
    /// `basis`, `insert`, `update` and `delete` wherever the paths reveal
    /// enough of the structure.
    pub fn from_proof_paths(paths: &[&ProofPath], max_tower_height: u8) -> Result<AuthSkipList, ProofError> {
        for path in paths {
            path.validate(max_tower_height)?;
        }
        let mut sorted: Vec<&ProofPath> = paths.to_vec();
        sorted.sort_by(|a, b| {
            let a = a.leaf().map(|leaf| &leaf.key);
            let b = b.leaf().map(|leaf| &leaf.key);
            return a.cmp(&b);
        });

        let mut merge = Merge::new(max_tower_height);
        let mut iter = sorted.into_iter();
        if let Some(first) = iter.next() {
            merge.add_skeleton(first)?;
        }
        for path in iter {
            merge.add_path(path)?;
        }
        return merge.finish();
    }

    /// Register every pathname, leaf and plateau reachable from the root.
    pub(crate) fn normalize(&mut self) -> Result<(), SkipListError> {
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            let key = node.key.clone();
            let proxy = node.is_proxy();
            let height = node.height;
            let children = [node.right(), node.lower()];

            self.register_key(key.clone());
            if !proxy {
                if height == 0 {
                    self.register_leaf(key.clone(), id);
                }
                if self.is_plateau(id)? {
                    self.register_plateau(key, id);
                }
            }
            stack.extend(children.into_iter().flatten());
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Label;
    use crate::key::hash;
    use crate::prover;

    fn filehash(name: &str) -> Vec<u8> {
        return hash(&[name.as_bytes()]).0;
    }

    fn server(names: &[&str]) -> AuthSkipList {
        let mut list = AuthSkipList::new();
        for name in names {
            list.insert(&Key::path(name), filehash(name)).unwrap();
        }
        return list;
    }

    #[test]
    fn single_path_reproduces_basis() {
        let mut list = server(&["a", "b", "c"]);
        let basis = list.basis(false).unwrap();
        let path = prover::prove_path(&mut list, &Key::path("b")).unwrap();
        let mut client = AuthSkipList::from_proof_paths(&[&path], 16).unwrap();
        assert_eq!(client.basis(true).unwrap(), basis);
        client.check_invariants().unwrap();
        assert_eq!(client.filehash(&Key::path("b")), Some(filehash("b").as_slice()));
    }

    #[test]
    fn merged_paths_reproduce_basis() {
        let mut list = server(&["a", "b", "c", "d", "e", "f"]);
        let basis = list.basis(false).unwrap();
        let paths: Vec<ProofPath> = ["f", "a", "d"]
            .iter()
            .map(|name| prover::prove_path(&mut list, &Key::path(name)).unwrap())
            .collect();
        let refs: Vec<&ProofPath> = paths.iter().collect();
        let mut client = AuthSkipList::from_proof_paths(&refs, 16).unwrap();
        assert_eq!(client.basis(true).unwrap(), basis);
        client.check_invariants().unwrap();
        for name in ["a", "d", "f"] {
            assert!(client.leaf(&Key::path(name)).is_some());
        }
    }

    #[test]
    fn merging_twice_is_merging_once() {
        let mut list = server(&["a", "b", "c"]);
        let a = prover::prove_path(&mut list, &Key::path("a")).unwrap();
        let c = prover::prove_path(&mut list, &Key::path("c")).unwrap();
        let mut once = AuthSkipList::from_proof_paths(&[&a, &c], 16).unwrap();
        let mut twice = AuthSkipList::from_proof_paths(&[&a, &c, &c, &a], 16).unwrap();
        assert_eq!(once.node_count(), twice.node_count());
        assert_eq!(once.basis(true).unwrap(), twice.basis(true).unwrap());
    }

    #[test]
    fn unrevealed_positions_stay_proxies() {
        let mut list = server(&["a", "b", "c"]);
        let path = prover::prove_path(&mut list, &Key::path("a")).unwrap();
        let mut client = AuthSkipList::from_proof_paths(&[&path], 16).unwrap();
        // The pathnames are known through the proxies, but their leaves are not.
        assert!(client.contains(&Key::PosInf));
        assert!(client.leaf(&Key::PosInf).is_none());
        let root = client.root();
        assert!(matches!(
            client.outdate_ancestors(client.node(root).right().unwrap()),
            Err(SkipListError::ProxyOutdated { .. })
        ));
        client.basis(true).unwrap();
    }

    #[test]
    fn path_that_stops_short_of_the_root_is_rejected() {
        let mut list = server(&["a"]);
        let mut path = prover::prove_path(&mut list, &Key::path("a")).unwrap();
        path.nodes.pop();
        let result = AuthSkipList::from_proof_paths(&[&path], 16);
        assert!(matches!(result, Err(ProofError::Malformed(_))));
    }

    #[test]
    fn foreign_paths_do_not_merge() {
        let mut one = server(&["a", "b"]);
        let mut two = server(&["a", "b", "c"]);
        let a = prover::prove_path(&mut one, &Key::path("a")).unwrap();
        let c = prover::prove_path(&mut two, &Key::path("c")).unwrap();
        // Both reach the root, but c's path was built against another list;
        // whatever happens, it must not yield the first list's basis.
        let expected = one.basis(false).unwrap();
        match AuthSkipList::from_proof_paths(&[&a, &c], 16) {
            Ok(mut merged) => assert_ne!(merged.basis(true).ok(), Some(expected)),
            Err(err) => assert!(matches!(err, ProofError::Malformed(_) | ProofError::Structure(_))),
        }
    }

    #[test]
    fn tampered_proxy_label_changes_basis() {
        let mut list = server(&["a", "b"]);
        let basis = list.basis(false).unwrap();
        let mut path = prover::prove_path(&mut list, &Key::path("a")).unwrap();
        for node in path.nodes.iter_mut() {
            if let Link::Proxy { label, .. } = &mut node.right {
                *label = Label(vec![0; 32]);
                break;
            }
        }
        let mut client = AuthSkipList::from_proof_paths(&[&path], 16).unwrap();
        assert_ne!(client.basis(true).unwrap(), basis);
    }

    #[test]
    fn no_paths_is_malformed() {
        let result = AuthSkipList::from_proof_paths(&[], 16);
        assert!(matches!(result, Err(ProofError::Malformed(_))));
    }
}
