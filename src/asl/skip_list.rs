// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Authenticated skip list over pathnames.
//!
//! Every pathname owns a tower of nodes, from its leaf at height 0 up to its
//! plateau. Tower heights are derived from a hash of the pathname, so any two
//! parties holding the same pathnames build the same shape and agree on the
//! root label (the basis).
//!
//! ```text
//! 2: -INF ────────────────────────────────────> +INF
//! 1: -INF ───────────> b ─────────────────────> +INF
//! 0: -INF ──> a ──> b ──────> c ──> d ────────> +INF
//! ```
//!
//! Seen as a tree, each node has a `lower` child (the node below it in the
//! same tower) and a `right` child (the next tower at this height, only when
//! that tower stops at this height). Labels are computed bottom-up:
//!
//! - leaf with right: `hash(key ‖ filehash ‖ label(right))`
//! - leaf without right: `key ‖ filehash`, not hashed
//! - internal with right: `hash(label(lower) ‖ label(right))`
//! - internal without right: `label(lower)`

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use super::node::Body;
use super::node::Node;
use super::node::NodeId;
use crate::config::Config;
use crate::config::TOWER_HEIGHT_LIMIT;
use crate::config::sentinel_height;
use crate::error::SkipListError;
use crate::key::Basis;
use crate::key::Key;
use crate::key::Label;
use crate::key::hash;

/// The neighbors of a pathname at height 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gap {
    /// The greatest pathname strictly below the probe.
    pub below: Key,
    /// The least pathname at or above the probe.
    pub above: Key,
}

pub struct AuthSkipList {
    /// Arena of nodes.
    nodes: Vec<Node>,
    /// Free list for reusing removed node slots.
    free_list: Vec<NodeId>,
    /// Known pathnames, sentinels included.
    keys: BTreeSet<Key>,
    leaves: FxHashMap<Key, NodeId>,
    plateaus: FxHashMap<Key, NodeId>,
    /// Plateau of the -INF tower.
    root: NodeId,
    max_tower_height: u8,
}

/// Height of the tower for `key`.
///
/// Reads the first two bytes of the key's hash as a big-endian integer and
/// counts how many times it divides by four, capped at `max_tower_height`.
/// Sentinels stand one above the cap.
pub fn tower_height(key: &Key, max_tower_height: u8) -> u8 {
    if key.is_sentinel() {
        return sentinel_height(max_tower_height);
    }
    let max_tower_height = max_tower_height.min(TOWER_HEIGHT_LIMIT);
    let digest = hash(&[key.encode()]);
    let mut value = u16::from_be_bytes([digest.0[0], digest.0[1]]) as u32;
    let mut height = 0;
    while height < max_tower_height && value % 4 == 0 {
        height += 1;
        value /= 4;
    }
    return height;
}

impl AuthSkipList {
    /// An empty list: just the two sentinel towers.
    pub fn new() -> AuthSkipList {
        return AuthSkipList::with_config(&Config::default());
    }

    pub fn with_config(config: &Config) -> AuthSkipList {
        let mut list = AuthSkipList::bare(config.max_tower_height);
        let low = list.build_tower(&Key::NegInf, Key::NegInf.sentinel_filehash());
        let high = list.build_tower(&Key::PosInf, Key::PosInf.sentinel_filehash());
        let root = low[low.len() - 1];
        let top = high[high.len() - 1];
        list.root = root;
        if let Body::Real { right, .. } = &mut list.nodes[root as usize].body {
            *right = Some(top);
        }
        list.nodes[top as usize].father = Some(root);
        return list;
    }

    /// A list with no nodes at all, to be filled in by the caller.
    pub(crate) fn bare(max_tower_height: u8) -> AuthSkipList {
        return AuthSkipList {
            nodes: Vec::new(),
            free_list: Vec::new(),
            keys: BTreeSet::new(),
            leaves: FxHashMap::default(),
            plateaus: FxHashMap::default(),
            root: 0,
            max_tower_height,
        };
    }

    // --- Accessors ---

    pub fn max_tower_height(&self) -> u8 {
        return self.max_tower_height;
    }

    pub fn root(&self) -> NodeId {
        return self.root;
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        return &self.nodes[id as usize];
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        return &mut self.nodes[id as usize];
    }

    /// Number of pathnames, sentinels excluded.
    pub fn len(&self) -> usize {
        return self.pathnames().count();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    pub fn contains(&self, key: &Key) -> bool {
        return self.keys.contains(key);
    }

    /// Pathnames in order, sentinels excluded.
    pub fn pathnames(&self) -> impl Iterator<Item = &Key> {
        return self.keys.iter().filter(|key| !key.is_sentinel());
    }

    /// Content hash of a pathname whose leaf is known.
    pub fn filehash(&self, key: &Key) -> Option<&[u8]> {
        let leaf = *self.leaves.get(key)?;
        return self.node(leaf).filehash();
    }

    pub fn leaf(&self, key: &Key) -> Option<NodeId> {
        return self.leaves.get(key).copied();
    }

    pub fn plateau(&self, key: &Key) -> Option<NodeId> {
        return self.plateaus.get(key).copied();
    }

    pub fn tower_height(&self, key: &Key) -> u8 {
        return tower_height(key, self.max_tower_height);
    }

    // --- Arena and links ---

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free_list.pop() {
            self.nodes[id as usize] = node;
            return id;
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        return id;
    }

    pub(crate) fn release(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.father = None;
        node.label = None;
        node.body = Body::Real { filehash: None, lower: None, right: None };
        self.free_list.push(id);
    }

    /// Number of live arena slots.
    pub fn node_count(&self) -> usize {
        return self.nodes.len() - self.free_list.len();
    }

    pub(crate) fn set_lower(&mut self, parent: NodeId, child: Option<NodeId>) -> Result<(), SkipListError> {
        let position = self.node(parent).position();
        match &mut self.node_mut(parent).body {
            Body::Real { lower, .. } => *lower = child,
            Body::Proxy => return Err(proxy_error(position)),
        }
        if let Some(child) = child {
            self.node_mut(child).father = Some(parent);
        }
        return Ok(());
    }

    pub(crate) fn set_right(&mut self, parent: NodeId, child: Option<NodeId>) -> Result<(), SkipListError> {
        let position = self.node(parent).position();
        match &mut self.node_mut(parent).body {
            Body::Real { right, .. } => *right = child,
            Body::Proxy => return Err(proxy_error(position)),
        }
        if let Some(child) = child {
            self.node_mut(child).father = Some(parent);
        }
        return Ok(());
    }

    pub(crate) fn register_key(&mut self, key: Key) {
        self.keys.insert(key);
    }

    pub(crate) fn register_leaf(&mut self, key: Key, id: NodeId) {
        self.leaves.insert(key, id);
    }

    pub(crate) fn register_plateau(&mut self, key: Key, id: NodeId) {
        self.plateaus.insert(key, id);
    }

    /// Build and register an unlinked tower. Returns its nodes, leaf first.
    fn build_tower(&mut self, key: &Key, filehash: Vec<u8>) -> Vec<NodeId> {
        let height = self.tower_height(key);
        let mut tower = Vec::with_capacity(height as usize + 1);
        let leaf = self.alloc(Node::real(key.clone(), 0, Some(filehash)));
        tower.push(leaf);
        for level in 1..=height {
            let id = self.alloc(Node::real(key.clone(), level, None));
            if let Body::Real { lower, .. } = &mut self.node_mut(id).body {
                *lower = Some(tower[tower.len() - 1]);
            }
            self.node_mut(tower[tower.len() - 1]).father = Some(id);
            tower.push(id);
        }
        self.keys.insert(key.clone());
        self.leaves.insert(key.clone(), leaf);
        self.plateaus.insert(key.clone(), tower[tower.len() - 1]);
        return tower;
    }

    // --- Structure ---

    /// True when the node is the top of its tower. Checks that the father
    /// links back to it on the matching side.
    pub fn is_plateau(&self, id: NodeId) -> Result<bool, SkipListError> {
        let node = self.node(id);
        let Some(father) = node.father else {
            return Ok(true);
        };
        let parent = self.node(father);
        if parent.key != node.key {
            if parent.right() != Some(id) {
                return Err(SkipListError::Malformed(format!(
                    "({:?}, {}) is not the right child of its father",
                    node.key, node.height
                )));
            }
            return Ok(true);
        }
        if parent.lower() != Some(id) {
            return Err(SkipListError::Malformed(format!(
                "({:?}, {}) is not the lower child of its father",
                node.key, node.height
            )));
        }
        return Ok(false);
    }

    /// Label of a node, recomputed when outdated or `forced`.
    ///
    /// Children are labeled before their parents with an explicit stack, so
    /// long rows of short towers cannot exhaust the call stack.
    pub fn compute_label(&mut self, id: NodeId, forced: bool) -> Result<Label, SkipListError> {
        let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            let node = self.node(current);
            let (lower, right) = match &node.body {
                Body::Proxy => {
                    if node.label.is_none() {
                        return Err(proxy_error(node.position()));
                    }
                    continue;
                }
                Body::Real { lower, right, .. } => (*lower, *right),
            };
            if !forced && node.label.is_some() {
                continue;
            }
            if expanded {
                let label = self.label_from_children(current)?;
                self.node_mut(current).label = Some(label);
                continue;
            }
            stack.push((current, true));
            stack.extend(right.map(|right| (right, false)));
            stack.extend(lower.map(|lower| (lower, false)));
        }

        let node = self.node(id);
        return node.label.clone().ok_or_else(|| {
            SkipListError::Malformed(format!("({:?}, {}) was left unlabeled", node.key, node.height))
        });
    }

    /// Label of a real node from its children's current labels.
    fn label_from_children(&self, id: NodeId) -> Result<Label, SkipListError> {
        let node = self.node(id);
        let Body::Real { filehash, lower, right } = &node.body else {
            return Err(proxy_error(node.position()));
        };
        let right = match right {
            Some(right) => Some(self.child_label(*right)?),
            None => None,
        };

        if node.height == 0 {
            let Some(filehash) = filehash else {
                return Err(SkipListError::Malformed(format!("leaf {:?} has no filehash", node.key)));
            };
            return Ok(match right {
                Some(right) => hash(&[node.key.encode(), filehash.as_slice(), right.as_bytes()]),
                None => Label([node.key.encode(), filehash.as_slice()].concat()),
            });
        }

        let Some(lower) = lower else {
            return Err(SkipListError::Malformed(format!(
                "({:?}, {}) has no lower child",
                node.key, node.height
            )));
        };
        let lower = self.child_label(*lower)?;
        return Ok(match right {
            Some(right) => hash(&[lower.as_bytes(), right.as_bytes()]),
            None => lower.clone(),
        });
    }

    fn child_label(&self, id: NodeId) -> Result<&Label, SkipListError> {
        let node = self.node(id);
        return node.label.as_ref().ok_or_else(|| {
            SkipListError::Malformed(format!("({:?}, {}) has no label yet", node.key, node.height))
        });
    }

    /// Mark a node and every ancestor up to the root as outdated.
    pub fn outdate_ancestors(&mut self, id: NodeId) -> Result<(), SkipListError> {
        let node = self.node(id);
        if node.is_proxy() {
            return Err(proxy_error(node.position()));
        }
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node_mut(id);
            node.label = None;
            current = node.father;
        }
        return Ok(());
    }

    /// The root label.
    pub fn basis(&mut self, forced: bool) -> Result<Basis, SkipListError> {
        let root = self.root;
        return self
            .compute_label(root, forced)
            .map_err(|err| SkipListError::UnexpectedBasis(Box::new(err)));
    }

    // --- Search ---

    /// The node at `height` with the greatest pathname below `key`.
    ///
    /// Walks right while the right child is below `key`, and down otherwise,
    /// until it stands at `height`. Returns `None` only for `-INF`.
    pub fn find_left_buddy(&self, key: &Key, height: u8) -> Result<Option<NodeId>, SkipListError> {
        if *key == Key::NegInf {
            return Ok(None);
        }
        let mut current = self.root;
        loop {
            let node = self.node(current);
            if node.is_proxy() {
                return Err(SkipListError::Malformed(format!(
                    "search for ({:?}, {}) reached proxy ({:?}, {})",
                    key, height, node.key, node.height
                )));
            }
            if let Some(right) = node.right() {
                if self.node(right).key < *key {
                    current = right;
                    continue;
                }
            }
            if node.height == height {
                return Ok(Some(current));
            }
            match node.lower() {
                Some(lower) if node.height > height => current = lower,
                _ => {
                    return Err(SkipListError::Malformed(format!(
                        "search for ({:?}, {}) stuck at ({:?}, {})",
                        key, height, node.key, node.height
                    )));
                }
            }
        }
    }

    fn require_left_buddy(&self, key: &Key, height: u8) -> Result<NodeId, SkipListError> {
        return self.find_left_buddy(key, height)?.ok_or_else(|| {
            SkipListError::Malformed(format!("no left buddy for ({:?}, {})", key, height))
        });
    }

    /// Neighbors of `key` at height 0.
    ///
    /// The predecessor is where the search lands. The successor is the right
    /// child of the lowest node on the search path that has one: towers that
    /// stop at a height only appear as right children at that height.
    pub fn find_gap(&self, key: &Key) -> Result<Gap, SkipListError> {
        if *key == Key::NegInf {
            return Err(SkipListError::Sentinel(key.clone()));
        }
        let mut current = self.root;
        let mut path: SmallVec<[NodeId; 24]> = SmallVec::new();
        loop {
            let node = self.node(current);
            if node.is_proxy() {
                return Err(SkipListError::Malformed(format!(
                    "gap search for {:?} reached proxy ({:?}, {})",
                    key, node.key, node.height
                )));
            }
            if let Some(right) = node.right() {
                if self.node(right).key < *key {
                    current = right;
                    continue;
                }
            }
            path.push(current);
            if node.height == 0 {
                break;
            }
            match node.lower() {
                Some(lower) => current = lower,
                None => {
                    return Err(SkipListError::Malformed(format!(
                        "({:?}, {}) has no lower child",
                        node.key, node.height
                    )));
                }
            }
        }

        let below = self.node(current).key.clone();
        let above = path
            .iter()
            .rev()
            .find_map(|&id| self.node(id).right())
            .map(|right| self.node(right).key.clone())
            .ok_or_else(|| SkipListError::Malformed(format!("no successor for {:?}", key)))?;
        return Ok(Gap { below, above });
    }

    // --- Mutations ---

    fn check_key(&self, key: &Key) -> Result<(), SkipListError> {
        if key.is_sentinel() {
            return Err(SkipListError::Sentinel(key.clone()));
        }
        return Ok(());
    }

    pub fn insert(&mut self, key: &Key, filehash: Vec<u8>) -> Result<(), SkipListError> {
        self.check_key(key)?;
        if self.keys.contains(key) {
            return Err(SkipListError::AlreadyPresent(key.clone()));
        }
        if filehash.is_empty() {
            return Err(SkipListError::EmptyFilehash(key.clone()));
        }

        let tower = self.build_tower(key, filehash);
        let top = tower.len() - 1;
        trace!(?key, height = top, "insert");

        // Below the plateau, the new tower takes over whatever each buddy had
        // to its right.
        for (level, &id) in tower.iter().enumerate().take(top) {
            let buddy = self.require_left_buddy(key, level as u8)?;
            if let Some(right) = self.node(buddy).right() {
                if self.node(right).key <= *key {
                    return Err(SkipListError::Malformed(format!(
                        "right child {:?} of left buddy is not above {:?}",
                        self.node(right).key, key
                    )));
                }
                self.set_right(buddy, None)?;
                self.set_right(id, Some(right))?;
                self.outdate_ancestors(buddy)?;
            }
        }

        let plateau = tower[top];
        let buddy = self.require_left_buddy(key, top as u8)?;
        let adopted = self.node(buddy).right();
        self.set_right(plateau, adopted)?;
        self.set_right(buddy, Some(plateau))?;
        self.outdate_ancestors(buddy)?;
        return Ok(());
    }

    pub fn update(&mut self, key: &Key, filehash: Vec<u8>) -> Result<(), SkipListError> {
        self.check_key(key)?;
        if !self.keys.contains(key) {
            return Err(SkipListError::Absent(key.clone()));
        }
        if filehash.is_empty() {
            return Err(SkipListError::EmptyFilehash(key.clone()));
        }
        let Some(leaf) = self.leaf(key) else {
            return Err(SkipListError::Malformed(format!("leaf of {:?} is not known", key)));
        };
        if let Body::Real { filehash: slot, .. } = &mut self.node_mut(leaf).body {
            *slot = Some(filehash);
        }
        return self.outdate_ancestors(leaf);
    }

    pub fn delete(&mut self, key: &Key) -> Result<(), SkipListError> {
        self.check_key(key)?;
        if !self.keys.contains(key) {
            return Err(SkipListError::Absent(key.clone()));
        }
        let Some(plateau) = self.plateau(key) else {
            return Err(SkipListError::Malformed(format!("plateau of {:?} is not known", key)));
        };
        let Some(father) = self.node(plateau).father else {
            return Err(SkipListError::Malformed(format!("plateau of {:?} is detached", key)));
        };
        if !self.is_plateau(plateau)? {
            return Err(SkipListError::Malformed(format!("{:?} is not a plateau", key)));
        }
        trace!(?key, height = self.node(plateau).height, "delete");

        self.set_right(father, None)?;
        self.outdate_ancestors(father)?;

        // Walk down the headless tower, handing each level's right subtree
        // back to the left buddy.
        let mut current = Some(plateau);
        while let Some(id) = current {
            let node = self.node(id);
            if node.is_proxy() {
                return Err(SkipListError::Malformed(format!(
                    "tower of {:?} is hidden below height {}",
                    key, node.height
                )));
            }
            let height = node.height;
            let right = node.right();
            current = node.lower();

            let buddy = self.require_left_buddy(key, height)?;
            if let Some(right) = right {
                if self.node(buddy).right().is_some() {
                    return Err(SkipListError::Malformed(format!(
                        "left buddy of ({:?}, {}) already has a right child",
                        key, height
                    )));
                }
                self.set_right(buddy, Some(right))?;
                self.outdate_ancestors(buddy)?;
            }
            self.release(id);
        }

        self.keys.remove(key);
        self.leaves.remove(key);
        self.plateaus.remove(key);
        return Ok(());
    }

    // --- Invariant checking ---

    /// Walk the whole tree and check every parent/child cross-reference,
    /// tower shape, and horizontal ordering.
    pub fn check_invariants(&self) -> Result<(), SkipListError> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            self.is_plateau(id)?;
            if node.is_proxy() {
                continue;
            }
            if node.height == 0 {
                if node.lower().is_some() || node.filehash().is_none() {
                    return Err(SkipListError::Malformed(format!("bad leaf {:?}", node.key)));
                }
            } else {
                let Some(lower) = node.lower() else {
                    return Err(SkipListError::Malformed(format!(
                        "({:?}, {}) has no lower child",
                        node.key, node.height
                    )));
                };
                let child = self.node(lower);
                if child.key != node.key || child.height.checked_add(1) != Some(node.height) {
                    return Err(SkipListError::Malformed(format!(
                        "({:?}, {}) sits below ({:?}, {})",
                        child.key, child.height, node.key, node.height
                    )));
                }
                stack.push(lower);
            }
            if let Some(right) = node.right() {
                let child = self.node(right);
                if child.key <= node.key || child.height != node.height {
                    return Err(SkipListError::Malformed(format!(
                        "({:?}, {}) sits right of ({:?}, {})",
                        child.key, child.height, node.key, node.height
                    )));
                }
                stack.push(right);
            }
        }
        return Ok(());
    }
}

impl Default for AuthSkipList {
    fn default() -> Self {
        return Self::new();
    }
}

fn proxy_error((key, height): (Key, u8)) -> SkipListError {
    return SkipListError::ProxyOutdated { key, height };
}
