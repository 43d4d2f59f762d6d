// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Decoded proofs, as handed over by the network layer.
//!
//! A proof path is a chain of real nodes from a leaf up to the root. Each
//! node after the first links the previous one as either its lower or its
//! right child (`Link::Path`); its other child, when present, is a proxy
//! carrying the label of a subtree the server did not send.
//!
//! ```text
//!   (-INF,2) ─right─> [proxy (+INF,2)]
//!      │lower
//!   (-INF,1) ─right─> (c,1)          <- path continues through right
//!                       │lower
//!                     (c,0) ─right─> [proxy (d,0)]
//! ```

use serde::Deserialize;
use serde::Serialize;

use crate::config::sentinel_height;
use crate::error::ProofError;
use crate::key::Key;
use crate::key::Label;

/// Right links a path may follow on one level. Runs of equal-height towers
/// are geometrically rare, so honest paths stay far below this.
pub const MAX_ROW_STEPS: usize = 1024;

/// What the client is doing, as named by the sync protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Upload,
    RemoteCopy,
    Rename,
    Move,
    Download,
    Delete,
    DeleteLocal,
}

/// The structural effect an operation has on the skip list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verb {
    Insert,
    Update,
    Delete,
    /// Membership with content.
    Verify,
    /// Non-membership: a gap between two adjacent pathnames.
    Verify2,
}

/// One child slot of a proof node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Link {
    None,
    /// The previous node in the same path.
    Path,
    Proxy { key: Key, height: u8, label: Label },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    pub key: Key,
    pub height: u8,
    /// Present exactly on height-0 nodes.
    pub filehash: Option<Vec<u8>>,
    pub lower: Link,
    pub right: Link,
}

/// A chain of nodes, leaf first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPath {
    pub nodes: Vec<ProofNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub operation: Operation,
    pub pathname: String,
    pub paths: Vec<ProofPath>,
}

impl Operation {
    /// The structural verb, before insert and update are told apart.
    pub fn verb(&self) -> Verb {
        return match self {
            Operation::Upload | Operation::RemoteCopy => Verb::Insert,
            Operation::Delete => Verb::Delete,
            Operation::Download | Operation::Rename | Operation::Move => Verb::Verify,
            Operation::DeleteLocal => Verb::Verify2,
        };
    }
}

impl Verb {
    /// Whether the verb changes the skip list when replayed.
    pub fn is_mutation(&self) -> bool {
        return matches!(self, Verb::Insert | Verb::Update | Verb::Delete);
    }
}

impl ProofNode {
    pub fn leaf(key: Key, filehash: Vec<u8>) -> ProofNode {
        return ProofNode {
            key,
            height: 0,
            filehash: Some(filehash),
            lower: Link::None,
            right: Link::None,
        };
    }
}

impl ProofPath {
    /// The starting leaf of the path.
    pub fn leaf(&self) -> Option<&ProofNode> {
        return self.nodes.first();
    }

    pub fn top(&self) -> Option<&ProofNode> {
        return self.nodes.last();
    }

    /// Check the shape of the chain: a leaf first, then one linked child per
    /// step with coordinates that agree, proxies only where a child of that
    /// node could sit, and the `-INF` sentinel plateau last.
    pub fn validate(&self, max_tower_height: u8) -> Result<(), ProofError> {
        let (Some(leaf), Some(top)) = (self.leaf(), self.top()) else {
            return Err(ProofError::Malformed("empty proof path".into()));
        };
        if leaf.height != 0 {
            return Err(ProofError::Malformed(format!(
                "path starts at ({:?}, {}) instead of a leaf",
                leaf.key, leaf.height
            )));
        }
        let root_height = sentinel_height(max_tower_height);
        if top.key != Key::NegInf || top.height != root_height {
            return Err(ProofError::Malformed(format!(
                "path ends at ({:?}, {}) instead of the root",
                top.key, top.height
            )));
        }
        let limit = (root_height as usize + 1) * MAX_ROW_STEPS;
        if self.nodes.len() > limit {
            return Err(ProofError::Malformed(format!(
                "path of {} nodes exceeds {}",
                self.nodes.len(),
                limit
            )));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            validate_node(node)?;

            let lower_is_path = node.lower == Link::Path;
            let right_is_path = node.right == Link::Path;
            if i == 0 {
                if lower_is_path || right_is_path {
                    return Err(ProofError::Malformed("leaf links a previous node".into()));
                }
                continue;
            }
            if lower_is_path == right_is_path {
                return Err(ProofError::Malformed(format!(
                    "node ({:?}, {}) must link exactly one previous node",
                    node.key, node.height
                )));
            }

            let prev = &self.nodes[i - 1];
            let consistent = if lower_is_path {
                prev.key == node.key && node.height.checked_sub(1) == Some(prev.height)
            } else {
                prev.height == node.height && prev.key > node.key
            };
            if !consistent {
                return Err(ProofError::Malformed(format!(
                    "({:?}, {}) cannot be a child of ({:?}, {})",
                    prev.key, prev.height, node.key, node.height
                )));
            }
        }
        return Ok(());
    }
}

fn validate_node(node: &ProofNode) -> Result<(), ProofError> {
    if node.height == 0 {
        if node.filehash.is_none() {
            return Err(malformed(node, "leaf without filehash"));
        }
        if node.lower != Link::None {
            return Err(malformed(node, "leaf with a lower child"));
        }
    } else {
        if node.filehash.is_some() {
            return Err(malformed(node, "filehash above height 0"));
        }
        if node.lower == Link::None {
            return Err(malformed(node, "internal node without a lower child"));
        }
    }

    if let Link::Proxy { key, height, .. } = &node.lower {
        if *key != node.key || node.height.checked_sub(1) != Some(*height) {
            return Err(malformed(node, "lower proxy outside the tower"));
        }
    }
    if let Link::Proxy { key, height, .. } = &node.right {
        if *height != node.height || *key <= node.key {
            return Err(malformed(node, "right proxy at an impossible position"));
        }
    }
    return Ok(());
}

fn malformed(node: &ProofNode, what: &str) -> ProofError {
    return ProofError::Malformed(format!("({:?}, {}): {}", node.key, node.height, what));
}

impl Proof {
    pub fn target(&self) -> Key {
        return Key::parse(&self.pathname);
    }

    /// Starting leaves of every path, sorted by pathname.
    pub fn leaves(&self) -> Vec<&ProofNode> {
        let mut leaves: Vec<&ProofNode> = self.paths.iter().filter_map(|p| p.leaf()).collect();
        leaves.sort_by(|a, b| a.key.cmp(&b.key));
        return leaves;
    }

    /// Lowest and highest starting pathnames, as used by gap proofs.
    pub fn bracket(&self) -> Option<(Key, Key)> {
        let leaves = self.leaves();
        let low = leaves.first()?;
        let high = leaves.last()?;
        return Some((low.key.clone(), high.key.clone()));
    }
}
