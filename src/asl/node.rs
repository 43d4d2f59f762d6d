// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Arena nodes of an authenticated skip list.
//!
//! Nodes sit on a grid of `(key, height)` positions. Links are arena indices:
//! `lower` points down the same tower, `right` points to the plateau of the
//! next tower at the same height, and `father` is the inverse of whichever of
//! the two made this node someone's child.

use crate::key::Key;
use crate::key::Label;

/// Node index type. u32 saves space vs usize on 64-bit.
pub type NodeId = u32;

#[derive(Clone, Debug)]
pub enum Body {
    Real {
        /// Content hash, only at height 0.
        filehash: Option<Vec<u8>>,
        lower: Option<NodeId>,
        right: Option<NodeId>,
    },
    /// Stand-in for a subtree the server did not send. Its label is fixed.
    Proxy,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub key: Key,
    pub height: u8,
    /// Cached label; `None` means outdated.
    pub label: Option<Label>,
    pub father: Option<NodeId>,
    pub body: Body,
}

impl Node {
    pub fn real(key: Key, height: u8, filehash: Option<Vec<u8>>) -> Node {
        return Node {
            key,
            height,
            label: None,
            father: None,
            body: Body::Real { filehash, lower: None, right: None },
        };
    }

    pub fn proxy(key: Key, height: u8, label: Label) -> Node {
        return Node {
            key,
            height,
            label: Some(label),
            father: None,
            body: Body::Proxy,
        };
    }

    pub fn is_proxy(&self) -> bool {
        return matches!(self.body, Body::Proxy);
    }

    pub fn is_outdated(&self) -> bool {
        return self.label.is_none();
    }

    pub fn lower(&self) -> Option<NodeId> {
        return match self.body {
            Body::Real { lower, .. } => lower,
            Body::Proxy => None,
        };
    }

    pub fn right(&self) -> Option<NodeId> {
        return match self.body {
            Body::Real { right, .. } => right,
            Body::Proxy => None,
        };
    }

    pub fn filehash(&self) -> Option<&[u8]> {
        return match &self.body {
            Body::Real { filehash, .. } => filehash.as_deref(),
            Body::Proxy => None,
        };
    }

    /// Grid coordinate of the node.
    pub fn position(&self) -> (Key, u8) {
        return (self.key.clone(), self.height);
    }
}

/// Nodes are the same when they sit at the same position, whatever their
/// labels or contents. Trees built independently compare this way.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        return self.key == other.key && self.height == other.height;
    }
}

impl Eq for Node {}
