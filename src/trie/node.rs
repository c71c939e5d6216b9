//! Arena node for the binary prefix trie.
//!
//! Nodes are owned by the trie's arena and referenced by index. The
//! `ancestor_prefix` back-reference is an arena index as well, never an
//! owning pointer, so the upward walk used by level recalculation cannot
//! create reference cycles.

/// Index of a node inside the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// A single binary-trie node.
///
/// Only prefix-flagged nodes represent allocated prefixes; the rest are
/// interior path nodes kept alive by their descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Bit value on the edge from the parent, `None` only for the root.
    pub bit: Option<u8>,
    /// Bit distance from the root.
    pub depth: usize,
    /// Delegation level: 1 + the maximum level of the nearest prefix
    /// descendants, 0 when nothing is delegated below this prefix.
    pub level: usize,
    /// Marks the root-to-here bit path as an allocated prefix.
    pub is_prefix: bool,
    /// True when the prefix flag was set during the generating phase.
    pub synthesized: bool,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
    /// Nearest prefix-flagged ancestor, if any.
    pub ancestor_prefix: Option<NodeId>,
}

impl Node {
    pub(crate) fn root() -> Self {
        Node {
            bit: None,
            depth: 0,
            level: 0,
            is_prefix: false,
            synthesized: false,
            left: None,
            right: None,
            parent: None,
            ancestor_prefix: None,
        }
    }

    pub(crate) fn child(bit: u8, parent: NodeId, depth: usize, ancestor_prefix: Option<NodeId>) -> Self {
        Node {
            bit: Some(bit),
            depth,
            level: 0,
            is_prefix: false,
            synthesized: false,
            left: None,
            right: None,
            parent: Some(parent),
            ancestor_prefix,
        }
    }

    /// A prefix leaf: an allocation with nothing delegated below it.
    pub fn is_leaf(&self) -> bool {
        self.is_prefix && self.left.is_none() && self.right.is_none()
    }
}
