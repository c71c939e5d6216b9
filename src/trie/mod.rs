//! Binary prefix trie with delegation-level bookkeeping.
//!
//! The trie owns every node in an arena and keeps derived statistics
//! (prefix counts per depth, prefix-leaf counts per depth, maximum depth and
//! level) up to date on every successful insertion, so the planner never has
//! to re-walk the whole structure.
//!
//! Insertion runs in one of two explicit phases. In the build phase the seed
//! data is authoritative: levels are recomputed and committed unconditionally.
//! In the generating phase the insertion is speculative: the level
//! recalculation is checked against `max_possible_level` first, and on a
//! violation every node created for the attempt is pruned again, leaving the
//! trie exactly as it was.

pub mod node;

use log::trace;
use std::collections::VecDeque;

pub use node::{Node, NodeId};

/// Longest prefix handled by the generator (the routable half of an IPv6
/// address).
pub const MAX_PREFIX_LEN: usize = 64;

/// Prefix or prefix-leaf counts indexed by depth, fully dense.
pub type DepthCounts = [usize; MAX_PREFIX_LEN + 1];

/// Insertion mode, passed explicitly so the asymmetric validation between the
/// two phases is part of the contract rather than inferred state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Seed construction: lenient, level bound is recorded but not enforced.
    Build,
    /// Constrained generation: duplicate and level violations are rejected
    /// and rolled back.
    Generate,
}

/// Rejection reasons for a single insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("the exact prefix already exists in the trie")]
    Duplicate,
    #[error("insertion would push a delegation level above the allowed maximum of {max}")]
    LevelExceeded { max: usize },
}

/// Binary trie over bit-string prefixes.
#[derive(Debug, Clone)]
pub struct BinaryTrie {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
    max_possible_level: usize,
    trie_depth: usize,
    max_trie_level: usize,
    prefix_count_by_depth: DepthCounts,
    leaf_count_by_depth: DepthCounts,
}

impl BinaryTrie {
    pub fn new(max_possible_level: usize) -> Self {
        BinaryTrie {
            nodes: vec![Some(Node::root())],
            free: Vec::new(),
            root: NodeId(0),
            max_possible_level,
            trie_depth: 0,
            max_trie_level: 0,
            prefix_count_by_depth: [0; MAX_PREFIX_LEN + 1],
            leaf_count_by_depth: [0; MAX_PREFIX_LEN + 1],
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn max_possible_level(&self) -> usize {
        self.max_possible_level
    }

    /// Maximum depth of any prefix node.
    pub fn trie_depth(&self) -> usize {
        self.trie_depth
    }

    /// Maximum delegation level over all prefix nodes.
    pub fn max_trie_level(&self) -> usize {
        self.max_trie_level
    }

    pub fn prefix_count_by_depth(&self) -> &DepthCounts {
        &self.prefix_count_by_depth
    }

    pub fn leaf_count_by_depth(&self) -> &DepthCounts {
        &self.leaf_count_by_depth
    }

    pub fn prefix_node_total(&self) -> usize {
        self.prefix_count_by_depth.iter().sum()
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.node(id).depth
    }

    pub fn level(&self, id: NodeId) -> usize {
        self.node(id).level
    }

    pub fn is_prefix(&self, id: NodeId) -> bool {
        self.node(id).is_prefix
    }

    pub fn children(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let node = self.node(id);
        (node.left, node.right)
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0]
            .as_ref()
            .unwrap_or_else(|| unreachable!("node {} was freed but is still referenced", id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0]
            .as_mut()
            .unwrap_or_else(|| unreachable!("node {} was freed but is still referenced", id.0))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Insert the bit string `bits` below `parent` and flag the terminal node
    /// as a prefix.
    ///
    /// In [`Phase::Generate`] the call fails with [`InsertError::Duplicate`]
    /// when the exact prefix already exists, and with
    /// [`InsertError::LevelExceeded`] when committing the insertion would
    /// leave any node on the ancestor-prefix chain above
    /// `max_possible_level`. A rejected insertion leaves the trie unchanged.
    ///
    /// In [`Phase::Build`] only exact duplicates are reported; level bounds
    /// are recorded, never enforced.
    pub fn insert(&mut self, bits: &str, parent: NodeId, phase: Phase) -> Result<NodeId, InsertError> {
        debug_assert!(bits.bytes().all(|b| b == b'0' || b == b'1'));
        debug_assert!(self.node(parent).depth + bits.len() <= MAX_PREFIX_LEN);

        if phase == Phase::Generate && self.is_exist(parent, bits) {
            return Err(InsertError::Duplicate);
        }

        let mut current = parent;
        let mut created: Vec<NodeId> = Vec::new();
        // The one pre-existing node that gains its first child on this walk,
        // relevant for prefix-leaf accounting.
        let mut first_branch_parent: Option<NodeId> = None;

        for byte in bits.bytes() {
            let bit = byte - b'0';
            let (existing, depth, ancestor, had_children) = {
                let here = self.node(current);
                (
                    if bit == 0 { here.left } else { here.right },
                    here.depth + 1,
                    if here.is_prefix { Some(current) } else { here.ancestor_prefix },
                    here.left.is_some() || here.right.is_some(),
                )
            };

            current = match existing {
                Some(next) => next,
                None => {
                    let child = self.alloc(Node::child(bit, current, depth, ancestor));
                    if bit == 0 {
                        self.node_mut(current).left = Some(child);
                    } else {
                        self.node_mut(current).right = Some(child);
                    }
                    if created.is_empty() && !had_children {
                        first_branch_parent = Some(current);
                    }
                    created.push(child);
                    child
                }
            };
        }

        let terminal = current;
        if self.node(terminal).is_prefix {
            // Only reachable in the build phase; the generating phase caught
            // this in the existence pre-check.
            return Err(InsertError::Duplicate);
        }

        // The new prefix may sit above existing prefixes (unanchored
        // generation): its own level is one above its nearest prefix
        // descendants.
        let (frontier, interior) = self.prefix_frontier(terminal);
        let own_level = frontier
            .iter()
            .map(|&id| self.node(id).level + 1)
            .max()
            .unwrap_or(0);

        let (level_updates, chain_max) = self.speculative_chain_levels(terminal, own_level);

        if phase == Phase::Generate && chain_max > self.max_possible_level {
            self.delete_node_from_trie(&created);
            return Err(InsertError::LevelExceeded {
                max: self.max_possible_level,
            });
        }

        // Commit point: nothing below may fail.
        {
            let node = self.node_mut(terminal);
            node.is_prefix = true;
            node.level = own_level;
            node.synthesized = phase == Phase::Generate;
        }
        for (id, level) in level_updates {
            self.node_mut(id).level = level;
        }
        // The new prefix is now the nearest prefix ancestor for everything
        // between itself and its prefix frontier.
        for id in interior.into_iter().chain(frontier) {
            self.node_mut(id).ancestor_prefix = Some(terminal);
        }

        let terminal_depth = self.node(terminal).depth;
        self.prefix_count_by_depth[terminal_depth] += 1;
        if self.node(terminal).is_leaf() {
            self.leaf_count_by_depth[terminal_depth] += 1;
        }
        if let Some(id) = first_branch_parent {
            // A former prefix leaf just delegated its first child.
            if self.node(id).is_prefix {
                let depth = self.node(id).depth;
                self.leaf_count_by_depth[depth] -= 1;
            }
        }
        if terminal_depth > self.trie_depth {
            self.trie_depth = terminal_depth;
        }
        if chain_max > self.max_trie_level {
            self.max_trie_level = chain_max;
        }

        trace!(
            "inserted {}-bit prefix at level {} ({:?})",
            terminal_depth,
            own_level,
            phase
        );
        Ok(terminal)
    }

    /// Existence check without node creation.
    ///
    /// Strict interpretation: only a prefix-flagged terminal counts as
    /// existing, a bare interior node at the same position does not.
    pub fn is_exist(&self, parent: NodeId, bits: &str) -> bool {
        let mut current = parent;
        for byte in bits.bytes() {
            let here = self.node(current);
            let next = if byte == b'0' { here.left } else { here.right };
            match next {
                Some(id) => current = id,
                None => return false,
            }
        }
        self.node(current).is_prefix
    }

    /// Bit strings of every prefix node, left-first depth-first order.
    ///
    /// Pure function of the trie state; the walk uses an explicit stack whose
    /// depth is bounded by [`MAX_PREFIX_LEN`].
    pub fn enumerate_prefixes(&self) -> Vec<String> {
        let mut prefixes = Vec::with_capacity(self.prefix_node_total());
        let mut stack: Vec<(NodeId, String)> = vec![(self.root, String::new())];

        while let Some((id, path)) = stack.pop() {
            let node = self.node(id);
            if node.is_prefix {
                prefixes.push(path.clone());
            }
            if let Some(right) = node.right {
                stack.push((right, format!("{path}1")));
            }
            if let Some(left) = node.left {
                stack.push((left, format!("{path}0")));
            }
        }
        prefixes
    }

    /// Arena ids of every prefix node, same order as [`enumerate_prefixes`].
    ///
    /// [`enumerate_prefixes`]: BinaryTrie::enumerate_prefixes
    pub fn prefix_node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.prefix_node_total());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_prefix {
                ids.push(id);
            }
            if let Some(right) = node.right {
                stack.push(right);
            }
            if let Some(left) = node.left {
                stack.push(left);
            }
        }
        ids
    }

    /// Number of prefix nodes flagged during the generating phase.
    pub fn synthesized_prefix_total(&self) -> usize {
        self.prefix_node_ids()
            .into_iter()
            .filter(|&id| self.node(id).synthesized)
            .count()
    }

    /// Count of prefix nodes per delegation level, index = level.
    pub fn level_histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; self.max_trie_level + 1];
        for id in self.prefix_node_ids() {
            histogram[self.node(id).level] += 1;
        }
        histogram
    }

    /// Nearest prefix descendants of `from` (the prefix frontier) and the
    /// non-prefix nodes strictly between `from` and that frontier.
    fn prefix_frontier(&self, from: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut frontier = Vec::new();
        let mut interior = Vec::new();
        let mut stack = VecDeque::new();
        let here = self.node(from);
        stack.extend(here.left.into_iter().chain(here.right));

        while let Some(id) = stack.pop_back() {
            let node = self.node(id);
            if node.is_prefix {
                frontier.push(id);
            } else {
                interior.push(id);
                stack.extend(node.left.into_iter().chain(node.right));
            }
        }
        (frontier, interior)
    }

    /// Walk the ancestor-prefix chain of `terminal` and compute the levels it
    /// would hold after committing a prefix of level `own_level` at
    /// `terminal`. Returns the raised levels plus the maximum level anywhere
    /// on the chain (raised or pre-existing), which is what the generating
    /// phase checks against the bound.
    fn speculative_chain_levels(&self, terminal: NodeId, own_level: usize) -> (Vec<(NodeId, usize)>, usize) {
        let mut updates = Vec::new();
        let mut chain_max = own_level;
        let mut child_level = own_level;
        let mut cursor = self.node(terminal).ancestor_prefix;

        while let Some(id) = cursor {
            let node = self.node(id);
            let required = child_level + 1;
            let new_level = node.level.max(required);
            if new_level > node.level {
                updates.push((id, new_level));
            }
            if new_level > chain_max {
                chain_max = new_level;
            }
            child_level = new_level;
            cursor = node.ancestor_prefix;
        }
        (updates, chain_max)
    }

    /// Prune the nodes created by a failed insertion attempt, deepest first.
    ///
    /// This is rollback only, not a general delete: every node in
    /// `created_path` is non-prefix and childless by the time it is unlinked,
    /// so the walk stops exactly at the first pre-existing node that still
    /// holds content.
    fn delete_node_from_trie(&mut self, created_path: &[NodeId]) {
        for &id in created_path.iter().rev() {
            let node = self.node(id);
            debug_assert!(!node.is_prefix && node.left.is_none() && node.right.is_none());
            let bit = node.bit;
            if let Some(parent) = node.parent {
                match bit {
                    Some(0) => self.node_mut(parent).left = None,
                    _ => self.node_mut(parent).right = None,
                }
            }
            self.nodes[id.0] = None;
            self.free.push(id.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(prefixes: &[&str], max_level: usize) -> BinaryTrie {
        let mut trie = BinaryTrie::new(max_level);
        for bits in prefixes {
            trie.insert(bits, trie.root(), Phase::Build)
                .expect("seed insertion");
        }
        trie
    }

    /// Independent recount used to cross-check the incremental caches.
    fn recount(trie: &BinaryTrie) -> (DepthCounts, DepthCounts) {
        let mut prefixes = [0; MAX_PREFIX_LEN + 1];
        let mut leaves = [0; MAX_PREFIX_LEN + 1];
        for id in trie.prefix_node_ids() {
            prefixes[trie.depth(id)] += 1;
            let (left, right) = trie.children(id);
            if left.is_none() && right.is_none() {
                leaves[trie.depth(id)] += 1;
            }
        }
        (prefixes, leaves)
    }

    fn snapshot(trie: &BinaryTrie) -> Vec<(String, usize)> {
        let mut dump: Vec<(String, usize)> = trie
            .enumerate_prefixes()
            .into_iter()
            .map(|bits| {
                let mut cursor = trie.root();
                for byte in bits.bytes() {
                    let (left, right) = trie.children(cursor);
                    cursor = if byte == b'0' { left } else { right }.unwrap();
                }
                (bits, trie.level(cursor))
            })
            .collect();
        dump.sort();
        dump
    }

    #[test]
    fn seed_trie_statistics() {
        let trie = build(
            &["11", "1110", "1111", "110000", "110001", "0", "001", "010", "011"],
            7,
        );
        assert_eq!(trie.prefix_node_total(), 9);
        assert_eq!(trie.trie_depth(), 6);

        let (prefixes, leaves) = recount(&trie);
        assert_eq!(&prefixes, trie.prefix_count_by_depth());
        assert_eq!(&leaves, trie.leaf_count_by_depth());
    }

    #[test]
    fn levels_reflect_delegation_depth() {
        let trie = build(&["0", "001", "00110", "01"], 7);
        // "0" delegates to "001" which delegates to "00110".
        let mut by_prefix = snapshot(&trie);
        by_prefix.sort();
        assert_eq!(
            by_prefix,
            vec![
                ("0".to_string(), 2),
                ("001".to_string(), 1),
                ("00110".to_string(), 0),
                ("01".to_string(), 0),
            ]
        );
        assert_eq!(trie.max_trie_level(), 2);
    }

    #[test]
    fn levels_never_decrease() {
        let mut trie = build(&["0"], 7);
        let mut previous_root_level = trie.level(trie.prefix_node_ids()[0]);
        for bits in ["001", "0011", "00111", "01"] {
            trie.insert(bits, trie.root(), Phase::Generate).unwrap();
            let root_prefix = trie
                .prefix_node_ids()
                .into_iter()
                .find(|&id| trie.depth(id) == 1)
                .unwrap();
            assert!(trie.level(root_prefix) >= previous_root_level);
            previous_root_level = trie.level(root_prefix);
        }
    }

    #[test]
    fn duplicate_rejected_in_generate_phase() {
        let mut trie = build(&["0011"], 7);
        let err = trie.insert("0011", trie.root(), Phase::Generate).unwrap_err();
        assert_eq!(err, InsertError::Duplicate);
    }

    #[test]
    fn interior_node_does_not_count_as_existing() {
        let trie = build(&["0011"], 7);
        // "00" exists as an interior node but is not prefix-flagged.
        assert!(!trie.is_exist(trie.root(), "00"));
        assert!(trie.is_exist(trie.root(), "0011"));
    }

    #[test]
    fn level_bound_enforced_and_rollback_exact() {
        let mut trie = build(&["0", "001"], 1);
        let before = snapshot(&trie);
        let before_prefixes = *trie.prefix_count_by_depth();
        let before_leaves = *trie.leaf_count_by_depth();

        // A prefix under "001" would push "0" to level 2.
        let err = trie.insert("10", find(&trie, "001"), Phase::Generate).unwrap_err();
        assert_eq!(err, InsertError::LevelExceeded { max: 1 });

        assert_eq!(snapshot(&trie), before);
        assert_eq!(trie.prefix_count_by_depth(), &before_prefixes);
        assert_eq!(trie.leaf_count_by_depth(), &before_leaves);
    }

    #[test]
    fn insertion_under_overweight_seed_chain_is_rejected() {
        // Build phase accepts a level-1 chain even with the bound at 0.
        let mut trie = build(&["0", "001"], 0);
        assert_eq!(trie.max_trie_level(), 1);

        // Any further insertion below that chain must fail immediately, even
        // where it would not raise a level.
        let err = trie.insert("1", find(&trie, "0"), Phase::Generate).unwrap_err();
        assert_eq!(err, InsertError::LevelExceeded { max: 0 });
    }

    #[test]
    fn unanchored_prefix_above_existing_prefixes() {
        let mut trie = build(&["001100", "001111"], 7);
        // Insert a shorter prefix above both: it becomes their nearest
        // prefix ancestor and takes level 1.
        let id = trie.insert("0011", trie.root(), Phase::Generate).unwrap();
        assert_eq!(trie.level(id), 1);
        assert_eq!(trie.max_trie_level(), 1);

        // A further insert below one child raises the new ancestor.
        trie.insert("0000", find(&trie, "001100"), Phase::Generate).unwrap();
        assert_eq!(trie.level(id), 2);
    }

    #[test]
    fn enumeration_matches_insertions() {
        let seeds = ["11", "1110", "1111", "110000", "110001", "0", "001", "010", "011"];
        let trie = build(&seeds, 7);
        let mut enumerated = trie.enumerate_prefixes();
        enumerated.sort();
        let mut expected: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(enumerated, expected);
    }

    #[test]
    fn leaf_counts_track_delegation() {
        let mut trie = build(&["0011"], 7);
        assert_eq!(trie.leaf_count_by_depth()[4], 1);

        trie.insert("01", find(&trie, "0011"), Phase::Generate).unwrap();
        // "0011" delegated a child, so it is no longer a leaf.
        assert_eq!(trie.leaf_count_by_depth()[4], 0);
        assert_eq!(trie.leaf_count_by_depth()[6], 1);
    }

    fn find(trie: &BinaryTrie, bits: &str) -> NodeId {
        let mut cursor = trie.root();
        for byte in bits.bytes() {
            let (left, right) = trie.children(cursor);
            cursor = if byte == b'0' { left } else { right }.unwrap();
        }
        cursor
    }
}
