//! Distribution planner.
//!
//! Translates a target depth distribution into per-organisation-level work
//! queues. Each organisation level is a depth interval modeling one tier of
//! the real-world allocation hierarchy (registry, local registry, provider,
//! end-user). Buckets whose adjacent shallower level holds no prefix leaves
//! cannot be reached by expanding existing allocations, so their work is
//! routed to the unanchored (random) generator instead.

use crate::trie::{DepthCounts, MAX_PREFIX_LEN};
use log::debug;
use std::collections::BTreeMap;

/// Depth intervals of the allocation hierarchy, RIR down to end-user.
pub const ORG_INTERVALS: [(usize, usize); 5] = [(0, 12), (12, 32), (32, 48), (48, 64), (64, 65)];

/// Number of organisation levels.
pub const ORG_LEVELS: usize = ORG_INTERVALS.len();

/// Organisation level containing `depth`. Depths above the modeled range are
/// clamped into the deepest bucket.
pub fn organisation_level(depth: usize) -> usize {
    ORG_INTERVALS
        .iter()
        .position(|&(lo, hi)| lo <= depth && depth < hi)
        .unwrap_or(ORG_LEVELS - 1)
}

/// Per-bucket totals of a dense depth distribution.
pub fn group_by_length(counts: &DepthCounts) -> [usize; ORG_LEVELS] {
    let mut grouped = [0; ORG_LEVELS];
    for (index, &(lo, hi)) in ORG_INTERVALS.iter().enumerate() {
        grouped[index] = counts[lo..hi.min(MAX_PREFIX_LEN + 1)].iter().sum();
    }
    grouped
}

/// Validation failures raised before any generation begins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error(
        "target distribution at depth {depth} requests {requested} prefixes but the trie \
         already holds {current}; the generator never removes prefixes"
    )]
    ShrinkRequested {
        depth: usize,
        current: usize,
        requested: usize,
    },
    #[error(
        "target distribution totals {planned} prefixes but --prefix-quantity is {specified}"
    )]
    QuantityMismatch { specified: usize, planned: usize },
    #[error("new prefixes cannot be requested at depth {depth}: depths below 12 belong to the registry root")]
    InvalidDepth { depth: usize },
}

/// One organisation-level work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBucket {
    /// Depth interval `[lo, hi)` of this organisation level.
    pub interval: (usize, usize),
    /// Remaining prefixes to generate, keyed by target depth. Drained as
    /// generation proceeds; an empty map means the bucket is done.
    pub pending: BTreeMap<usize, usize>,
    /// Per-leaf spawn counts spreading this bucket's total evenly across the
    /// leaves of the adjacent shallower level. Empty for unanchored buckets.
    pub strategy: Vec<usize>,
}

impl PlanBucket {
    fn new(interval: (usize, usize)) -> Self {
        PlanBucket {
            interval,
            pending: BTreeMap::new(),
            strategy: Vec::new(),
        }
    }

    /// Total prefixes still to generate in this bucket.
    pub fn remaining(&self) -> usize {
        self.pending.values().sum()
    }

    /// Shallowest depth still outstanding.
    pub fn next_depth(&self) -> Option<usize> {
        self.pending.keys().next().copied()
    }

    /// Record one generated prefix at `depth`, removing the depth key once
    /// its count reaches zero.
    pub fn complete_one(&mut self, depth: usize) {
        if let Some(count) = self.pending.get_mut(&depth) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&depth);
            }
        }
    }
}

/// The full work plan: trie-anchored buckets consumed by leaf expansion and
/// unanchored buckets consumed by random generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWork {
    pub anchored: Vec<PlanBucket>,
    pub unanchored: Vec<PlanBucket>,
}

impl PlannedWork {
    pub fn total_pending(&self) -> usize {
        self.anchored
            .iter()
            .chain(&self.unanchored)
            .map(PlanBucket::remaining)
            .sum()
    }

    pub fn is_drained(&self) -> bool {
        self.total_pending() == 0
    }
}

/// Build the distribution plan from the current trie statistics and the
/// caller's target distribution.
///
/// `prefix_quantity` is the expected size of the final prefix set; the target
/// distribution must sum to exactly that value. Every depth must grow or stay
/// unchanged, and growth below the registry-root interval is rejected.
pub fn build_plan(
    current: &DepthCounts,
    target: &DepthCounts,
    leaf_counts: &DepthCounts,
    prefix_quantity: usize,
) -> Result<PlannedWork, PlanError> {
    for depth in 0..=MAX_PREFIX_LEN {
        if target[depth] < current[depth] {
            return Err(PlanError::ShrinkRequested {
                depth,
                current: current[depth],
                requested: target[depth],
            });
        }
    }

    let planned: usize = target.iter().sum();
    if planned != prefix_quantity {
        return Err(PlanError::QuantityMismatch {
            specified: prefix_quantity,
            planned,
        });
    }

    let leaves_by_level = group_by_length(leaf_counts);
    let mut anchored: Vec<PlanBucket> = ORG_INTERVALS.iter().map(|&i| PlanBucket::new(i)).collect();
    let mut unanchored: Vec<PlanBucket> = ORG_INTERVALS.iter().map(|&i| PlanBucket::new(i)).collect();

    for depth in 0..=MAX_PREFIX_LEN {
        let delta = target[depth] - current[depth];
        if delta == 0 {
            continue;
        }
        let level = organisation_level(depth);
        if level == 0 {
            return Err(PlanError::InvalidDepth { depth });
        }
        // Without leaves one tier up there is nothing to expand from, so the
        // work is handed to the unanchored generator.
        if leaves_by_level[level - 1] > 0 {
            anchored[level].pending.insert(depth, delta);
        } else {
            debug!(
                "routing {} prefixes at depth {} to unanchored generation: no leaves in {:?}",
                delta,
                depth,
                ORG_INTERVALS[level - 1]
            );
            unanchored[level].pending.insert(depth, delta);
        }
    }

    for (level, bucket) in anchored.iter_mut().enumerate() {
        if !bucket.pending.is_empty() {
            bucket.strategy = build_generating_strategy(bucket.remaining(), leaves_by_level[level - 1]);
        }
    }

    Ok(PlannedWork { anchored, unanchored })
}

/// Spread `total` spawns across `leaves` parent leaves as evenly as possible:
/// every leaf takes `total / leaves`, the first `total % leaves` take one
/// extra so the schedule sums exactly to `total`.
pub fn build_generating_strategy(total: usize, leaves: usize) -> Vec<usize> {
    if leaves == 0 {
        return Vec::new();
    }
    let base = total / leaves;
    let remainder = total % leaves;
    (0..leaves)
        .map(|index| base + usize::from(index < remainder))
        .collect()
}
