//! Trie-traversal prefix generation.
//!
//! Drains the anchored work queues by expanding existing prefixes: for each
//! outstanding target depth the generator picks a uniform-random candidate
//! from the adjacent shallower organisation level, synthesizes a random bit
//! suffix of exactly the missing width and inserts it. A duplicate simply
//! triggers a fresh draw; a level rejection retires that candidate until the
//! next success. When every candidate in a bucket has been retired the
//! requested distribution is structurally infeasible and the run aborts.

use crate::generator::{random_bits, GenerateError};
use crate::plan::{organisation_level, PlanBucket};
use crate::trie::{BinaryTrie, InsertError, NodeId, Phase};
use log::{debug, info};
use rand::Rng;
use std::collections::HashSet;

/// Drain the anchored work queues, shallow buckets first so freshly
/// generated allocations can parent the next tier.
pub(crate) fn generate<R: Rng>(
    trie: &mut BinaryTrie,
    buckets: &mut [PlanBucket],
    candidates: &mut [Vec<NodeId>],
    rng: &mut R,
    max_retries: usize,
) -> Result<(), GenerateError> {
    for level in 0..buckets.len() {
        if buckets[level].pending.is_empty() {
            continue;
        }
        let (lo, hi) = buckets[level].interval;
        info!(
            "generating {} prefixes in interval [{}, {})",
            buckets[level].remaining(),
            lo,
            hi
        );

        // The planner never schedules anchored work for the registry-root
        // bucket, so a parent level always exists.
        debug_assert!(level > 0);
        let parent_level = level - 1;
        // Candidates that failed on the level bound; cleared after every
        // success, because a successful insertion elsewhere does not change
        // their subtree but keeps the drain moving.
        let mut used: HashSet<NodeId> = HashSet::new();

        while let Some(depth) = buckets[level].next_depth() {
            let mut attempts = 0usize;
            loop {
                let available: Vec<NodeId> = candidates[parent_level]
                    .iter()
                    .copied()
                    .filter(|id| !used.contains(id))
                    .collect();
                if available.is_empty() {
                    return Err(GenerateError::CannotGenerate { depth, lo, hi });
                }

                let parent = available[rng.gen_range(0..available.len())];
                let suffix_len = depth - trie.depth(parent);
                let bits = random_bits(rng, suffix_len);

                attempts += 1;
                if attempts > max_retries {
                    return Err(GenerateError::RetryBudgetExceeded {
                        attempts: max_retries,
                    });
                }

                match trie.insert(&bits, parent, Phase::Generate) {
                    Ok(id) => {
                        candidates[organisation_level(depth)].push(id);
                        buckets[level].complete_one(depth);
                        used.clear();
                        break;
                    }
                    Err(InsertError::Duplicate) => {
                        // A fresh draw from the same parent can still land.
                        continue;
                    }
                    Err(InsertError::LevelExceeded { .. }) => {
                        debug!(
                            "candidate at depth {} exhausted for {}-bit targets",
                            trie.depth(parent),
                            depth
                        );
                        used.insert(parent);
                        continue;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ORG_INTERVALS, ORG_LEVELS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn bucket(level: usize, entries: &[(usize, usize)]) -> PlanBucket {
        PlanBucket {
            interval: ORG_INTERVALS[level],
            pending: entries.iter().copied().collect::<BTreeMap<_, _>>(),
            strategy: Vec::new(),
        }
    }

    fn seeded_trie(seeds: &[&str], max_level: usize) -> (BinaryTrie, Vec<Vec<NodeId>>) {
        let mut trie = BinaryTrie::new(max_level);
        let mut candidates = vec![Vec::new(); ORG_LEVELS];
        for bits in seeds {
            let id = trie.insert(bits, trie.root(), Phase::Build).unwrap();
            candidates[organisation_level(bits.len())].push(id);
        }
        (trie, candidates)
    }

    #[test]
    fn drains_the_bucket_below_its_parents() {
        let (mut trie, mut candidates) =
            seeded_trie(&["0010000000000001", "0010000000000010"], 7);
        let mut buckets: Vec<PlanBucket> = (0..ORG_LEVELS)
            .map(|level| bucket(level, &[]))
            .collect();
        buckets[2] = bucket(2, &[(36, 5)]);
        let mut rng = StdRng::seed_from_u64(2);

        generate(&mut trie, &mut buckets, &mut candidates, &mut rng, 10_000).unwrap();

        assert!(buckets[2].pending.is_empty());
        assert_eq!(trie.prefix_count_by_depth()[36], 5);
        // Generated prefixes became candidates for the next tier.
        assert_eq!(candidates[2].len(), 5);
    }

    #[test]
    fn exhausted_candidates_fail_hard() {
        // The single /16 cannot delegate at all with the bound at 0.
        let (mut trie, mut candidates) = seeded_trie(&["0010000000000001"], 0);
        let mut buckets: Vec<PlanBucket> = (0..ORG_LEVELS)
            .map(|level| bucket(level, &[]))
            .collect();
        buckets[2] = bucket(2, &[(36, 1)]);
        let mut rng = StdRng::seed_from_u64(2);

        let err =
            generate(&mut trie, &mut buckets, &mut candidates, &mut rng, 10_000).unwrap_err();
        assert_eq!(
            err,
            GenerateError::CannotGenerate {
                depth: 36,
                lo: 32,
                hi: 48
            }
        );
    }

    #[test]
    fn duplicates_are_retried_without_retiring_the_parent() {
        // A single /31 parent and three targets at depth 33: only four
        // suffixes exist, so duplicate draws are near-certain. The drain
        // must still finish, because duplicates never retire a candidate.
        let seed = "0010000000000000000000000000000";
        let (mut trie, mut candidates) = seeded_trie(&[seed], 7);
        let mut buckets: Vec<PlanBucket> = (0..ORG_LEVELS)
            .map(|level| bucket(level, &[]))
            .collect();
        buckets[2] = bucket(2, &[(33, 3)]);
        let mut rng = StdRng::seed_from_u64(9);

        generate(&mut trie, &mut buckets, &mut candidates, &mut rng, 10_000).unwrap();
        assert!(buckets[2].pending.is_empty());
        assert_eq!(trie.prefix_count_by_depth()[33], 3);
    }
}
