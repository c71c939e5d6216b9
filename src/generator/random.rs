//! Unanchored prefix generation.
//!
//! Synthesizes top-level allocations that do not descend from any seed
//! prefix. The first bits of every generated prefix are pinned to the IANA
//! global-unicast marker so the output stays inside the address space real
//! registries allocate from. Collisions with existing prefixes and level
//! rejections are both retried with fresh bits, up to the retry budget.

use crate::generator::{random_bits, GenerateError};
use crate::plan::{organisation_level, PlanBucket};
use crate::trie::{BinaryTrie, NodeId, Phase};
use log::{debug, info};
use rand::Rng;

/// Fixed leading bits of every unanchored prefix (2000::/3, the global
/// unicast space).
pub const IANA_ROOT_MARKER: &str = "001";

/// Drain the unanchored work queues by inserting fresh prefixes at the root.
///
/// Newly created prefixes are recorded as traversal candidates so the
/// anchored phase can delegate below them.
pub(crate) fn generate<R: Rng>(
    trie: &mut BinaryTrie,
    buckets: &mut [PlanBucket],
    candidates: &mut [Vec<NodeId>],
    rng: &mut R,
    max_retries: usize,
) -> Result<(), GenerateError> {
    let root = trie.root();
    let mut generated = 0usize;

    for bucket in buckets.iter_mut() {
        while let Some(depth) = bucket.next_depth() {
            let mut attempts = 0usize;
            loop {
                attempts += 1;
                if attempts > max_retries {
                    return Err(GenerateError::RetryBudgetExceeded {
                        attempts: max_retries,
                    });
                }

                let bits = format!(
                    "{}{}",
                    IANA_ROOT_MARKER,
                    random_bits(rng, depth - IANA_ROOT_MARKER.len())
                );
                match trie.insert(&bits, root, Phase::Generate) {
                    Ok(id) => {
                        candidates[organisation_level(depth)].push(id);
                        bucket.complete_one(depth);
                        generated += 1;
                        break;
                    }
                    // Both rejections are recoverable here: a new draw from
                    // the full depth-wide space can always land elsewhere.
                    Err(err) => {
                        debug!("unanchored attempt at depth {} rejected: {}", depth, err);
                        continue;
                    }
                }
            }
        }
    }

    if generated > 0 {
        info!("{} prefixes generated without a seed anchor", generated);
    }
    Ok(())
}
