//! Generation orchestrator.
//!
//! Builds the seed trie, validates that the requested target distribution is
//! feasible, then sequences the two generation phases: unanchored (random)
//! generation first, so fresh registry-level allocations can anchor deeper
//! ones, followed by trie-traversal generation that expands existing
//! allocations. Any fatal error aborts the run before a single prefix is
//! emitted.

pub mod random;
pub mod traversal;

use crate::plan::{self, PlanError, ORG_LEVELS};
use crate::trie::{BinaryTrie, DepthCounts, InsertError, NodeId, Phase};
use log::{info, warn};
use rand::Rng;

/// Default ceiling on collision retries before the run is declared stuck.
pub const DEFAULT_MAX_RETRIES: usize = 10_000;

/// Caller-supplied generation parameters.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Expected size of the final prefix set.
    pub prefix_quantity: usize,
    /// Upper bound on any prefix's delegation level.
    pub max_level: usize,
    /// Dense target distribution: depth -> expected prefix count.
    pub target_distribution: DepthCounts,
    /// Attempt ceiling for duplicate/collision retry loops.
    pub max_retries: usize,
}

/// Fatal generation failures. Recoverable insertion rejections
/// ([`InsertError`]) never surface here; they are retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(
        "cannot generate a {depth}-bit prefix in interval [{lo}, {hi}): every candidate \
         parent prefix is already at its maximum delegation level"
    )]
    CannotGenerate { depth: usize, lo: usize, hi: usize },
    #[error(
        "gave up after {attempts} generation attempts without finding a free prefix; \
         the requested distribution is too dense for the address space"
    )]
    RetryBudgetExceeded { attempts: usize },
    #[error(
        "seed trie already contains a prefix at delegation level {level}, above the \
         allowed maximum of {max}"
    )]
    SeedLevelTooHigh { level: usize, max: usize },
}

/// Owns the trie across the whole build-plan-generate pipeline.
pub struct Generator {
    trie: BinaryTrie,
    config: GeneratorConfig,
    /// Candidate parent prefixes per organisation level. Freshly generated
    /// prefixes are appended so new registry allocations can anchor deeper
    /// ones within the same run.
    candidates: Vec<Vec<NodeId>>,
}

impl Generator {
    /// Build the seed trie. The build phase is lenient: the seed data is
    /// authoritative and level bounds are recorded, not enforced.
    pub fn new(config: GeneratorConfig, seed_bits: &[String]) -> Self {
        let mut trie = BinaryTrie::new(config.max_level);
        let root = trie.root();
        let mut candidates = vec![Vec::new(); ORG_LEVELS];

        for bits in seed_bits {
            match trie.insert(bits, root, Phase::Build) {
                Ok(id) => candidates[plan::organisation_level(bits.len())].push(id),
                // The seed reader deduplicates, so this only fires on
                // hand-assembled input.
                Err(InsertError::Duplicate) => warn!("duplicate seed prefix ignored: {}", bits),
                Err(InsertError::LevelExceeded { .. }) => {
                    unreachable!("level bounds are not enforced in the build phase")
                }
            }
        }
        info!(
            "seed trie built: {} prefixes, depth {}, level {}",
            trie.prefix_node_total(),
            trie.trie_depth(),
            trie.max_trie_level()
        );

        Generator {
            trie,
            config,
            candidates,
        }
    }

    pub fn trie(&self) -> &BinaryTrie {
        &self.trie
    }

    /// Run the full pipeline and return the bit strings of every prefix in
    /// the trie, seed and generated alike.
    pub fn generate<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<String>, GenerateError> {
        if self.trie.max_trie_level() > self.config.max_level {
            return Err(GenerateError::SeedLevelTooHigh {
                level: self.trie.max_trie_level(),
                max: self.config.max_level,
            });
        }

        let mut work = plan::build_plan(
            self.trie.prefix_count_by_depth(),
            &self.config.target_distribution,
            self.trie.leaf_count_by_depth(),
            self.config.prefix_quantity,
        )?;
        info!(
            "distribution plan: {} prefixes to generate ({} unanchored)",
            work.total_pending(),
            work.unanchored.iter().map(|b| b.remaining()).sum::<usize>()
        );

        random::generate(
            &mut self.trie,
            &mut work.unanchored,
            &mut self.candidates,
            rng,
            self.config.max_retries,
        )?;
        traversal::generate(
            &mut self.trie,
            &mut work.anchored,
            &mut self.candidates,
            rng,
            self.config.max_retries,
        )?;
        debug_assert!(work.is_drained());

        info!(
            "generation finished: {} prefixes in trie, depth {}, level {}",
            self.trie.prefix_node_total(),
            self.trie.trie_depth(),
            self.trie.max_trie_level()
        );
        Ok(self.trie.enumerate_prefixes())
    }
}

/// Uniform random bit string of exactly `len` characters.
///
/// Equivalent to drawing a `len`-bit integer and left-padding its binary
/// representation with zeros.
pub(crate) fn random_bits<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| if rng.gen::<bool>() { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::MAX_PREFIX_LEN;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dense(entries: &[(usize, usize)]) -> DepthCounts {
        let mut counts = [0; MAX_PREFIX_LEN + 1];
        for &(depth, count) in entries {
            counts[depth] = count;
        }
        counts
    }

    fn config(quantity: usize, max_level: usize, target: DepthCounts) -> GeneratorConfig {
        GeneratorConfig {
            prefix_quantity: quantity,
            max_level,
            target_distribution: target,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[test]
    fn empty_seed_generates_unanchored_prefixes() {
        let mut generator = Generator::new(config(3, 7, dense(&[(24, 3)])), &[]);
        let mut rng = StdRng::seed_from_u64(1);
        let prefixes = generator.generate(&mut rng).unwrap();

        assert_eq!(prefixes.len(), 3);
        for bits in &prefixes {
            assert_eq!(bits.len(), 24);
            assert!(bits.starts_with(random::IANA_ROOT_MARKER));
        }
    }

    #[test]
    fn seed_level_above_bound_aborts_before_planning() {
        let seeds = vec!["001000000000".to_string(), "0010000000000001".to_string()];
        let mut generator = Generator::new(config(2, 0, dense(&[(12, 1), (16, 1)])), &seeds);
        let mut rng = StdRng::seed_from_u64(1);
        let err = generator.generate(&mut rng).unwrap_err();
        assert_eq!(err, GenerateError::SeedLevelTooHigh { level: 1, max: 0 });
    }

    #[test]
    fn anchored_generation_expands_seed_leaves() {
        let seeds = vec!["0010000000000001".to_string(), "0010000000000010".to_string()];
        let target = dense(&[(16, 2), (40, 6)]);
        let mut generator = Generator::new(config(8, 7, target), &seeds);
        let mut rng = StdRng::seed_from_u64(7);
        let prefixes = generator.generate(&mut rng).unwrap();

        assert_eq!(prefixes.len(), 8);
        let deep: Vec<&String> = prefixes.iter().filter(|bits| bits.len() == 40).collect();
        assert_eq!(deep.len(), 6);
        // Every generated /40 descends from one of the seed /16s.
        for bits in deep {
            assert!(seeds.iter().any(|seed| bits.starts_with(seed.as_str())));
        }
    }

    #[test]
    fn infeasible_level_bound_is_a_hard_failure() {
        // One seed /16 whose only expansion would create level-1 chains
        // while the bound is 0: every candidate exhausts immediately once
        // it has delegated.
        let seeds = vec!["0010000000000001".to_string()];
        let target = dense(&[(16, 1), (40, 2)]);
        let mut generator = Generator::new(config(3, 0, target), &seeds);
        let mut rng = StdRng::seed_from_u64(3);
        let err = generator.generate(&mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerateError::CannotGenerate {
                depth: 40,
                lo: 32,
                hi: 48
            }
        );
    }

    #[test]
    fn generated_set_is_reproducible_with_a_fixed_rng_seed() {
        let target = dense(&[(24, 5), (40, 3)]);
        let run = |seed: u64| {
            let mut generator = Generator::new(config(8, 7, target), &[]);
            let mut rng = StdRng::seed_from_u64(seed);
            generator.generate(&mut rng).unwrap()
        };
        assert_eq!(run(42), run(42));
    }
}
