//! # V6Gene - IPv6 prefix set generator
//!
//! This library synthesizes large, statistically realistic sets of IPv6
//! prefixes. A binary trie is grown from a seed set of real-world prefixes,
//! then new prefixes are generated to match a caller-specified target
//! distribution by prefix length, while a delegation-level bound models how
//! address space is handed down the RIR -> LIR -> ISP -> end-user hierarchy.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `trie`: binary prefix trie with phased insertion, delegation-level
//!   maintenance and incremental statistics
//! - `plan`: distribution planner turning target distributions into
//!   per-organisation-level work queues
//! - `generator`: orchestrator plus the two generation strategies
//!   (trie-traversal and unanchored random)
//! - `codec`: textual CIDR to bit-string conversion at the boundary
//! - `seed`: seed-file and distribution-file parsing
//! - `report`: serializable run statistics
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use v6gene::generator::{Generator, GeneratorConfig, DEFAULT_MAX_RETRIES};
//! use v6gene::{codec, seed};
//!
//! let seeds = seed::read_seed_file("seed_prefixes.txt".as_ref())?;
//! let mut target = [0; 65];
//! target[32] = 100;
//! target[48] = 400;
//!
//! let config = GeneratorConfig {
//!     prefix_quantity: 500,
//!     max_level: 5,
//!     target_distribution: target,
//!     max_retries: DEFAULT_MAX_RETRIES,
//! };
//! let mut generator = Generator::new(config, &seeds);
//! let mut rng = StdRng::seed_from_u64(42);
//! for bits in generator.generate(&mut rng)? {
//!     println!("{}", codec::render_cidr(&bits));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod generator;
pub mod plan;
pub mod report;
pub mod seed;
pub mod trie;

pub use codec::{parse_cidr, render_cidr, CodecError};
pub use generator::{GenerateError, Generator, GeneratorConfig, DEFAULT_MAX_RETRIES};
pub use plan::{build_generating_strategy, build_plan, PlanBucket, PlanError, PlannedWork};
pub use report::RunReport;
pub use seed::{parse_depth_distribution, read_seed_file, InputError};
pub use trie::{BinaryTrie, InsertError, Phase};
