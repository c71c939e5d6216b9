//! Run statistics report.
//!
//! Collects the numbers an operator wants after a run — seed versus
//! generated counts, the realized depth distribution, the level histogram —
//! into a serializable artifact. Rendering distribution graphs from it is
//! left to external tooling.

use crate::trie::BinaryTrie;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("cannot write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Summary of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed_prefixes: usize,
    pub generated_prefixes: usize,
    pub total_prefixes: usize,
    pub trie_depth: usize,
    pub trie_level: usize,
    /// Depths with at least one prefix and their counts.
    pub depth_distribution: BTreeMap<usize, usize>,
    /// Prefix count per delegation level, index = level.
    pub level_histogram: Vec<usize>,
}

impl RunReport {
    pub fn collect(trie: &BinaryTrie, seed_prefixes: usize) -> Self {
        let depth_distribution = trie
            .prefix_count_by_depth()
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(depth, &count)| (depth, count))
            .collect();

        RunReport {
            seed_prefixes,
            generated_prefixes: trie.synthesized_prefix_total(),
            total_prefixes: trie.prefix_node_total(),
            trie_depth: trie.trie_depth(),
            trie_level: trie.max_trie_level(),
            depth_distribution,
            level_histogram: trie.level_histogram(),
        }
    }

    /// Log the headline numbers at info level.
    pub fn log_summary(&self) {
        info!(
            "{} prefixes total ({} seed, {} generated)",
            self.total_prefixes, self.seed_prefixes, self.generated_prefixes
        );
        info!(
            "trie depth {}, trie level {}",
            self.trie_depth, self.trie_level
        );
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
