//! Input-file parsing: seed prefix sets and target depth distributions.
//!
//! Seed files carry one `address/length` per line. Lines that do not parse,
//! or whose length falls outside the delegation policy window, are skipped
//! with a debug log rather than failing the run, mirroring how operators
//! feed raw RIR dumps into the generator.
//!
//! Depth distribution files (and the equivalent inline argument) use the
//! compact `depth:count` form, separated by commas or whitespace.

use crate::codec;
use crate::trie::{DepthCounts, MAX_PREFIX_LEN};
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Shortest prefix accepted from a seed file. Real delegations below /12 are
/// registry-internal and are not useful anchors for generation.
pub const MIN_SEED_PREFIX_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed depth distribution entry '{entry}', expected depth:count")]
    MalformedDistribution { entry: String },
    #[error("depth {depth} in the distribution is outside the 0-{MAX_PREFIX_LEN} range")]
    DepthOutOfRange { depth: usize },
}

/// Read and validate a seed prefix file.
///
/// Returns deduplicated bit strings sorted by ascending length, which is the
/// order the trie build phase expects (shallow allocations first).
pub fn read_seed_file(path: &Path) -> Result<Vec<String>, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_seed_prefixes(&content))
}

/// Parse seed file content into validated bit strings.
pub fn parse_seed_prefixes(content: &str) -> Vec<String> {
    let mut unique = BTreeSet::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match codec::parse_cidr(line) {
            Ok(bits) if bits.len() >= MIN_SEED_PREFIX_LEN => {
                unique.insert(bits);
            }
            Ok(bits) => {
                debug!(
                    "skipping seed prefix '{}': length {} is below the /{} policy floor",
                    line,
                    bits.len(),
                    MIN_SEED_PREFIX_LEN
                );
            }
            Err(err) => {
                debug!("skipping invalid seed line '{}': {}", line, err);
            }
        }
    }

    let mut prefixes: Vec<String> = unique.into_iter().collect();
    prefixes.sort_by_key(|bits| bits.len());
    prefixes
}

/// Parse an inline `depth:count,...` target distribution into a dense map.
/// Depths not mentioned default to zero.
pub fn parse_depth_distribution(text: &str) -> Result<DepthCounts, InputError> {
    let mut distribution = [0; MAX_PREFIX_LEN + 1];

    for entry in text.split([',', '\n', ' ']).filter(|e| !e.trim().is_empty()) {
        let entry = entry.trim();
        let (depth, count) = entry
            .split_once(':')
            .ok_or_else(|| InputError::MalformedDistribution {
                entry: entry.to_string(),
            })?;
        let depth: usize = depth
            .trim()
            .parse()
            .map_err(|_| InputError::MalformedDistribution {
                entry: entry.to_string(),
            })?;
        let count: usize = count
            .trim()
            .parse()
            .map_err(|_| InputError::MalformedDistribution {
                entry: entry.to_string(),
            })?;
        if depth > MAX_PREFIX_LEN {
            return Err(InputError::DepthOutOfRange { depth });
        }
        distribution[depth] = count;
    }
    Ok(distribution)
}

/// Read a depth distribution from a file in the same `depth:count` format.
pub fn read_depth_distribution_file(path: &Path) -> Result<DepthCounts, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_depth_distribution(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn seed_parsing_filters_and_sorts() {
        let content = "\
2001:db8::/32
2001:db8::/32
2000::/4
garbage line
2001::/16
2001:db8:ffff::/48
";
        let prefixes = parse_seed_prefixes(content);
        // The /4 is below the policy floor, the duplicate and the garbage
        // line are dropped, the remainder is sorted by length.
        assert_eq!(prefixes.len(), 3);
        assert_eq!(prefixes[0].len(), 16);
        assert_eq!(prefixes[1].len(), 32);
        assert_eq!(prefixes[2].len(), 48);
    }

    #[test]
    fn seed_file_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2001:db8::/32").unwrap();
        writeln!(file, "2001:db8:1::/48").unwrap();
        let prefixes = read_seed_file(file.path()).unwrap();
        assert_eq!(prefixes.len(), 2);
    }

    #[test]
    fn distribution_parsing() {
        let distribution = parse_depth_distribution("32:100,48:400, 64:25").unwrap();
        assert_eq!(distribution[32], 100);
        assert_eq!(distribution[48], 400);
        assert_eq!(distribution[64], 25);
        assert_eq!(distribution[12], 0);
    }

    #[test]
    fn distribution_rejects_bad_entries() {
        assert!(matches!(
            parse_depth_distribution("32-100").unwrap_err(),
            InputError::MalformedDistribution { .. }
        ));
        assert!(matches!(
            parse_depth_distribution("65:10").unwrap_err(),
            InputError::DepthOutOfRange { depth: 65 }
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_seed_file(Path::new("/nonexistent/seed.txt")).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
