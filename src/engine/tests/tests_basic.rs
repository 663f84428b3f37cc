use super::helpers::{one, two};
use crate::engine::{BlockFinder, BlockFinderConfig, BlockFinderError};
use crate::enumerator::EnumerationStrategy;

#[test]
fn new_builds_over_single_chromosome() {
    let finder = BlockFinder::new(one("ACGTACGT")).unwrap();
    assert_eq!(finder.num_chromosomes(), 1);
}

#[test]
fn new_builds_over_multiple_chromosomes() {
    let finder = BlockFinder::new(two("ACGT", "ACGT")).unwrap();
    assert_eq!(finder.num_chromosomes(), 2);
}

#[test]
fn new_rejects_invalid_alphabet() {
    let err = BlockFinder::new(one("ACGTX")).unwrap_err();
    assert!(matches!(err, BlockFinderError::Dna(_)));
}

#[test]
fn with_config_honors_chunk_size_and_strategy() {
    let config = BlockFinderConfig {
        chunk_size: 4,
        enumeration_strategy: EnumerationStrategy::Hash,
    };
    let finder = BlockFinder::with_config(one("ACGTACGTACGT"), config).unwrap();
    assert_eq!(finder.num_chromosomes(), 1);
}

#[test]
fn new_with_temp_builds_over_a_scratch_dir() {
    let dir = tempfile::tempdir().unwrap();
    let finder = BlockFinder::new_with_temp(one("ACGTACGT"), dir.path()).unwrap();
    assert_eq!(finder.num_chromosomes(), 1);
}

#[test]
fn default_config_uses_suffix_array_and_default_chunk_size() {
    let config = BlockFinderConfig::default();
    assert_eq!(config.enumeration_strategy, EnumerationStrategy::SuffixArray);
    assert_eq!(config.chunk_size, crate::seq::DEFAULT_CHUNK_SIZE);
}
