//! Extra integration tests targeting code paths not exercised by
//! `tests/integration.rs`'s scenario harness.
//!
//! These tests exercise:
//! - `BlockFinder::new_with_temp`'s on-disk scratch path
//! - `BlockFinder::with_config` with the hash enumeration strategy
//! - `serialize_graph` / `serialize_condensed_graph`
//! - Multi-chromosome, multi-occurrence block grouping
//! - The progress callback contract

use synteny_graph::dna::ChromosomeRecord;
use synteny_graph::engine::{BlockFinder, BlockFinderConfig};
use synteny_graph::enumerator::EnumerationStrategy;
use synteny_graph::simplify::PassState;

fn chromosome(id: u32, sequence: &str) -> ChromosomeRecord {
    ChromosomeRecord::new(id, format!("chr{id}"), sequence)
}

// ================================================================================================
// On-disk (`new_with_temp`) path
// ================================================================================================

#[test]
fn new_with_temp_produces_the_same_blocks_as_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let sequences = vec![chromosome(0, "ACGTACGT")];

    let in_memory = BlockFinder::new(sequences.clone()).unwrap();
    let on_disk = BlockFinder::new_with_temp(sequences, dir.path()).unwrap();

    let in_memory_blocks = in_memory.generate_synteny_blocks(3, 3, false, None).unwrap();
    let on_disk_blocks = on_disk.generate_synteny_blocks(3, 3, false, None).unwrap();

    assert_eq!(in_memory_blocks, on_disk_blocks);
}

#[test]
fn new_with_temp_leaves_no_scratch_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let finder = BlockFinder::new_with_temp(vec![chromosome(0, "ACGTACGTACGT")], dir.path()).unwrap();
    finder.generate_synteny_blocks(3, 3, false, None).unwrap();

    let remaining: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(remaining.is_empty(), "scratch files should be removed on success");
}

// ================================================================================================
// Enumeration strategy parity
// ================================================================================================

#[test]
fn hash_and_suffix_array_strategies_agree() {
    let sequences = vec![chromosome(0, "ACGTTTTACGT"), chromosome(1, "ACGTACGT")];

    let hash_finder = BlockFinder::with_config(
        sequences.clone(),
        BlockFinderConfig {
            chunk_size: 64,
            enumeration_strategy: EnumerationStrategy::Hash,
        },
    )
    .unwrap();
    let sa_finder = BlockFinder::with_config(
        sequences,
        BlockFinderConfig {
            chunk_size: 64,
            enumeration_strategy: EnumerationStrategy::SuffixArray,
        },
    )
    .unwrap();

    let mut hash_blocks = hash_finder.generate_synteny_blocks(3, 3, false, None).unwrap();
    let mut sa_blocks = sa_finder.generate_synteny_blocks(3, 3, false, None).unwrap();
    hash_blocks.sort_by_key(|b| (b.chr, b.start));
    sa_blocks.sort_by_key(|b| (b.chr, b.start));

    assert_eq!(hash_blocks, sa_blocks, "both enumeration strategies must agree on output");
}

// ================================================================================================
// Serialization
// ================================================================================================

#[test]
fn serialize_graph_round_trips_edge_count_with_condensed_form() {
    let finder = BlockFinder::new(vec![chromosome(0, "ACGTACGTACGT")]).unwrap();

    let mut plain = Vec::new();
    finder.serialize_graph(3, &mut plain).unwrap();
    let plain_edge_count = String::from_utf8(plain).unwrap().lines().count();

    let mut condensed = Vec::new();
    let mut reported = None;
    finder
        .serialize_condensed_graph(3, &mut condensed, Some(&mut |n| reported = Some(n)))
        .unwrap();

    assert_eq!(reported, Some(plain_edge_count));
}

// ================================================================================================
// Progress callback
// ================================================================================================

#[test]
fn simplify_progress_callback_fires_once_per_pass() {
    let mut finder = BlockFinder::new(vec![
        chromosome(0, "ACGTTTTACGT"),
        chromosome(1, "ACGTACGT"),
    ])
    .unwrap();

    let mut passes: Vec<PassState> = Vec::new();
    let mut callback = |state: PassState| passes.push(state);
    let stats = finder
        .perform_graph_simplifications(3, 5, 4, Some(&mut callback))
        .unwrap();

    assert_eq!(passes.len(), stats.passes_run);
    for (i, state) in passes.iter().enumerate() {
        assert_eq!(state.iteration, i + 1);
    }
}

// ================================================================================================
// Multi-chromosome grouping
// ================================================================================================

#[test]
fn three_identical_chromosomes_form_one_shared_block() {
    let finder = BlockFinder::new(vec![
        chromosome(0, "ACGTACGT"),
        chromosome(1, "ACGTACGT"),
        chromosome(2, "ACGTACGT"),
    ])
    .unwrap();

    let blocks = finder.generate_synteny_blocks(4, 4, true, None).unwrap();
    let chromosomes_covered: std::collections::HashSet<_> = blocks.iter().map(|b| b.chr).collect();
    assert_eq!(chromosomes_covered.len(), 3);
}
