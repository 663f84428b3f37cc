use crate::dna::ChromosomeRecord;
use crate::enumerator::{enumerate, enumerate_with_temp, EnumerationStrategy, EnumeratorError};
use crate::seq::EditableSeq;

fn seq_of(records: &[ChromosomeRecord]) -> EditableSeq {
    EditableSeq::new(records, 64).unwrap()
}

/// "ACGT" is its own reverse complement, so the forward and negative views
/// read byte-identical content: "AC"/"GT" each appear once per strand and
/// touch a chromosome boundary (qualify), while the purely-interior "CG"
/// has the same single neighbor character on both sides on every occurrence
/// and does not.
#[test]
fn boundary_groups_qualify_interior_group_does_not() {
    let records = [ChromosomeRecord::new(0, "chrA", "ACGT")];
    let seq = seq_of(&records);

    let result = enumerate(&seq, 1, 2, EnumerationStrategy::Hash).unwrap();

    assert_eq!(result.positive.len(), 2);
    assert_eq!(result.negative.len(), 2);
    assert_eq!(result.max_id, 3);
}

#[test]
fn suffix_array_strategy_agrees_with_hash_strategy_on_counts() {
    let records = [ChromosomeRecord::new(0, "chrA", "ACGT")];
    let seq = seq_of(&records);

    let hash = enumerate(&seq, 1, 2, EnumerationStrategy::Hash).unwrap();
    let sa = enumerate(&seq, 1, 2, EnumerationStrategy::SuffixArray).unwrap();

    assert_eq!(hash.positive.len(), sa.positive.len());
    assert_eq!(hash.negative.len(), sa.negative.len());
    assert_eq!(hash.max_id, sa.max_id);
}

/// Every occurrence of a homopolymer run is the same de Bruijn vertex, and
/// that vertex touches both chromosome boundaries, so the whole run
/// qualifies as one bifurcation shared by every occurrence — including the
/// purely-interior one. This is the literal, all-or-nothing reading of the
/// qualification rule, not a per-occurrence one.
#[test]
fn homopolymer_run_anchors_every_occurrence_under_one_id() {
    let records = [
        ChromosomeRecord::new(0, "chrA", "AAAA"),
        ChromosomeRecord::new(1, "chrB", "AAAA"),
    ];
    let seq = seq_of(&records);

    let result = enumerate(&seq, 2, 2, EnumerationStrategy::Hash).unwrap();

    // "AA" (positive) and "TT" (negative, since "AAAA"'s reverse complement
    // is "TTTT") each get 3 occurrences per chromosome, all under one id.
    assert_eq!(result.positive.len(), 6);
    assert_eq!(result.negative.len(), 6);
    assert_eq!(result.max_id, 3);

    let first_id = result.positive[0].bif_id;
    assert!(result.positive.iter().all(|a| a.bif_id == first_id));
    let neg_id = result.negative[0].bif_id;
    assert!(result.negative.iter().all(|a| a.bif_id == neg_id));
    assert_ne!(first_id, neg_id);
}

#[test]
fn zero_k_is_rejected() {
    let records = [ChromosomeRecord::new(0, "chrA", "ACGT")];
    let seq = seq_of(&records);

    let err = enumerate(&seq, 1, 0, EnumerationStrategy::Hash).unwrap_err();
    assert!(matches!(err, EnumeratorError::ZeroK));
}

#[test]
fn k_larger_than_a_chromosome_is_rejected() {
    let records = [ChromosomeRecord::new(0, "chrA", "AC")];
    let seq = seq_of(&records);

    let err = enumerate(&seq, 1, 5, EnumerationStrategy::Hash).unwrap_err();
    assert!(matches!(err, EnumeratorError::KTooLarge { k: 5, chr: 0, len: 2 }));
}

#[test]
fn enumerate_with_temp_matches_in_memory_enumeration() {
    let records = [
        ChromosomeRecord::new(0, "chrA", "AAAA"),
        ChromosomeRecord::new(1, "chrB", "AAAA"),
    ];
    let seq = seq_of(&records);
    let dir = tempfile::tempdir().unwrap();

    let in_ram = enumerate(&seq, 2, 2, EnumerationStrategy::Hash).unwrap();
    let via_disk = enumerate_with_temp(&seq, 2, 2, EnumerationStrategy::Hash, dir.path()).unwrap();

    assert_eq!(via_disk.max_id, in_ram.max_id);
    assert_eq!(via_disk.positive.len(), in_ram.positive.len());
    assert_eq!(via_disk.negative.len(), in_ram.negative.len());
    assert!(!dir.path().join("scratch-enumerator.log").exists());
}
