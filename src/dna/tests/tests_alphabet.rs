use crate::dna::{DnaError, Nucleotide};

#[test]
fn parses_valid_sequence() {
    let seq = Nucleotide::parse_sequence("acgtN").unwrap();
    assert_eq!(
        seq,
        vec![
            Nucleotide::A,
            Nucleotide::C,
            Nucleotide::G,
            Nucleotide::T,
            Nucleotide::N,
        ]
    );
}

#[test]
fn rejects_invalid_base() {
    let err = Nucleotide::parse_sequence("ACGTX").unwrap_err();
    assert_eq!(err, DnaError::InvalidBase('X', 4));
}

#[test]
fn complement_is_involution() {
    for base in [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::T] {
        assert_eq!(base.complement().complement(), base);
    }
    assert_eq!(Nucleotide::N.complement(), Nucleotide::N);
}

#[test]
#[should_panic]
fn complement_panics_on_sep() {
    let _ = Nucleotide::Sep.complement();
}

#[test]
fn empty_sequence_parses_to_empty_vec() {
    assert!(Nucleotide::parse_sequence("").unwrap().is_empty());
}
