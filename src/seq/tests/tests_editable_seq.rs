use crate::dna::{ChromosomeRecord, Nucleotide, Strand};
use crate::seq::{EditableSeq, SlotId};

fn build(seqs: &[(u32, &str)], chunk_size: usize) -> EditableSeq {
    let records: Vec<_> = seqs
        .iter()
        .map(|(id, s)| ChromosomeRecord::new(*id, format!("chr{id}"), *s))
        .collect();
    EditableSeq::new(&records, chunk_size).unwrap()
}

fn forward_bases(seq: &EditableSeq, chr: u32) -> Vec<Nucleotide> {
    let mut out = Vec::new();
    let mut cur = seq.begin(chr, Strand::Positive).unwrap();
    while let Some(c) = cur {
        out.push(seq.read(c).unwrap());
        cur = seq.next(c);
    }
    out
}

fn reverse_bases(seq: &EditableSeq, chr: u32) -> Vec<Nucleotide> {
    let mut out = Vec::new();
    let mut cur = seq.begin(chr, Strand::Negative).unwrap();
    while let Some(c) = cur {
        out.push(seq.read(c).unwrap());
        cur = seq.next(c);
    }
    out
}

#[test]
fn forward_iteration_reproduces_input() {
    let seq = build(&[(0, "ACGTACGT")], 3);
    assert_eq!(
        forward_bases(&seq, 0),
        Nucleotide::parse_sequence("ACGTACGT").unwrap()
    );
}

#[test]
fn reverse_iteration_reproduces_reverse_complement() {
    // ACGTACGT is palindromic under reverse-complement, so use a
    // non-palindromic input to make the check meaningful.
    let seq = build(&[(0, "AACCGGT")], 4);
    let rc: Vec<_> = "AACCGGT"
        .chars()
        .rev()
        .map(|c| Nucleotide::from_u8(c as u8, 0).unwrap().complement())
        .collect();
    assert_eq!(reverse_bases(&seq, 0), rc);
}

#[test]
fn original_position_is_monotone_along_forward_iteration() {
    let seq = build(&[(0, "ACGTACGTACGT")], 5);
    let mut cur = seq.begin(0, Strand::Positive).unwrap();
    let mut last = None;
    while let Some(c) = cur {
        let pos = seq.original_position(c.slot);
        if let Some(prev) = last {
            assert!(pos > prev);
        }
        last = Some(pos);
        cur = seq.next(c);
    }
}

#[test]
fn chr_of_identifies_the_owning_chromosome() {
    let seq = build(&[(0, "ACGT"), (1, "TTTT")], 2);
    let mut cur = seq.begin(0, Strand::Positive).unwrap();
    while let Some(c) = cur {
        assert_eq!(seq.chr_of(c.slot), 0);
        cur = seq.next(c);
    }
    let mut cur = seq.begin(1, Strand::Positive).unwrap();
    while let Some(c) = cur {
        assert_eq!(seq.chr_of(c.slot), 1);
        cur = seq.next(c);
    }
}

#[test]
fn empty_chromosome_has_no_live_slots() {
    let seq = build(&[(0, "")], 8);
    assert!(seq.begin(0, Strand::Positive).unwrap().is_none());
    assert!(seq.begin(0, Strand::Negative).unwrap().is_none());
}

#[test]
fn unrelated_cursors_survive_an_erase() {
    let mut seq = build(&[(0, "ACGTACGTACGT")], 4);
    let first = seq.begin(0, Strand::Positive).unwrap().unwrap();
    let original_first_pos = seq.original_position(first.slot);

    // Find the slot at position 8 and 9 (physical) to erase 2 chars in
    // the middle, far from `first`.
    let mut cur = first;
    for _ in 0..8 {
        cur = seq.next(cur).unwrap();
    }
    let erase_start = cur.slot;
    let erase_end = seq.next(cur).unwrap().slot;
    let after = seq.erase(0, erase_start, Some(erase_end));
    assert!(after.is_some());

    // `first` is untouched: same slot, same original position, same base.
    assert_eq!(seq.original_position(first.slot), original_first_pos);
    assert_eq!(seq.read(first).unwrap(), Nucleotide::A);
}

#[test]
fn erase_through_end_of_chromosome_accepts_none_sentinel() {
    let mut seq = build(&[(0, "ACGTACGT")], 4);
    let mid = {
        let mut cur = seq.begin(0, Strand::Positive).unwrap().unwrap();
        for _ in 0..4 {
            cur = seq.next(cur).unwrap();
        }
        cur.slot
    };
    let after = seq.erase(0, mid, None);
    assert!(after.is_none());
    assert_eq!(forward_bases(&seq, 0).len(), 4);
}

#[test]
fn insert_relocates_tail_and_notifies_in_matching_order() {
    let mut seq = build(&[(0, "ACGT")], 4);
    let at = seq.begin(0, Strand::Positive).unwrap().unwrap().slot; // slot 0

    let mut before_calls: Vec<Vec<SlotId>> = Vec::new();
    let mut after_calls: Vec<Vec<SlotId>> = Vec::new();

    let values = Nucleotide::parse_sequence("TT").unwrap();
    let positions = [100u32, 101u32];

    seq.insert(
        0,
        at,
        &values,
        &positions,
        &mut |old| before_calls.push(old.to_vec()),
        &mut |new| after_calls.push(new.to_vec()),
    )
    .unwrap();

    assert_eq!(before_calls.len(), 1);
    assert_eq!(after_calls.len(), 1);
    assert_eq!(before_calls[0].len(), after_calls[0].len());
    // The whole original chunk (ACGT) was live from slot 0, so all 4 moved.
    assert_eq!(before_calls[0].len(), 4);

    let result = forward_bases(&seq, 0);
    assert_eq!(result[0], Nucleotide::T);
    assert_eq!(result[1], Nucleotide::T);
}

#[test]
fn insert_with_empty_values_is_a_no_op() {
    let mut seq = build(&[(0, "ACGT")], 4);
    let at = seq.begin(0, Strand::Positive).unwrap().unwrap().slot;
    let mut calls = 0;
    let got = seq
        .insert(
            0,
            at,
            &[],
            &[],
            &mut |_| calls += 1,
            &mut |_| calls += 1,
        )
        .unwrap();
    assert_eq!(got, at);
    assert_eq!(calls, 0);
}

#[test]
fn rejects_mismatched_values_and_positions_length() {
    let mut seq = build(&[(0, "ACGT")], 4);
    let at = seq.begin(0, Strand::Positive).unwrap().unwrap().slot;
    let values = Nucleotide::parse_sequence("TT").unwrap();
    let err = seq
        .insert(0, at, &values, &[1], &mut |_| {}, &mut |_| {})
        .unwrap_err();
    assert_eq!(err, crate::seq::SeqError::LengthMismatch);
}

#[test]
fn zero_chunk_size_is_rejected() {
    let records = vec![ChromosomeRecord::new(0, "chr0", "ACGT")];
    let err = EditableSeq::new(&records, 0).unwrap_err();
    assert_eq!(err, crate::seq::SeqError::ZeroChunkSize);
}
