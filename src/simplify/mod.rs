//! Bulge-removal graph simplifier.
//!
//! Collapses short divergent branches ("bulges") between a shared start
//! bifurcation and a shared end bifurcation so that repeated near-identical
//! paths converge into one before edge listing. Each pass snapshots a
//! bifurcation id's anchors before touching [`EditableSeq`], groups anchors
//! whose forward walk reaches the same end bifurcation within
//! `min_branch_size`, and collapses every group member but the first into
//! the first.
//!
//! Only positive-direction anchors are examined as collapse candidates.
//! [`EditableSeq`]'s two strand views alias the same physical chunks, so
//! rewriting a bulge's positive-direction arm already changes what a
//! negative-direction read of that same region sees (the complement of the
//! new content, reversed) — redoing the same collapse from the negative
//! side would double-apply the edit. `blocks::group_into_blocks` likewise
//! only ever emits positive-direction groups.


use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::bifstore::{Anchor, BifStore};
use crate::dna::Strand;
use crate::seq::{EditableSeq, SeqCursor, SeqError, SlotId};

/// Errors raised while simplifying the graph.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimplifyError {
    #[error(transparent)]
    Seq(#[from] SeqError),
}

/// Per-pass progress, reported once per outer-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassState {
    pub iteration: usize,
    pub collapses: usize,
}

/// Invoked once per pass boundary; must not mutate engine state. Its
/// return value is ignored — cancellation is not a feature of the core.
pub type ProgressCallback<'a> = dyn FnMut(PassState) + 'a;

/// Summary of a [`simplify`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimplifyStats {
    pub passes_run: usize,
    pub total_collapses: usize,
}

/// One candidate outgoing path from a start bifurcation's occurrence to
/// the next bifurcation found within `min_branch_size` interior
/// characters. `interior_start`/`interior_len` describe the stretch
/// strictly between the two `k`-mer windows — the part a collapse may
/// rewrite.
#[derive(Debug, Clone, Copy)]
struct Arm {
    start: Anchor,
    chr: u32,
    interior_start: Option<SlotId>,
    interior_len: usize,
    end: Anchor,
    end_bif_id: u32,
}

/// Walks forward from `start` (a positive-direction occurrence of some
/// bifurcation id), skipping its own `k`-length window, looking for the
/// next bifurcation within `min_branch_size` interior characters. Returns
/// `None` if none is found in range or the chromosome ends first.
fn find_arm(
    seq: &EditableSeq,
    bif_store: &BifStore,
    start: Anchor,
    k: usize,
    min_branch_size: usize,
) -> Option<Arm> {
    let chr = seq.chr_of(start.slot);
    let mut cursor = SeqCursor {
        chr,
        strand: Strand::Positive,
        slot: start.slot,
    };

    for _ in 0..k {
        cursor = seq.next(cursor)?;
    }
    let interior_start = cursor.slot;

    let mut interior_len = 0usize;
    loop {
        if let Some(end_id) = bif_store.lookup(cursor.strand, cursor.slot) {
            if interior_len < min_branch_size {
                return Some(Arm {
                    start,
                    chr,
                    interior_start: if interior_len == 0 { None } else { Some(interior_start) },
                    interior_len,
                    end: Anchor { strand: cursor.strand, slot: cursor.slot },
                    end_bif_id: end_id,
                });
            }
            return None;
        }
        if interior_len >= min_branch_size {
            return None;
        }
        cursor = seq.next(cursor)?;
        interior_len += 1;
    }
}

/// Reads `len` characters starting at `start` (in chain order), returning
/// their values and recorded original positions.
fn read_run(seq: &EditableSeq, chr: u32, start: SlotId, len: usize) -> Result<(Vec<crate::dna::Nucleotide>, Vec<u32>), SimplifyError> {
    let mut values = Vec::with_capacity(len);
    let mut positions = Vec::with_capacity(len);
    if len == 0 {
        return Ok((values, positions));
    }

    let mut cursor = SeqCursor { chr, strand: Strand::Positive, slot: start };
    for i in 0..len {
        values.push(seq.read(cursor)?);
        positions.push(seq.original_position(cursor.slot));
        if i + 1 < len {
            cursor = seq
                .next(cursor)
                .expect("interior_len was bounded by a prior successful walk");
        }
    }
    Ok((values, positions))
}

/// Rewrites `target`'s interior to match `source`'s, then re-anchors every
/// bifurcation displaced by the edit: build the replacement content, then
/// atomically swap the metadata that points at it, then clean up.
fn collapse_source_into_target(
    seq: &mut EditableSeq,
    bif_store: &mut BifStore,
    restricted: &mut HashMap<u32, HashSet<SlotId>>,
    start_id: u32,
    source: &Arm,
    target: &Arm,
) -> Result<(), SimplifyError> {
    let (src_values, src_positions) = match source.interior_start {
        Some(start) => read_run(seq, source.chr, start, source.interior_len)?,
        None => (Vec::new(), Vec::new()),
    };

    // notify_before (manual: `EditableSeq::erase` has no callback hook):
    // deregister every anchor inside the doomed range, on both strands —
    // the same physical slots may carry a different bifId when read from
    // the other direction.
    if let Some(target_interior_start) = target.interior_start {
        let mut cursor = SeqCursor {
            chr: target.chr,
            strand: Strand::Positive,
            slot: target_interior_start,
        };
        for i in 0..target.interior_len {
            bif_store.erase(Strand::Positive, cursor.slot);
            bif_store.erase(Strand::Negative, cursor.slot);
            if i + 1 < target.interior_len {
                cursor = seq
                    .next(cursor)
                    .expect("interior_len was bounded by a prior successful walk");
            }
        }
        seq.erase(target.chr, target_interior_start, Some(target.end.slot));
    }

    let mut end_slot = target.end.slot;

    if !src_values.is_empty() {
        let bif_store_cell = RefCell::new(&mut *bif_store);
        let relocations: RefCell<Vec<Vec<(Strand, u32)>>> = RefCell::new(Vec::new());
        let new_end_slot: Cell<Option<SlotId>> = Cell::new(None);

        let mut notify_before = |old_slots: &[SlotId]| {
            let mut store = bif_store_cell.borrow_mut();
            let mut rel = relocations.borrow_mut();
            rel.clear();
            for &slot in old_slots {
                let mut found = Vec::new();
                for strand in [Strand::Positive, Strand::Negative] {
                    if let Some(id) = store.lookup(strand, slot) {
                        store.erase(strand, slot);
                        found.push((strand, id));
                    }
                }
                rel.push(found);
            }
        };
        let mut notify_after = |new_slots: &[SlotId]| {
            let mut store = bif_store_cell.borrow_mut();
            let rel = relocations.borrow();
            for (i, (slot, found)) in new_slots.iter().zip(rel.iter()).enumerate() {
                for &(strand, id) in found {
                    let _ = store.add(id, Anchor { strand, slot: *slot });
                }
                if i == 0 {
                    new_end_slot.set(Some(*slot));
                }
            }
        };

        seq.insert(
            target.chr,
            target.end.slot,
            &src_values,
            &src_positions,
            &mut notify_before,
            &mut notify_after,
        )?;

        if let Some(s) = new_end_slot.get() {
            end_slot = s;
        }
    }

    restricted.entry(start_id).or_default().insert(end_slot);
    trace!(start_id, end_bif_id = target.end_bif_id, "bulge collapsed");
    Ok(())
}

/// Iteratively removes bulges from the graph, for up to `max_iterations`
/// passes over `[0, bif_store.max_id())`, halting early once a full pass
/// collapses nothing.
pub fn simplify(
    seq: &mut EditableSeq,
    bif_store: &mut BifStore,
    k: usize,
    min_branch_size: usize,
    max_iterations: usize,
    mut progress: Option<&mut ProgressCallback<'_>>,
) -> Result<SimplifyStats, SimplifyError> {
    let max_id = bif_store.max_id();
    let mut restricted: HashMap<u32, HashSet<SlotId>> = HashMap::new();
    let mut stats = SimplifyStats::default();

    for iteration in 1..=max_iterations {
        let mut collapses_this_pass = 0usize;

        for start_id in 0..max_id {
            let snapshot: Vec<Anchor> = bif_store.anchors_of(start_id).to_vec();
            if snapshot.len() < 2 {
                continue;
            }
            let restricted_here = restricted.get(&start_id);

            let mut arms: Vec<Arm> = Vec::new();
            for anchor in &snapshot {
                if anchor.strand != Strand::Positive {
                    continue;
                }
                if restricted_here.is_some_and(|r| r.contains(&anchor.slot)) {
                    continue;
                }
                if let Some(arm) = find_arm(seq, bif_store, *anchor, k, min_branch_size) {
                    arms.push(arm);
                }
            }

            let mut by_end: HashMap<u32, Vec<usize>> = HashMap::new();
            for (idx, arm) in arms.iter().enumerate() {
                by_end.entry(arm.end_bif_id).or_default().push(idx);
            }

            for idxs in by_end.into_values() {
                if idxs.len() < 2 {
                    continue;
                }
                let source = arms[idxs[0]];
                for &ti in &idxs[1..] {
                    let target = arms[ti];
                    if bif_store.lookup(Strand::Positive, target.start.slot) != Some(start_id) {
                        continue;
                    }
                    if bif_store.lookup(target.end.strand, target.end.slot) != Some(target.end_bif_id) {
                        continue;
                    }
                    collapse_source_into_target(seq, bif_store, &mut restricted, start_id, &source, &target)?;
                    collapses_this_pass += 1;
                }
            }
        }

        stats.passes_run += 1;
        stats.total_collapses += collapses_this_pass;

        let state = PassState { iteration, collapses: collapses_this_pass };
        if let Some(cb) = progress.as_deref_mut() {
            cb(state);
        }
        info!(iteration, collapses = collapses_this_pass, "simplify pass complete");

        if collapses_this_pass == 0 {
            debug!(iteration, "simplify converged early");
            break;
        }
    }

    Ok(stats)
}
