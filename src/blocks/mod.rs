//! Edge listing and synteny block grouping.
//!
//! Reads the current [`crate::seq::EditableSeq`] plus [`crate::bifstore::BifStore`]
//! and turns the simplified graph into its final output: a list of
//! [`BlockInstance`]s, each an occurrence of a synteny block projected back
//! onto original input coordinates.
//!
//! `list_edges` walks consecutive anchor pairs per `(chr, direction)` and
//! emits the out-label edge between them; `group_into_blocks` sorts those
//! edges and walks consecutive-equal runs. The grouping predicate
//! (`Edge::coincide`) deliberately excludes `chr` so a block can span
//! chromosomes at all, while `chr` still breaks ties in the sort key; the
//! in-group overlap filter (`Edge::overlap`) then keeps at most one member
//! per overlapping original-coordinate range.


use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, trace};

use crate::bifstore::BifStore;
use crate::dna::{Nucleotide, Strand};
use crate::seq::{EditableSeq, SeqCursor, SeqError};

/// Errors raised while listing edges or grouping blocks.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlocksError {
    #[error(transparent)]
    Seq(#[from] SeqError),
}

/// One non-branching edge of the (possibly simplified) graph, between two
/// consecutive bifurcation anchors of the same chromosome and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub chr: u32,
    pub direction: Strand,
    pub start_vertex: u32,
    pub end_vertex: u32,
    pub actual_pos: u32,
    pub actual_len: u32,
    pub original_pos: u32,
    pub original_len: u32,
    pub first_char: Nucleotide,
}

impl Edge {
    /// The sort/group key: `(startVertex, endVertex, firstChar, direction,
    /// chr)`. `chr` is last: a tie-breaker for deterministic ordering, never
    /// part of [`Edge::coincide`].
    fn sort_key(&self) -> (u32, u32, Nucleotide, Strand, u32) {
        (
            self.start_vertex,
            self.end_vertex,
            self.first_char,
            self.direction,
            self.chr,
        )
    }

    /// Whether `self` and `other` belong to the same block candidate.
    /// Deliberately ignores `chr` — grouping must be able to span multiple
    /// chromosomes, or `shared_only` blocks (one member per chromosome)
    /// could never form.
    pub fn coincide(&self, other: &Edge) -> bool {
        self.start_vertex == other.start_vertex
            && self.end_vertex == other.end_vertex
            && self.first_char == other.first_char
            && self.direction == other.direction
    }

    /// Same-chromosome, half-open range intersection on original
    /// coordinates. Used by the in-group overlap filter.
    pub fn overlap(&self, other: &Edge) -> bool {
        if self.chr != other.chr {
            return false;
        }
        let a_start = self.original_pos;
        let a_end = self.original_pos + self.original_len;
        let b_start = other.original_pos;
        let b_end = other.original_pos + other.original_len;
        a_start < b_end && b_start < a_end
    }
}

/// Walks `bif_store`'s anchors per `(chr, direction)`, in anchor order, and
/// emits the out-label edge between each consecutive pair. Edges whose
/// `original_len < min_size` are dropped. `min_size` is a caller-supplied
/// floor independent of the enumeration `k`, so a block can be required to
/// carry more sequence than the bare `k`-mer that anchored it.
pub fn list_edges(
    seq: &EditableSeq,
    bif_store: &BifStore,
    num_chromosomes: u32,
    k: usize,
    min_size: usize,
) -> Result<Vec<Edge>, BlocksError> {
    let mut edges = Vec::new();

    for chr in 0..num_chromosomes {
        for direction in [Strand::Positive, Strand::Negative] {
            // Candidate start vertex: its bif id, actual/original start
            // position, and the live slot its k-mer begins at.
            struct Vertex {
                bif_id: u32,
                actual_pos: u32,
                original_pos: u32,
                slot: crate::seq::SlotId,
            }

            let mut anchors: Vec<Vertex> = Vec::new();
            let mut cur = seq.begin(chr, direction)?;
            let mut actual_pos = 0u32;

            while let Some(cursor) = cur {
                if let Some(bif_id) = bif_store.lookup(direction, cursor.slot) {
                    anchors.push(Vertex {
                        bif_id,
                        actual_pos,
                        original_pos: seq.original_position(cursor.slot),
                        slot: cursor.slot,
                    });
                }
                actual_pos += 1;
                cur = seq.next(cursor);
            }

            for pair in anchors.windows(2) {
                let (start, end) = (&pair[0], &pair[1]);

                // `first_char` is read `k` steps ahead of `start`,
                // independent of `end`'s distance. A bifurcation's k-mer
                // always fits within the chain, so this walk never runs
                // off the end of the chromosome.
                let mut look = SeqCursor { chr, strand: direction, slot: start.slot };
                for _ in 0..k {
                    look = seq
                        .next(look)
                        .expect("a bifurcation's k-mer window always fits within the chain");
                }
                let first_char = seq.read(look)?;

                let edge = Edge {
                    chr,
                    direction,
                    start_vertex: start.bif_id,
                    end_vertex: end.bif_id,
                    actual_pos: start.actual_pos,
                    actual_len: end.actual_pos + k as u32 - start.actual_pos,
                    original_pos: start.original_pos,
                    original_len: end.original_pos + k as u32 - start.original_pos,
                    first_char,
                };
                if edge.original_len as usize >= min_size {
                    edges.push(edge);
                }
            }
        }
    }

    debug!(edges = edges.len(), "edges listed");
    Ok(edges)
}

/// A single occurrence of a synteny block in output coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInstance {
    pub signed_block_id: i32,
    pub chr: u32,
    pub start: u32,
    pub end: u32,
}

/// Groups `edges` into numbered synteny blocks: sort by the key vector,
/// walk consecutive `coincide` runs, skip runs that revisit an
/// already-emitted locus or (with `shared_only`) don't cover every
/// chromosome exactly once, overlap-filter within the run, and emit one
/// `BlockInstance` per surviving member. Output is naturally ordered by
/// `(chr, start)`.
pub fn group_into_blocks(mut edges: Vec<Edge>, num_chromosomes: u32, shared_only: bool) -> Vec<BlockInstance> {
    edges.sort_by_key(Edge::sort_key);

    let mut visited: Vec<HashSet<(u32, u32)>> = vec![HashSet::new(); num_chromosomes as usize];
    let mut blocks = Vec::new();
    let mut next_block_id = 1i32;

    let mut i = 0;
    while i < edges.len() {
        let group_start = i;
        let mut occurrences = vec![0u32; num_chromosomes as usize];
        let mut hit = false;

        while i < edges.len() && edges[group_start].coincide(&edges[i]) {
            let e = &edges[i];
            occurrences[e.chr as usize] += 1;
            if visited[e.chr as usize].contains(&(e.original_pos, e.original_len)) {
                hit = true;
            }
            i += 1;
        }

        let group = &edges[group_start..i];
        let is_positive = group[0].direction == Strand::Positive;
        let group_size = group.len();

        if !hit
            && is_positive
            && group_size > 1
            && (!shared_only || occurrences.iter().filter(|&&c| c == 1).count() == num_chromosomes as usize)
        {
            let mut kept: Vec<&Edge> = Vec::new();
            for e in group {
                if !kept.iter().any(|k| e.overlap(k)) {
                    kept.push(e);
                }
            }

            if kept.len() > 1 {
                for e in &kept {
                    visited[e.chr as usize].insert((e.original_pos, e.original_len));
                    blocks.push(BlockInstance {
                        signed_block_id: next_block_id,
                        chr: e.chr,
                        start: e.original_pos,
                        end: e.original_pos + e.original_len,
                    });
                }
                next_block_id += 1;
            }
        }
    }

    blocks.sort_by_key(|b| (b.chr, b.start));
    trace!(blocks = blocks.len(), "blocks grouped");
    blocks
}
