//! Stable, bidirectional, tombstone-carrying sequence storage.
//!
//! `EditableSeq` holds every input chromosome as a chain of fixed-capacity
//! [`Chunk`]s — an arena realization of the unrolled linked list the graph
//! simplifier needs: erasing a run of characters never renumbers the
//! survivors, and a [`SlotId`] (chunk id + slot index) stays the stable
//! identity of one logical character for as long as that character lives,
//! regardless of edits elsewhere in the structure.
//!
//! # Invariants
//!
//! - Slot order within and across chunks, following `next`/`prev` links, is
//!   the logical order of the chromosome.
//! - A slot holds either a real base or [`Nucleotide::Gap`] (a tombstone);
//!   iteration skips tombstones but never reassigns the `SlotId` of a
//!   surviving neighbor.
//! - A [`SeqCursor`] stays valid across edits anywhere except at its own
//!   slot; it is invalidated only if that exact slot is erased.
//! - The chain's last chunk per chromosome carries `is_end = true` so
//!   forward iteration recognizes the boundary without a sentinel lookup.
//!
//! `insert` splits the target chunk at the insertion point, relocates its
//! live tail into a fresh chunk (notifying the caller before and after the
//! move so it can keep an external index consistent), then writes the
//! incoming values into the vacated room, spilling into further fresh
//! chunks if the batch doesn't fit.

#[cfg(test)]
mod tests;

use std::sync::RwLock;

use thiserror::Error;
use tracing::trace;

use crate::dna::{ChromosomeRecord, DnaError, Nucleotide, Strand};

/// Default chunk capacity, exposed as `BlockFinderConfig::chunk_size`.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Errors raised by [`EditableSeq`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SeqError {
    #[error("invalid base in input: {0}")]
    Dna(#[from] DnaError),

    #[error("chunk_size must be at least 1")]
    ZeroChunkSize,

    #[error("no such chromosome {0}")]
    NoSuchChromosome(u32),

    #[error("cursor refers to a slot outside the live chain")]
    DeadCursor,

    #[error("values and original_positions must have equal length")]
    LengthMismatch,
}

/// Identity of one chunk in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(u32);

/// The stable identity of a slot: which chunk, and which offset inside it.
///
/// Two tokens compare equal iff they name the same slot. This is the
/// crate's realization of spec's "(chunk-id, slot-index)" position token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub chunk: ChunkId,
    pub slot: u16,
}

impl SlotId {
    /// Decomposes into a raw `(chunk, slot)` pair, for callers (e.g. the
    /// scratch-file egress path) that need to serialize a token without
    /// depending on [`ChunkId`]'s internal representation.
    pub fn to_raw(self) -> (u32, u16) {
        (self.chunk.0, self.slot)
    }

    /// Rebuilds a token from the pair produced by [`SlotId::to_raw`].
    /// Only valid against the same [`EditableSeq`] that produced it.
    pub fn from_raw(chunk: u32, slot: u16) -> Self {
        SlotId {
            chunk: ChunkId(chunk),
            slot,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotEntry {
    nt: Nucleotide,
    orig_pos: u32,
}

impl SlotEntry {
    fn tombstone() -> Self {
        Self {
            nt: Nucleotide::Gap,
            orig_pos: 0,
        }
    }

    fn is_live(&self) -> bool {
        self.nt != Nucleotide::Gap
    }
}

#[derive(Debug)]
struct Chunk {
    chr: u32,
    entries: Vec<SlotEntry>,
    live_count: u16,
    prev: Option<ChunkId>,
    next: Option<ChunkId>,
    is_end: bool,
}

impl Chunk {
    fn new(chr: u32, chunk_size: usize) -> Self {
        Self {
            chr,
            entries: vec![SlotEntry::tombstone(); chunk_size],
            live_count: 0,
            prev: None,
            next: None,
            is_end: false,
        }
    }

    fn recompute_live_count(&mut self) {
        self.live_count = self.entries.iter().filter(|e| e.is_live()).count() as u16;
    }
}

/// A directional position in one chromosome's storage.
///
/// `strand` determines reading direction: [`Strand::Positive`] walks the
/// chain forward and reads bases as stored; [`Strand::Negative`] walks the
/// chain backward and reads the complement of each base. Both directions
/// share the same underlying chunks — no storage is duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqCursor {
    pub chr: u32,
    pub strand: Strand,
    pub slot: SlotId,
}

/// A half-open run of slots passed to a notify callback during `insert`.
/// `notify_before` receives the slots about to move (in chain order);
/// `notify_after` receives their replacements in the same order and count,
/// so a caller can zip the two lists itself to carry state (e.g. a
/// bifurcation id) across the move.
pub type NotifyBefore<'a> = dyn FnMut(&[SlotId]) + 'a;
pub type NotifyAfter<'a> = dyn FnMut(&[SlotId]) + 'a;

/// Chunked, tombstone-carrying storage for every input chromosome.
#[derive(Debug)]
pub struct EditableSeq {
    chunks: Vec<Chunk>,
    free_list: Vec<ChunkId>,
    chr_head: Vec<Option<ChunkId>>,
    chr_tail: Vec<Option<ChunkId>>,
    chunk_size: usize,
}

impl EditableSeq {
    /// Builds storage for every chromosome, filled left to right with no
    /// tombstones; each slot's original position is its offset in the
    /// input string.
    pub fn new(chromosomes: &[ChromosomeRecord], chunk_size: usize) -> Result<Self, SeqError> {
        if chunk_size == 0 {
            return Err(SeqError::ZeroChunkSize);
        }

        let mut seq = EditableSeq {
            chunks: Vec::new(),
            free_list: Vec::new(),
            chr_head: vec![None; chromosomes.len()],
            chr_tail: vec![None; chromosomes.len()],
            chunk_size,
        };

        for record in chromosomes {
            let bases = Nucleotide::parse_sequence(&record.sequence)?;
            seq.build_chain(record.id, &bases);
        }

        trace!(chromosomes = chromosomes.len(), chunk_size, "EditableSeq built");
        Ok(seq)
    }

    fn build_chain(&mut self, chr: u32, bases: &[Nucleotide]) {
        let idx = chr as usize;
        if bases.is_empty() {
            // An empty chromosome still needs one (empty) end chunk so
            // begin()/end() have somewhere to point.
            let id = self.push_chunk(Chunk {
                is_end: true,
                ..Chunk::new(chr, self.chunk_size)
            });
            self.chr_head[idx] = Some(id);
            self.chr_tail[idx] = Some(id);
            return;
        }

        let mut first_chunk = None;
        let mut prev: Option<ChunkId> = None;
        let mut pos = 0usize;
        while pos < bases.len() {
            let end = (pos + self.chunk_size).min(bases.len());
            let mut chunk = Chunk::new(chr, self.chunk_size);
            for (slot, base) in bases[pos..end].iter().enumerate() {
                chunk.entries[slot] = SlotEntry {
                    nt: *base,
                    orig_pos: (pos + slot) as u32,
                };
            }
            chunk.recompute_live_count();
            chunk.prev = prev;
            let id = self.push_chunk(chunk);
            if let Some(p) = prev {
                self.chunks[p.0 as usize].next = Some(id);
            }
            first_chunk.get_or_insert(id);
            prev = Some(id);
            pos = end;
        }

        let last = prev.expect("non-empty chromosome produces at least one chunk");
        self.chunks[last.0 as usize].is_end = true;
        self.chr_head[idx] = first_chunk;
        self.chr_tail[idx] = Some(last);
    }

    fn push_chunk(&mut self, chunk: Chunk) -> ChunkId {
        if let Some(id) = self.free_list.pop() {
            self.chunks[id.0 as usize] = chunk;
            id
        } else {
            let id = ChunkId(self.chunks.len() as u32);
            self.chunks.push(chunk);
            id
        }
    }

    fn chunk(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.0 as usize]
    }

    fn chunk_mut(&mut self, id: ChunkId) -> &mut Chunk {
        &mut self.chunks[id.0 as usize]
    }

    /// First live slot of `chr` in `strand`'s reading direction.
    pub fn begin(&self, chr: u32, strand: Strand) -> Result<Option<SeqCursor>, SeqError> {
        let idx = chr as usize;
        let head = *self
            .chr_head
            .get(idx)
            .ok_or(SeqError::NoSuchChromosome(chr))?;
        let tail = *self
            .chr_tail
            .get(idx)
            .ok_or(SeqError::NoSuchChromosome(chr))?;

        let start_chunk = match strand {
            Strand::Positive => head,
            Strand::Negative => tail,
        };

        let Some(mut cur) = start_chunk else {
            return Ok(None);
        };

        let mut slot: i64 = match strand {
            Strand::Positive => 0,
            Strand::Negative => self.chunk_size as i64 - 1,
        };

        loop {
            let chunk = self.chunk(cur);
            if slot >= 0 && (slot as usize) < self.chunk_size && chunk.entries[slot as usize].is_live() {
                return Ok(Some(SeqCursor {
                    chr,
                    strand,
                    slot: SlotId {
                        chunk: cur,
                        slot: slot as u16,
                    },
                }));
            }

            match strand {
                Strand::Positive => {
                    if slot + 1 < self.chunk_size as i64 {
                        slot += 1;
                    } else if let Some(next) = chunk.next {
                        cur = next;
                        slot = 0;
                    } else {
                        return Ok(None);
                    }
                }
                Strand::Negative => {
                    if slot - 1 >= 0 {
                        slot -= 1;
                    } else if let Some(prev) = chunk.prev {
                        cur = prev;
                        slot = self.chunk_size as i64 - 1;
                    } else {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Advances one live slot in `cursor`'s reading direction, skipping
    /// tombstones. Returns `None` once the chromosome boundary is passed.
    pub fn next(&self, cursor: SeqCursor) -> Option<SeqCursor> {
        self.step(cursor, cursor.strand)
    }

    /// Steps one live slot against `cursor`'s reading direction (undoes
    /// `next`).
    pub fn prev(&self, cursor: SeqCursor) -> Option<SeqCursor> {
        self.step(cursor, cursor.strand.flip())
    }

    fn step(&self, cursor: SeqCursor, physical_direction: Strand) -> Option<SeqCursor> {
        let mut cur = cursor.slot.chunk;
        let mut slot: i64 = cursor.slot.slot as i64;

        loop {
            match physical_direction {
                Strand::Positive => {
                    if slot + 1 < self.chunk_size as i64 {
                        slot += 1;
                    } else if let Some(next) = self.chunk(cur).next {
                        cur = next;
                        slot = 0;
                    } else {
                        return None;
                    }
                }
                Strand::Negative => {
                    if slot - 1 >= 0 {
                        slot -= 1;
                    } else if let Some(prev) = self.chunk(cur).prev {
                        cur = prev;
                        slot = self.chunk_size as i64 - 1;
                    } else {
                        return None;
                    }
                }
            }

            if self.chunk(cur).entries[slot as usize].is_live() {
                return Some(SeqCursor {
                    chr: cursor.chr,
                    strand: cursor.strand,
                    slot: SlotId {
                        chunk: cur,
                        slot: slot as u16,
                    },
                });
            }
        }
    }

    /// Reads the base at `cursor`, complemented if `cursor.strand` is
    /// [`Strand::Negative`].
    pub fn read(&self, cursor: SeqCursor) -> Result<Nucleotide, SeqError> {
        let entry = self.chunk(cursor.slot.chunk).entries[cursor.slot.slot as usize];
        if !entry.is_live() {
            return Err(SeqError::DeadCursor);
        }
        Ok(match cursor.strand {
            Strand::Positive => entry.nt,
            Strand::Negative => entry.nt.complement(),
        })
    }

    /// The input coordinate recorded when this slot was created.
    pub fn original_position(&self, slot: SlotId) -> u32 {
        self.chunk(slot.chunk).entries[slot.slot as usize].orig_pos
    }

    /// Which chromosome `slot`'s chunk belongs to.
    pub fn chr_of(&self, slot: SlotId) -> u32 {
        self.chunk(slot.chunk).chr
    }

    /// A direction-independent identity for this slot, stable for as long
    /// as the slot lives.
    pub fn element_id(&self, slot: SlotId) -> u64 {
        ((slot.chunk.0 as u64) << 16) | slot.slot as u64
    }

    /// Replaces every slot in the half-open range `[start, end)` (chain
    /// order) with a tombstone, retiring any chunk whose live count
    /// reaches zero. `end` itself is not erased — pass `None` (the
    /// one-past-the-last-live-slot sentinel) to erase through the end of
    /// the chromosome. Returns the slot following the erased range, if
    /// the chromosome has one.
    pub fn erase(&mut self, chr: u32, start: SlotId, end: Option<SlotId>) -> Option<SlotId> {
        let after = end;

        let mut cur = start.chunk;
        let mut slot = start.slot;
        loop {
            if Some(SlotId { chunk: cur, slot }) == end {
                break;
            }

            let chunk = self.chunk_mut(cur);
            if chunk.entries[slot as usize].is_live() {
                chunk.entries[slot as usize] = SlotEntry::tombstone();
                chunk.live_count -= 1;
            }

            let chunk = self.chunk(cur);
            if (slot as usize) + 1 < self.chunk_size {
                slot += 1;
            } else {
                let next = chunk.next;
                self.retire_if_empty(cur, chr);
                match next {
                    Some(n) => {
                        cur = n;
                        slot = 0;
                    }
                    None => break,
                }
            }
        }
        self.retire_if_empty(cur, chr);

        trace!(chr, "EditableSeq range erased");
        after
    }

    fn retire_if_empty(&mut self, id: ChunkId, chr: u32) {
        let (live, prev, next, is_end) = {
            let chunk = self.chunk(id);
            (chunk.live_count, chunk.prev, chunk.next, chunk.is_end)
        };
        if live != 0 {
            return;
        }

        let idx = chr as usize;
        if let Some(p) = prev {
            self.chunk_mut(p).next = next;
        } else {
            self.chr_head[idx] = next;
        }
        if let Some(n) = next {
            self.chunk_mut(n).prev = prev;
            if is_end {
                self.chunk_mut(n).is_end = true;
            }
        } else if let Some(p) = prev {
            if is_end {
                self.chunk_mut(p).is_end = true;
            }
            self.chr_tail[idx] = Some(p);
        } else {
            // Chromosome now has no chunks at all; leave head/tail as-is
            // (an empty chromosome is represented by head==tail==None).
            self.chr_head[idx] = None;
            self.chr_tail[idx] = None;
        }

        self.free_list.push(id);
    }

    /// Inserts `values` at `at`, following the split-and-relocate
    /// algorithm: the target chunk's live tail moves into a fresh chunk
    /// (wrapped by `notify_before`/`notify_after` so a caller can keep an
    /// external index consistent), then `values` are written into the
    /// vacated slots, spilling into further fresh chunks as needed.
    ///
    /// Returns the slot of the first inserted value.
    pub fn insert(
        &mut self,
        chr: u32,
        at: SlotId,
        values: &[Nucleotide],
        original_positions: &[u32],
        notify_before: &mut NotifyBefore<'_>,
        notify_after: &mut NotifyAfter<'_>,
    ) -> Result<SlotId, SeqError> {
        if values.len() != original_positions.len() {
            return Err(SeqError::LengthMismatch);
        }
        if values.is_empty() {
            return Ok(at);
        }

        let chunk_size = self.chunk_size;

        // Collect the live suffix of the target chunk, from `at.slot` to
        // its physical end, in chain order.
        let mut old_slots = Vec::new();
        let mut moved: Vec<SlotEntry> = Vec::new();
        {
            let chunk = self.chunk(at.chunk);
            for s in at.slot as usize..chunk_size {
                let entry = chunk.entries[s];
                if entry.is_live() {
                    old_slots.push(SlotId {
                        chunk: at.chunk,
                        slot: s as u16,
                    });
                    moved.push(entry);
                }
            }
        }

        notify_before(&old_slots);

        // Splice a fresh chunk in after the target to receive the moved
        // suffix.
        let (old_next, was_end) = {
            let chunk = self.chunk(at.chunk);
            (chunk.next, chunk.is_end)
        };
        let mut tail_chunk = Chunk::new(chr, chunk_size);
        tail_chunk.prev = Some(at.chunk);
        tail_chunk.next = old_next;
        tail_chunk.is_end = was_end;
        for (slot, entry) in moved.iter().enumerate() {
            tail_chunk.entries[slot] = *entry;
        }
        tail_chunk.recompute_live_count();
        let tail_id = self.push_chunk(tail_chunk);

        if let Some(n) = old_next {
            self.chunk_mut(n).prev = Some(tail_id);
        }
        {
            let chunk = self.chunk_mut(at.chunk);
            chunk.next = Some(tail_id);
            chunk.is_end = false;
            for s in at.slot as usize..chunk_size {
                chunk.entries[s] = SlotEntry::tombstone();
            }
            chunk.recompute_live_count();
        }
        if was_end {
            self.chr_tail[chr as usize] = Some(tail_id);
        }

        let new_slots: Vec<SlotId> = (0..moved.len())
            .map(|s| SlotId {
                chunk: tail_id,
                slot: s as u16,
            })
            .collect();
        notify_after(&new_slots);

        // Write `values` into the vacated room, spilling into further
        // fresh chunks spliced between the target and `tail_id` if the
        // batch doesn't fit.
        let mut cur = at.chunk;
        let mut offset = at.slot as usize;
        let mut remaining_values = values;
        let mut remaining_pos = original_positions;
        let mut first_written = None;

        loop {
            let room = chunk_size - offset;
            let n = room.min(remaining_values.len());
            {
                let chunk = self.chunk_mut(cur);
                for i in 0..n {
                    chunk.entries[offset + i] = SlotEntry {
                        nt: remaining_values[i],
                        orig_pos: remaining_pos[i],
                    };
                }
                chunk.recompute_live_count();
            }
            if first_written.is_none() {
                first_written = Some(SlotId {
                    chunk: cur,
                    slot: offset as u16,
                });
            }
            remaining_values = &remaining_values[n..];
            remaining_pos = &remaining_pos[n..];
            if remaining_values.is_empty() {
                break;
            }

            let mut spill = Chunk::new(chr, chunk_size);
            let next_after = self.chunk(cur).next;
            spill.prev = Some(cur);
            spill.next = next_after;
            let id = self.push_chunk(spill);
            if let Some(n) = next_after {
                self.chunk_mut(n).prev = Some(id);
            }
            self.chunk_mut(cur).next = Some(id);
            cur = id;
            offset = 0;
        }

        trace!(chr, inserted = values.len(), "EditableSeq values inserted");
        Ok(first_written.expect("values is non-empty"))
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// A thread-safe handle around [`EditableSeq`].
///
/// Retained from the teacher's lock-guarded store shape even though the
/// engine itself runs single-threaded (see `SPEC_FULL.md` §5) — it costs
/// nothing and matches the corpus's default shape for mutable shared
/// state.
#[derive(Debug)]
pub struct SharedEditableSeq {
    inner: RwLock<EditableSeq>,
}

impl SharedEditableSeq {
    pub fn new(seq: EditableSeq) -> Self {
        Self {
            inner: RwLock::new(seq),
        }
    }

    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, EditableSeq> {
        self.inner.read().expect("EditableSeq lock poisoned")
    }

    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, EditableSeq> {
        self.inner.write().expect("EditableSeq lock poisoned")
    }
}
