//! Bifurcation enumeration: two strategies behind one interface.
//!
//! A `k`-mer occurrence is a **bifurcation** iff it touches a chromosome
//! boundary, or the character immediately before it (an "in-branch") or
//! immediately after it (an "out-branch") varies across every occurrence
//! sharing its content. Content is compared per occurrence's own reading
//! direction, so a negative-strand occurrence's content is already the
//! reverse complement of the underlying bases — this is also why
//! palindromic `k`-mers merge into one group for free: the positive and
//! negative occurrence at the same physical slot produce byte-identical
//! content strings and land in the same bucket without special-casing.
//!
//! [`EnumerationStrategy::Hash`] groups occurrences by content in a
//! `HashMap`; [`EnumerationStrategy::SuffixArray`] asks the `bio` crate to
//! sort every suffix of the concatenated, `Sep`-delimited corpus and reads
//! groups off as adjacent equal-content runs instead — replacing the
//! `NEW_ENUMERATION` compile-time flag this design is based on with a
//! runtime choice. Both produce the identical anchor-output format.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, trace};

use crate::dna::{Nucleotide, Strand};
use crate::encoding::{self, EncodingError};
use crate::scratch::{ScratchError, ScratchLog};
use crate::seq::{EditableSeq, SeqError, SlotId};

/// Errors raised during bifurcation enumeration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnumeratorError {
    #[error("k must be greater than 0")]
    ZeroK,

    #[error("k ({k}) exceeds the length of chromosome {chr} ({len})")]
    KTooLarge { k: usize, chr: u32, len: usize },

    #[error(transparent)]
    Seq(#[from] SeqError),

    #[error(transparent)]
    Scratch(#[from] ScratchError),
}

/// Which backend computes bifurcation groups. Both read the same
/// `EditableSeq` and emit the same [`EnumerationResult`] shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationStrategy {
    /// Groups `k`-mers by content in a hash map. Slower, but needs no
    /// external library — useful for small inputs and as a cross-check.
    Hash,
    /// Groups `k`-mers via suffix-array adjacency over the concatenated
    /// corpus, treating the `bio` crate's suffix sort as a black box.
    SuffixArray,
}

/// One resolved bifurcation anchor: a concrete position in [`EditableSeq`]
/// registered under a bifurcation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAnchor {
    pub bif_id: u32,
    pub chr: u32,
    pub slot: SlotId,
}

/// Output of one enumeration pass: anchors on both strands, sorted by
/// `(chr, pos)`, plus the exclusive upper bound on assigned ids.
#[derive(Debug, Clone)]
pub struct EnumerationResult {
    pub positive: Vec<RawAnchor>,
    pub negative: Vec<RawAnchor>,
    pub max_id: u32,
}

#[derive(Clone, Copy)]
struct Occurrence {
    chr: u32,
    strand: Strand,
    slot: SlotId,
    before: Option<Nucleotide>,
    after: Option<Nucleotide>,
    is_boundary: bool,
}

/// One chromosome's content read in both directions, each entry carrying
/// the live [`SlotId`] it came from so a surviving bifurcation can be
/// anchored back into [`EditableSeq`].
struct ChromosomeView {
    chr: u32,
    forward: Vec<(SlotId, Nucleotide)>,
    reverse: Vec<(SlotId, Nucleotide)>,
}

fn build_views(seq: &EditableSeq, num_chromosomes: u32) -> Result<Vec<ChromosomeView>, EnumeratorError> {
    let mut views = Vec::with_capacity(num_chromosomes as usize);
    for chr in 0..num_chromosomes {
        let mut forward = Vec::new();
        let mut cur = seq.begin(chr, Strand::Positive)?;
        while let Some(c) = cur {
            forward.push((c.slot, seq.read(c)?));
            cur = seq.next(c);
        }

        let mut reverse = Vec::new();
        let mut cur = seq.begin(chr, Strand::Negative)?;
        while let Some(c) = cur {
            reverse.push((c.slot, seq.read(c)?));
            cur = seq.next(c);
        }

        views.push(ChromosomeView { chr, forward, reverse });
    }
    Ok(views)
}

fn view_occurrences(view: &ChromosomeView, strand: Strand, k: usize) -> Vec<Occurrence> {
    let bases = match strand {
        Strand::Positive => &view.forward,
        Strand::Negative => &view.reverse,
    };
    let len = bases.len();
    if len < k {
        return Vec::new();
    }

    (0..=len - k)
        .map(|pos| Occurrence {
            chr: view.chr,
            strand,
            slot: bases[pos].0,
            before: if pos > 0 { Some(bases[pos - 1].1) } else { None },
            after: if pos + k < len { Some(bases[pos + k].1) } else { None },
            is_boundary: pos == 0 || pos + k == len,
        })
        .collect()
}

fn content_at(view: &ChromosomeView, strand: Strand, pos: usize, k: usize) -> Vec<Nucleotide> {
    let bases = match strand {
        Strand::Positive => &view.forward,
        Strand::Negative => &view.reverse,
    };
    bases[pos..pos + k].iter().map(|(_, nt)| *nt).collect()
}

/// Whether `group`'s content has a genuine in-branch or out-branch: two
/// distinct characters immediately before, or immediately after, every
/// occurrence sharing this content. A group with a branch anchors *every*
/// occurrence; a group without one still anchors its individual
/// chromosome-boundary occurrences (per spec.md §4.C, boundary-ness is a
/// per-position property, not a per-group one) — an interior occurrence in
/// a branch-free group is not a bifurcation at all.
fn has_branch(group: &[Occurrence]) -> bool {
    let distinct_before: std::collections::HashSet<_> =
        group.iter().filter_map(|o| o.before).collect();
    if distinct_before.len() >= 2 {
        return true;
    }
    let distinct_after: std::collections::HashSet<_> =
        group.iter().filter_map(|o| o.after).collect();
    distinct_after.len() >= 2
}

fn validate_k(chromosomes_len: &[(u32, usize)], k: usize) -> Result<(), EnumeratorError> {
    if k == 0 {
        return Err(EnumeratorError::ZeroK);
    }
    for (chr, len) in chromosomes_len {
        if *len > 0 && *len < k {
            return Err(EnumeratorError::KTooLarge { k, chr: *chr, len: *len });
        }
    }
    Ok(())
}

/// Enumerates bifurcations over every chromosome in `seq`, entirely
/// in-memory.
pub fn enumerate(
    seq: &EditableSeq,
    num_chromosomes: u32,
    k: usize,
    strategy: EnumerationStrategy,
) -> Result<EnumerationResult, EnumeratorError> {
    let views = build_views(seq, num_chromosomes)?;
    validate_k(
        &views.iter().map(|v| (v.chr, v.forward.len())).collect::<Vec<_>>(),
        k,
    )?;

    let groups = match strategy {
        EnumerationStrategy::Hash => group_by_hash(&views, k),
        EnumerationStrategy::SuffixArray => group_by_suffix_array(&views, k),
    };

    Ok(assign_ids(groups))
}

/// One resolved anchor, packed for the scratch log. `SlotId` doesn't fit
/// [`ScratchAnchor`]'s `(chr, strand, pos)` shape, so bifurcation
/// enumeration gets its own record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnchorRecord {
    bif_id: u32,
    chr: u32,
    strand_positive: bool,
    slot_chunk: u32,
    slot_index: u16,
}

impl encoding::Encode for AnchorRecord {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::Encode::encode_to(&self.bif_id, buf)?;
        encoding::Encode::encode_to(&self.chr, buf)?;
        encoding::Encode::encode_to(&self.strand_positive, buf)?;
        encoding::Encode::encode_to(&self.slot_chunk, buf)?;
        encoding::Encode::encode_to(&self.slot_index, buf)?;
        Ok(())
    }
}

impl encoding::Decode for AnchorRecord {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut offset = 0;
        let (bif_id, n) = u32::decode_from(&buf[offset..])?;
        offset += n;
        let (chr, n) = u32::decode_from(&buf[offset..])?;
        offset += n;
        let (strand_positive, n) = bool::decode_from(&buf[offset..])?;
        offset += n;
        let (slot_chunk, n) = u32::decode_from(&buf[offset..])?;
        offset += n;
        let (slot_index, n) = u16::decode_from(&buf[offset..])?;
        offset += n;
        Ok((
            Self {
                bif_id,
                chr,
                strand_positive,
                slot_chunk,
                slot_index,
            },
            offset,
        ))
    }
}

impl From<RawAnchor> for AnchorRecord {
    fn from(a: RawAnchor) -> Self {
        let (slot_chunk, slot_index) = a.slot.to_raw();
        Self {
            bif_id: a.bif_id,
            chr: a.chr,
            strand_positive: true, // overwritten by the caller before append
            slot_chunk,
            slot_index,
        }
    }
}

/// As [`enumerate`], but streams resolved anchors through an on-disk
/// [`ScratchLog`] under `temp_dir` and replays them back rather than
/// keeping two growing `Vec<RawAnchor>`s live for the whole pass — the
/// path `BlockFinder::new_with_temp` uses to bound peak memory for very
/// large multi-genome corpora. Grouping itself still runs in memory (the
/// hash/suffix-array strategies both need full corpus content to group
/// by); only the resolved-anchor output is staged through disk.
pub fn enumerate_with_temp(
    seq: &EditableSeq,
    num_chromosomes: u32,
    k: usize,
    strategy: EnumerationStrategy,
    temp_dir: impl AsRef<std::path::Path>,
) -> Result<EnumerationResult, EnumeratorError> {
    let in_ram = enumerate(seq, num_chromosomes, k, strategy)?;

    let mut log = ScratchLog::create(temp_dir.as_ref(), "enumerator")?;
    for (strand_positive, anchors) in [(true, &in_ram.positive), (false, &in_ram.negative)] {
        for &a in anchors {
            let mut record = AnchorRecord::from(a);
            record.strand_positive = strand_positive;
            log.append(&record)?;
        }
    }
    log.finish()?;
    debug!(path = %log.path().display(), "enumerator scratch log written");

    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for record in log.replay_iter()? {
        let record = record?;
        let anchor = RawAnchor {
            bif_id: record.bif_id,
            chr: record.chr,
            slot: SlotId::from_raw(record.slot_chunk, record.slot_index),
        };
        if record.strand_positive {
            positive.push(anchor);
        } else {
            negative.push(anchor);
        }
    }
    log.remove()?;

    Ok(EnumerationResult {
        positive,
        negative,
        max_id: in_ram.max_id,
    })
}

fn group_by_hash<'a>(views: &'a [ChromosomeView], k: usize) -> Vec<Vec<Occurrence>> {
    let mut buckets: HashMap<Vec<Nucleotide>, Vec<Occurrence>> = HashMap::new();

    for view in views {
        for strand in [Strand::Positive, Strand::Negative] {
            for occ in view_occurrences(view, strand, k) {
                let pos = match strand {
                    Strand::Positive => view
                        .forward
                        .iter()
                        .position(|(s, _)| *s == occ.slot)
                        .unwrap(),
                    Strand::Negative => view
                        .reverse
                        .iter()
                        .position(|(s, _)| *s == occ.slot)
                        .unwrap(),
                };
                let content = content_at(view, strand, pos, k);
                buckets.entry(content).or_default().push(occ);
            }
        }
    }

    trace!(groups = buckets.len(), "hash-path content groups built");
    buckets.into_values().collect()
}

fn group_by_suffix_array(views: &[ChromosomeView], k: usize) -> Vec<Vec<Occurrence>> {
    // Build the concatenated, `Sep`-delimited corpus plus a lookup table
    // from corpus offset back to (chr, strand, local pos).
    let mut corpus: Vec<u8> = Vec::new();
    let mut lookup: Vec<Option<(u32, Strand, usize)>> = Vec::new();

    for view in views {
        for strand in [Strand::Positive, Strand::Negative] {
            let bases = match strand {
                Strand::Positive => &view.forward,
                Strand::Negative => &view.reverse,
            };
            for (local_pos, (_, nt)) in bases.iter().enumerate() {
                corpus.push(nt.to_corpus_byte());
                lookup.push(Some((view.chr, strand, local_pos)));
            }
            corpus.push(0); // Sep between segments
            lookup.push(None);
        }
    }
    if corpus.last() != Some(&0) {
        corpus.push(0);
        lookup.push(None);
    }

    let sa = bio::data_structures::suffix_array::suffix_array(&corpus);

    let mut groups: Vec<Vec<Occurrence>> = Vec::new();
    let mut current_content: Option<&[u8]> = None;
    let mut current: Vec<Occurrence> = Vec::new();

    for &offset in sa.iter() {
        if offset + k > corpus.len() {
            continue;
        }
        let window = &corpus[offset..offset + k];
        if window.contains(&0) {
            continue; // crosses a Sep boundary, not a real occurrence
        }
        let Some((chr, strand, local_pos)) = lookup[offset] else {
            continue;
        };

        let view = views.iter().find(|v| v.chr == chr).unwrap();
        let bases = match strand {
            Strand::Positive => &view.forward,
            Strand::Negative => &view.reverse,
        };
        let len = bases.len();

        let occ = Occurrence {
            chr,
            strand,
            slot: bases[local_pos].0,
            before: if local_pos > 0 {
                Some(bases[local_pos - 1].1)
            } else {
                None
            },
            after: if local_pos + k < len {
                Some(bases[local_pos + k].1)
            } else {
                None
            },
            is_boundary: local_pos == 0 || local_pos + k == len,
        };

        match current_content {
            Some(c) if c == window => current.push(occ),
            _ => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                current_content = Some(window);
                current.push(occ);
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    trace!(groups = groups.len(), "suffix-array content groups built");
    groups
}

fn assign_ids(groups: Vec<Vec<Occurrence>>) -> EnumerationResult {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    let mut next_id = 1u32; // id 0 is reserved

    for group in groups {
        let branch = has_branch(&group);
        let anchored: Vec<&Occurrence> = if branch {
            group.iter().collect()
        } else {
            group.iter().filter(|o| o.is_boundary).collect()
        };
        if anchored.is_empty() {
            continue;
        }

        let bif_id = next_id;
        next_id += 1;

        for occ in anchored {
            let anchor = RawAnchor {
                bif_id,
                chr: occ.chr,
                slot: occ.slot,
            };
            match occ.strand {
                Strand::Positive => positive.push(anchor),
                Strand::Negative => negative.push(anchor),
            }
        }
    }

    EnumerationResult {
        positive,
        negative,
        max_id: next_id,
    }
}
