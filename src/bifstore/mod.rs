//! Bidirectional bifurcation index.
//!
//! `BifStore` is the authority that lets the graph simplifier answer two
//! questions cheaply: "which positions carry bifurcation id `n`?" and
//! "does this position carry a bifurcation id at all?". Both indices are
//! kept in lock-step under one critical section per mutation — there is
//! no window where one reflects an edit the other hasn't seen yet.


use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::dna::Strand;
use crate::seq::SlotId;

/// Errors raised by [`BifStore`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BifStoreError {
    #[error("bifurcation id {0} is out of range (max is {1})")]
    IdOutOfRange(u32, u32),
}

/// One occurrence of a bifurcation `k`-mer: which strand and slot it
/// anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub strand: Strand,
    pub slot: SlotId,
}

/// Dual index: `bifId -> ordered anchors` and `(strand, slot) -> bifId`.
#[derive(Debug)]
pub struct BifStore {
    id_to_anchors: Vec<Vec<Anchor>>,
    token_to_id: HashMap<(Strand, SlotId), u32>,
}

impl BifStore {
    /// Constructs an empty store with capacity for ids in `[0, max_id)`.
    pub fn new(max_id: u32) -> Self {
        debug!(max_id, "BifStore constructed");
        Self {
            id_to_anchors: vec![Vec::new(); max_id as usize],
            token_to_id: HashMap::new(),
        }
    }

    /// Registers `anchor`'s position token under `bif_id`, appending to
    /// the end of that id's anchor list (construction/call order is
    /// preserved, per `anchors_of`'s ordering guarantee).
    pub fn add(&mut self, bif_id: u32, anchor: Anchor) -> Result<(), BifStoreError> {
        let bucket = self
            .id_to_anchors
            .get_mut(bif_id as usize)
            .ok_or_else(|| BifStoreError::IdOutOfRange(bif_id, self.id_to_anchors.len() as u32))?;
        bucket.push(anchor);
        self.token_to_id.insert((anchor.strand, anchor.slot), bif_id);
        Ok(())
    }

    /// Removes the anchor at `(strand, slot)`, if one is registered,
    /// updating both indices atomically.
    pub fn erase(&mut self, strand: Strand, slot: SlotId) {
        if let Some(bif_id) = self.token_to_id.remove(&(strand, slot)) {
            if let Some(bucket) = self.id_to_anchors.get_mut(bif_id as usize) {
                bucket.retain(|a| !(a.strand == strand && a.slot == slot));
            }
        }
    }

    /// The id anchored at `(strand, slot)`, if any.
    pub fn lookup(&self, strand: Strand, slot: SlotId) -> Option<u32> {
        self.token_to_id.get(&(strand, slot)).copied()
    }

    /// All anchors of `bif_id`, in the order they were added.
    pub fn anchors_of(&self, bif_id: u32) -> &[Anchor] {
        self.id_to_anchors
            .get(bif_id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of anchors currently registered for `bif_id`.
    pub fn count(&self, bif_id: u32) -> usize {
        self.anchors_of(bif_id).len()
    }

    /// The exclusive upper bound on bifurcation ids this store was built
    /// with.
    pub fn max_id(&self) -> u32 {
        self.id_to_anchors.len() as u32
    }
}
