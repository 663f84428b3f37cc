//! # synteny-graph
//!
//! Finds **synteny blocks** — maximal similar substrings shared among a
//! set of DNA sequences, reverse-complement aware — by building a
//! compacted **de Bruijn graph** over `k`-mers from all input chromosomes
//! on both strands, iteratively collapsing short divergent branches
//! ("bulges"), and enumerating the graph's non-branching paths as blocks
//! projected back onto original coordinates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      BlockFinder                          │
//! │  ┌────────────┐  ┌─────────────┐  ┌─────────────────────┐│
//! │  │ EditableSeq │  │  enumerator │  │      BifStore       ││
//! │  │ (chunked,   │◄─┤ (hash /     ├─►│ (bifId ⇄ anchors,   ││
//! │  │ tombstoned) │  │ suffix-array│  │  slot → bifId)      ││
//! │  └──────┬──────┘  └─────────────┘  └──────────┬──────────┘│
//! │         │  notify-before / notify-after edits            │
//! │         ▼                                      ▼          │
//! │  ┌──────────────────────────────────────────────────────┐ │
//! │  │         simplify (bulge-removal passes)               │ │
//! │  └──────────────────────────────┬───────────────────────┘ │
//! │                                 ▼                          │
//! │  ┌──────────────────────────────────────────────────────┐ │
//! │  │     blocks (edge listing + synteny block grouping)    │ │
//! │  └──────────────────────────────────────────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Top-level `BlockFinder` API — construct, simplify, generate blocks, serialize |
//! | [`dna`] | Alphabet, strand, and chromosome record types |
//! | [`seq`] | `EditableSeq` — chunked, tombstone-carrying mutable sequence with stable position tokens |
//! | [`bifstore`] | `BifStore` — bidirectional bifurcation index |
//! | [`enumerator`] | Bifurcation enumeration (hash and suffix-array strategies) |
//! | [`simplify`] | Bulge-removal graph simplification |
//! | [`blocks`] | Edge listing and synteny block grouping |
//! | [`scratch`] | On-disk scratch log backing `BlockFinder::new_with_temp` |
//! | [`encoding`] | Deterministic binary wire format used by `scratch` |
//!
//! ## Key features
//!
//! - **Reverse-complement awareness** — every chromosome is read on both
//!   strands; palindromic `k`-mers share one bifurcation id across strands.
//! - **Iterator-stable mutation** — `EditableSeq`'s chunked, tombstone-
//!   carrying storage lets the simplifier rewrite thousands of positions
//!   without invalidating unrelated position tokens or re-scanning.
//! - **Two enumeration strategies behind one interface** — an in-memory
//!   hash path and a suffix-array path (via the `bio` crate), selected at
//!   construction time, producing an identical anchor format.
//! - **Bounded-memory mode** — `BlockFinder::new_with_temp` streams
//!   resolved anchors through an on-disk scratch log for very large
//!   multi-genome corpora.
//!
//! ## Quick start
//!
//! ```rust
//! use synteny_graph::dna::ChromosomeRecord;
//! use synteny_graph::engine::BlockFinder;
//!
//! let chromosomes = vec![ChromosomeRecord::new(0, "chrA", "ACGTACGT")];
//! let mut finder = BlockFinder::new(chromosomes).unwrap();
//!
//! finder
//!     .perform_graph_simplifications(3, 3, 4, None)
//!     .unwrap();
//!
//! let blocks = finder
//!     .generate_synteny_blocks(3, 3, false, None)
//!     .unwrap();
//! assert_eq!(blocks.len(), 2);
//! ```

#![allow(dead_code)]

pub mod bifstore;
pub mod blocks;
pub mod dna;
pub mod encoding;
pub mod engine;
pub mod enumerator;
pub mod scratch;
pub mod seq;
pub mod simplify;
