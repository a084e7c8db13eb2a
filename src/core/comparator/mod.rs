//! # Comparator Module
//!
//! Groups records whose images are duplicates or near-duplicates.
//!
//! ## Passes
//! 1. **Digest** - byte-identical files (same content digest) are joined
//!    with similarity 1.0
//! 2. **Hash** - pairs within `hash_threshold` Hamming distance; all pairs
//!    below `exhaustive_cutoff` records, pigeonhole banding above it
//! 3. **Embedding** - each embedded record queries the index for neighbors
//!    within `embedding_threshold` cosine distance
//!
//! Matches are merged with union-find, so groups are disjoint. Raising
//! either threshold only adds matches and can only merge groups.
//!
//! Records that failed, or that have no feature current under the active
//! hasher and model, take no part.

mod candidates;
mod grouper;
mod union_find;

pub use candidates::{hash_matches, HashMatch};

use crate::core::hasher::PerceptualHash;
use crate::core::index::{FlatIndex, VectorIndex};
use crate::core::record::{FeatureVersions, Identity, ImageRecord};
use crate::events::{CompareEvent, Event, EventSender};
use grouper::Edge;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// Which signal established a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Perceptual hash proximity or identical content
    Hash,
    /// Embedding proximity
    Embedding,
    /// Both signals contributed
    Both,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMethod::Hash => write!(f, "hash"),
            MatchMethod::Embedding => write!(f, "embedding"),
            MatchMethod::Both => write!(f, "hash+embedding"),
        }
    }
}

/// A group of duplicate images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Derived from the representative, stable across runs
    pub id: Uuid,
    /// Every member, representative first
    pub members: Vec<Identity>,
    /// Paths of `members`, same order
    pub paths: Vec<PathBuf>,
    /// Sharpness of `members`, same order
    pub sharpness: Vec<Option<f64>>,
    /// The recommended image to keep
    pub representative: Identity,
    pub representative_path: PathBuf,
    /// Highest pairwise similarity observed inside the group, in [0, 1]
    pub confidence: f64,
    pub method: MatchMethod,
    /// Every member has the same content digest
    pub byte_identical: bool,
    /// Total file size of the non-representative members
    pub duplicate_size_bytes: u64,
}

impl DuplicateGroup {
    /// Number of duplicates (excluding the representative)
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Paths other than the representative
    pub fn duplicate_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter().skip(1)
    }

    /// Path of the sharpest scored member; the earlier member wins ties
    pub fn sharpest_path(&self) -> Option<&PathBuf> {
        let mut best: Option<(usize, f64)> = None;
        for (i, score) in self.sharpness.iter().enumerate() {
            if let Some(score) = *score {
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((i, score));
                }
            }
        }
        best.map(|(i, _)| &self.paths[i])
    }
}

/// Duplicate grouping over a store snapshot
#[derive(Debug, Clone)]
pub struct Comparator {
    hash_threshold: u32,
    embedding_threshold: f32,
    exhaustive_cutoff: usize,
    neighbor_k: usize,
}

impl Comparator {
    pub fn new(hash_threshold: u32, embedding_threshold: f32) -> Self {
        Self {
            hash_threshold,
            embedding_threshold,
            exhaustive_cutoff: 2000,
            neighbor_k: 32,
        }
    }

    /// Record count at or below which the hash pass compares all pairs
    pub fn exhaustive_cutoff(mut self, cutoff: usize) -> Self {
        self.exhaustive_cutoff = cutoff;
        self
    }

    /// Neighbors requested per embedding query
    pub fn neighbor_k(mut self, k: usize) -> Self {
        self.neighbor_k = k.max(1);
        self
    }

    /// Group `records`.
    ///
    /// `index` must hold the current embeddings of `records`; without one, a
    /// temporary exact index is built from the records themselves.
    pub fn find_duplicate_groups(
        &self,
        records: &[ImageRecord],
        versions: &FeatureVersions,
        index: Option<&dyn VectorIndex>,
        events: &EventSender,
    ) -> Vec<DuplicateGroup> {
        let usable: Vec<&ImageRecord> = records
            .iter()
            .filter(|r| r.current_hash(versions).is_some() || r.current_embedding(versions).is_some())
            .collect();

        events.send(Event::Compare(CompareEvent::Started {
            total_records: usable.len(),
        }));

        let positions: HashMap<&Identity, usize> = usable
            .iter()
            .enumerate()
            .map(|(i, r)| (&r.identity, i))
            .collect();

        let mut edges = self.digest_pass(&usable);
        edges.extend(self.hash_pass(&usable, versions));

        let fallback;
        let index = match index {
            Some(index) => Some(index),
            None => {
                fallback = Self::temporary_index(&usable, versions);
                fallback.as_ref().map(|i| i as &dyn VectorIndex)
            }
        };
        if let Some(index) = index {
            edges.extend(self.embedding_pass(&usable, &positions, versions, index));
        }

        let groups = grouper::materialize(&usable, &edges);

        debug!(
            records = usable.len(),
            matches = edges.len(),
            groups = groups.len(),
            "Comparison complete"
        );
        events.send(Event::Compare(CompareEvent::Completed {
            total_groups: groups.len(),
            total_duplicates: groups.iter().map(|g| g.duplicate_count()).sum(),
        }));

        groups
    }

    fn digest_pass(&self, usable: &[&ImageRecord]) -> Vec<Edge> {
        let mut first_with: HashMap<&str, usize> = HashMap::new();
        let mut edges = Vec::new();
        for (i, record) in usable.iter().enumerate() {
            if let Some(digest) = record.content_digest.as_deref() {
                match first_with.get(digest) {
                    Some(&first) => edges.push(Edge {
                        a: first,
                        b: i,
                        similarity: 1.0,
                        via: MatchMethod::Hash,
                    }),
                    None => {
                        first_with.insert(digest, i);
                    }
                }
            }
        }
        edges
    }

    fn hash_pass(&self, usable: &[&ImageRecord], versions: &FeatureVersions) -> Vec<Edge> {
        let hashes: Vec<_> = usable
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.current_hash(versions).map(|h| (i, h)))
            .collect();
        let Some((_, first)) = hashes.first() else {
            return Vec::new();
        };
        let bits = first.bit_count().max(1) as f64;

        hash_matches(&hashes, self.hash_threshold, self.exhaustive_cutoff)
            .into_iter()
            .map(|m| Edge {
                a: m.a,
                b: m.b,
                similarity: 1.0 - m.distance as f64 / bits,
                via: MatchMethod::Hash,
            })
            .collect()
    }

    fn embedding_pass(
        &self,
        usable: &[&ImageRecord],
        positions: &HashMap<&Identity, usize>,
        versions: &FeatureVersions,
        index: &dyn VectorIndex,
    ) -> Vec<Edge> {
        usable
            .par_iter()
            .enumerate()
            .filter_map(|(i, r)| r.current_embedding(versions).map(|e| (i, e)))
            .flat_map_iter(|(i, embedding)| {
                // One extra slot for the query's own entry
                let neighbors = index
                    .find_neighbors(embedding, self.neighbor_k + 1, self.embedding_threshold)
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "Neighbor query failed");
                        Vec::new()
                    });
                neighbors.into_iter().filter_map(move |n| {
                    let j = *positions.get(&n.identity)?;
                    (j != i).then(|| Edge {
                        a: i.min(j),
                        b: i.max(j),
                        similarity: 1.0 - n.distance as f64,
                        via: MatchMethod::Embedding,
                    })
                })
            })
            .collect()
    }

    fn temporary_index(usable: &[&ImageRecord], versions: &FeatureVersions) -> Option<FlatIndex> {
        let dimension = versions.dimension?;
        let mut index = FlatIndex::new(dimension);
        for record in usable {
            if let Some(embedding) = record.current_embedding(versions) {
                if let Err(e) = index.insert(record.identity.clone(), embedding.to_vec()) {
                    warn!(identity = %record.identity, error = %e, "Skipping embedding for temporary index");
                }
            }
        }
        Some(index)
    }
}
