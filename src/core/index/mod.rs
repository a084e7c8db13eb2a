//! # Index Module
//!
//! Nearest-neighbor search over unit-length embeddings.
//!
//! Distance is cosine distance, `1 - dot(a, b)`, in `[0, 2]`. Results are
//! nearest first with ties broken by identity, so identical inputs always
//! give identical answers.
//!
//! ## Implementations
//! - `FlatIndex` - exact linear scan; the correctness baseline
//! - `IvfIndex` - inverted file over k-means clusters; probes a configurable
//!   fraction of clusters per query, trading recall for speed
//!
//! The index is derived state. It is rebuilt from the store when the engine
//! opens and after corruption, and updated incrementally after each scan.

mod flat;
mod ivf;

pub use flat::FlatIndex;
pub use ivf::IvfIndex;

use crate::core::config::{IndexConfig, IndexKind};
use crate::core::embedder::dot;
use crate::core::record::Identity;
use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub identity: Identity,
    /// Cosine distance to the query
    pub distance: f32,
}

/// Trait for nearest-neighbor index implementations
pub trait VectorIndex: Send + Sync {
    /// Length of every stored vector
    fn dimension(&self) -> usize;

    /// Number of live entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, identity: &Identity) -> bool;

    /// Add an entry, replacing any previous vector for the identity
    fn insert(&mut self, identity: Identity, vector: Vec<f32>) -> Result<(), IndexError>;

    /// Drop an entry. Returns whether it was present.
    fn remove(&mut self, identity: &Identity) -> bool;

    /// Up to `k` entries within `max_distance` of `query`, nearest first
    fn find_neighbors(
        &self,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<Neighbor>, IndexError>;

    /// Replace the whole contents
    fn rebuild(&mut self, entries: Vec<(Identity, Vec<f32>)>) -> Result<(), IndexError>;
}

/// Construct the configured index for vectors of `dimension`
pub fn build_index(config: &IndexConfig, dimension: usize) -> Box<dyn VectorIndex> {
    match config.kind {
        IndexKind::Flat => Box::new(FlatIndex::new(dimension)),
        IndexKind::Ivf => Box::new(IvfIndex::new(dimension, config.clone())),
    }
}

/// Cosine distance between unit vectors, clamped to `[0, 2]`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - dot(a, b)).clamp(0.0, 2.0)
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != expected {
        return Err(IndexError::DimensionMismatch {
            expected,
            found: vector.len(),
        });
    }
    Ok(())
}

/// Candidate ordered by distance, then identity; the heap keeps the worst on top
struct Candidate<'a> {
    distance: f32,
    identity: &'a Identity,
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.identity.cmp(other.identity))
    }
}

/// Bounded best-k collector shared by the index implementations
pub(crate) struct TopK<'a> {
    heap: BinaryHeap<Candidate<'a>>,
    k: usize,
    max_distance: f32,
}

impl<'a> TopK<'a> {
    pub(crate) fn new(k: usize, max_distance: f32) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1)),
            k,
            max_distance,
        }
    }

    pub(crate) fn offer(&mut self, identity: &'a Identity, distance: f32) {
        if self.k == 0 || distance.is_nan() || distance > self.max_distance {
            return;
        }
        let candidate = Candidate { distance, identity };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    pub(crate) fn into_sorted(self) -> Vec<Neighbor> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                identity: c.identity.clone(),
                distance: c.distance,
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_orders_by_distance_then_identity() {
        let a = Identity::from_raw("a");
        let b = Identity::from_raw("b");
        let c = Identity::from_raw("c");

        let mut top = TopK::new(2, 1.0);
        top.offer(&c, 0.1);
        top.offer(&b, 0.1);
        top.offer(&a, 0.5);

        let hits = top.into_sorted();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].identity, b);
        assert_eq!(hits[1].identity, c);
    }

    #[test]
    fn top_k_respects_max_distance() {
        let a = Identity::from_raw("a");
        let mut top = TopK::new(5, 0.2);
        top.offer(&a, 0.3);
        top.offer(&a, f32::NAN);
        assert!(top.into_sorted().is_empty());
    }

    #[test]
    fn cosine_distance_of_unit_vectors() {
        assert!((cosine_distance(&[1.0, 0.0], &[1.0, 0.0])).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn factory_honours_kind() {
        let mut config = IndexConfig::default();
        config.kind = IndexKind::Flat;
        let index = build_index(&config, 3);
        assert_eq!(index.dimension(), 3);
        assert!(index.is_empty());
    }
}
