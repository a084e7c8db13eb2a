//! Inverted-file index over spherical k-means clusters.
//!
//! Vectors are partitioned into `lists` clusters. A query ranks the
//! centroids and scans only the nearest `ceil(probe_fraction * lists)` of
//! them, so its cost is roughly `probe_fraction` of a linear scan.
//!
//! ## Recall
//! A true neighbor is missed only when it sits in a cluster that was not
//! probed, which happens for pairs straddling a cluster border. The loss
//! shrinks as `probe_fraction` grows and vanishes at 1.0. Near-duplicates
//! (cosine distance well under the cluster radius) almost always share a
//! cluster, so the default of 0.25 loses very little for deduplication.
//! A stored vector queried against itself is always found.
//!
//! ## Maintenance
//! - Below `min_train_size` entries there are no clusters and every query
//!   is an exact scan.
//! - Removal leaves a tombstone. Once tombstones exceed `rebuild_ratio` of
//!   the slots, the index is compacted and retrained.
//! - Clusters are retrained when the index doubles in size since the last
//!   training, keeping centroids representative of the data.

use super::{check_dimension, cosine_distance, Neighbor, TopK, VectorIndex};
use crate::core::config::IndexConfig;
use crate::core::embedder::dot;
use crate::core::record::Identity;
use crate::error::IndexError;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Cap on training points per cluster; more adds time without better centroids
const MAX_POINTS_PER_LIST: usize = 64;
const MAX_ITERATIONS: usize = 10;

pub struct IvfIndex {
    dimension: usize,
    config: IndexConfig,
    slots: Vec<Option<(Identity, Vec<f32>)>>,
    positions: HashMap<Identity, usize>,
    /// Empty until trained
    centroids: Vec<Vec<f32>>,
    /// Slot numbers per centroid
    lists: Vec<Vec<usize>>,
    tombstones: usize,
    trained_on: usize,
}

impl IvfIndex {
    pub fn new(dimension: usize, config: IndexConfig) -> Self {
        Self {
            dimension,
            config,
            slots: Vec::new(),
            positions: HashMap::new(),
            centroids: Vec::new(),
            lists: Vec::new(),
            tombstones: 0,
            trained_on: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Number of clusters, 0 while untrained
    pub fn list_count(&self) -> usize {
        self.centroids.len()
    }

    /// Clusters scanned per query
    pub fn probe_count(&self) -> usize {
        let lists = self.list_count();
        if lists == 0 {
            return 0;
        }
        ((self.config.probe_fraction * lists as f32).ceil() as usize).clamp(1, lists)
    }

    pub(crate) fn tombstones(&self) -> usize {
        self.tombstones
    }

    fn nearest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> usize {
        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (i, centroid) in centroids.iter().enumerate() {
            let score = dot(centroid, vector);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }

    fn push_slot(&mut self, identity: Identity, vector: Vec<f32>) {
        let slot = self.slots.len();
        if self.is_trained() {
            let list = Self::nearest_centroid(&self.centroids, &vector);
            self.lists[list].push(slot);
        }
        self.positions.insert(identity.clone(), slot);
        self.slots.push(Some((identity, vector)));
    }

    fn maybe_retrain(&mut self) {
        let live = self.len();
        let due = if self.is_trained() {
            live >= self.trained_on.saturating_mul(2)
        } else {
            live >= self.config.min_train_size.max(1)
        };
        if due {
            self.compact_and_train();
        }
    }

    /// Drop tombstones and, with enough data, recluster
    fn compact_and_train(&mut self) {
        let mut live: Vec<(Identity, Vec<f32>)> = self.slots.drain(..).flatten().collect();
        live.sort_by(|a, b| a.0.cmp(&b.0));

        self.positions.clear();
        self.tombstones = 0;
        self.centroids.clear();
        self.lists.clear();
        self.trained_on = 0;

        if !live.is_empty() && live.len() >= self.config.min_train_size.max(1) {
            self.centroids = self.train(&live);
            self.lists = vec![Vec::new(); self.centroids.len()];
            self.trained_on = live.len();
            debug!(
                entries = live.len(),
                lists = self.centroids.len(),
                "Trained IVF clusters"
            );
        }

        for (identity, vector) in live {
            self.push_slot(identity, vector);
        }
    }

    /// Spherical k-means with deterministic seeding
    fn train(&self, entries: &[(Identity, Vec<f32>)]) -> Vec<Vec<f32>> {
        let lists = if self.config.lists > 0 {
            self.config.lists
        } else {
            (entries.len() as f64).sqrt().ceil() as usize
        }
        .clamp(1, entries.len());

        let stride = (entries.len() / (lists * MAX_POINTS_PER_LIST)).max(1);
        let sample: Vec<&[f32]> = entries
            .iter()
            .step_by(stride)
            .map(|(_, v)| v.as_slice())
            .collect();

        let mut centroids: Vec<Vec<f32>> = (0..lists)
            .map(|i| sample[i * sample.len() / lists].to_vec())
            .collect();
        let mut assignment = vec![usize::MAX; sample.len()];

        for _ in 0..MAX_ITERATIONS {
            let next: Vec<usize> = sample
                .par_iter()
                .map(|v| Self::nearest_centroid(&centroids, v))
                .collect();
            if next == assignment {
                break;
            }
            assignment = next;

            let mut sums = vec![vec![0.0f32; self.dimension]; lists];
            for (vector, &cluster) in sample.iter().zip(&assignment) {
                for (sum, value) in sums[cluster].iter_mut().zip(vector.iter()) {
                    *sum += value;
                }
            }
            for (centroid, sum) in centroids.iter_mut().zip(sums) {
                let norm = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
                // Empty or cancelled-out clusters keep their previous centroid
                if norm > f32::EPSILON {
                    *centroid = sum.into_iter().map(|x| x / norm).collect();
                }
            }
        }

        centroids
    }

    fn scan_slots<'a>(
        &'a self,
        slots: impl Iterator<Item = usize>,
        query: &[f32],
        top: &mut TopK<'a>,
    ) -> Result<(), IndexError> {
        for slot in slots {
            match self.slots.get(slot) {
                Some(Some((identity, vector))) => top.offer(identity, cosine_distance(query, vector)),
                Some(None) => {}
                None => {
                    return Err(IndexError::Corrupted(format!(
                        "inverted list references slot {} of {}",
                        slot,
                        self.slots.len()
                    )))
                }
            }
        }
        Ok(())
    }
}

impl VectorIndex for IvfIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn contains(&self, identity: &Identity) -> bool {
        self.positions.contains_key(identity)
    }

    fn insert(&mut self, identity: Identity, vector: Vec<f32>) -> Result<(), IndexError> {
        check_dimension(self.dimension, &vector)?;
        self.remove(&identity);
        self.push_slot(identity, vector);
        self.maybe_retrain();
        Ok(())
    }

    fn remove(&mut self, identity: &Identity) -> bool {
        let Some(slot) = self.positions.remove(identity) else {
            return false;
        };
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
        self.tombstones += 1;

        if self.tombstones as f32 > self.config.rebuild_ratio * self.slots.len() as f32 {
            self.compact_and_train();
        }
        true
    }

    fn find_neighbors(
        &self,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<Neighbor>, IndexError> {
        check_dimension(self.dimension, query)?;
        let mut top = TopK::new(k, max_distance);

        if !self.is_trained() {
            self.scan_slots(0..self.slots.len(), query, &mut top)?;
            return Ok(top.into_sorted());
        }

        // Rank by raw similarity so the first probe is the list an identical
        // vector was assigned to
        let mut ranked: Vec<(f32, usize)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (dot(query, c), i))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        for &(_, list) in ranked.iter().take(self.probe_count()) {
            self.scan_slots(self.lists[list].iter().copied(), query, &mut top)?;
        }
        Ok(top.into_sorted())
    }

    fn rebuild(&mut self, entries: Vec<(Identity, Vec<f32>)>) -> Result<(), IndexError> {
        for (_, vector) in &entries {
            check_dimension(self.dimension, vector)?;
        }

        self.slots.clear();
        self.positions.clear();
        self.centroids.clear();
        self.lists.clear();
        for (identity, vector) in entries {
            // Later duplicates win, as with repeated inserts
            if let Some(previous) = self.positions.insert(identity.clone(), self.slots.len()) {
                self.slots[previous] = None;
            }
            self.slots.push(Some((identity, vector)));
        }

        self.compact_and_train();
        Ok(())
    }
}
