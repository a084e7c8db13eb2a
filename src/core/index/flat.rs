//! Exact nearest-neighbor search by linear scan.

use super::{check_dimension, cosine_distance, Neighbor, TopK, VectorIndex};
use crate::core::record::Identity;
use crate::error::IndexError;
use std::collections::HashMap;

/// Exhaustive index: every query compares against every entry
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<(Identity, Vec<f32>)>,
    positions: HashMap<Identity, usize>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, identity: &Identity) -> bool {
        self.positions.contains_key(identity)
    }

    fn insert(&mut self, identity: Identity, vector: Vec<f32>) -> Result<(), IndexError> {
        check_dimension(self.dimension, &vector)?;
        match self.positions.get(&identity) {
            Some(&position) => self.entries[position].1 = vector,
            None => {
                self.positions.insert(identity.clone(), self.entries.len());
                self.entries.push((identity, vector));
            }
        }
        Ok(())
    }

    fn remove(&mut self, identity: &Identity) -> bool {
        let Some(position) = self.positions.remove(identity) else {
            return false;
        };
        self.entries.swap_remove(position);
        if let Some((moved, _)) = self.entries.get(position) {
            self.positions.insert(moved.clone(), position);
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
        for (identity, vector) in &self.entries {
            top.offer(identity, cosine_distance(query, vector));
        }
        Ok(top.into_sorted())
    }

    fn rebuild(&mut self, entries: Vec<(Identity, Vec<f32>)>) -> Result<(), IndexError> {
        self.entries.clear();
        self.positions.clear();
        for (identity, vector) in entries {
            self.insert(identity, vector)?;
        }
        Ok(())
    }
}
