//! Turns pairwise matches into disjoint duplicate groups.
//!
//! If A matches B and B matches C, then {A, B, C} forms a single group even
//! if A doesn't directly match C.

use super::union_find::UnionFind;
use super::{DuplicateGroup, MatchMethod};
use crate::core::record::ImageRecord;
use std::cmp::Ordering;
use uuid::Uuid;

/// One observed match between two arena positions
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    pub a: usize,
    pub b: usize,
    /// Normalized to [0, 1]
    pub similarity: f64,
    /// `Hash` or `Embedding`; never `Both`
    pub via: MatchMethod,
}

#[derive(Debug, Clone, Copy, Default)]
struct GroupEvidence {
    confidence: f64,
    by_hash: bool,
    by_embedding: bool,
}

impl GroupEvidence {
    fn method(&self) -> MatchMethod {
        match (self.by_hash, self.by_embedding) {
            (true, true) => MatchMethod::Both,
            (false, true) => MatchMethod::Embedding,
            _ => MatchMethod::Hash,
        }
    }
}

/// Merge `edges` over `records` and build the resulting groups, ordered by
/// confidence (highest first), then size (largest first), then
/// representative path.
pub(crate) fn materialize(records: &[&ImageRecord], edges: &[Edge]) -> Vec<DuplicateGroup> {
    let mut uf = UnionFind::new(records.len());
    for edge in edges {
        uf.union(edge.a, edge.b);
    }

    let mut evidence = vec![GroupEvidence::default(); records.len()];
    for edge in edges {
        let root = uf.find(edge.a);
        let entry = &mut evidence[root];
        entry.confidence = entry.confidence.max(edge.similarity.clamp(0.0, 1.0));
        match edge.via {
            MatchMethod::Embedding => entry.by_embedding = true,
            _ => entry.by_hash = true,
        }
    }

    let mut groups: Vec<DuplicateGroup> = uf
        .sets(2)
        .into_iter()
        .map(|members| {
            let root = uf.find(members[0]);
            build_group(records, &members, evidence[root])
        })
        .collect();

    groups.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.members.len().cmp(&a.members.len()))
            .then_with(|| a.representative_path.cmp(&b.representative_path))
    });
    groups
}

/// Largest file wins, then the lexicographically smallest path
fn representative_order(a: &ImageRecord, b: &ImageRecord) -> Ordering {
    b.file_size
        .cmp(&a.file_size)
        .then_with(|| a.path.cmp(&b.path))
        .then_with(|| a.identity.cmp(&b.identity))
}

fn build_group(records: &[&ImageRecord], members: &[usize], evidence: GroupEvidence) -> DuplicateGroup {
    let mut group_records: Vec<&ImageRecord> = members.iter().map(|&i| records[i]).collect();
    group_records.sort_by(|a, b| representative_order(a, b));

    let representative = group_records[0];
    let duplicate_size_bytes = group_records[1..].iter().map(|r| r.file_size).sum();

    let byte_identical = match &representative.content_digest {
        Some(digest) => group_records
            .iter()
            .all(|r| r.content_digest.as_ref() == Some(digest)),
        None => false,
    };

    DuplicateGroup {
        id: Uuid::new_v5(&Uuid::NAMESPACE_OID, representative.identity.as_str().as_bytes()),
        members: group_records.iter().map(|r| r.identity.clone()).collect(),
        paths: group_records.iter().map(|r| r.path.clone()).collect(),
        sharpness: group_records.iter().map(|r| r.sharpness).collect(),
        representative: representative.identity.clone(),
        representative_path: representative.path.clone(),
        confidence: evidence.confidence,
        method: evidence.method(),
        byte_identical,
        duplicate_size_bytes,
    }
}
