//! Candidate pair generation for the hash pass.
//!
//! Small inputs are compared exhaustively. Larger ones use pigeonhole
//! banding: split each `bits`-wide hash into `threshold + 1` disjoint bands.
//! Two hashes within `threshold` bits of each other cannot differ in every
//! band, so they share at least one band value exactly. Only pairs that
//! collide in some band are compared, and no qualifying pair is missed.

use crate::core::hasher::{ImageHashValue, PerceptualHash};
use rayon::prelude::*;
use std::collections::HashMap;

/// Two arena positions whose hashes are within the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashMatch {
    pub a: usize,
    pub b: usize,
    pub distance: u32,
}

/// All pairs within `threshold` Hamming distance, sorted by `(a, b)`.
///
/// `hashes` pairs an arena position with its hash; all hashes must share
/// one width.
pub fn hash_matches(
    hashes: &[(usize, &ImageHashValue)],
    threshold: u32,
    exhaustive_cutoff: usize,
) -> Vec<HashMatch> {
    let Some((_, first)) = hashes.first() else {
        return Vec::new();
    };

    let mut matches = match band_layout(first.bit_count(), threshold) {
        Some(layout) if hashes.len() > exhaustive_cutoff => banded(hashes, threshold, &layout),
        _ => exhaustive(hashes, threshold),
    };
    matches.sort_by_key(|m| (m.a, m.b));
    matches
}

fn ordered(a: usize, b: usize, distance: u32) -> HashMatch {
    HashMatch {
        a: a.min(b),
        b: a.max(b),
        distance,
    }
}

fn exhaustive(hashes: &[(usize, &ImageHashValue)], threshold: u32) -> Vec<HashMatch> {
    (0..hashes.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let (a, hash_a) = hashes[i];
            hashes[i + 1..].iter().filter_map(move |&(b, hash_b)| {
                let distance = hash_a.distance(hash_b);
                (distance <= threshold).then(|| ordered(a, b, distance))
            })
        })
        .collect()
}

/// `(start_bit, width)` of each band, or `None` when there would be more
/// bands than bits
fn band_layout(bits: u32, threshold: u32) -> Option<Vec<(usize, usize)>> {
    let bits = bits as usize;
    let bands = threshold as usize + 1;
    if bits == 0 || bands > bits {
        return None;
    }

    let base = bits / bands;
    let extra = bits % bands;
    let mut layout = Vec::with_capacity(bands);
    let mut start = 0;
    for band in 0..bands {
        let width = base + usize::from(band < extra);
        layout.push((start, width));
        start += width;
    }
    Some(layout)
}

fn band_key(hash: &ImageHashValue, start: usize, width: usize) -> Vec<u64> {
    (0..width)
        .step_by(64)
        .map(|offset| hash.bit_range(start + offset, (width - offset).min(64)))
        .collect()
}

fn banded(
    hashes: &[(usize, &ImageHashValue)],
    threshold: u32,
    layout: &[(usize, usize)],
) -> Vec<HashMatch> {
    let keys: Vec<Vec<Vec<u64>>> = hashes
        .par_iter()
        .map(|(_, hash)| {
            layout
                .iter()
                .map(|&(start, width)| band_key(hash, start, width))
                .collect()
        })
        .collect();

    (0..layout.len())
        .into_par_iter()
        .flat_map_iter(|band| {
            let mut buckets: HashMap<&[u64], Vec<usize>> = HashMap::new();
            for (i, record_keys) in keys.iter().enumerate() {
                buckets.entry(record_keys[band].as_slice()).or_default().push(i);
            }

            let mut found = Vec::new();
            for bucket in buckets.values().filter(|b| b.len() > 1) {
                for (x, &i) in bucket.iter().enumerate() {
                    for &j in &bucket[x + 1..] {
                        // Report each pair only from the first band it shares
                        if (0..band).any(|earlier| keys[i][earlier] == keys[j][earlier]) {
                            continue;
                        }
                        let distance = hashes[i].1.distance(hashes[j].1);
                        if distance <= threshold {
                            found.push(ordered(hashes[i].0, hashes[j].0, distance));
                        }
                    }
                }
            }
            found
        })
        .collect()
}
