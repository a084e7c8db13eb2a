//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end pipeline behavior including:
//! - Resized copies grouped, unrelated images left out
//! - Corrupt files recorded as failed without stopping the scan
//! - Hash-only records when inference fails
//! - Regrouping at new thresholds without rescanning

mod common;

use common::{checkerboard, config_for, file_names, save, save_resized, scene};
use image::DynamicImage;
use spectramatch::core::comparator::{DuplicateGroup, MatchMethod};
use spectramatch::core::embedder::{Embedder, InferenceModel, ModelDescriptor};
use spectramatch::core::pipeline::{CancellationToken, Pipeline};
use spectramatch::core::record::RecordStatus;
use spectramatch::core::store::InMemoryStore;
use spectramatch::error::InferenceError;
use spectramatch::events::{Event, EventChannel, ScanEvent};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn in_memory(config: spectramatch::core::config::EngineConfig) -> Pipeline {
    Pipeline::builder(config)
        .store(Arc::new(InMemoryStore::new()))
        .build()
        .unwrap()
}

#[test]
fn resized_copy_is_grouped_and_unrelated_image_is_not() {
    let photos = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let original = scene(256);
    save(&original, photos.path(), "a.png");
    save_resized(&original, 128, photos.path(), "b.png");
    save(&checkerboard(256), photos.path(), "c.png");

    let pipeline = in_memory(config_for(photos.path(), state.path()));
    let result = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.report.processed, 3);
    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(file_names(&group.paths), vec!["a.png", "b.png"]);
    assert!(group.confidence > 0.9, "confidence {}", group.confidence);
    assert!(!group.byte_identical);
    // The larger original is kept
    assert!(group.representative_path.ends_with("a.png"));
}

#[test]
fn corrupt_file_fails_alone() {
    let photos = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    fs::write(photos.path().join("broken.jpg"), b"this is not a valid image file").unwrap();
    let first = save(&scene(64), photos.path(), "one.png");
    fs::copy(&first, photos.path().join("two.png")).unwrap();

    let (sender, receiver) = EventChannel::new();
    let pipeline = Pipeline::builder(config_for(photos.path(), state.path()))
        .store(Arc::new(InMemoryStore::new()))
        .events(sender)
        .build()
        .unwrap();
    let result = pipeline.run(&CancellationToken::new()).unwrap();
    drop(pipeline);

    assert_eq!(result.report.failed, 1);
    assert!(result.report.failures[0].path.ends_with("broken.jpg"));

    assert_eq!(result.groups.len(), 1);
    assert_eq!(file_names(&result.groups[0].paths), vec!["one.png", "two.png"]);
    assert!(result.groups[0].byte_identical);

    let failed_events = receiver
        .iter()
        .filter(|e| matches!(e, Event::Scan(ScanEvent::FileFailed { .. })))
        .count();
    assert_eq!(failed_events, 1);
}

#[test]
fn failed_records_keep_no_features_and_are_retried() {
    let photos = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let broken = photos.path().join("late.png");
    fs::write(&broken, b"truncated").unwrap();

    let pipeline = in_memory(config_for(photos.path(), state.path()));
    pipeline.scan(&CancellationToken::new()).unwrap();

    let records = pipeline.store().all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert!(records[0].perceptual_hash.is_none());
    assert!(records[0].embedding.is_none());
    assert!(records[0].last_error.is_some());

    // Identical identity, still retried
    let report = pipeline.scan(&CancellationToken::new()).unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 0);
}

/// Always fails, as an unavailable model would
struct UnavailableModel {
    descriptor: ModelDescriptor,
}

impl InferenceModel for UnavailableModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn infer(&self, _image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        Err(InferenceError::ModelUnavailable {
            model: self.descriptor.id.clone(),
            reason: "weights not loaded".to_string(),
        })
    }
}

#[test]
fn inference_failures_leave_hash_only_records_that_still_group() {
    let photos = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let original = scene(128);
    save(&original, photos.path(), "a.png");
    save(&original, photos.path(), "b.bmp");

    let model = UnavailableModel {
        descriptor: ModelDescriptor::new("unavailable", 16, 8),
    };
    let pipeline = Pipeline::builder(config_for(photos.path(), state.path()))
        .store(Arc::new(InMemoryStore::new()))
        .embedder(Embedder::new(Arc::new(model)))
        .build()
        .unwrap();
    let result = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(result.report.failed, 0);
    assert_eq!(result.report.embedding_failures, 2);
    assert_eq!(pipeline.stats().unwrap().hashed, 2);
    assert_eq!(pipeline.indexed_count().unwrap(), 0);

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].method, MatchMethod::Hash);
    assert_eq!(result.groups[0].confidence, 1.0);

    // Not retried until the model changes
    let report = pipeline.scan(&CancellationToken::new()).unwrap();
    assert_eq!(report.skipped, 2);
}

fn memberships(groups: &[DuplicateGroup]) -> Vec<HashSet<String>> {
    groups
        .iter()
        .map(|g| g.members.iter().map(|m| m.as_str().to_string()).collect())
        .collect()
}

#[test]
fn regrouping_is_monotonic_disjoint_and_deterministic() {
    let photos = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let base = scene(192);
    save(&base, photos.path(), "base.png");
    for (i, side) in [160, 128, 96, 64].into_iter().enumerate() {
        save_resized(&base, side, photos.path(), &format!("small_{}.png", i));
    }
    save(&checkerboard(192), photos.path(), "board.png");
    save_resized(&checkerboard(192), 100, photos.path(), "board_small.png");

    let pipeline = in_memory(config_for(photos.path(), state.path()));
    pipeline.scan(&CancellationToken::new()).unwrap();

    let mut previous: Vec<HashSet<String>> = Vec::new();
    for (hash_t, emb_t) in [(0, 0.0), (2, 0.01), (6, 0.05), (12, 0.2), (24, 0.5)] {
        let groups = pipeline.find_duplicate_groups(hash_t, emb_t).unwrap();
        let current = memberships(&groups);

        let mut seen = HashSet::new();
        for group in &current {
            assert!(group.len() >= 2);
            for member in group {
                assert!(seen.insert(member.clone()), "groups overlap at {}", member);
            }
        }
        for old in &previous {
            assert!(
                current.iter().any(|g| old.is_subset(g)),
                "a group split when thresholds were raised"
            );
        }

        let again = pipeline.find_duplicate_groups(hash_t, emb_t).unwrap();
        assert_eq!(groups, again);

        previous = current;
    }
}

#[test]
fn invalid_thresholds_are_rejected_without_scanning() {
    let photos = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let pipeline = in_memory(config_for(photos.path(), state.path()));

    assert!(pipeline.find_duplicate_groups(65, 0.1).is_err());
    assert!(pipeline.find_duplicate_groups(10, 2.5).is_err());
}

#[test]
fn nonexistent_root_is_reported_not_fatal() {
    let state = TempDir::new().unwrap();
    let missing = state.path().join("does-not-exist");

    let pipeline = in_memory(config_for(&missing, state.path()));
    let report = pipeline.scan(&CancellationToken::new()).unwrap();

    assert_eq!(report.candidates, 0);
    assert!(!report.cancelled);
}
