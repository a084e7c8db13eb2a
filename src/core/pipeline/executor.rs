//! Pipeline execution implementation.

use super::{CancellationToken, FileFailure, PipelineResult, ScanReport};
use crate::core::comparator::{Comparator, DuplicateGroup};
use crate::core::config::{check_thresholds, EngineConfig};
use crate::core::decode::{FastDecoder, ImageDecoder};
use crate::core::embedder::{Embedder, ThumbnailModel};
use crate::core::hasher::{HashAlgorithm, HasherConfig};
use crate::core::index::{build_index, VectorIndex};
use crate::core::quality::QualityAnalyzer;
use crate::core::record::{content_digest, FeatureVersions, Identity, ImageRecord, PendingWork, RecordStatus};
use crate::core::scanner::{retired_identities, ScanConfig, WalkDirScanner};
use crate::core::store::{RecordStore, SqliteStore, StoreStats};
use crate::error::{DecodeError, HashError, IndexError, Result, StoreError};
use crate::events::{
    null_sender, Event, EventSender, IndexEvent, PipelineEvent, PipelinePhase, PipelineSummary,
    ProgressThrottle, ScanEvent, ScanProgress,
};
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

type SharedIndex = Option<Box<dyn VectorIndex>>;

/// Builder wiring the pipeline's collaborators.
///
/// Defaults: a `SqliteStore` at `config.store_path`, the `FastDecoder`, and
/// an embedder over the built-in `ThumbnailModel`.
pub struct PipelineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn RecordStore>>,
    decoder: Arc<dyn ImageDecoder>,
    embedder: Option<Embedder>,
    events: EventSender,
}

impl PipelineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            decoder: Arc::new(FastDecoder::new()),
            embedder: Some(Embedder::new(Arc::new(ThumbnailModel::new()))),
            events: null_sender(),
        }
    }

    /// Use this store instead of opening `config.store_path`
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn embedder(mut self, embedder: Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Hash-only operation: no embeddings are computed or compared
    pub fn without_embedder(mut self) -> Self {
        self.embedder = None;
        self
    }

    /// Where progress and result events go
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Validate the configuration, open the store and bootstrap the index
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        let hasher = HasherConfig::new()
            .algorithm(self.config.hash_algorithm)
            .hash_size(self.config.hash_size)
            .build()?;

        let store: Arc<dyn RecordStore> = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteStore::open(&self.config.store_path)?),
        };

        let pipeline = Pipeline {
            config: self.config,
            store,
            decoder: self.decoder,
            hasher,
            quality: QualityAnalyzer::default(),
            embedder: self.embedder,
            index: RwLock::new(None),
            events: self.events,
        };
        pipeline.rebuild_index()?;

        Ok(pipeline)
    }
}

/// The duplicate detection pipeline
pub struct Pipeline {
    config: EngineConfig,
    store: Arc<dyn RecordStore>,
    decoder: Arc<dyn ImageDecoder>,
    hasher: Box<dyn HashAlgorithm>,
    quality: QualityAnalyzer,
    embedder: Option<Embedder>,
    index: RwLock<SharedIndex>,
    events: EventSender,
}

/// What discovery decided
struct Discovery {
    plan: Vec<(ImageRecord, PendingWork)>,
    seen: HashSet<Identity>,
    skipped: usize,
    complete: bool,
}

/// One committed batch
#[derive(Default)]
struct BatchOutcome {
    records: Vec<ImageRecord>,
    embedding_failures: usize,
}

impl Pipeline {
    pub fn builder(config: EngineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Open with the default collaborators
    pub fn open(config: EngineConfig) -> Result<Self> {
        PipelineBuilder::new(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Versions of the features this pipeline produces
    pub fn feature_versions(&self) -> FeatureVersions {
        FeatureVersions {
            hash_version: self.hasher.version_tag(),
            embedding_model: self.embedder.as_ref().map(|e| e.model_id().to_string()),
            dimension: self.embedder.as_ref().map(Embedder::dimension),
        }
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats()?)
    }

    /// Live entries in the nearest-neighbor index
    pub fn indexed_count(&self) -> Result<usize> {
        Ok(self.read_index()?.as_ref().map_or(0, |index| index.len()))
    }

    /// Scan, then group at the configured thresholds
    pub fn run(&self, cancel: &CancellationToken) -> Result<PipelineResult> {
        let start = Instant::now();
        self.events.send(Event::Pipeline(PipelineEvent::Started));

        let outcome = self.scan(cancel).and_then(|report| {
            if report.cancelled {
                return Ok(PipelineResult {
                    report,
                    groups: Vec::new(),
                });
            }
            self.phase(PipelinePhase::Comparing);
            let groups = self.duplicate_groups()?;
            Ok(PipelineResult { report, groups })
        });

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.events.send(Event::Pipeline(PipelineEvent::Error {
                    message: e.to_string(),
                }));
                return Err(e);
            }
        };

        if result.report.cancelled {
            info!("Scan cancelled");
            self.events.send(Event::Pipeline(PipelineEvent::Cancelled));
            return Ok(result);
        }

        self.events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_records: self.store.count()?,
                duplicate_groups: result.groups.len(),
                duplicate_count: result.groups.iter().map(|g| g.duplicate_count()).sum(),
                potential_savings_bytes: result.potential_savings_bytes(),
                duration_ms: start.elapsed().as_millis() as u64,
            },
        }));

        Ok(result)
    }

    /// Bring the store and index up to date with `config.roots`.
    ///
    /// Per-file problems are recorded and skipped; only store failures end
    /// the scan early.
    pub fn scan(&self, cancel: &CancellationToken) -> Result<ScanReport> {
        let start = Instant::now();
        let versions = self.feature_versions();

        self.phase(PipelinePhase::Discovering);
        self.events.send(Event::Scan(ScanEvent::Started {
            roots: self.config.roots.clone(),
        }));
        info!(roots = self.config.roots.len(), hash = %versions.hash_version, "Scan started");

        let discovery = self.discover(&versions, cancel)?;

        // Unseen files are checked individually, so a cut-short walk is safe
        // here too; skipping it only keeps cancellation prompt.
        let mut retired = Vec::new();
        let mut retired_count = 0;
        if discovery.complete {
            retired = retired_identities(self.store.locations()?, &discovery.seen);
            retired_count = self.store.remove_batch(&retired)?;
            if retired_count > 0 {
                info!(count = retired_count, "Retired records for missing or changed files");
                self.events.send(Event::Scan(ScanEvent::Retired {
                    count: retired_count,
                }));
            }
        }

        let planned = discovery.plan.len();
        self.events.send(Event::Scan(ScanEvent::Discovered {
            candidates: discovery.seen.len(),
            pending: planned,
        }));
        debug!(candidates = discovery.seen.len(), pending = planned, skipped = discovery.skipped, "Discovery complete");

        self.phase(PipelinePhase::Processing);
        let outcome = match self.process(discovery.plan, &versions, cancel) {
            Ok(outcome) => outcome,
            Err(e) => {
                // Batches committed before the failure, and the retirements, are
                // in the store but not yet in the index
                warn!(error = %e, "Scan aborted, resyncing index with store");
                if let Err(rebuild) = self.rebuild_index() {
                    warn!(error = %rebuild, "Index resync failed");
                }
                return Err(e);
            }
        };

        self.phase(PipelinePhase::Indexing);
        self.apply_to_index(&retired, &outcome.records, &versions)?;

        let failures: Vec<FileFailure> = outcome
            .records
            .iter()
            .filter(|r| r.status == RecordStatus::Failed)
            .map(|r| FileFailure {
                path: r.path.clone(),
                message: r.last_error.clone().unwrap_or_default(),
            })
            .collect();

        let report = ScanReport {
            candidates: discovery.seen.len(),
            processed: outcome.records.len(),
            skipped: discovery.skipped,
            failed: failures.len(),
            retired: retired_count,
            embedding_failures: outcome.embedding_failures,
            cancelled: !discovery.complete || outcome.records.len() < planned,
            duration: start.elapsed(),
            failures,
        };

        self.events.send(Event::Scan(ScanEvent::Completed {
            processed: report.processed,
            skipped: report.skipped,
            failed: report.failed,
        }));
        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            retired = report.retired,
            cancelled = report.cancelled,
            duration_ms = report.duration.as_millis() as u64,
            "Scan finished"
        );

        Ok(report)
    }

    /// Group duplicates at the given thresholds, without rescanning
    pub fn find_duplicate_groups(
        &self,
        hash_threshold: u32,
        embedding_threshold: f32,
    ) -> Result<Vec<DuplicateGroup>> {
        check_thresholds(hash_threshold, embedding_threshold, self.hasher.bit_count())?;

        let versions = self.feature_versions();
        // Held for the whole comparison so no scan can update the index mid-query
        let index = self.read_index()?;
        let records = self.store.all_records()?;

        let comparator = Comparator::new(hash_threshold, embedding_threshold)
            .exhaustive_cutoff(self.config.exhaustive_cutoff)
            .neighbor_k(self.config.neighbor_k);

        Ok(comparator.find_duplicate_groups(&records, &versions, index.as_deref(), &self.events))
    }

    /// Group duplicates at the configured thresholds
    pub fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        self.find_duplicate_groups(self.config.hash_threshold, self.config.embedding_threshold)
    }

    /// Rebuild the index from every current embedding in the store.
    ///
    /// Returns the number of entries indexed.
    pub fn rebuild_index(&self) -> Result<usize> {
        let Some(embedder) = &self.embedder else {
            return Ok(0);
        };

        let versions = self.feature_versions();
        let entries: Vec<(Identity, Vec<f32>)> = self
            .store
            .all_records()?
            .into_iter()
            .filter_map(|record| {
                let embedding = record.current_embedding(&versions)?.to_vec();
                Some((record.identity, embedding))
            })
            .collect();
        let count = entries.len();

        let mut index = build_index(&self.config.index, embedder.dimension());
        index.rebuild(entries)?;

        // Rebuilding is the recovery path, so a poisoned lock is taken over
        let mut guard = self.index.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(index);
        drop(guard);
        self.index.clear_poison();

        info!(entries = count, "Index rebuilt from store");
        self.events.send(Event::Index(IndexEvent::Rebuilt { entries: count }));
        Ok(count)
    }

    fn discover(&self, versions: &FeatureVersions, cancel: &CancellationToken) -> Result<Discovery> {
        let scanner = WalkDirScanner::new(ScanConfig::from_engine(&self.config));
        let mut discovery = Discovery {
            plan: Vec::new(),
            seen: HashSet::new(),
            skipped: 0,
            complete: true,
        };

        for candidate in scanner.candidates(&self.config.roots, &self.events) {
            if cancel.is_cancelled() {
                discovery.complete = false;
                break;
            }

            let identity = candidate.identity();
            // Overlapping roots yield the same file twice
            if !discovery.seen.insert(identity.clone()) {
                continue;
            }

            match self.store.get(&identity)? {
                Some(record) => {
                    let work = record.pending_work(versions);
                    if work.is_empty() {
                        discovery.skipped += 1;
                    } else {
                        discovery.plan.push((record, work));
                    }
                }
                None => {
                    let record = ImageRecord::pending(candidate.path, candidate.size, candidate.modified);
                    let work = PendingWork {
                        hash: true,
                        embedding: versions.embedding_model.is_some(),
                    };
                    discovery.plan.push((record, work));
                }
            }
        }

        Ok(discovery)
    }

    fn process(
        &self,
        plan: Vec<(ImageRecord, PendingWork)>,
        versions: &FeatureVersions,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome> {
        if plan.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let total = plan.len();
        let throttle = ProgressThrottle::new(total);
        let batch_size = self.config.embed_batch_size.max(1);

        let work = || -> std::result::Result<Vec<BatchOutcome>, StoreError> {
            plan.par_chunks(batch_size)
                .map(|chunk| {
                    if cancel.is_cancelled() {
                        return Ok(BatchOutcome::default());
                    }

                    let outcome = self.process_batch(chunk, versions);
                    self.store.upsert_batch(&outcome.records)?;
                    self.report_progress(&outcome.records, &throttle, total);
                    Ok(outcome)
                })
                .collect()
        };

        let batches = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.effective_workers())
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                warn!(error = %e, "Could not build worker pool, using the global one");
                work()
            }
        }?;

        debug!(processed = throttle.count(), total, "Processing finished");

        let mut merged = BatchOutcome::default();
        for batch in batches {
            merged.records.extend(batch.records);
            merged.embedding_failures += batch.embedding_failures;
        }
        Ok(merged)
    }

    /// Decode, hash and embed one batch. Never fails as a whole.
    fn process_batch(&self, chunk: &[(ImageRecord, PendingWork)], versions: &FeatureVersions) -> BatchOutcome {
        let mut records = Vec::with_capacity(chunk.len());
        let mut images: Vec<(usize, DynamicImage)> = Vec::new();

        for (record, work) in chunk {
            let mut record = record.clone();
            match self.extract(&mut record, *work) {
                Ok(Some(image)) => images.push((records.len(), image)),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %record.path.display(), error = %e, "Marking file failed");
                    record.mark_failed(e.to_string());
                }
            }
            records.push(record);
        }

        let mut embedding_failures = 0;
        if let (Some(embedder), Some(model)) = (&self.embedder, &versions.embedding_model) {
            if !images.is_empty() {
                let batch: Vec<&DynamicImage> = images.iter().map(|(_, image)| image).collect();
                let results = embedder.embed_batch(&batch);

                for ((position, _), result) in images.iter().zip(results) {
                    let record = &mut records[*position];
                    record.embedding_model = Some(model.clone());
                    match result {
                        Ok(embedding) => record.embedding = Some(embedding),
                        Err(e) => {
                            // The record stays comparable through its hash
                            warn!(path = %record.path.display(), error = %e, "Embedding failed");
                            record.embedding = None;
                            embedding_failures += 1;
                        }
                    }
                    record.settle_status();
                }
            }
        }

        BatchOutcome {
            records,
            embedding_failures,
        }
    }

    /// Compute the features `work` asks for. Returns the decoded image when
    /// it still has to be embedded.
    fn extract(&self, record: &mut ImageRecord, work: PendingWork) -> Result<Option<DynamicImage>> {
        let image = self.decoder.decode(&record.path)?;
        record.width = image.width();
        record.height = image.height();

        if work.hash || record.content_digest.is_none() {
            let digest = content_digest(&record.path).map_err(|source| DecodeError::Io {
                path: record.path.clone(),
                source,
            })?;
            record.content_digest = Some(digest);
        }

        if work.hash {
            record.perceptual_hash = Some(self.hasher.hash_image(&image)?);
            record.sharpness = Some(self.quality.sharpness(&image).map_err(HashError::from)?);
        }
        record.settle_status();

        Ok((work.embedding && self.embedder.is_some()).then_some(image))
    }

    fn report_progress(&self, records: &[ImageRecord], throttle: &ProgressThrottle, total: usize) {
        for record in records {
            if record.status == RecordStatus::Failed {
                self.events.send(Event::Scan(ScanEvent::FileFailed {
                    path: record.path.clone(),
                    message: record.last_error.clone().unwrap_or_default(),
                }));
            }
            if let Some(processed) = throttle.tick() {
                self.events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    processed,
                    total,
                    current_path: record.path.clone(),
                })));
            }
        }
    }

    /// Apply a scan's retirements and new features to the index
    fn apply_to_index(
        &self,
        retired: &[Identity],
        records: &[ImageRecord],
        versions: &FeatureVersions,
    ) -> Result<()> {
        if self.embedder.is_none() {
            return Ok(());
        }

        let mut guard = match self.index.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                drop(poisoned);
                warn!("Index lock poisoned, rebuilding from store");
                return self.rebuild_index().map(|_| ());
            }
        };
        let Some(index) = guard.as_mut() else {
            return Ok(());
        };

        let mut inserted = 0;
        let mut removed = 0;
        let mut failure: Option<IndexError> = None;

        for identity in retired {
            if index.remove(identity) {
                removed += 1;
            }
        }
        for record in records {
            match record.current_embedding(versions) {
                Some(embedding) => match index.insert(record.identity.clone(), embedding.to_vec()) {
                    Ok(()) => inserted += 1,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                },
                None => {
                    if index.remove(&record.identity) {
                        removed += 1;
                    }
                }
            }
        }
        drop(guard);

        if let Some(e) = failure {
            warn!(error = %e, "Index update failed, rebuilding from store");
            return self.rebuild_index().map(|_| ());
        }

        debug!(inserted, removed, "Index updated");
        self.events.send(Event::Index(IndexEvent::Updated { inserted, removed }));
        Ok(())
    }

    fn read_index(&self) -> Result<RwLockReadGuard<'_, SharedIndex>> {
        if self.index.is_poisoned() {
            warn!("Index lock poisoned, rebuilding from store");
            self.rebuild_index()?;
        }
        self.index
            .read()
            .map_err(|_| IndexError::Corrupted("index lock poisoned".to_string()).into())
    }

    fn phase(&self, phase: PipelinePhase) {
        self.events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
    }
}
