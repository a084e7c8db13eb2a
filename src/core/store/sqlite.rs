//! SQLite record store.
//!
//! One file holds everything. A `metadata` table carries the schema
//! version; hashes and embeddings carry their own version tags so a change
//! of algorithm or model only invalidates that feature.
//!
//! A row that no longer decodes is never fatal: it is read back as a
//! `Pending` record (or as absent, if even its key columns are unreadable)
//! and the next scan recomputes it.

use super::{RecordStore, StoreStats};
use crate::core::hasher::{ImageHashValue, PerceptualHash};
use crate::core::record::{Identity, ImageRecord, RecordStatus};
use crate::error::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Newest on-disk layout this build reads and writes
pub const SCHEMA_VERSION: u32 = 2;

const RECORD_COLUMNS: &str = "identity, path, file_size, modified_ns, status, hash, hash_version,
     embedding, embedding_model, content_digest, width, height, last_error, updated_at, sharpness";

/// SQLite-backed persistent store
///
/// Runs in WAL mode so readers in other processes are not blocked by a
/// scan in progress.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Self::initialize(&conn).map_err(|e| match e {
            rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::NotADatabase => {
                StoreError::Corrupted {
                    path: path.to_path_buf(),
                }
            }
            other => StoreError::QueryFailed(other.to_string()),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };
        store.check_schema_version()?;

        debug!(path = %path.display(), "Opened record store");
        Ok(store)
    }

    fn initialize(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS records (
                identity TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                modified_ns INTEGER NOT NULL,
                status TEXT NOT NULL,
                hash BLOB,
                hash_version TEXT,
                embedding BLOB,
                embedding_model TEXT,
                content_digest TEXT,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                last_error TEXT,
                updated_at TEXT NOT NULL,
                sharpness REAL
             );
             CREATE INDEX IF NOT EXISTS idx_records_path ON records(path);",
        )
    }

    /// Stamp a fresh file, reject files written by a newer build
    fn check_schema_version(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => {
                conn.execute(
                    "INSERT INTO metadata (key, value) VALUES ('schema_version', ?)",
                    [SCHEMA_VERSION.to_string()],
                )?;
                info!(version = SCHEMA_VERSION, "Initialized store schema");
                Ok(())
            }
            Some(value) => {
                let found: u32 = value.parse().map_err(|_| StoreError::Corrupted {
                    path: self.db_path.clone(),
                })?;
                if found > SCHEMA_VERSION {
                    return Err(StoreError::UnsupportedSchema {
                        path: self.db_path.clone(),
                        found,
                        supported: SCHEMA_VERSION,
                    });
                }
                if found < SCHEMA_VERSION {
                    Self::migrate(&conn, found)?;
                }
                Ok(())
            }
        }
    }

    /// Bring an older layout up to `SCHEMA_VERSION` in one transaction
    fn migrate(conn: &Connection, from: u32) -> Result<(), StoreError> {
        let tx = conn.unchecked_transaction()?;

        // v2: per-image sharpness; v1 rows get it on their next scan
        if !has_column(&tx, "records", "sharpness")? {
            tx.execute_batch("ALTER TABLE records ADD COLUMN sharpness REAL")?;
        }

        tx.execute(
            "UPDATE metadata SET value = ? WHERE key = 'schema_version'",
            [SCHEMA_VERSION.to_string()],
        )?;
        tx.commit()?;

        info!(from, to = SCHEMA_VERSION, "Migrated store schema");
        Ok(())
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn write_record(conn: &Connection, record: &ImageRecord) -> Result<(), StoreError> {
        let hash_bytes = record.perceptual_hash.as_ref().map(|h| h.as_bytes().to_vec());
        let hash_version = record.perceptual_hash.as_ref().map(|h| h.version_tag());
        let embedding = record.embedding.as_deref().map(encode_embedding);

        conn.execute(
            "INSERT OR REPLACE INTO records
             (identity, path, file_size, modified_ns, status, hash, hash_version,
              embedding, embedding_model, content_digest, width, height, last_error, updated_at,
              sharpness)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.identity.as_str(),
                record.path.to_string_lossy(),
                record.file_size as i64,
                to_nanos(record.modified),
                record.status.as_str(),
                hash_bytes,
                hash_version,
                embedding,
                record.embedding_model,
                record.content_digest,
                record.width,
                record.height,
                record.last_error,
                record.updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                record.sharpness,
            ],
        )?;
        Ok(())
    }
}

/// Columns exactly as stored, before validation
struct RawRecord {
    identity: String,
    path: String,
    file_size: i64,
    modified_ns: i64,
    status: String,
    hash: Option<Vec<u8>>,
    hash_version: Option<String>,
    embedding: Option<Vec<u8>>,
    embedding_model: Option<String>,
    content_digest: Option<String>,
    width: u32,
    height: u32,
    last_error: Option<String>,
    updated_at: String,
    sharpness: Option<f64>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity: row.get(0)?,
            path: row.get(1)?,
            file_size: row.get(2)?,
            modified_ns: row.get(3)?,
            status: row.get(4)?,
            hash: row.get(5)?,
            hash_version: row.get(6)?,
            embedding: row.get(7)?,
            embedding_model: row.get(8)?,
            content_digest: row.get(9)?,
            width: row.get(10)?,
            height: row.get(11)?,
            last_error: row.get(12)?,
            updated_at: row.get(13)?,
            sharpness: row.get(14)?,
        })
    }

    /// Decode the row, falling back to a `Pending` record that keeps only the
    /// file's key columns when any feature column is damaged
    fn into_record(self) -> ImageRecord {
        match self.decode() {
            Ok(record) => record,
            Err(reason) => {
                warn!(
                    identity = %self.identity,
                    path = %self.path,
                    reason = %reason,
                    "Damaged record, it will be recomputed"
                );
                self.salvage()
            }
        }
    }

    fn decode(&self) -> Result<ImageRecord, String> {
        let status = RecordStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown status '{}'", self.status))?;

        // A hash with an unknown or outdated tag is dropped and recomputed
        let perceptual_hash = match (&self.hash, &self.hash_version) {
            (Some(bytes), Some(tag)) => ImageHashValue::from_stored(bytes, tag),
            _ => None,
        };

        let embedding = self.embedding.as_deref().map(decode_embedding).transpose()?;

        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| format!("bad timestamp: {}", e))?
            .with_timezone(&Utc);

        Ok(ImageRecord {
            identity: Identity::from_raw(self.identity.clone()),
            path: PathBuf::from(&self.path),
            file_size: self.file_size.max(0) as u64,
            modified: from_nanos(self.modified_ns),
            status,
            perceptual_hash,
            embedding,
            embedding_model: self.embedding_model.clone(),
            content_digest: self.content_digest.clone(),
            width: self.width,
            height: self.height,
            sharpness: self.sharpness,
            last_error: self.last_error.clone(),
            updated_at,
        })
    }

    /// Keep the stored identity so the record stays addressable
    fn salvage(self) -> ImageRecord {
        let mut record = ImageRecord::pending(
            PathBuf::from(self.path),
            self.file_size.max(0) as u64,
            from_nanos(self.modified_ns),
        );
        record.identity = Identity::from_raw(self.identity);
        record
    }
}

impl RecordStore for SqliteStore {
    fn get(&self, identity: &Identity) -> Result<Option<ImageRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM records WHERE identity = ?", RECORD_COLUMNS),
                [identity.as_str()],
                |row| Ok(RawRecord::from_row(row)),
            )
            .optional()?;

        match row {
            Some(Ok(raw)) => Ok(Some(raw.into_record())),
            Some(Err(e)) => {
                // Reported as absent, so the scan reprocesses the file and overwrites the row
                warn!(identity = %identity, error = %e, "Unreadable record row");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn upsert(&self, record: &ImageRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        Self::write_record(&conn, record)
    }

    fn upsert_batch(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for record in records {
            Self::write_record(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM records WHERE identity = ?", [identity.as_str()])?;
        Ok(removed > 0)
    }

    fn remove_batch(&self, identities: &[Identity]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM records WHERE identity = ?")?;
            for identity in identities {
                removed += stmt.execute([identity.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn all_records(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records ORDER BY identity",
            RECORD_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], |row| Ok(RawRecord::from_row(row)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Ok(raw) => records.push(raw.into_record()),
                Err(e) => warn!(error = %e, "Skipping unreadable record row"),
            }
        }
        Ok(records)
    }

    fn locations(&self) -> Result<Vec<(Identity, PathBuf)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT identity, path FROM records ORDER BY identity")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    Identity::from_raw(row.get::<_, String>(0)?),
                    PathBuf::from(row.get::<_, String>(1)?),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*), COALESCE(SUM(file_size), 0) FROM records GROUP BY status",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = StoreStats::default();
        for (status, count, bytes) in rows {
            // Damaged rows load as pending, so count them that way
            let status = RecordStatus::parse(&status).unwrap_or(RecordStatus::Pending);
            let count = count as usize;
            stats.total += count;
            stats.total_bytes += bytes.max(0) as u64;
            match status {
                RecordStatus::Pending => stats.pending += count,
                RecordStatus::Hashed => stats.hashed += count,
                RecordStatus::Embedded => stats.embedded += count,
                RecordStatus::Failed => stats.failed += count,
            }
        }
        Ok(stats)
    }
}

fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!(
            "embedding blob of {} bytes is not a whole number of f32s",
            bytes.len()
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|name| name == column))
}

fn to_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i64,
        Err(before) => -(before.duration().as_nanos() as i64),
    }
}

fn from_nanos(nanos: i64) -> SystemTime {
    if nanos >= 0 {
        UNIX_EPOCH + Duration::from_nanos(nanos as u64)
    } else {
        UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::HashAlgorithmKind;
    use tempfile::TempDir;

    fn record(path: &str, size: u64) -> ImageRecord {
        let modified = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let mut record = ImageRecord::pending(PathBuf::from(path), size, modified);
        record.perceptual_hash = Some(ImageHashValue::new(
            vec![0xDE, 0xAD, 0xBE, 0xEF, 0, 1, 2, 3],
            HashAlgorithmKind::Perceptual,
        ));
        record.embedding = Some(vec![0.6, -0.8, 0.0]);
        record.embedding_model = Some("test-model".to_string());
        record.content_digest = Some("00ff".to_string());
        record.width = 640;
        record.height = 480;
        record.sharpness = Some(42.25);
        record.settle_status();
        record
    }

    #[test]
    fn open_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("library.db");

        let store = SqliteStore::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("library.db");
        let original = record("/photos/a.jpg", 1000);

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.upsert(&original).unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        let loaded = store.get(&original.identity).unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("library.db")).unwrap();

        let mut rec = record("/photos/a.jpg", 1000);
        store.upsert(&rec).unwrap();
        rec.mark_failed("corrupt");
        store.upsert(&rec).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let loaded = store.get(&rec.identity).unwrap().unwrap();
        assert_eq!(loaded.status, RecordStatus::Failed);
        assert!(loaded.perceptual_hash.is_none());
        assert_eq!(loaded.last_error.as_deref(), Some("corrupt"));
    }

    #[test]
    fn batch_operations_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("library.db")).unwrap();

        let mut failed = record("/photos/c.jpg", 5);
        failed.mark_failed("boom");
        let records = vec![record("/photos/a.jpg", 10), record("/photos/b.jpg", 20), failed];
        store.upsert_batch(&records).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.embedded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes, 35);

        let ids: Vec<Identity> = records[..2].iter().map(|r| r.identity.clone()).collect();
        assert_eq!(store.remove_batch(&ids).unwrap(), 2);
        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.remove(&ids[0]).unwrap());
    }

    #[test]
    fn locations_list_identities_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("library.db")).unwrap();

        store.upsert(&record("/photos/a.jpg", 10)).unwrap();
        store.upsert(&record("/photos/b.jpg", 10)).unwrap();

        let locations = store.locations().unwrap();
        assert_eq!(locations.len(), 2);
        assert!(locations[0].0 < locations[1].0);
    }

    #[test]
    fn outdated_hash_revision_loads_as_missing() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("library.db");
        let rec = record("/photos/a.jpg", 10);

        let store = SqliteStore::open(&db_path).unwrap();
        store.upsert(&rec).unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE records SET hash_version = 'phash-64-v0'", [])
            .unwrap();

        let loaded = store.get(&rec.identity).unwrap().unwrap();
        assert!(loaded.perceptual_hash.is_none());
        assert_eq!(loaded.embedding, rec.embedding);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("library.db");
        drop(SqliteStore::open(&db_path).unwrap());

        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "UPDATE metadata SET value = '99' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();
        drop(conn);

        assert!(matches!(
            SqliteStore::open(&db_path),
            Err(StoreError::UnsupportedSchema {
                found: 99,
                supported: SCHEMA_VERSION,
                ..
            })
        ));
    }

    #[test]
    fn damaged_rows_load_as_pending() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("library.db")).unwrap();
        let good = record("/photos/a.jpg", 10);
        let bad_blob = record("/photos/b.jpg", 20);
        let bad_status = record("/photos/c.jpg", 30);
        store
            .upsert_batch(&[good.clone(), bad_blob.clone(), bad_status.clone()])
            .unwrap();

        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE records SET embedding = X'010203' WHERE identity = ?",
                [bad_blob.identity.as_str()],
            )
            .unwrap();
            conn.execute(
                "UPDATE records SET status = 'exploded' WHERE identity = ?",
                [bad_status.identity.as_str()],
            )
            .unwrap();
        }

        let records = store.all_records().unwrap();
        assert_eq!(records.len(), 3);
        let loaded_good = records.iter().find(|r| r.identity == good.identity).unwrap();
        assert_eq!(*loaded_good, good);

        let salvaged = store.get(&bad_blob.identity).unwrap().unwrap();
        assert_eq!(salvaged.status, RecordStatus::Pending);
        assert_eq!(salvaged.path, bad_blob.path);
        assert!(salvaged.embedding.is_none());
        assert!(salvaged.perceptual_hash.is_none());

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
    }

    #[test]
    fn rows_with_unreadable_key_columns_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("library.db")).unwrap();
        let good = record("/photos/a.jpg", 10);
        let bad = record("/photos/b.jpg", 20);
        store.upsert_batch(&[good.clone(), bad.clone()]).unwrap();

        store
            .lock()
            .unwrap()
            .execute(
                "UPDATE records SET width = 'wide' WHERE identity = ?",
                [bad.identity.as_str()],
            )
            .unwrap();

        let records = store.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, good.identity);
        assert!(store.get(&bad.identity).unwrap().is_none());
    }

    #[test]
    fn version_one_store_is_migrated() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("library.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             INSERT INTO metadata (key, value) VALUES ('schema_version', '1');
             CREATE TABLE records (
                identity TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                modified_ns INTEGER NOT NULL,
                status TEXT NOT NULL,
                hash BLOB,
                hash_version TEXT,
                embedding BLOB,
                embedding_model TEXT,
                content_digest TEXT,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                last_error TEXT,
                updated_at TEXT NOT NULL
             );
             INSERT INTO records VALUES ('00ab', '/photos/old.jpg', 7, 0, 'hashed', NULL, NULL,
                NULL, NULL, NULL, 10, 10, NULL, '2024-01-01T00:00:00Z');",
        )
        .unwrap();
        drop(conn);

        let store = SqliteStore::open(&db_path).unwrap();

        let old = store.get(&Identity::from_raw("00ab")).unwrap().unwrap();
        assert_eq!(old.path, PathBuf::from("/photos/old.jpg"));
        assert!(old.sharpness.is_none());

        let version: String = store
            .lock()
            .unwrap()
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());

        let fresh = record("/photos/new.jpg", 10);
        store.upsert(&fresh).unwrap();
        assert_eq!(store.get(&fresh.identity).unwrap().unwrap().sharpness, Some(42.25));
    }

    #[test]
    fn garbage_file_is_reported_as_corrupted() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("library.db");
        std::fs::write(&db_path, vec![0x42u8; 4096]).unwrap();

        assert!(matches!(
            SqliteStore::open(&db_path),
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn timestamps_before_the_epoch_round_trip() {
        let before = UNIX_EPOCH - Duration::from_secs(86_400);
        assert_eq!(from_nanos(to_nanos(before)), before);
    }
}
