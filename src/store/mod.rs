//! SQLite snapshot store
//!
//! A secondary sink for validated replies. Stores are identified by
//! `(host, database name)`: every pair gets its own connection behind its own
//! lock, so concurrent hosts never interleave writes to the same store while
//! different stores proceed independently.

mod migrations;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::common::{paths, Error, Result};
use crate::snapshot::writer::snapshot_file_name;
use crate::snapshot::Format;

pub use migrations::run_migrations;

/// How long a connection waits on a database locked by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkRecord {
    pub host: String,
    /// Command or RPC name as used in snapshot file names
    pub cli_command: String,
    /// Snapshot tag
    pub snap_name: String,
    pub filename: String,
    pub format: Format,
    /// Canonical serialized reply
    pub data: String,
}

impl SinkRecord {
    pub fn new(host: &str, name: &str, snap_name: &str, format: Format, data: String) -> Self {
        Self {
            host: host.to_string(),
            cli_command: name.to_string(),
            snap_name: snap_name.to_string(),
            filename: snapshot_file_name(host, snap_name, name, format),
            format,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreKey {
    host: String,
    database: String,
}

/// Registry of open snapshot databases
pub struct SnapshotStore {
    dir: PathBuf,
    handles: Mutex<HashMap<StoreKey, Arc<Mutex<Connection>>>>,
}

impl SnapshotStore {
    /// Create a store whose database files live in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Append a record to the host's store in `database`
    pub fn persist(&self, database: &str, record: &SinkRecord) -> Result<()> {
        let handle = self.handle(&record.host, database)?;
        let conn = handle
            .lock()
            .map_err(|_| Error::StoreLockPoisoned(record.host.clone()))?;
        conn.execute(
            "INSERT INTO snapshots (host, cli_command, snap_name, filename, format, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.host,
                record.cli_command,
                record.snap_name,
                record.filename,
                record.format.as_str(),
                record.data,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        tracing::debug!(
            host = %record.host,
            database,
            filename = %record.filename,
            "Snapshot stored"
        );
        Ok(())
    }

    /// Records stored for `host` in `database`, oldest first
    pub fn records(&self, host: &str, database: &str) -> Result<Vec<SinkRecord>> {
        let handle = self.handle(host, database)?;
        let conn = handle
            .lock()
            .map_err(|_| Error::StoreLockPoisoned(host.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT host, cli_command, snap_name, filename, format, data
             FROM snapshots WHERE host = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![host], |row| {
            let format: String = row.get(4)?;
            Ok(SinkRecord {
                host: row.get(0)?,
                cli_command: row.get(1)?,
                snap_name: row.get(2)?,
                filename: row.get(3)?,
                format: Format::resolve(Some(format.as_str())),
                data: row.get(5)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Connection for a `(host, database)` pair, opened on first use
    fn handle(&self, host: &str, database: &str) -> Result<Arc<Mutex<Connection>>> {
        let key = StoreKey {
            host: host.to_string(),
            database: database.to_string(),
        };
        let mut handles = self
            .handles
            .lock()
            .map_err(|_| Error::StoreLockPoisoned(host.to_string()))?;
        if let Some(handle) = handles.get(&key) {
            return Ok(handle.clone());
        }

        paths::ensure_dir(&self.dir)?;
        let conn = Connection::open(self.dir.join(database))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        run_migrations(&conn)?;

        let handle = Arc::new(Mutex::new(conn));
        handles.insert(key, handle.clone());
        Ok(handle)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("dir", &self.dir)
            .finish()
    }
}

/// Store sink attached to a snapshot run
#[derive(Debug, Clone)]
pub struct StoreSink {
    pub store: Arc<SnapshotStore>,
    pub database: String,
}

impl StoreSink {
    pub fn new(store: Arc<SnapshotStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
        }
    }

    /// Persist a record on the blocking pool
    pub async fn persist(&self, record: SinkRecord) -> Result<()> {
        let store = self.store.clone();
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || store.persist(&database, &record))
            .await
            .map_err(|e| Error::Internal(format!("store task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(host: &str, name: &str) -> SinkRecord {
        SinkRecord::new(host, name, "pre", Format::Xml, format!("<{}/>", name))
    }

    #[test]
    fn test_record_filename() {
        let rec = SinkRecord::new("r1", "show_version", "pre", Format::Text, String::new());
        assert_eq!(rec.filename, "r1_pre_show_version.text");
        assert_eq!(rec.cli_command, "show_version");
        assert_eq!(rec.snap_name, "pre");
    }

    #[test]
    fn test_persist_and_read_back() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.persist("snaps.db", &record("r1", "a")).unwrap();
        store.persist("snaps.db", &record("r1", "b")).unwrap();

        let records = store.records("r1", "snaps.db").unwrap();
        assert_eq!(records, vec![record("r1", "a"), record("r1", "b")]);
        assert!(dir.path().join("snaps.db").exists());
    }

    #[test]
    fn test_hosts_sharing_a_database_are_separate() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.persist("snaps.db", &record("r1", "a")).unwrap();
        store.persist("snaps.db", &record("r2", "b")).unwrap();
        store.persist("snaps.db", &record("r2", "c")).unwrap();

        assert_eq!(store.records("r1", "snaps.db").unwrap().len(), 1);
        assert_eq!(store.records("r2", "snaps.db").unwrap().len(), 2);
        assert!(store.records("r3", "snaps.db").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_writers_keep_every_record() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SnapshotStore::new(dir.path()));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let host = format!("r{}", i % 2);
                    for n in 0..10 {
                        store
                            .persist("shared.db", &record(&host, &format!("t{}", n)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(store.records("r0", "shared.db").unwrap().len(), 20);
        assert_eq!(store.records("r1", "shared.db").unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_sink_persists_on_blocking_pool() {
        let dir = tempdir().unwrap();
        let sink = StoreSink::new(Arc::new(SnapshotStore::new(dir.path())), "snaps.db");
        sink.persist(record("r1", "a")).await.unwrap();
        assert_eq!(sink.store.records("r1", "snaps.db").unwrap().len(), 1);
    }
}
