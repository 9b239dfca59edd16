//! `SQLite`-backed cache of named record collections.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::migrations;
use crate::error::Result;
use crate::models::{position_of, Record, RecordId, SyncOperation};
use crate::util::unix_timestamp_millis;

/// A cached record whose last write has not reached the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub collection: String,
    pub id: RecordId,
    pub operation: SyncOperation,
    /// Record as last written locally
    pub record: Record,
    /// Unix ms
    pub marked_at: i64,
}

/// Local, process-persisted store of collections.
///
/// Each collection is kept as one JSON array, which preserves load order.
/// Pending markers live in a side table so they never leak into the payload.
///
/// Public operations do not fail: a broken or missing collection reads as
/// empty and write errors are logged. Writes return whether they persisted.
pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    /// Open a cache file at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::from_connection(conn)
    }

    /// Open an in-memory cache (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All records of a collection; empty when the collection is unknown.
    pub fn read_all(&self, name: &str) -> Vec<Record> {
        let conn = self.conn.lock();
        Self::load_records(&conn, name).unwrap_or_else(|error| {
            tracing::warn!(collection = name, %error, "Failed to read cached collection");
            Vec::new()
        })
    }

    /// Replace a collection wholesale.
    pub fn write_all(&self, name: &str, records: &[Record]) -> bool {
        let conn = self.conn.lock();
        Self::logged(name, "write", Self::store_records(&conn, name, records))
    }

    /// Replace the record with a matching id, or append it.
    pub fn upsert(&self, name: &str, record: &Record) -> bool {
        let conn = self.conn.lock();
        let result = Self::load_records(&conn, name).and_then(|mut records| {
            match record.id().and_then(|id| position_of(&records, &id)) {
                Some(index) => records[index] = record.clone(),
                None => records.push(record.clone()),
            }
            Self::store_records(&conn, name, &records)
        });
        Self::logged(name, "upsert", result)
    }

    /// Remove the record with `id`; a no-op if it isn't cached.
    pub fn remove(&self, name: &str, id: &RecordId) -> bool {
        let conn = self.conn.lock();
        let result = Self::load_records(&conn, name).and_then(|mut records| {
            let before = records.len();
            records.retain(|record| record.id().as_ref() != Some(id));
            if records.len() == before {
                return Ok(());
            }
            Self::store_records(&conn, name, &records)
        });
        Self::logged(name, "remove", result)
    }

    /// Look up a single record by id.
    pub fn find(&self, name: &str, id: &RecordId) -> Option<Record> {
        let records = self.read_all(name);
        position_of(&records, id).map(|index| records[index].clone())
    }

    /// Drop every cached record of a collection. Pending markers are kept.
    pub fn clear(&self, name: &str) -> bool {
        let conn = self.conn.lock();
        let result = conn
            .execute("DELETE FROM collections WHERE name = ?", params![name])
            .map(|_| ())
            .map_err(Into::into);
        Self::logged(name, "clear", result)
    }

    /// Names of every cached collection, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let conn = self.conn.lock();
        let result = conn
            .prepare("SELECT name FROM collections ORDER BY name")
            .and_then(|mut stmt| {
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>();
                names
            });
        result.unwrap_or_else(|error| {
            tracing::warn!(%error, "Failed to list cached collections");
            Vec::new()
        })
    }

    /// Mark a record's last write as not yet on the remote.
    ///
    /// An existing marker for the same record is folded with the new
    /// operation; a create followed by a delete removes the marker.
    pub fn mark_pending(
        &self,
        name: &str,
        id: &RecordId,
        operation: SyncOperation,
        record: &Record,
    ) -> bool {
        let conn = self.conn.lock();
        let result = (|| -> Result<()> {
            let existing = Self::pending_operation(&conn, name, id)?;
            let merged = existing.map_or(Some(operation), |previous| previous.coalesce(operation));
            match merged {
                Some(operation) => {
                    conn.execute(
                        "INSERT INTO pending_records (collection, record_id, operation, snapshot, marked_at)
                         VALUES (?, ?, ?, ?, ?)
                         ON CONFLICT(collection, record_id) DO UPDATE SET
                            operation = excluded.operation,
                            snapshot = excluded.snapshot,
                            marked_at = excluded.marked_at",
                        params![
                            name,
                            id.as_str(),
                            operation.as_str(),
                            serde_json::to_string(record)?,
                            unix_timestamp_millis()
                        ],
                    )?;
                }
                None => {
                    Self::delete_pending(&conn, name, id)?;
                }
            }
            Ok(())
        })();
        Self::logged(name, "mark pending", result)
    }

    /// Clear the pending marker of a record.
    pub fn clear_pending(&self, name: &str, id: &RecordId) -> bool {
        let conn = self.conn.lock();
        Self::logged(name, "clear pending", Self::delete_pending(&conn, name, id))
    }

    /// Whether a record still carries a pending marker.
    pub fn is_pending(&self, name: &str, id: &RecordId) -> bool {
        let conn = self.conn.lock();
        Self::pending_operation(&conn, name, id)
            .ok()
            .flatten()
            .is_some()
    }

    /// Pending records of one collection, oldest marker first.
    pub fn pending(&self, name: &str) -> Vec<PendingRecord> {
        self.query_pending(Some(name))
    }

    /// Pending records of every collection, oldest marker first.
    pub fn all_pending(&self) -> Vec<PendingRecord> {
        self.query_pending(None)
    }

    fn query_pending(&self, name: Option<&str>) -> Vec<PendingRecord> {
        let conn = self.conn.lock();
        let result = (|| -> Result<Vec<PendingRecord>> {
            let mut stmt = conn.prepare(
                "SELECT collection, record_id, operation, snapshot, marked_at
                 FROM pending_records
                 WHERE ?1 IS NULL OR collection = ?1
                 ORDER BY marked_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map(params![name], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut pending = Vec::with_capacity(rows.len());
            for (collection, id, operation, snapshot, marked_at) in rows {
                let Ok(operation) = operation.parse::<SyncOperation>() else {
                    tracing::warn!(%collection, %id, %operation, "Skipping pending marker with unknown operation");
                    continue;
                };
                pending.push(PendingRecord {
                    collection,
                    id: RecordId::from(id),
                    operation,
                    record: serde_json::from_str(&snapshot)?,
                    marked_at,
                });
            }
            Ok(pending)
        })();

        result.unwrap_or_else(|error| {
            tracing::warn!(collection = name, %error, "Failed to read pending markers");
            Vec::new()
        })
    }

    fn load_records(conn: &Connection, name: &str) -> Result<Vec<Record>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT records FROM collections WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn store_records(conn: &Connection, name: &str, records: &[Record]) -> Result<()> {
        conn.execute(
            "INSERT INTO collections (name, records, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET records = excluded.records, updated_at = excluded.updated_at",
            params![name, serde_json::to_string(records)?, unix_timestamp_millis()],
        )?;
        Ok(())
    }

    fn pending_operation(
        conn: &Connection,
        name: &str,
        id: &RecordId,
    ) -> Result<Option<SyncOperation>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT operation FROM pending_records WHERE collection = ? AND record_id = ?",
                params![name, id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|operation| operation.parse().ok()))
    }

    fn delete_pending(conn: &Connection, name: &str, id: &RecordId) -> Result<()> {
        conn.execute(
            "DELETE FROM pending_records WHERE collection = ? AND record_id = ?",
            params![name, id.as_str()],
        )?;
        Ok(())
    }

    fn logged(name: &str, action: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(collection = name, action, %error, "Cache write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> CacheStore {
        CacheStore::open_in_memory().unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn missing_collection_reads_empty() {
        let cache = setup();
        assert!(cache.read_all("clients").is_empty());
        assert!(cache.find("clients", &RecordId::from(1)).is_none());
    }

    #[test]
    fn write_all_replaces_and_keeps_order() {
        let cache = setup();
        let records = vec![
            record(json!({"id": 3, "name": "C"})),
            record(json!({"id": 1, "name": "A"})),
        ];
        assert!(cache.write_all("clients", &records));
        assert_eq!(cache.read_all("clients"), records);

        assert!(cache.write_all("clients", &[]));
        assert!(cache.read_all("clients").is_empty());
    }

    #[test]
    fn upsert_replaces_by_id_else_appends() {
        let cache = setup();
        cache.upsert("vehicles", &record(json!({"id": 1, "plate": "A"})));
        cache.upsert("vehicles", &record(json!({"id": 2, "plate": "B"})));
        cache.upsert("vehicles", &record(json!({"id": "1", "plate": "A2"})));

        let records = cache.read_all("vehicles");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record(json!({"id": "1", "plate": "A2"})));
        assert_eq!(records[1].get("plate"), Some(&json!("B")));
    }

    #[test]
    fn remove_by_id() {
        let cache = setup();
        cache.upsert("staff", &record(json!({"id": 1})));
        cache.upsert("staff", &record(json!({"id": 2})));
        assert!(cache.remove("staff", &RecordId::from(1)));
        assert!(cache.remove("staff", &RecordId::from(99)));
        assert_eq!(cache.read_all("staff"), vec![record(json!({"id": 2}))]);
    }

    #[test]
    fn collections_are_independent() {
        let cache = setup();
        cache.upsert("clients", &record(json!({"id": 1})));
        cache.upsert("trips", &record(json!({"id": 1})));
        cache.clear("clients");
        assert!(cache.read_all("clients").is_empty());
        assert_eq!(cache.read_all("trips").len(), 1);
        assert_eq!(cache.collection_names(), vec!["trips".to_string()]);
    }

    #[test]
    fn pending_markers_stay_out_of_payload() {
        let cache = setup();
        let rec = record(json!({"id": 7, "name": "Acme"}));
        cache.upsert("clients", &rec);
        cache.mark_pending("clients", &RecordId::from(7), SyncOperation::Create, &rec);

        assert_eq!(cache.read_all("clients"), vec![rec.clone()]);
        assert!(cache.is_pending("clients", &RecordId::from(7)));

        let pending = cache.pending("clients");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, SyncOperation::Create);
        assert_eq!(pending[0].record, rec);

        cache.clear_pending("clients", &RecordId::from(7));
        assert!(!cache.is_pending("clients", &RecordId::from(7)));
        assert!(cache.pending("clients").is_empty());
    }

    #[test]
    fn pending_markers_coalesce() {
        let cache = setup();
        let id = RecordId::from(9);
        let v1 = record(json!({"id": 9, "name": "v1"}));
        let v2 = record(json!({"id": 9, "name": "v2"}));

        cache.mark_pending("trips", &id, SyncOperation::Create, &v1);
        cache.mark_pending("trips", &id, SyncOperation::Update, &v2);
        let pending = cache.pending("trips");
        assert_eq!(pending[0].operation, SyncOperation::Create);
        assert_eq!(pending[0].record, v2);

        cache.mark_pending("trips", &id, SyncOperation::Delete, &v2);
        assert!(cache.pending("trips").is_empty());
    }

    #[test]
    fn clear_keeps_pending_markers() {
        let cache = setup();
        let rec = record(json!({"id": 1}));
        cache.upsert("branches", &rec);
        cache.mark_pending("branches", &RecordId::from(1), SyncOperation::Update, &rec);
        cache.clear("branches");
        assert!(cache.read_all("branches").is_empty());
        assert_eq!(cache.all_pending().len(), 1);
    }

    #[test]
    fn persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("cache.db");
        let rec = record(json!({"id": "m-1", "route": "NBO-MSA"}));

        {
            let cache = CacheStore::open(&path).unwrap();
            cache.upsert("manifests", &rec);
            cache.mark_pending("manifests", &RecordId::from("m-1"), SyncOperation::Create, &rec);
        }

        let cache = CacheStore::open(&path).unwrap();
        assert_eq!(cache.read_all("manifests"), vec![rec]);
        assert!(cache.is_pending("manifests", &RecordId::from("m-1")));
    }
}
