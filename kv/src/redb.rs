//! Redb-based durable key-value store.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{Batch, KVError, KVResult, KVStore, Op};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// A durable key-value store backed by a single redb file.
///
/// Every [`KVStore::write`] runs in its own write transaction and returns
/// only after the commit succeeded.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> KVResult<Self> {
        let db = Database::create(path).map_err(storage)?;

        // Create the table up front so read transactions never see it missing.
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;
        let value = table.get(key).map_err(storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        for item in table.range(prefix..).map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        Ok(results)
    }

    fn write(&self, batch: Batch) -> KVResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            for op in batch.ops() {
                match op {
                    Op::Put { key, value } => {
                        table
                            .insert(key.as_str(), value.as_slice())
                            .map_err(storage)?;
                    }
                    Op::Delete { key } => {
                        table.remove(key.as_str()).map_err(storage)?;
                    }
                }
            }
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn redb_put_get_delete() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.put("subj:1", b"value1").unwrap();
        assert_eq!(store.get("subj:1").unwrap(), Some(b"value1".to_vec()));

        store.delete("subj:1").unwrap();
        assert_eq!(store.get("subj:1").unwrap(), None);
    }

    #[test]
    fn redb_scan_stops_at_prefix_end() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.put("vec:a", b"1").unwrap();
        store.put("vec:b", b"2").unwrap();
        store.put("vez", b"3").unwrap();
        store.put("other:c", b"4").unwrap();

        let results = store.scan("vec:").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "vec:a");
        assert_eq!(results[1].0, "vec:b");
    }

    #[test]
    fn redb_batch_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            let mut batch = Batch::new();
            batch.put("a", b"1".to_vec()).put("b", b"2".to_vec()).delete("a");
            store.write(batch).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(b"2".to_vec()));
    }
}
