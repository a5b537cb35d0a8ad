#![allow(unsafe_code)]

//! Persistent ordered key-value engine: an LMDB wrapper plus the on-disk
//! naming layout the core drives.
//!
//! The engine contract is deliberately thin: environments, serializable
//! single-writer transactions with snapshot reads, named databases with
//! optional native-byte-order integer keys and duplicate values, and
//! forward cursors. Record payload bytes are opaque here; the core only
//! drives position allocation and transaction boundaries.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, DatabaseFlags, EnvOpenOptions, PutFlags, RoTxn, RwTxn};

use crate::error::{NogError, Result};
use crate::model::{ClassId, IndexId, PositionId, PropertyType};

/// Name of the database holding the persisted [`crate::model::DbInfo`]
/// counters and version watermark.
pub const DBINFO_DB: &str = ".dbinfo";

/// Name of the database holding one serialized descriptor per class.
pub const SCHEMA_DB: &str = ".schema";

/// Key of the single entry inside [`DBINFO_DB`].
pub const DBINFO_KEY: &[u8] = b"info";

/// Reserved position inside every class database holding the next
/// position id to assign.
pub const NEXT_POSITION_ID: PositionId = 0;

/// Which half of a signed-numeric index database a name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexHalf {
    /// Values ≥ 0.
    Positive,
    /// Values < 0.
    Negative,
}

/// Per-class record databases are named by the stringified class id.
pub fn class_db_name(class_id: ClassId) -> String {
    class_id.to_string()
}

/// Secondary-index databases are named by a reserved prefix and the index
/// id, with a half suffix when the indexed property type is signed.
pub fn index_db_name(index_id: IndexId, half: Option<IndexHalf>) -> String {
    match half {
        None => format!(".index_{index_id}"),
        Some(IndexHalf::Positive) => format!(".index_{index_id}_positive"),
        Some(IndexHalf::Negative) => format!(".index_{index_id}_negative"),
    }
}

/// Every database name an index occupies: one for unsigned and
/// non-numeric property types, a positive and a negative half otherwise.
pub fn index_db_names(index_id: IndexId, property_type: PropertyType) -> Vec<String> {
    if property_type.is_signed_numeric() {
        vec![
            index_db_name(index_id, Some(IndexHalf::Positive)),
            index_db_name(index_id, Some(IndexHalf::Negative)),
        ]
    } else {
        vec![index_db_name(index_id, None)]
    }
}

/// Native-byte-order key encoding for integer-keyed databases.
pub fn position_key(position_id: PositionId) -> [u8; 4] {
    position_id.to_ne_bytes()
}

/// Native-byte-order key for the schema database (class ids widened to
/// the integer-key width LMDB expects).
pub fn class_key(class_id: ClassId) -> [u8; 4] {
    u32::from(class_id).to_ne_bytes()
}

/// Options of a named database.
#[derive(Clone, Copy, Debug, Default)]
pub struct DbOptions {
    /// Keys are native-byte-order unsigned integers, enabling fast range
    /// scans in id order.
    pub numeric_keys: bool,
    /// The database keeps multiple sorted values per key.
    pub dup_values: bool,
}

impl DbOptions {
    fn flags(self) -> DatabaseFlags {
        let mut flags = DatabaseFlags::empty();
        if self.numeric_keys {
            flags |= DatabaseFlags::INTEGER_KEY;
        }
        if self.dup_values {
            flags |= DatabaseFlags::DUP_SORT;
        }
        flags
    }
}

/// An open LMDB environment.
#[derive(Clone)]
pub struct StorageEnv {
    env: heed::Env,
}

impl StorageEnv {
    /// Opens (creating if needed) the environment rooted at `path`.
    pub fn open(
        path: &Path,
        map_size: usize,
        max_databases: u32,
        max_readers: u32,
    ) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let mut options = EnvOpenOptions::new();
        options
            .map_size(map_size)
            .max_dbs(max_databases)
            .max_readers(max_readers);
        // One environment per path per process; heed refuses a second open.
        let env = unsafe { options.open(path) }?;
        Ok(Self { env })
    }

    /// Begins a read-only transaction with a consistent snapshot.
    pub fn begin_read(&self) -> Result<StoreTxn<'_>> {
        Ok(StoreTxn::ReadOnly(self.env.read_txn()?))
    }

    /// Begins the read-write transaction. LMDB serializes writers: this
    /// blocks until the previous writer finishes.
    pub fn begin_write(&self) -> Result<StoreTxn<'_>> {
        Ok(StoreTxn::ReadWrite(self.env.write_txn()?))
    }

    /// Opens the named database, creating it when the transaction is
    /// read-write. Fails if a read-only transaction names a database that
    /// does not exist yet.
    pub fn open_db(&self, txn: &mut StoreTxn<'_>, name: &str, options: DbOptions) -> Result<StoreDb> {
        self.try_open_db(txn, name, options)?
            .ok_or(NogError::Internal("named database does not exist"))
    }

    /// Opens the named database if it exists; read-write transactions
    /// create it on demand.
    pub fn try_open_db(
        &self,
        txn: &mut StoreTxn<'_>,
        name: &str,
        options: DbOptions,
    ) -> Result<Option<StoreDb>> {
        let mut open_options = self.env.database_options().types::<Bytes, Bytes>();
        open_options.name(name);
        open_options.flags(options.flags());
        let db = match txn {
            StoreTxn::ReadWrite(wtxn) => Some(open_options.create(wtxn)?),
            StoreTxn::ReadOnly(rtxn) => open_options.open(rtxn)?,
        };
        Ok(db.map(|db| StoreDb { db }))
    }

    /// Flushes buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.env.force_sync()?;
        Ok(())
    }
}

/// A storage transaction in one of the two modes.
pub enum StoreTxn<'env> {
    /// Snapshot reader.
    ReadOnly(RoTxn<'env>),
    /// The single writer.
    ReadWrite(RwTxn<'env>),
}

impl<'env> StoreTxn<'env> {
    fn ro(&self) -> &RoTxn<'env> {
        match self {
            StoreTxn::ReadOnly(txn) => txn,
            StoreTxn::ReadWrite(txn) => txn,
        }
    }

    fn rw(&mut self) -> Result<&mut RwTxn<'env>> {
        match self {
            StoreTxn::ReadWrite(txn) => Ok(txn),
            StoreTxn::ReadOnly(_) => Err(NogError::Internal(
                "write through a read-only storage transaction",
            )),
        }
    }

    /// Whether this is the writer.
    pub fn is_read_write(&self) -> bool {
        matches!(self, StoreTxn::ReadWrite(_))
    }

    /// Durably commits the transaction.
    pub fn commit(self) -> Result<()> {
        match self {
            StoreTxn::ReadOnly(txn) => txn.commit()?,
            StoreTxn::ReadWrite(txn) => txn.commit()?,
        }
        Ok(())
    }

    /// Abandons the transaction. Never surfaces an error; the rollback
    /// paths rely on that.
    pub fn abort(self) {
        match self {
            StoreTxn::ReadOnly(_) => {}
            StoreTxn::ReadWrite(txn) => txn.abort(),
        }
    }
}

/// Handle to a named database.
#[derive(Clone, Copy)]
pub struct StoreDb {
    db: Database<Bytes, Bytes>,
}

impl StoreDb {
    /// Stores `value` under `key`. With `append` the key is required to
    /// sort after every existing key, enabling O(1) tail inserts.
    pub fn put(&self, txn: &mut StoreTxn<'_>, key: &[u8], value: &[u8], append: bool) -> Result<()> {
        let wtxn = txn.rw()?;
        if append {
            self.db.put_with_flags(wtxn, PutFlags::APPEND, key, value)?;
        } else {
            self.db.put(wtxn, key, value)?;
        }
        Ok(())
    }

    /// Value stored under `key`, copied out of the map.
    pub fn get(&self, txn: &StoreTxn<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(txn.ro(), key)?.map(<[u8]>::to_vec))
    }

    /// Removes `key`; reports whether it was present.
    pub fn delete(&self, txn: &mut StoreTxn<'_>, key: &[u8]) -> Result<bool> {
        Ok(self.db.delete(txn.rw()?, key)?)
    }

    /// Removes every entry of the database.
    pub fn clear(&self, txn: &mut StoreTxn<'_>) -> Result<()> {
        self.db.clear(txn.rw()?)?;
        Ok(())
    }

    /// Forward scan of every `(key, value)` pair in key order.
    pub fn scan(&self, txn: &StoreTxn<'_>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for item in self.db.iter(txn.ro())? {
            let (key, value) = item?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    /// Number of entries.
    pub fn len(&self, txn: &StoreTxn<'_>) -> Result<u64> {
        Ok(self.db.len(txn.ro())?)
    }

    /// Whether the database holds no entries.
    pub fn is_empty(&self, txn: &StoreTxn<'_>) -> Result<bool> {
        Ok(self.db.is_empty(txn.ro())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_env(dir: &Path) -> StorageEnv {
        StorageEnv::open(dir, 16 * 1024 * 1024, 16, 126).expect("open env")
    }

    #[test]
    fn naming_layout() {
        assert_eq!(class_db_name(42), "42");
        assert_eq!(index_db_name(3, None), ".index_3");
        assert_eq!(index_db_name(3, Some(IndexHalf::Positive)), ".index_3_positive");
        assert_eq!(index_db_name(3, Some(IndexHalf::Negative)), ".index_3_negative");
        assert_eq!(
            index_db_names(7, PropertyType::Integer),
            vec![".index_7_positive", ".index_7_negative"]
        );
        assert_eq!(index_db_names(7, PropertyType::Text), vec![".index_7"]);
    }

    #[test]
    fn put_get_roundtrip_survives_commit() -> Result<()> {
        let dir = tempdir().unwrap();
        let env = test_env(dir.path());

        let mut txn = env.begin_write()?;
        let db = env.open_db(&mut txn, &class_db_name(1), DbOptions {
            numeric_keys: true,
            ..Default::default()
        })?;
        db.put(&mut txn, &position_key(1), b"payload", false)?;
        db.put(&mut txn, &position_key(2), b"other", false)?;
        txn.commit()?;

        let mut txn = env.begin_read()?;
        let db = env.open_db(&mut txn, &class_db_name(1), DbOptions {
            numeric_keys: true,
            ..Default::default()
        })?;
        assert_eq!(db.get(&txn, &position_key(1))?.as_deref(), Some(&b"payload"[..]));
        assert_eq!(db.len(&txn)?, 2);
        txn.abort();
        Ok(())
    }

    #[test]
    fn abort_discards_writes() -> Result<()> {
        let dir = tempdir().unwrap();
        let env = test_env(dir.path());

        let mut txn = env.begin_write()?;
        let db = env.open_db(&mut txn, "scratch", DbOptions::default())?;
        db.put(&mut txn, b"k", b"v", false)?;
        txn.commit()?;

        let mut txn = env.begin_write()?;
        let db = env.open_db(&mut txn, "scratch", DbOptions::default())?;
        db.put(&mut txn, b"k", b"overwritten", false)?;
        db.delete(&mut txn, b"k")?;
        txn.abort();

        let mut txn = env.begin_read()?;
        let db = env.open_db(&mut txn, "scratch", DbOptions::default())?;
        assert_eq!(db.get(&txn, b"k")?.as_deref(), Some(&b"v"[..]));
        txn.abort();
        Ok(())
    }

    #[test]
    fn numeric_keys_scan_in_id_order() -> Result<()> {
        let dir = tempdir().unwrap();
        let env = test_env(dir.path());

        let mut txn = env.begin_write()?;
        let db = env.open_db(&mut txn, &class_db_name(7), DbOptions {
            numeric_keys: true,
            ..Default::default()
        })?;
        for position in [300u32, 2, 70_000] {
            db.put(&mut txn, &position_key(position), &position.to_le_bytes(), false)?;
        }
        let keys: Vec<u32> = db
            .scan(&txn)?
            .into_iter()
            .map(|(key, _)| PositionId::from_ne_bytes(key.try_into().unwrap()))
            .collect();
        assert_eq!(keys, vec![2, 300, 70_000]);
        txn.commit()?;
        Ok(())
    }
}
