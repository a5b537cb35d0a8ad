//! Process-wide holder of the engines, counters, queues, and the two
//! global locks.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::info;

use crate::error::Result;
use crate::graph::Graph;
use crate::model::DbInfo;
use crate::schema::{ClassDescriptor, ClassSnapshot, Schema};
use crate::storage::{self, DbOptions, StorageEnv};
use crate::txn::{Txn, TxnMode, TxnStat};

/// Environment sizing knobs, passed straight to LMDB.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Maximum size of the memory map (and therefore of the database).
    pub map_size: usize,
    /// Maximum number of named databases. Every class consumes one, every
    /// index one or two.
    pub max_databases: u32,
    /// Maximum number of concurrently open read transactions.
    pub max_readers: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_size: 1024 * 1024 * 1024,
            max_databases: 1024,
            max_readers: 126,
        }
    }
}

/// The database context: owner of the storage environment, the schema and
/// graph engines, the transaction statistics, and the writer lock.
///
/// A context has no transactional behavior of its own; [`Context::begin`]
/// hands out [`Txn`] handles that borrow it, so the borrow checker
/// guarantees every transaction finishes before the context goes away.
pub struct Context {
    env: Option<StorageEnv>,
    path: Option<PathBuf>,
    pub(crate) db_info: RwLock<DbInfo>,
    pub(crate) schema: Schema,
    pub(crate) graph: Graph,
    pub(crate) stat: TxnStat,
    pub(crate) writer_lock: RwLock<()>,
}

impl Context {
    /// Opens (creating if needed) the database rooted at `path` and
    /// reloads the persisted counters and schema.
    pub fn open(path: impl AsRef<Path>, settings: Settings) -> Result<Self> {
        let path = path.as_ref();
        let env = StorageEnv::open(
            path,
            settings.map_size,
            settings.max_databases,
            settings.max_readers,
        )?;
        let ctx = Self {
            env: Some(env),
            path: Some(path.to_path_buf()),
            db_info: RwLock::new(DbInfo::default()),
            schema: Schema::new(),
            graph: Graph::new(),
            stat: TxnStat::new(),
            writer_lock: RwLock::new(()),
        };
        ctx.load_persisted()?;
        info!(path = %path.display(), "database context opened");
        Ok(ctx)
    }

    /// Builds a context with persistence disabled.
    ///
    /// Read-write transactions over an in-memory context are not
    /// serialized by a storage engine; the caller takes responsibility
    /// for running one writer at a time.
    pub fn in_memory() -> Self {
        Self {
            env: None,
            path: None,
            db_info: RwLock::new(DbInfo::default()),
            schema: Schema::new(),
            graph: Graph::new(),
            stat: TxnStat::new(),
            writer_lock: RwLock::new(()),
        }
    }

    /// Begins a transaction against this context.
    pub fn begin(&self, mode: TxnMode) -> Result<Txn<'_>> {
        Txn::begin(self, mode)
    }

    /// The graph topology engine.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The schema engine.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The transaction statistics.
    pub fn stat(&self) -> &TxnStat {
        &self.stat
    }

    /// Current schema-info counters.
    pub fn db_info(&self) -> DbInfo {
        self.db_info.read().clone()
    }

    /// Filesystem root of the environment, if persistence is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn env(&self) -> Option<&StorageEnv> {
        self.env.as_ref()
    }

    /// Creates the system databases on first open and reinstates the
    /// persisted db-info counters, version watermark, and schema
    /// descriptors.
    fn load_persisted(&self) -> Result<()> {
        let Some(env) = &self.env else {
            return Ok(());
        };
        let mut txn = env.begin_write()?;
        let info_db = env.open_db(&mut txn, storage::DBINFO_DB, DbOptions::default())?;
        let schema_db = env.open_db(
            &mut txn,
            storage::SCHEMA_DB,
            DbOptions {
                numeric_keys: true,
                ..Default::default()
            },
        )?;
        if let Some(bytes) = info_db.get(&txn, storage::DBINFO_KEY)? {
            let (info, version_id) = Txn::load_db_info(&bytes)?;
            *self.db_info.write() = info;
            self.stat.restore_version(version_id);
            for (_, value) in schema_db.scan(&txn)? {
                let snapshot: ClassSnapshot = bincode::deserialize(&value)?;
                // Reloaded descriptors are committed history; version 1 is
                // below every snapshot a reopened context can hand out.
                self.schema
                    .install_restored(ClassDescriptor::restored(snapshot, 1));
            }
            info!(
                classes = self.schema.classes.len(),
                version = version_id,
                "restored persisted schema"
            );
        }
        txn.commit()?;
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            info!(path = %path.display(), "database context closed");
        }
    }
}
