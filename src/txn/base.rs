//! The base transaction: begin, commit, rollback, and the staged state in
//! between.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::context::Context;
use crate::error::{NogError, Result, TxnError};
use crate::graph::{Edge, Vertex};
use crate::model::{
    ClassId, DbInfo, PositionId, RecordId, TxnId, VersionId, MAX_VERSION_ID,
};
use crate::schema::{ClassDescriptor, ClassSnapshot};
use crate::storage::{self, DbOptions, StoreTxn};
use crate::txn::StatusFlag;
use crate::version::VersionControl;

/// Transaction mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxnMode {
    /// Snapshot reader: observes the state as of its begin, never writes.
    ReadOnly,
    /// The writer: stages changes and promotes them at commit.
    ReadWrite,
}

/// Persisted form of the db-info counters plus the version watermark.
#[derive(Serialize, Deserialize)]
struct DbInfoSnapshot {
    info: DbInfo,
    version_id: VersionId,
}

/// A transaction over a [`Context`].
///
/// Readers capture a snapshot version at begin and register in the
/// active-reader set; the writer stages every change into its uncommitted
/// sets and promotes them under the writer lock at commit. An incomplete
/// transaction rolls back when dropped.
pub struct Txn<'ctx> {
    ctx: &'ctx Context,
    store: Option<StoreTxn<'ctx>>,
    mode: TxnMode,
    txn_id: TxnId,
    version_id: VersionId,
    pub(crate) db_info: DbInfo,
    uc_classes: BTreeMap<ClassId, Arc<ClassDescriptor>>,
    uc_vertices: BTreeMap<RecordId, Arc<Vertex>>,
    uc_edges: BTreeMap<RecordId, Arc<Edge>>,
    completed: bool,
    store_committed: bool,
}

impl<'ctx> Txn<'ctx> {
    pub(crate) fn begin(ctx: &'ctx Context, mode: TxnMode) -> Result<Self> {
        match mode {
            TxnMode::ReadOnly => {
                let store = match ctx.env() {
                    Some(env) => Some(env.begin_read()?),
                    None => None,
                };
                let txn_id = ctx.stat.allocate_txn_id();
                // Pin version zero before reading the counter: a writer
                // that commits between the two steps sees this reader and
                // leaves the delete queues alone.
                ctx.stat.register_active(txn_id, 0);
                let version_id = ctx.stat.max_version_id();
                ctx.stat.register_active(txn_id, version_id);
                Ok(Self {
                    ctx,
                    store,
                    mode,
                    txn_id,
                    version_id,
                    db_info: DbInfo::default(),
                    uc_classes: BTreeMap::new(),
                    uc_vertices: BTreeMap::new(),
                    uc_edges: BTreeMap::new(),
                    completed: false,
                    store_committed: false,
                })
            }
            TxnMode::ReadWrite => {
                let store = match ctx.env() {
                    Some(env) => {
                        let store = env.begin_write()?;
                        // Pass through the writer lock once: the previous
                        // writer finished its promotions before releasing
                        // it, so everything it committed is visible here.
                        drop(ctx.writer_lock.read());
                        Some(store)
                    }
                    None => None,
                };
                let db_info = ctx.db_info.read().clone();
                let version_id = ctx.stat.max_version_id() + 1;
                if version_id > MAX_VERSION_ID {
                    if let Some(store) = store {
                        store.abort();
                    }
                    error!("version id space exhausted");
                    return Err(TxnError::VersionMaxReached.into());
                }
                Ok(Self {
                    ctx,
                    store,
                    mode,
                    txn_id: 0,
                    version_id,
                    db_info,
                    uc_classes: BTreeMap::new(),
                    uc_vertices: BTreeMap::new(),
                    uc_edges: BTreeMap::new(),
                    completed: false,
                    store_committed: false,
                })
            }
        }
    }

    /// The transaction's mode.
    pub fn mode(&self) -> TxnMode {
        self.mode
    }

    /// Reader id; zero for the writer.
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    /// The snapshot version for a reader, or the version this writer will
    /// commit at.
    pub fn version_id(&self) -> VersionId {
        self.version_id
    }

    /// Whether the transaction has committed or rolled back.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.completed {
            return Err(TxnError::Completed.into());
        }
        Ok(())
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        self.ensure_active()?;
        if self.mode != TxnMode::ReadWrite {
            return Err(TxnError::InvalidMode.into());
        }
        Ok(())
    }

    /// Reads a versioned cell under this transaction's visibility rule.
    pub(crate) fn read_cell<T: Clone>(&self, cell: &VersionControl<T>) -> Option<T> {
        match self.mode {
            TxnMode::ReadOnly => cell.read_at(self.version_id),
            TxnMode::ReadWrite => cell.read_latest(),
        }
    }

    pub(crate) fn add_uncommitted_vertex(&mut self, vertex: Arc<Vertex>) {
        self.uc_vertices.entry(vertex.rid).or_insert(vertex);
    }

    pub(crate) fn remove_uncommitted_vertex(&mut self, rid: &RecordId) {
        self.uc_vertices.remove(rid);
    }

    pub(crate) fn find_uncommitted_vertex(&self, rid: &RecordId) -> Option<Arc<Vertex>> {
        self.uc_vertices.get(rid).cloned()
    }

    pub(crate) fn add_uncommitted_edge(&mut self, edge: Arc<Edge>) {
        self.uc_edges.entry(edge.rid).or_insert(edge);
    }

    pub(crate) fn remove_uncommitted_edge(&mut self, rid: &RecordId) {
        self.uc_edges.remove(rid);
    }

    pub(crate) fn find_uncommitted_edge(&self, rid: &RecordId) -> Option<Arc<Edge>> {
        self.uc_edges.get(rid).cloned()
    }

    pub(crate) fn add_uncommitted_class(&mut self, descriptor: Arc<ClassDescriptor>) {
        self.uc_classes.entry(descriptor.id).or_insert(descriptor);
    }

    pub(crate) fn remove_uncommitted_class(&mut self, class_id: &ClassId) {
        self.uc_classes.remove(class_id);
    }

    pub(crate) fn find_uncommitted_class(&self, class_id: &ClassId) -> Option<Arc<ClassDescriptor>> {
        self.uc_classes.get(class_id).cloned()
    }

    pub(crate) fn uncommitted_classes(&self) -> Vec<Arc<ClassDescriptor>> {
        self.uc_classes.values().cloned().collect()
    }

    /// Commits the transaction.
    ///
    /// The reader path prunes and deregisters; the writer path promotes
    /// every staged change under the writer lock. On any failure the
    /// transaction rolls back before the error is returned.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        match self.mode {
            TxnMode::ReadOnly => {
                self.finish_read_only();
                Ok(())
            }
            TxnMode::ReadWrite => {
                if let Err(err) = self.commit_read_write() {
                    self.rollback_internal();
                    return Err(err);
                }
                Ok(())
            }
        }
    }

    /// Rolls the transaction back, restoring every staged entity.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.rollback_internal();
        Ok(())
    }

    /// Reader epilogue, shared by commit and rollback: reclaim what this
    /// reader was the last to pin, then deregister.
    fn finish_read_only(&mut self) {
        if self.ctx.stat.is_pinned_min(self.txn_id) {
            // Anything deleted at or below snapshot + 1 is invisible to
            // every remaining and future reader.
            self.ctx.schema.prune_deleted(self.version_id + 1);
            self.ctx.graph.prune_deleted(self.version_id + 1);
        }
        self.ctx.stat.unregister_active(self.txn_id);
        if let Some(store) = self.store.take() {
            store.abort();
        }
        self.completed = true;
    }

    fn commit_read_write(&mut self) -> Result<()> {
        let ctx = self.ctx;
        let _writer = ctx.writer_lock.write();

        let changed = !self.uc_classes.is_empty()
            || !self.uc_vertices.is_empty()
            || !self.uc_edges.is_empty();
        if changed {
            self.persist_db_info()?;
        }
        if let Some(store) = self.store.take() {
            store.commit()?;
            self.store_committed = true;
        }

        let version_id = self.version_id;
        let prune_below = match ctx.stat.min_active() {
            Some((_, snapshot)) => snapshot,
            None => version_id - 1,
        };

        if !self.uc_classes.is_empty() {
            let mut dropped = Vec::new();
            for descriptor in self.uc_classes.values() {
                match descriptor.state.state().1 {
                    StatusFlag::UncommittedDelete => {
                        dropped.push((descriptor.id, version_id));
                    }
                    StatusFlag::UncommittedCreate => {
                        ctx.schema
                            .classes
                            .insert(descriptor.id, Arc::clone(descriptor));
                    }
                    _ => {
                        descriptor.name.prune_stable_below(prune_below);
                        descriptor.properties.prune_stable_below(prune_below);
                        descriptor.super_class.prune_stable_below(prune_below);
                        descriptor.sub_classes.prune_stable_below(prune_below);
                    }
                }
                descriptor.state.promote(version_id);
                descriptor.name.promote(version_id);
                descriptor.properties.promote(version_id);
                descriptor.super_class.promote(version_id);
                descriptor.sub_classes.promote(version_id);
            }
            ctx.schema.deleted_classes.push_batch(dropped);
        }

        if !self.uc_vertices.is_empty() || !self.uc_edges.is_empty() {
            let mut deleted_vertices = Vec::new();
            let mut deleted_edges = Vec::new();

            for vertex in self.uc_vertices.values() {
                match vertex.state.state().1 {
                    StatusFlag::UncommittedDelete => {
                        deleted_vertices.push((vertex.rid, version_id));
                    }
                    StatusFlag::UncommittedCreate => {
                        ctx.graph.vertices.insert(vertex.rid, Arc::clone(vertex));
                    }
                    _ => {}
                }
                vertex.state.promote(version_id);
            }

            for edge in self.uc_edges.values() {
                match edge.state.state().1 {
                    StatusFlag::UncommittedDelete => {
                        deleted_edges.push((edge.rid, version_id));
                    }
                    StatusFlag::UncommittedCreate => {
                        ctx.graph.edges.insert(edge.rid, Arc::clone(edge));
                    }
                    _ => {
                        edge.source.prune_stable_below(prune_below);
                        edge.target.prune_stable_below(prune_below);
                    }
                }

                // Promote the adjacency entries keyed by this edge on both
                // resolutions (staged and stable) of both endpoints; this
                // is what makes the edge appear in its endpoints' lists at
                // exactly this version.
                let class_id = edge.rid.class_id;
                let position_id = edge.rid.position_id;
                let promote_out = |vertex: &Arc<Vertex>| {
                    vertex.out_edges.prune_all(prune_below);
                    if let Some(cell) = vertex.out_edges.get(&class_id, &position_id) {
                        cell.promote(version_id);
                    }
                };
                let promote_in = |vertex: &Arc<Vertex>| {
                    vertex.in_edges.prune_all(prune_below);
                    if let Some(cell) = vertex.in_edges.get(&class_id, &position_id) {
                        cell.promote(version_id);
                    }
                };
                if let Some(source) = edge.source.staged_value() {
                    promote_out(&source);
                }
                if let Some((source, _)) = edge.source.latest_stable() {
                    promote_out(&source);
                }
                if let Some(target) = edge.target.staged_value() {
                    promote_in(&target);
                }
                if let Some((target, _)) = edge.target.latest_stable() {
                    promote_in(&target);
                }

                edge.state.promote(version_id);
                edge.source.promote(version_id);
                edge.target.promote(version_id);
            }

            ctx.graph.deleted_vertices.push_batch(deleted_vertices);
            ctx.graph.deleted_edges.push_batch(deleted_edges);
        }

        if changed {
            *ctx.db_info.write() = self.db_info.clone();
        }

        // From here on new transactions observe this commit.
        ctx.stat.advance_version_id();
        debug!(version = version_id, "writer committed");

        if ctx.stat.min_active().is_none() {
            ctx.schema.prune_deleted(version_id);
            ctx.graph.prune_deleted(version_id);
        }
        self.completed = true;
        Ok(())
    }

    fn rollback_internal(&mut self) {
        if self.completed {
            return;
        }
        match self.mode {
            TxnMode::ReadOnly => self.finish_read_only(),
            TxnMode::ReadWrite => {
                for vertex in self.uc_vertices.values() {
                    if vertex.state.state().1 == StatusFlag::UncommittedDelete {
                        vertex.state.set_status(StatusFlag::CommittedCreate);
                    }
                }
                for edge in self.uc_edges.values() {
                    if edge.state.state().1 == StatusFlag::UncommittedDelete {
                        edge.state.set_status(StatusFlag::CommittedCreate);
                    }
                    let class_id = edge.rid.class_id;
                    let position_id = edge.rid.position_id;
                    if let Some(source) = edge.source.staged_value() {
                        source.out_edges.prune(&class_id, &position_id, 0);
                    }
                    if let Some(source) = edge
                        .source
                        .latest_stable()
                        .and_then(|(vertex, active)| active.then_some(vertex))
                    {
                        source.out_edges.prune(&class_id, &position_id, 0);
                    }
                    if let Some(target) = edge.target.staged_value() {
                        target.in_edges.prune(&class_id, &position_id, 0);
                    }
                    if let Some(target) = edge
                        .target
                        .latest_stable()
                        .and_then(|(vertex, active)| active.then_some(vertex))
                    {
                        target.in_edges.prune(&class_id, &position_id, 0);
                    }
                    edge.source.disable_staged();
                    edge.target.disable_staged();
                }
                for descriptor in self.uc_classes.values() {
                    if descriptor.state.state().1 == StatusFlag::UncommittedDelete {
                        descriptor.state.set_status(StatusFlag::CommittedCreate);
                    }
                    descriptor.name.disable_staged();
                    descriptor.properties.disable_staged();
                    descriptor.super_class.disable_staged();
                    descriptor.sub_classes.disable_staged();
                }
                if let Some(store) = self.store.take() {
                    if !self.store_committed {
                        store.abort();
                    }
                }
                self.completed = true;
            }
        }
    }

    fn persist_db_info(&mut self) -> Result<()> {
        let ctx = self.ctx;
        let Some(env) = ctx.env() else {
            return Ok(());
        };
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };
        let db = env.open_db(store, storage::DBINFO_DB, DbOptions::default())?;
        let snapshot = DbInfoSnapshot {
            info: self.db_info.clone(),
            version_id: self.version_id,
        };
        db.put(store, storage::DBINFO_KEY, &bincode::serialize(&snapshot)?, false)
    }

    pub(crate) fn load_db_info(bytes: &[u8]) -> Result<(DbInfo, VersionId)> {
        let snapshot: DbInfoSnapshot = bincode::deserialize(bytes)?;
        Ok((snapshot.info, snapshot.version_id))
    }

    /// Writes the current writer-view snapshot of a class descriptor into
    /// the schema database. No-op without persistence.
    pub(crate) fn persist_class(&mut self, descriptor: &ClassDescriptor) -> Result<()> {
        let ctx = self.ctx;
        let Some(env) = ctx.env() else {
            return Ok(());
        };
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };
        let db = env.open_db(
            store,
            storage::SCHEMA_DB,
            DbOptions {
                numeric_keys: true,
                ..Default::default()
            },
        )?;
        let snapshot: ClassSnapshot = descriptor.snapshot();
        db.put(
            store,
            &storage::class_key(descriptor.id),
            &bincode::serialize(&snapshot)?,
            false,
        )
    }

    /// Removes a dropped class from the schema database. No-op without
    /// persistence.
    pub(crate) fn erase_class_snapshot(&mut self, class_id: ClassId) -> Result<()> {
        let ctx = self.ctx;
        let Some(env) = ctx.env() else {
            return Ok(());
        };
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };
        let db = env.open_db(
            store,
            storage::SCHEMA_DB,
            DbOptions {
                numeric_keys: true,
                ..Default::default()
            },
        )?;
        db.delete(store, &storage::class_key(class_id))?;
        Ok(())
    }
}

/// Record-store plumbing: the persistent surface the core drives. Payload
/// bytes are opaque; only position allocation and transaction boundaries
/// belong to the core.
impl<'ctx> Txn<'ctx> {
    fn class_store(&mut self, class_id: ClassId) -> Result<(storage::StoreDb, &mut StoreTxn<'ctx>)> {
        let ctx = self.ctx;
        let env = ctx
            .env()
            .ok_or(NogError::Internal("persistence is disabled"))?;
        let store = self
            .store
            .as_mut()
            .ok_or(NogError::Internal("persistence is disabled"))?;
        let db = env.open_db(
            store,
            &storage::class_db_name(class_id),
            DbOptions {
                numeric_keys: true,
                ..Default::default()
            },
        )?;
        Ok((db, store))
    }

    /// Allocates the next position id of a class by bumping the reserved
    /// key of its record database.
    pub fn next_position_id(&mut self, class_id: ClassId) -> Result<PositionId> {
        self.ensure_writable()?;
        let (db, store) = self.class_store(class_id)?;
        let next = match db.get(store, &storage::position_key(storage::NEXT_POSITION_ID))? {
            Some(bytes) => PositionId::from_ne_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| NogError::Internal("malformed next-position record"))?,
            ),
            None => 1,
        };
        db.put(
            store,
            &storage::position_key(storage::NEXT_POSITION_ID),
            &(next + 1).to_ne_bytes(),
            false,
        )?;
        Ok(next)
    }

    /// Stores an opaque record payload.
    pub fn put_record(&mut self, rid: RecordId, payload: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        let (db, store) = self.class_store(rid.class_id)?;
        db.put(store, &storage::position_key(rid.position_id), payload, false)
    }

    /// Fetches an opaque record payload.
    pub fn get_record(&mut self, rid: RecordId) -> Result<Option<Vec<u8>>> {
        self.ensure_active()?;
        let ctx = self.ctx;
        let env = ctx
            .env()
            .ok_or(NogError::Internal("persistence is disabled"))?;
        let store = self
            .store
            .as_mut()
            .ok_or(NogError::Internal("persistence is disabled"))?;
        let Some(db) = env.try_open_db(
            store,
            &storage::class_db_name(rid.class_id),
            DbOptions {
                numeric_keys: true,
                ..Default::default()
            },
        )?
        else {
            return Ok(None);
        };
        db.get(store, &storage::position_key(rid.position_id))
    }

    /// Deletes a record payload; reports whether it was present.
    pub fn del_record(&mut self, rid: RecordId) -> Result<bool> {
        self.ensure_writable()?;
        let (db, store) = self.class_store(rid.class_id)?;
        db.delete(store, &storage::position_key(rid.position_id))
    }

    /// Empties a class database, keeping the position watermark.
    pub fn empty_class(&mut self, class_id: ClassId) -> Result<()> {
        self.ensure_writable()?;
        let (db, store) = self.class_store(class_id)?;
        let watermark = db.get(store, &storage::position_key(storage::NEXT_POSITION_ID))?;
        db.clear(store)?;
        if let Some(watermark) = watermark {
            db.put(
                store,
                &storage::position_key(storage::NEXT_POSITION_ID),
                &watermark,
                false,
            )?;
        }
        Ok(())
    }

    /// Positions currently present in a class database, in id order.
    pub fn record_ids(&mut self, class_id: ClassId) -> Result<Vec<PositionId>> {
        self.ensure_active()?;
        let ctx = self.ctx;
        let env = ctx
            .env()
            .ok_or(NogError::Internal("persistence is disabled"))?;
        let store = self
            .store
            .as_mut()
            .ok_or(NogError::Internal("persistence is disabled"))?;
        let Some(db) = env.try_open_db(
            store,
            &storage::class_db_name(class_id),
            DbOptions {
                numeric_keys: true,
                ..Default::default()
            },
        )?
        else {
            return Ok(Vec::new());
        };
        let mut positions = Vec::new();
        for (key, _) in db.scan(store)? {
            let position = PositionId::from_ne_bytes(
                key.as_slice()
                    .try_into()
                    .map_err(|_| NogError::Internal("malformed record key"))?,
            );
            if position != storage::NEXT_POSITION_ID {
                positions.push(position);
            }
        }
        Ok(positions)
    }
}

/// Graph operations, delegated to the context's topology engine with this
/// transaction's visibility rule.
impl<'ctx> Txn<'ctx> {
    /// See [`crate::graph::Graph::create_vertex`].
    pub fn create_vertex(&mut self, rid: RecordId) -> Result<()> {
        let ctx = self.ctx;
        ctx.graph.create_vertex(self, rid)
    }

    /// See [`crate::graph::Graph::delete_vertex`].
    pub fn delete_vertex(&mut self, rid: RecordId) -> Result<()> {
        let ctx = self.ctx;
        ctx.graph.delete_vertex(self, rid)
    }

    /// See [`crate::graph::Graph::create_edge`].
    pub fn create_edge(&mut self, rid: RecordId, src_rid: RecordId, dst_rid: RecordId) -> Result<()> {
        let ctx = self.ctx;
        ctx.graph.create_edge(self, rid, src_rid, dst_rid)
    }

    /// See [`crate::graph::Graph::delete_edge`].
    pub fn delete_edge(&mut self, rid: RecordId) -> Result<()> {
        let ctx = self.ctx;
        ctx.graph.delete_edge(self, rid)
    }

    /// See [`crate::graph::Graph::relink_source`].
    pub fn relink_source(&mut self, rid: RecordId, src_rid: RecordId) -> Result<()> {
        let ctx = self.ctx;
        ctx.graph.relink_source(self, rid, src_rid)
    }

    /// See [`crate::graph::Graph::relink_target`].
    pub fn relink_target(&mut self, rid: RecordId, dst_rid: RecordId) -> Result<()> {
        let ctx = self.ctx;
        ctx.graph.relink_target(self, rid, dst_rid)
    }

    /// See [`crate::graph::Graph::source_of`].
    pub fn source_of(&self, rid: RecordId) -> Result<RecordId> {
        self.ctx.graph.source_of(self, rid)
    }

    /// See [`crate::graph::Graph::target_of`].
    pub fn target_of(&self, rid: RecordId) -> Result<RecordId> {
        self.ctx.graph.target_of(self, rid)
    }

    /// See [`crate::graph::Graph::endpoints_of`].
    pub fn endpoints_of(&self, rid: RecordId) -> Result<(RecordId, RecordId)> {
        self.ctx.graph.endpoints_of(self, rid)
    }

    /// See [`crate::graph::Graph::vertex_exists`].
    pub fn vertex_exists(&self, rid: RecordId) -> bool {
        self.ctx.graph.vertex_exists(self, rid)
    }

    /// See [`crate::graph::Graph::edge_exists`].
    pub fn edge_exists(&self, rid: RecordId) -> bool {
        self.ctx.graph.edge_exists(self, rid)
    }

    /// See [`crate::graph::Graph::in_edges`].
    pub fn in_edges(&self, rid: RecordId, class_filter: Option<ClassId>) -> Result<Vec<RecordId>> {
        self.ctx.graph.in_edges(self, rid, class_filter)
    }

    /// See [`crate::graph::Graph::out_edges`].
    pub fn out_edges(&self, rid: RecordId, class_filter: Option<ClassId>) -> Result<Vec<RecordId>> {
        self.ctx.graph.out_edges(self, rid, class_filter)
    }

    /// See [`crate::graph::Graph::all_edges`].
    pub fn all_edges(&self, rid: RecordId, class_filter: Option<ClassId>) -> Result<Vec<RecordId>> {
        self.ctx.graph.all_edges(self, rid, class_filter)
    }

    /// See [`crate::graph::Graph::in_edge_classes`].
    pub fn in_edge_classes(&self, rid: RecordId) -> Result<Vec<ClassId>> {
        self.ctx.graph.in_edge_classes(self, rid)
    }

    /// See [`crate::graph::Graph::out_edge_classes`].
    pub fn out_edge_classes(&self, rid: RecordId) -> Result<Vec<ClassId>> {
        self.ctx.graph.out_edge_classes(self, rid)
    }

    /// See [`crate::graph::Graph::all_edge_classes`].
    pub fn all_edge_classes(&self, rid: RecordId) -> Result<Vec<ClassId>> {
        self.ctx.graph.all_edge_classes(self, rid)
    }
}

/// Schema operations, delegated to the context's schema engine.
impl<'ctx> Txn<'ctx> {
    /// See [`crate::schema::Schema::create_class`].
    pub fn create_class(
        &mut self,
        name: &str,
        class_type: crate::model::ClassType,
    ) -> Result<Arc<ClassDescriptor>> {
        let ctx = self.ctx;
        ctx.schema.create_class(self, name, class_type)
    }

    /// See [`crate::schema::Schema::drop_class`].
    pub fn drop_class(&mut self, class_id: ClassId) -> Result<()> {
        let ctx = self.ctx;
        ctx.schema.drop_class(self, class_id)
    }

    /// See [`crate::schema::Schema::rename_class`].
    pub fn rename_class(&mut self, class_id: ClassId, new_name: &str) -> Result<()> {
        let ctx = self.ctx;
        ctx.schema.rename_class(self, class_id, new_name)
    }

    /// See [`crate::schema::Schema::set_super_class`].
    pub fn set_super_class(&mut self, class_id: ClassId, super_id: Option<ClassId>) -> Result<()> {
        let ctx = self.ctx;
        ctx.schema.set_super_class(self, class_id, super_id)
    }

    /// See [`crate::schema::Schema::add_property`].
    pub fn add_property(
        &mut self,
        class_id: ClassId,
        name: &str,
        property_type: crate::model::PropertyType,
    ) -> Result<crate::model::PropertyId> {
        let ctx = self.ctx;
        ctx.schema.add_property(self, class_id, name, property_type)
    }

    /// See [`crate::schema::Schema::drop_property`].
    pub fn drop_property(&mut self, class_id: ClassId, name: &str) -> Result<()> {
        let ctx = self.ctx;
        ctx.schema.drop_property(self, class_id, name)
    }

    /// See [`crate::schema::Schema::rename_property`].
    pub fn rename_property(&mut self, class_id: ClassId, old_name: &str, new_name: &str) -> Result<()> {
        let ctx = self.ctx;
        ctx.schema.rename_property(self, class_id, old_name, new_name)
    }

    /// See [`crate::schema::Schema::find_by_id`].
    pub fn class_by_id(&self, class_id: ClassId) -> Option<Arc<ClassDescriptor>> {
        self.ctx.schema.find_by_id(self, class_id)
    }

    /// See [`crate::schema::Schema::find_by_name`].
    pub fn class_by_name(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.ctx.schema.find_by_name(self, name)
    }

    /// See [`crate::schema::Schema::name_of`].
    pub fn class_name_of(&self, class_id: ClassId) -> Result<String> {
        self.ctx.schema.name_of(self, class_id)
    }

    /// See [`crate::schema::Schema::properties_of`].
    pub fn properties_of(&self, class_id: ClassId) -> Result<crate::schema::ClassProperties> {
        self.ctx.schema.properties_of(self, class_id)
    }

    /// See [`crate::schema::Schema::super_class_of`].
    pub fn super_class_of(&self, class_id: ClassId) -> Result<Option<ClassId>> {
        self.ctx.schema.super_class_of(self, class_id)
    }

    /// See [`crate::schema::Schema::sub_classes_of`].
    pub fn sub_classes_of(&self, class_id: ClassId) -> Result<std::collections::BTreeSet<ClassId>> {
        self.ctx.schema.sub_classes_of(self, class_id)
    }

    /// See [`crate::schema::Schema::classes`].
    pub fn classes(&self) -> Vec<Arc<ClassDescriptor>> {
        self.ctx.schema.classes(self)
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.rollback_internal();
        }
    }
}
