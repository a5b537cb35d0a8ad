//! In-memory graph topology: vertices, edges, and their adjacency.
//!
//! The two concurrent maps own every vertex and edge. Edges keep strong
//! handles to their endpoint vertices inside versioned reference cells;
//! adjacency maps inside vertices keep only weak handles to edges, so the
//! edge map stays the single authoritative owner of edge lifetime and no
//! reference cycle forms. Adjacency lookups treat an expired weak handle
//! as "not found".

mod edge;
mod vertex;

use std::sync::{Arc, Weak};

use crate::model::{ClassId, PositionId, RecordId, VersionId};
use crate::txn::{Txn, TxnMode, TxnObject};
use crate::version::{
    ConcurrentDeleteQueue, ConcurrentMap, TwoLevelMultiVersionMap, VersionControl,
};

pub(crate) type AdjacencyMap = TwoLevelMultiVersionMap<ClassId, PositionId, Weak<Edge>>;

/// A vertex: record id, lifecycle word, and the two adjacency maps keyed
/// by edge class and edge position.
#[derive(Debug)]
pub struct Vertex {
    /// Record id naming this vertex.
    pub rid: RecordId,
    pub(crate) state: TxnObject,
    pub(crate) in_edges: AdjacencyMap,
    pub(crate) out_edges: AdjacencyMap,
}

impl Vertex {
    pub(crate) fn new(rid: RecordId) -> Arc<Self> {
        Arc::new(Self {
            rid,
            state: TxnObject::new(),
            in_edges: AdjacencyMap::new(),
            out_edges: AdjacencyMap::new(),
        })
    }
}

/// An edge: record id, lifecycle word, and versioned references to its
/// source and target vertices.
#[derive(Debug)]
pub struct Edge {
    /// Record id naming this edge.
    pub rid: RecordId,
    pub(crate) state: TxnObject,
    pub(crate) source: VersionControl<Arc<Vertex>>,
    pub(crate) target: VersionControl<Arc<Vertex>>,
}

impl Edge {
    pub(crate) fn new(rid: RecordId, source: &Arc<Vertex>, target: &Arc<Vertex>) -> Arc<Self> {
        Arc::new(Self {
            rid,
            state: TxnObject::new(),
            source: VersionControl::staged_with(Arc::clone(source)),
            target: VersionControl::staged_with(Arc::clone(target)),
        })
    }
}

/// The in-memory graph store.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) vertices: ConcurrentMap<RecordId, Vertex>,
    pub(crate) edges: ConcurrentMap<RecordId, Edge>,
    pub(crate) deleted_vertices: ConcurrentDeleteQueue<RecordId>,
    pub(crate) deleted_edges: ConcurrentDeleteQueue<RecordId>,
}

impl Graph {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `rid` to a vertex through the transaction's visibility
    /// rule: snapshot visibility for readers, latest-plus-own-writes for
    /// the writer.
    pub(crate) fn lookup_vertex(&self, txn: &Txn<'_>, rid: RecordId) -> Option<Arc<Vertex>> {
        match self.vertices.get(&rid) {
            Some(vertex) => {
                let invisible = match txn.mode() {
                    TxnMode::ReadOnly => vertex.state.is_invisible_to(txn.version_id()),
                    TxnMode::ReadWrite => vertex.state.is_invisible_to_writer(),
                };
                (!invisible).then_some(vertex)
            }
            None => match txn.mode() {
                TxnMode::ReadOnly => None,
                TxnMode::ReadWrite => txn
                    .find_uncommitted_vertex(&rid)
                    .filter(|vertex| !vertex.state.is_invisible_to_writer()),
            },
        }
    }

    /// Resolves `rid` to an edge through the transaction's visibility rule.
    pub(crate) fn lookup_edge(&self, txn: &Txn<'_>, rid: RecordId) -> Option<Arc<Edge>> {
        match self.edges.get(&rid) {
            Some(edge) => {
                let invisible = match txn.mode() {
                    TxnMode::ReadOnly => edge.state.is_invisible_to(txn.version_id()),
                    TxnMode::ReadWrite => edge.state.is_invisible_to_writer(),
                };
                (!invisible).then_some(edge)
            }
            None => match txn.mode() {
                TxnMode::ReadOnly => None,
                TxnMode::ReadWrite => txn
                    .find_uncommitted_edge(&rid)
                    .filter(|edge| !edge.state.is_invisible_to_writer()),
            },
        }
    }

    /// Whether a vertex with `rid` is visible to the transaction.
    pub fn vertex_exists(&self, txn: &Txn<'_>, rid: RecordId) -> bool {
        self.lookup_vertex(txn, rid).is_some()
    }

    /// Whether an edge with `rid` is visible to the transaction.
    pub fn edge_exists(&self, txn: &Txn<'_>, rid: RecordId) -> bool {
        self.lookup_edge(txn, rid).is_some()
    }

    /// Physically erases vertices. Reclamation path only: callers must
    /// have established that no transaction can still observe them.
    pub(crate) fn force_purge_vertices(&self, rids: &[RecordId]) {
        self.vertices.erase_batch(rids);
    }

    /// Physically erases edges. Reclamation path only.
    pub(crate) fn force_purge_edges(&self, rids: &[RecordId]) {
        self.edges.erase_batch(rids);
    }

    /// Drains both delete queues up to `version_id` and physically erases
    /// the drained entities, edges before vertices.
    pub(crate) fn prune_deleted(&self, version_id: VersionId) {
        let edges = self.deleted_edges.drain_up_to(version_id);
        if !edges.is_empty() {
            tracing::debug!(count = edges.len(), "reclaiming deleted edges");
            self.force_purge_edges(&edges);
        }
        let vertices = self.deleted_vertices.drain_up_to(version_id);
        if !vertices.is_empty() {
            tracing::debug!(count = vertices.len(), "reclaiming deleted vertices");
            self.force_purge_vertices(&vertices);
        }
    }

    /// Unconditionally wipes both maps. Only safe when no transaction is
    /// in flight (context teardown, tests).
    pub fn clear(&self) {
        self.edges.clear();
        self.vertices.clear();
    }

    /// Number of vertices physically present (including not-yet-reclaimed
    /// deletions).
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges physically present.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::model::RecordId;

    fn rid(class_id: ClassId, position_id: PositionId) -> RecordId {
        RecordId::new(class_id, position_id)
    }

    #[test]
    fn writer_lookup_consults_the_uncommitted_set() {
        let ctx = Context::in_memory();
        let mut writer = ctx.begin(TxnMode::ReadWrite).unwrap();
        assert!(ctx.graph.lookup_vertex(&writer, rid(1, 1)).is_none());

        ctx.graph.create_vertex(&mut writer, rid(1, 1)).unwrap();
        assert!(ctx.graph.lookup_vertex(&writer, rid(1, 1)).is_some());

        // A staged vertex is not in the global map yet.
        assert_eq!(ctx.graph.vertex_count(), 0);
        writer.rollback().unwrap();
    }

    #[test]
    fn deleted_entities_hide_from_the_writer_but_not_pinned_readers() {
        let ctx = Context::in_memory();
        let mut writer = ctx.begin(TxnMode::ReadWrite).unwrap();
        ctx.graph.create_vertex(&mut writer, rid(1, 1)).unwrap();
        writer.commit().unwrap();

        let reader = ctx.begin(TxnMode::ReadOnly).unwrap();
        let mut writer = ctx.begin(TxnMode::ReadWrite).unwrap();
        ctx.graph.delete_vertex(&mut writer, rid(1, 1)).unwrap();
        assert!(ctx.graph.lookup_vertex(&writer, rid(1, 1)).is_none());
        assert!(ctx.graph.lookup_vertex(&reader, rid(1, 1)).is_some());
        writer.commit().unwrap();
        assert!(ctx.graph.lookup_vertex(&reader, rid(1, 1)).is_some());
    }

    #[test]
    fn prune_deleted_purges_edges_before_vertices() {
        let graph = Graph::new();
        let vertex = Vertex::new(rid(1, 1));
        graph.vertices.insert(vertex.rid, Arc::clone(&vertex));
        let edge = Edge::new(rid(2, 1), &vertex, &vertex);
        graph.edges.insert(edge.rid, Arc::clone(&edge));

        graph.deleted_edges.push_batch([(edge.rid, 3)]);
        graph.deleted_vertices.push_batch([(vertex.rid, 4)]);

        graph.prune_deleted(3);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.vertex_count(), 1);

        graph.prune_deleted(4);
        assert_eq!(graph.vertex_count(), 0);
    }
}
