//! Vertex lifecycle and adjacency queries.

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::model::{ClassId, RecordId};
use crate::txn::{StatusFlag, Txn, TxnMode};

use super::{Graph, Vertex};

impl Graph {
    /// Creates a vertex under `rid`.
    ///
    /// The new vertex is staged in the transaction's uncommitted set and
    /// becomes globally visible at commit. Fails with
    /// [`GraphError::DuplicateVertex`] when a vertex with this rid is
    /// already visible to the transaction.
    pub fn create_vertex(&self, txn: &mut Txn<'_>, rid: RecordId) -> Result<()> {
        txn.ensure_writable()?;
        if !self.create_vertex_if_absent(txn, rid) {
            return Err(GraphError::DuplicateVertex(rid).into());
        }
        Ok(())
    }

    /// Non-erroring creation primitive: returns `false` when the vertex is
    /// already visible, `true` after staging a fresh one. Used directly by
    /// bulk edge loads that materialize missing endpoints.
    pub(crate) fn create_vertex_if_absent(&self, txn: &mut Txn<'_>, rid: RecordId) -> bool {
        if self.lookup_vertex(txn, rid).is_some() {
            return false;
        }
        txn.add_uncommitted_vertex(Vertex::new(rid));
        true
    }

    pub(crate) fn resolve_endpoint(&self, txn: &mut Txn<'_>, rid: RecordId) -> Arc<Vertex> {
        if let Some(vertex) = self.lookup_vertex(txn, rid) {
            return vertex;
        }
        let vertex = Vertex::new(rid);
        txn.add_uncommitted_vertex(Arc::clone(&vertex));
        vertex
    }

    /// Deletes the vertex under `rid`, cascading to every edge still
    /// attached in either direction.
    pub fn delete_vertex(&self, txn: &mut Txn<'_>, rid: RecordId) -> Result<()> {
        txn.ensure_writable()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;

        // Detach and delete incoming edges, removing each from its source
        // vertex's outgoing adjacency.
        for (class_id, position_ids) in vertex.in_edges.keys() {
            for position_id in position_ids {
                let Some(weak) = vertex.in_edges.find_latest(&class_id, &position_id) else {
                    continue;
                };
                let Some(in_edge) = weak.upgrade() else {
                    continue;
                };
                if let Some(source) = in_edge.source.read_latest() {
                    source
                        .out_edges
                        .erase(&in_edge.rid.class_id, &in_edge.rid.position_id);
                }
                if in_edge.state.state().1 == StatusFlag::UncommittedCreate {
                    txn.remove_uncommitted_edge(&in_edge.rid);
                } else {
                    in_edge.state.set_status(StatusFlag::UncommittedDelete);
                    txn.add_uncommitted_edge(in_edge);
                }
            }
        }

        // Same for outgoing edges and their target vertices.
        for (class_id, position_ids) in vertex.out_edges.keys() {
            for position_id in position_ids {
                let Some(weak) = vertex.out_edges.find_latest(&class_id, &position_id) else {
                    continue;
                };
                let Some(out_edge) = weak.upgrade() else {
                    continue;
                };
                if let Some(target) = out_edge.target.read_latest() {
                    target
                        .in_edges
                        .erase(&out_edge.rid.class_id, &out_edge.rid.position_id);
                }
                if out_edge.state.state().1 == StatusFlag::UncommittedCreate {
                    txn.remove_uncommitted_edge(&out_edge.rid);
                } else {
                    out_edge.state.set_status(StatusFlag::UncommittedDelete);
                    txn.add_uncommitted_edge(out_edge);
                }
            }
        }

        if vertex.state.state().1 == StatusFlag::UncommittedCreate {
            txn.remove_uncommitted_vertex(&rid);
        } else {
            vertex.state.set_status(StatusFlag::UncommittedDelete);
            txn.add_uncommitted_vertex(vertex);
        }
        Ok(())
    }

    /// Record ids of the edges arriving at `rid`, optionally restricted to
    /// one edge class.
    pub fn in_edges(
        &self,
        txn: &Txn<'_>,
        rid: RecordId,
        class_filter: Option<ClassId>,
    ) -> Result<Vec<RecordId>> {
        txn.ensure_active()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;
        Ok(self.collect_adjacent(txn, &vertex.in_edges, class_filter))
    }

    /// Record ids of the edges leaving `rid`, optionally restricted to one
    /// edge class.
    pub fn out_edges(
        &self,
        txn: &Txn<'_>,
        rid: RecordId,
        class_filter: Option<ClassId>,
    ) -> Result<Vec<RecordId>> {
        txn.ensure_active()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;
        Ok(self.collect_adjacent(txn, &vertex.out_edges, class_filter))
    }

    /// Record ids of the edges touching `rid` in either direction, sorted
    /// by (class, position) and deduplicated (a self-loop appears once).
    pub fn all_edges(
        &self,
        txn: &Txn<'_>,
        rid: RecordId,
        class_filter: Option<ClassId>,
    ) -> Result<Vec<RecordId>> {
        txn.ensure_active()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;
        let mut result = self.collect_adjacent(txn, &vertex.in_edges, class_filter);
        result.extend(self.collect_adjacent(txn, &vertex.out_edges, class_filter));
        result.sort_unstable();
        result.dedup();
        Ok(result)
    }

    /// Distinct edge classes with at least one visible edge arriving at
    /// `rid`.
    pub fn in_edge_classes(&self, txn: &Txn<'_>, rid: RecordId) -> Result<Vec<ClassId>> {
        txn.ensure_active()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;
        Ok(self.collect_adjacent_classes(txn, &vertex.in_edges))
    }

    /// Distinct edge classes with at least one visible edge leaving `rid`.
    pub fn out_edge_classes(&self, txn: &Txn<'_>, rid: RecordId) -> Result<Vec<ClassId>> {
        txn.ensure_active()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;
        Ok(self.collect_adjacent_classes(txn, &vertex.out_edges))
    }

    /// Distinct edge classes touching `rid` in either direction, sorted
    /// and deduplicated.
    pub fn all_edge_classes(&self, txn: &Txn<'_>, rid: RecordId) -> Result<Vec<ClassId>> {
        txn.ensure_active()?;
        let vertex = self
            .lookup_vertex(txn, rid)
            .ok_or(GraphError::NoExistVertex(rid))?;
        let mut result = self.collect_adjacent_classes(txn, &vertex.in_edges);
        result.extend(self.collect_adjacent_classes(txn, &vertex.out_edges));
        result.sort_unstable();
        result.dedup();
        Ok(result)
    }

    fn collect_adjacent(
        &self,
        txn: &Txn<'_>,
        adjacency: &super::AdjacencyMap,
        class_filter: Option<ClassId>,
    ) -> Vec<RecordId> {
        let mut result = Vec::new();
        let groups: Vec<(ClassId, Vec<crate::model::PositionId>)> = match class_filter {
            Some(class_id) => vec![(class_id, adjacency.keys_of(&class_id))],
            None => adjacency.keys(),
        };
        for (class_id, position_ids) in groups {
            for position_id in position_ids {
                let resolved = match txn.mode() {
                    TxnMode::ReadOnly => {
                        adjacency.find_at(txn.version_id(), &class_id, &position_id)
                    }
                    TxnMode::ReadWrite => adjacency.find_latest(&class_id, &position_id),
                };
                if let Some(edge) = resolved.and_then(|weak| weak.upgrade()) {
                    result.push(edge.rid);
                }
            }
        }
        result
    }

    fn collect_adjacent_classes(
        &self,
        txn: &Txn<'_>,
        adjacency: &super::AdjacencyMap,
    ) -> Vec<ClassId> {
        let mut result = Vec::new();
        for (class_id, position_ids) in adjacency.keys() {
            for position_id in position_ids {
                let resolved = match txn.mode() {
                    TxnMode::ReadOnly => {
                        adjacency.find_at(txn.version_id(), &class_id, &position_id)
                    }
                    TxnMode::ReadWrite => adjacency.find_latest(&class_id, &position_id),
                };
                if resolved.and_then(|weak| weak.upgrade()).is_some() {
                    result.push(class_id);
                    break;
                }
            }
        }
        result
    }
}
