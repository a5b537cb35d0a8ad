//! Edge lifecycle, endpoint resolution, and relinking.

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::model::RecordId;
use crate::txn::{StatusFlag, Txn, TxnMode};

use super::{Edge, Graph};

impl Graph {
    /// Creates an edge under `rid` from `src_rid` to `dst_rid`.
    ///
    /// Missing endpoint vertices are materialized as uncommitted creations
    /// of the same transaction (bulk loads insert edges without creating
    /// vertices first). Fails with [`GraphError::DuplicateEdge`] when an
    /// edge with this rid is already visible.
    pub fn create_edge(
        &self,
        txn: &mut Txn<'_>,
        rid: RecordId,
        src_rid: RecordId,
        dst_rid: RecordId,
    ) -> Result<()> {
        txn.ensure_writable()?;
        if self.lookup_edge(txn, rid).is_some() {
            return Err(GraphError::DuplicateEdge(rid).into());
        }
        let source = self.resolve_endpoint(txn, src_rid);
        let target = self.resolve_endpoint(txn, dst_rid);
        let edge = Edge::new(rid, &source, &target);
        txn.add_uncommitted_edge(Arc::clone(&edge));
        source
            .out_edges
            .insert(rid.class_id, rid.position_id, Arc::downgrade(&edge));
        target
            .in_edges
            .insert(rid.class_id, rid.position_id, Arc::downgrade(&edge));
        Ok(())
    }

    /// Deletes the edge under `rid`, detaching it from both endpoint
    /// adjacencies at the latest version.
    pub fn delete_edge(&self, txn: &mut Txn<'_>, rid: RecordId) -> Result<()> {
        txn.ensure_writable()?;
        let edge = self
            .lookup_edge(txn, rid)
            .ok_or(GraphError::NoExistEdge(rid))?;
        if let Some(source) = edge.source.read_latest() {
            source.out_edges.erase(&rid.class_id, &rid.position_id);
        }
        if let Some(target) = edge.target.read_latest() {
            target.in_edges.erase(&rid.class_id, &rid.position_id);
        }
        if edge.state.state().1 == StatusFlag::UncommittedCreate {
            txn.remove_uncommitted_edge(&rid);
        } else {
            edge.state.set_status(StatusFlag::UncommittedDelete);
            txn.add_uncommitted_edge(edge);
        }
        Ok(())
    }

    /// Repoints the edge's source to `src_rid`, maintaining both outgoing
    /// adjacencies.
    pub fn relink_source(&self, txn: &mut Txn<'_>, rid: RecordId, src_rid: RecordId) -> Result<()> {
        txn.ensure_writable()?;
        let edge = self
            .lookup_edge(txn, rid)
            .ok_or(GraphError::NoExistEdge(rid))?;
        let old_source = edge
            .source
            .read_latest()
            .ok_or(GraphError::NoExistSource(rid))?;
        let new_source = self.resolve_endpoint(txn, src_rid);
        old_source.out_edges.erase(&rid.class_id, &rid.position_id);
        edge.source.stage(Arc::clone(&new_source));
        txn.add_uncommitted_edge(Arc::clone(&edge));
        new_source
            .out_edges
            .insert(rid.class_id, rid.position_id, Arc::downgrade(&edge));
        Ok(())
    }

    /// Repoints the edge's target to `dst_rid`, maintaining both incoming
    /// adjacencies.
    pub fn relink_target(&self, txn: &mut Txn<'_>, rid: RecordId, dst_rid: RecordId) -> Result<()> {
        txn.ensure_writable()?;
        let edge = self
            .lookup_edge(txn, rid)
            .ok_or(GraphError::NoExistEdge(rid))?;
        let old_target = edge
            .target
            .read_latest()
            .ok_or(GraphError::NoExistDestination(rid))?;
        let new_target = self.resolve_endpoint(txn, dst_rid);
        old_target.in_edges.erase(&rid.class_id, &rid.position_id);
        edge.target.stage(Arc::clone(&new_target));
        txn.add_uncommitted_edge(Arc::clone(&edge));
        new_target
            .in_edges
            .insert(rid.class_id, rid.position_id, Arc::downgrade(&edge));
        Ok(())
    }

    /// Record id of the edge's source vertex under the transaction's
    /// visibility rule.
    pub fn source_of(&self, txn: &Txn<'_>, rid: RecordId) -> Result<RecordId> {
        txn.ensure_active()?;
        let edge = self
            .lookup_edge(txn, rid)
            .ok_or(GraphError::NoExistEdge(rid))?;
        let source = match txn.mode() {
            TxnMode::ReadOnly => edge.source.read_at(txn.version_id()),
            TxnMode::ReadWrite => edge.source.read_latest(),
        };
        source
            .map(|vertex| vertex.rid)
            .ok_or_else(|| GraphError::NoExistSource(rid).into())
    }

    /// Record id of the edge's target vertex under the transaction's
    /// visibility rule.
    pub fn target_of(&self, txn: &Txn<'_>, rid: RecordId) -> Result<RecordId> {
        txn.ensure_active()?;
        let edge = self
            .lookup_edge(txn, rid)
            .ok_or(GraphError::NoExistEdge(rid))?;
        let target = match txn.mode() {
            TxnMode::ReadOnly => edge.target.read_at(txn.version_id()),
            TxnMode::ReadWrite => edge.target.read_latest(),
        };
        target
            .map(|vertex| vertex.rid)
            .ok_or_else(|| GraphError::NoExistDestination(rid).into())
    }

    /// Both endpoint record ids of the edge, `(source, target)`.
    pub fn endpoints_of(&self, txn: &Txn<'_>, rid: RecordId) -> Result<(RecordId, RecordId)> {
        Ok((self.source_of(txn, rid)?, self.target_of(txn, rid)?))
    }
}
