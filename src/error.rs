//! Error taxonomy of the core.
//!
//! Failures are signaled by kind, grouped the way the layers report them:
//! graph topology, transaction lifecycle, and schema. The umbrella
//! [`NogError`] also carries I/O and storage-engine sources.

use std::io;

use thiserror::Error;

use crate::model::RecordId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NogError>;

/// Failures raised by the graph topology engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A vertex with this record id is already visible.
    #[error("duplicate vertex {0}")]
    DuplicateVertex(RecordId),
    /// No visible vertex with this record id.
    #[error("vertex {0} does not exist")]
    NoExistVertex(RecordId),
    /// The source endpoint of this edge could not be resolved.
    #[error("source vertex of edge {0} does not exist")]
    NoExistSource(RecordId),
    /// The destination endpoint of this edge could not be resolved.
    #[error("destination vertex of edge {0} does not exist")]
    NoExistDestination(RecordId),
    /// An edge with this record id is already visible.
    #[error("duplicate edge {0}")]
    DuplicateEdge(RecordId),
    /// No visible edge with this record id.
    #[error("edge {0} does not exist")]
    NoExistEdge(RecordId),
}

/// Failures raised by the transaction lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxnError {
    /// A write operation was issued against a read-only transaction.
    #[error("operation requires a read-write transaction")]
    InvalidMode,
    /// The transaction has already committed or rolled back.
    #[error("transaction already completed")]
    Completed,
    /// The version counter would overflow on this commit.
    #[error("maximum version id reached")]
    VersionMaxReached,
}

/// Failures raised by the schema engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A class with this name is already visible.
    #[error("class `{0}` already exists")]
    DuplicateClass(String),
    /// No visible class with this id.
    #[error("class {0} does not exist")]
    NoExistClass(crate::model::ClassId),
    /// The class exists but is not of the expected type.
    #[error("class type does not match")]
    MismatchClassType,
    /// A property with this name is already declared on the class.
    #[error("property `{0}` already exists")]
    DuplicateProperty(String),
    /// No property with this name on the class.
    #[error("property `{0}` does not exist")]
    NoExistProperty(String),
    /// Class names must be non-empty.
    #[error("class name is empty")]
    EmptyClassName,
    /// Property names must be non-empty.
    #[error("property name is empty")]
    EmptyPropertyName,
}

/// Umbrella error of the crate.
#[derive(Debug, Error)]
pub enum NogError {
    /// Graph topology failure.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Transaction lifecycle failure.
    #[error(transparent)]
    Txn(#[from] TxnError),
    /// Schema failure.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Persistent engine failure.
    #[error("storage engine error: {0}")]
    Storage(#[from] heed::Error),
    /// Filesystem failure while preparing the environment.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Snapshot encoding failure (schema or db-info records).
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    /// Invariant violation that should not be reachable.
    #[error("internal error: {0}")]
    Internal(&'static str),
}
