//! # NogDB core
//!
//! The concurrency-and-storage substrate of an embedded graph database:
//! records are vertices and edges grouped into typed classes with a
//! declared property schema, and the whole in-memory topology is
//! multi-versioned so read-only and read-write transactions observe
//! mutually consistent snapshots over an LMDB record store.
//!
//! ## Quick start
//!
//! ```no_run
//! use nogdb::{ClassType, Context, RecordId, Settings, TxnMode};
//!
//! let ctx = Context::open("people.nog", Settings::default())?;
//!
//! let mut txn = ctx.begin(TxnMode::ReadWrite)?;
//! let person = txn.create_class("Person", ClassType::Vertex)?.id;
//! let knows = txn.create_class("Knows", ClassType::Edge)?.id;
//! let alice = RecordId::new(person, txn.next_position_id(person)?);
//! let bob = RecordId::new(person, txn.next_position_id(person)?);
//! txn.create_vertex(alice)?;
//! txn.create_vertex(bob)?;
//! txn.create_edge(RecordId::new(knows, 1), alice, bob)?;
//! txn.commit()?;
//!
//! let reader = ctx.begin(TxnMode::ReadOnly)?;
//! assert_eq!(reader.out_edges(alice, None)?.len(), 1);
//! # Ok::<(), nogdb::NogError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`version`]: versioned value cells and the multi-version maps built
//!   from them;
//! - [`graph`] / [`schema`]: the in-memory topology and descriptor
//!   engines, both gated by the same snapshot-visibility rules;
//! - [`txn`]: lifecycle words, global counters, and the base transaction
//!   that promotes staged state at commit;
//! - [`storage`]: the LMDB wrapper and on-disk naming layout;
//! - [`context`]: the process-wide owner tying everything together.
//!
//! Query compilation, traversal, and record payload encoding live in
//! higher layers; this crate only promises them consistent snapshots and
//! durable record bytes.

pub mod context;
pub mod error;
pub mod graph;
pub mod logging;
pub mod model;
pub mod primitives;
pub mod schema;
pub mod storage;
pub mod txn;
pub mod version;

pub use crate::context::{Context, Settings};
pub use crate::error::{GraphError, NogError, Result, SchemaError, TxnError};
pub use crate::model::{
    ClassId, ClassType, DbInfo, IndexId, PositionId, PropertyId, PropertyType, RecordId, TxnId,
    VersionId, MAX_VERSION_ID,
};
pub use crate::schema::{ClassProperties, PropertyDescriptor};
pub use crate::txn::{Txn, TxnMode};
