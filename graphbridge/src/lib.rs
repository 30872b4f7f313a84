// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphBridge - a row-to-graph pipeline transform
//!
//! GraphBridge sits between a row-oriented pipeline engine and a
//! transactional graph database: each incoming row becomes a parameterized
//! graph statement, statements execute transactionally with batching and
//! failure recovery, and returned graph data is materialized back into the
//! row stream.
//!
//! # Features
//!
//! - **Parameter Mapping**: typed row fields bound as named statement
//!   parameters
//! - **Two Write Strategies**: per-row statements batched into shared
//!   transactions, or bulk list-based writes via the unwind pattern
//! - **Failure Recovery**: one reconnect-and-retry on transient
//!   connectivity loss, fatal classification for everything else
//! - **Result Materialization**: flattened typed columns per record, or an
//!   entire result as one opaque graph value
//! - **Driver Agnostic**: the graph store sits behind a small trait seam;
//!   any driver adapter plugs in
//!
//! # Usage
//!
//! ```no_run
//! use graphbridge::{GraphQuerySettings, GraphQueryTransform};
//!
//! # fn run(registry: &dyn graphbridge::ConnectionRegistry,
//! #        source: &mut dyn graphbridge::RowSource,
//! #        sink: &mut dyn graphbridge::RowSink,
//! #        schema: graphbridge::RowSchema) -> graphbridge::Result<()> {
//! let settings: GraphQuerySettings = serde_json::from_str(
//!     r#"{
//!         "connection": "graph",
//!         "statement": "CREATE (n:Item {id: $id})",
//!         "batch_size": 100,
//!         "parameter_mappings": [
//!             {"parameter": "id", "field": "id", "property_type": "Integer"}
//!         ]
//!     }"#,
//! )?;
//!
//! let mut transform = GraphQueryTransform::new(settings, "load_items", "write_graph");
//! transform.init(registry, Some(&schema))?;
//! transform.run(source, sink)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod mapper;
pub mod materialize;
pub mod row;
pub mod runner;
pub mod transform;
pub mod value;

// Re-export the types a host pipeline touches
pub use client::{
    ClientError, ConnectionRegistry, GraphClient, GraphSession, GraphTransaction, Notification,
    Record, ResultSummary, StatementResult, TransactionWork,
};
pub use codec::PropertyType;
pub use config::{GraphQuerySettings, ParameterMapping, ReturnValueSpec};
pub use error::{BridgeError, Result};
pub use row::{FieldMeta, Row, RowSchema, RowSink, RowSource, TabularType, TabularValue};
pub use runner::LineCounters;
pub use transform::GraphQueryTransform;
pub use value::{GraphData, GraphNode, GraphPath, GraphRelationship, GraphValue, ParameterMap};

/// GraphBridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GraphBridge crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
