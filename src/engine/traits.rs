//! Collaborator trait definitions
//!
//! The engine consumes two external collaborators: a schema catalog that
//! describes tables, and an execution layer that runs the generated SQL.
//! Both are async seams so backends can block on I/O; everything else in
//! the engine is a pure function over its inputs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::{ColumnMeta, ForeignKeyEdge, QueryResult, TableRef, Value};

/// Read-only source of table metadata
///
/// The engine never caches catalog answers; it queries per request so a
/// grid over a just-altered table sees the current shape.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Column metadata for one table, ordered by ordinal position.
    ///
    /// An unknown table yields an empty Vec, not an error: planning
    /// proceeds and execution fails downstream with a relation-not-found
    /// class error.
    async fn columns(&self, table: &TableRef) -> EngineResult<Vec<ColumnMeta>>;

    /// Foreign-key edges declared on `table`.
    async fn foreign_keys(&self, table: &TableRef) -> EngineResult<Vec<ForeignKeyEdge>>;

    /// Column metadata for several tables in a single round trip.
    ///
    /// Used by foreign-key display resolution: a table with a dozen
    /// foreign keys must not issue a dozen metadata queries.
    async fn columns_batch(
        &self,
        tables: &[TableRef],
    ) -> EngineResult<HashMap<TableRef, Vec<ColumnMeta>>>;
}

/// Executes generated SQL against the active connection
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a parameterized statement and returns the full result set.
    ///
    /// Timeouts are enforced here, not in the engine; they surface as
    /// `EngineError::Timeout`. A missing/closed connection surfaces as
    /// `EngineError::NotConnected`.
    async fn run(&self, sql: &str, params: &[Value]) -> EngineResult<QueryResult>;
}
