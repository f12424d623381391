//! Catalog entities returned by the service.
//!
//! Field names are the wire names: they match the catalog column aliases so
//! rows decode straight into these structs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One non-template database on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DatabaseSummary {
    pub datname: String,
}

/// Response body of the database listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DatabaseList {
    pub databases: Vec<DatabaseSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TableInfo {
    pub table_name: String,
}

/// A routine whose `routine_type` is `PROCEDURE`. Functions are not listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProcedureInfo {
    pub routine_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IndexInfo {
    pub indexname: String,
}

/// One (constraint, column) pair.
///
/// A constraint spanning several columns appears once per column, all rows
/// sharing `constraint_name`, `constraint_type` and `table_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ConstraintInfo {
    pub constraint_name: String,
    /// Single-letter `pg_constraint.contype` (`p`, `f`, `u`, `c`, `x`, `t`).
    pub constraint_type: String,
    pub table_name: String,
    pub column_name: String,
}

/// Objects found in one schema. Empty collections are kept, not omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SchemaMetadata {
    pub schema_name: String,
    pub tables: Vec<TableInfo>,
    #[serde(rename = "storedProcedures")]
    pub stored_procedures: Vec<ProcedureInfo>,
    pub indexes: Vec<IndexInfo>,
    pub constraints: Vec<ConstraintInfo>,
}

/// Response body of the metadata extraction endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DatabaseMetadata {
    pub datname: String,
    /// Total on-disk size in bytes.
    pub size: i64,
    /// Schemas in discovery order.
    pub schemas: Vec<SchemaMetadata>,
}
