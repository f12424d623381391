//! Request and response models.

pub mod connection;
pub mod metadata;

// Re-export commonly used types
pub use connection::{ConnectionParams, DEFAULT_PG_PORT};
pub use metadata::{
    ConstraintInfo, DatabaseList, DatabaseMetadata, DatabaseSummary, IndexInfo, ProcedureInfo,
    SchemaMetadata, TableInfo,
};
