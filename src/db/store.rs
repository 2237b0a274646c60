use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::models::{LinkDef, Record};

/// Errors raised by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid stored value for field '{field}': {source}")]
    Value {
        field: String,
        source: serde_json::Error,
    },
}

/// Persistence operations the synchronizer needs from the CRM database.
///
/// Default queries leave out soft-deleted rows; `retrieve` can include them
/// so a caller can undelete.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches a record by exact id within a module.
    async fn retrieve(
        &self,
        module: &str,
        id: &str,
        include_deleted: bool,
    ) -> Result<Option<Record>, StoreError>;

    /// Creates or updates the row and replaces its fields. Clears
    /// `new_with_id` on success.
    async fn save(&self, record: &mut Record) -> Result<(), StoreError>;

    /// Sets the soft-delete flag. The row and its fields are kept.
    async fn mark_deleted(&self, module: &str, id: &str) -> Result<(), StoreError>;

    /// Current non-deleted members of `link` on `parent`, keyed by child id.
    async fn linked(
        &self,
        parent: &Record,
        link: &LinkDef,
    ) -> Result<BTreeMap<String, Record>, StoreError>;

    /// Ids of non-deleted records in `module` whose id is not in `ids`.
    async fn ids_not_in(&self, module: &str, ids: &[String]) -> Result<Vec<String>, StoreError>;

    /// All non-deleted records of a module, ordered by id.
    async fn list(&self, module: &str) -> Result<Vec<Record>, StoreError>;
}
