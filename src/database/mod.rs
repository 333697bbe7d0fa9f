use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::StorageError;

pub mod postgres;
pub mod postgrest;
pub mod repository;

pub use postgres::PgRecordStore;
pub use postgrest::RestRecordStore;
pub use repository::Repository;

/// One row of a logical table, as field name -> value.
pub type Record = Map<String, Value>;

/// Equality conditions narrowing a read; all entries are AND-ed and ordering
/// is irrelevant.
pub type FilterSet = BTreeMap<String, Value>;

/// Pagination values below zero would be rejected by the relational backend
/// and silently rewritten by the table API; clamp them before either sees
/// them so all backends agree.
pub(crate) fn clamp_page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.max(0))
}

/// Storage-agnostic CRUD contract over logical tables.
///
/// Two interchangeable implementations exist: [`PgRecordStore`] (direct
/// relational session) and [`RestRecordStore`] (the platform's table API).
/// A deployment selects one at startup; callers never inspect which. Every
/// returned record satisfies the whole filter set supplied to the call that
/// produced it. Absence is `None`/`false`, never an error; transport failures
/// always surface as [`StorageError`]. Negative `skip`/`limit` values are
/// treated as zero by every backend.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Record>, StorageError>;

    async fn list(
        &self,
        table: &str,
        skip: i64,
        limit: i64,
        filters: &FilterSet,
    ) -> Result<Vec<Record>, StorageError>;

    async fn create(&self, table: &str, payload: Record) -> Result<Record, StorageError>;

    async fn update(
        &self,
        table: &str,
        id: Uuid,
        payload: Record,
    ) -> Result<Option<Record>, StorageError>;

    async fn delete(&self, table: &str, id: Uuid) -> Result<bool, StorageError>;
}
