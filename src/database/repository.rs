use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{FilterSet, Record, RecordStore};
use crate::error::StorageError;

/// Typed handle binding a logical table to one record-store backend.
///
/// Stateless beyond the binding, so one handle is shared across all
/// requests. The backend is chosen when the handle is constructed, never by
/// inspecting types at runtime.
pub struct Repository<T> {
    table: &'static str,
    store: Arc<dyn RecordStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { table: self.table, store: self.store.clone(), _marker: PhantomData }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(table: &'static str, store: Arc<dyn RecordStore>) -> Self {
        Self { table, store, _marker: PhantomData }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>, StorageError> {
        let record = self.store.get(self.table, id).await?;
        record.map(|r| decode(self.table, r)).transpose()
    }

    pub async fn list(
        &self,
        skip: i64,
        limit: i64,
        filters: &FilterSet,
    ) -> Result<Vec<T>, StorageError> {
        let records = self.store.list(self.table, skip, limit, filters).await?;
        records.into_iter().map(|r| decode(self.table, r)).collect()
    }

    pub async fn create(&self, payload: &(impl Serialize + Sync)) -> Result<T, StorageError> {
        let record = self.store.create(self.table, to_record(self.table, payload)?).await?;
        decode(self.table, record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        payload: &(impl Serialize + Sync),
    ) -> Result<Option<T>, StorageError> {
        let record = self
            .store
            .update(self.table, id, to_record(self.table, payload)?)
            .await?;
        record.map(|r| decode(self.table, r)).transpose()
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        self.store.delete(self.table, id).await
    }
}

/// Serialize a payload into a record, dropping null fields so that absent
/// `Option`s in patch structs leave the stored columns untouched.
pub fn to_record(table: &str, payload: &impl Serialize) -> Result<Record, StorageError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| StorageError::new(&format!("Failed to encode {} payload", table), e))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(StorageError::new(
            &format!("Failed to encode {} payload", table),
            format!("expected object, got {}", other),
        )),
    }
}

fn decode<T: DeserializeOwned>(table: &str, record: Record) -> Result<T, StorageError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| StorageError::new(&format!("Malformed {} record", table), e))
}
