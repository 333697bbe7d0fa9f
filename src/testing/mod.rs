//! Test utilities: an in-memory record store and token fixtures.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::{clamp_page, FilterSet, Record, RecordStore};
use crate::error::StorageError;

/// In-memory [`RecordStore`] with the same observable contract as the real
/// backends: generated ids, AND-ed equality filters, partial updates,
/// idempotent deletes.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Vec<(String, Uuid, Record)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the create path.
    pub fn seed(&self, table: &str, id: Uuid, mut record: Record) {
        record.insert("id".to_string(), json!(id.to_string()));
        self.tables
            .lock()
            .unwrap()
            .push((table.to_string(), id, record));
    }

    fn matches(record: &Record, filters: &FilterSet) -> bool {
        filters
            .iter()
            .all(|(k, v)| record.get(k) == Some(v))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Record>, StorageError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .iter()
            .find(|(t, rid, _)| t == table && *rid == id)
            .map(|(_, _, r)| r.clone()))
    }

    async fn list(
        &self,
        table: &str,
        skip: i64,
        limit: i64,
        filters: &FilterSet,
    ) -> Result<Vec<Record>, StorageError> {
        let (skip, limit) = clamp_page(skip, limit);
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .iter()
            .filter(|(t, _, r)| t == table && Self::matches(r, filters))
            .map(|(_, _, r)| r.clone())
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn create(&self, table: &str, mut payload: Record) -> Result<Record, StorageError> {
        let id = match payload.get("id").and_then(Value::as_str) {
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|e| StorageError::new("Failed to create record", e))?,
            None => Uuid::new_v4(),
        };
        payload.insert("id".to_string(), json!(id.to_string()));
        // Server-assigned defaults, like the real backends return them.
        let now = json!(Utc::now().to_rfc3339());
        payload.entry("created_at".to_string()).or_insert(now.clone());
        payload.entry("updated_at".to_string()).or_insert(now);
        self.tables
            .lock()
            .unwrap()
            .push((table.to_string(), id, payload.clone()));
        Ok(payload)
    }

    async fn update(
        &self,
        table: &str,
        id: Uuid,
        payload: Record,
    ) -> Result<Option<Record>, StorageError> {
        let mut tables = self.tables.lock().unwrap();
        for (t, rid, record) in tables.iter_mut() {
            if t == table && *rid == id {
                for (k, v) in payload {
                    record.insert(k, v);
                }
                record.insert("id".to_string(), json!(id.to_string()));
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    async fn delete(&self, table: &str, id: Uuid) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.len();
        tables.retain(|(t, rid, _)| !(t == table && *rid == id));
        Ok(tables.len() < before)
    }
}

/// Mint an HS256 access token for middleware and handler tests.
pub fn mint_token(sub: &str, secret: &str) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{}@example.com", sub),
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
