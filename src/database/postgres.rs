//! Relational record store backed by a pooled sqlx Postgres connection.
//!
//! Rows travel as jsonb on the way out (`to_jsonb`) and on the way in
//! (`jsonb_populate_record`), which keeps the store generic over logical
//! tables: uuid, enum and timestamp columns are converted by Postgres itself
//! rather than by per-table Rust code.

use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use async_trait::async_trait;

use crate::config::Settings;
use crate::database::{clamp_page, FilterSet, Record, RecordStore};
use crate::error::StorageError;

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the connection pool from settings. Pool max is the configured
    /// base size plus overflow headroom; one connection is acquired per
    /// operation and returned to the pool when the operation finishes.
    pub async fn connect(settings: &Settings) -> Result<Self, StorageError> {
        let url = settings
            .database_url
            .as_deref()
            .ok_or_else(|| StorageError::new("Database pool", "no connection string configured"))?;

        let pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections())
            .connect(url)
            .await
            .map_err(|e| StorageError::new("Failed to connect to database", e))?;

        Ok(Self::new(pool))
    }
}

/// Reject anything that is not a plain lowercase/underscore name. Logical
/// table and column names come from code, not from clients, but the check
/// keeps a typo from turning into injection.
fn check_identifier(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(StorageError::new("Invalid identifier", name));
    }
    Ok(())
}

fn quote_identifier(name: &str) -> Result<String, StorageError> {
    check_identifier(name)?;
    Ok(format!("\"{}\"", name))
}

fn build_get_sql(table: &str) -> Result<String, StorageError> {
    let table = quote_identifier(table)?;
    Ok(format!(
        "SELECT to_jsonb(t) AS row FROM {} t WHERE t.id = $1",
        table
    ))
}

/// One exact-equality predicate per filter entry. `->` yields the column as
/// jsonb, so uuid, enum and timestamp columns compare in their serialized
/// shape, and structured values (objects, arrays) only match whole-for-whole
/// rather than by containment.
fn build_list_sql(table: &str, filters: &FilterSet) -> Result<String, StorageError> {
    let table = quote_identifier(table)?;
    let mut sql = format!("SELECT to_jsonb(t) AS row FROM {} t", table);
    for (i, column) in filters.keys().enumerate() {
        check_identifier(column)?;
        let keyword = if i == 0 { "WHERE" } else { "AND" };
        sql.push_str(&format!(" {} to_jsonb(t)->'{}' = ${}", keyword, column, i + 1));
    }
    sql.push_str(&format!(
        " OFFSET ${} LIMIT ${}",
        filters.len() + 1,
        filters.len() + 2
    ));
    Ok(sql)
}

fn build_insert_sql(table: &str, payload: &Record) -> Result<String, StorageError> {
    let quoted_table = quote_identifier(table)?;
    if payload.is_empty() {
        return Ok(format!(
            "INSERT INTO {t} DEFAULT VALUES RETURNING to_jsonb({t}) AS row",
            t = quoted_table
        ));
    }
    let columns = column_list(payload)?;
    // Only columns present in the payload are named, so server defaults
    // (generated id, timestamps) still apply and come back in RETURNING.
    Ok(format!(
        "INSERT INTO {t} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{t}, $1) \
         RETURNING to_jsonb({t}) AS row",
        t = quoted_table,
        cols = columns
    ))
}

fn build_update_sql(table: &str, payload: &Record) -> Result<String, StorageError> {
    let quoted_table = quote_identifier(table)?;
    let columns = column_list(payload)?;
    Ok(format!(
        "UPDATE {t} SET ({cols}) = (SELECT {cols} FROM jsonb_populate_record(NULL::{t}, $1)) \
         WHERE id = $2 RETURNING to_jsonb({t}) AS row",
        t = quoted_table,
        cols = columns
    ))
}

fn build_delete_sql(table: &str) -> Result<String, StorageError> {
    let table = quote_identifier(table)?;
    Ok(format!("DELETE FROM {} WHERE id = $1", table))
}

fn column_list(payload: &Record) -> Result<String, StorageError> {
    let cols: Result<Vec<String>, StorageError> =
        payload.keys().map(|k| quote_identifier(k)).collect();
    Ok(cols?.join(", "))
}

fn row_value(row: &sqlx::postgres::PgRow) -> Result<Record, StorageError> {
    let value: Value = row
        .try_get("row")
        .map_err(|e| StorageError::new("Failed to decode row", e))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::new(
            "Failed to decode row",
            format!("expected object, got {}", other),
        )),
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Record>, StorageError> {
        let sql = build_get_sql(table)?;
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::new(&format!("Failed to get {}", table), e))?;
        row.as_ref().map(row_value).transpose()
    }

    async fn list(
        &self,
        table: &str,
        skip: i64,
        limit: i64,
        filters: &FilterSet,
    ) -> Result<Vec<Record>, StorageError> {
        let (skip, limit) = clamp_page(skip, limit);
        let sql = build_list_sql(table, filters)?;
        let mut query = sqlx::query(&sql);
        for value in filters.values() {
            query = query.bind(value.clone());
        }
        let rows = query
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::new(&format!("Failed to list {}", table), e))?;
        rows.iter().map(row_value).collect()
    }

    async fn create(&self, table: &str, payload: Record) -> Result<Record, StorageError> {
        let sql = build_insert_sql(table, &payload)?;
        let context = format!("Failed to create {}", table);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::new(&context, e))?;

        let mut query = sqlx::query(&sql);
        if !payload.is_empty() {
            query = query.bind(Value::Object(payload));
        }

        let row = match query.fetch_one(&mut *tx).await {
            Ok(row) => row,
            Err(e) => {
                // Never leave the session half-committed.
                let _ = tx.rollback().await;
                return Err(StorageError::new(&context, e));
            }
        };

        tx.commit()
            .await
            .map_err(|e| StorageError::new(&context, e))?;
        row_value(&row)
    }

    async fn update(
        &self,
        table: &str,
        id: Uuid,
        payload: Record,
    ) -> Result<Option<Record>, StorageError> {
        if payload.is_empty() {
            return self.get(table, id).await;
        }

        let sql = build_update_sql(table, &payload)?;
        let context = format!("Failed to update {}", table);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::new(&context, e))?;

        let row = match sqlx::query(&sql)
            .bind(Value::Object(payload))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(StorageError::new(&context, e));
            }
        };

        tx.commit()
            .await
            .map_err(|e| StorageError::new(&context, e))?;
        row.as_ref().map(row_value).transpose()
    }

    async fn delete(&self, table: &str, id: Uuid) -> Result<bool, StorageError> {
        let sql = build_delete_sql(table)?;
        let context = format!("Failed to delete from {}", table);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::new(&context, e))?;

        let result = match sqlx::query(&sql).bind(id).execute(&mut *tx).await {
            Ok(result) => result,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(StorageError::new(&context, e));
            }
        };

        tx.commit()
            .await
            .map_err(|e| StorageError::new(&context, e))?;
        Ok(result.rows_affected() > 0)
    }
}
