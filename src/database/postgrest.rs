//! Record store speaking the platform's PostgREST-style table API.
//!
//! Same contract as the relational store; the transport is HTTP. Filters map
//! to `column=eq.value` query parameters, pagination to `offset`/`limit`,
//! and mutations ask for `return=representation` so the server-assigned
//! columns come back in the response.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Settings;
use crate::database::{clamp_page, FilterSet, Record, RecordStore};
use crate::error::StorageError;

pub struct RestRecordStore {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestRecordStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.supabase_url.trim_end_matches('/').to_string(),
            api_key: settings.supabase_key.clone(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, table_url(&self.base_url, table))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn rows(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Vec<Record>, StorageError> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::new(context, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::new(context, format!("{} {}", status, body)));
        }

        // 204 carries no body; treat it as zero rows.
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| StorageError::new(context, e))
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url, table)
}

/// Render a filter value the way PostgREST expects it on the right side of
/// `eq.`: strings verbatim, everything else in its JSON form.
fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn list_query(skip: i64, limit: i64, filters: &FilterSet) -> Vec<(String, String)> {
    let (skip, limit) = clamp_page(skip, limit);
    let mut query = vec![("select".to_string(), "*".to_string())];
    for (column, value) in filters {
        query.push((column.clone(), format!("eq.{}", filter_value(value))));
    }
    query.push(("offset".to_string(), skip.to_string()));
    query.push(("limit".to_string(), limit.to_string()));
    query
}

fn id_query(id: Uuid) -> Vec<(String, String)> {
    vec![("id".to_string(), format!("eq.{}", id))]
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Record>, StorageError> {
        let context = format!("Failed to get {}", table);
        let request = self.request(Method::GET, table).query(&id_query(id));
        let rows = self.rows(request, &context).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(
        &self,
        table: &str,
        skip: i64,
        limit: i64,
        filters: &FilterSet,
    ) -> Result<Vec<Record>, StorageError> {
        let context = format!("Failed to list {}", table);
        let request = self
            .request(Method::GET, table)
            .query(&list_query(skip, limit, filters));
        self.rows(request, &context).await
    }

    async fn create(&self, table: &str, payload: Record) -> Result<Record, StorageError> {
        let context = format!("Failed to create {}", table);
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&Value::Object(payload));
        let rows = self.rows(request, &context).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::new(&context, "empty representation in response"))
    }

    async fn update(
        &self,
        table: &str,
        id: Uuid,
        payload: Record,
    ) -> Result<Option<Record>, StorageError> {
        // PostgREST cannot build an UPDATE with zero SET columns; an empty
        // patch degenerates to a read, same as the relational backend.
        if payload.is_empty() {
            return self.get(table, id).await;
        }

        let context = format!("Failed to update {}", table);
        let request = self
            .request(Method::PATCH, table)
            .query(&id_query(id))
            .header("Prefer", "return=representation")
            .json(&Value::Object(payload));
        let rows = self.rows(request, &context).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, table: &str, id: Uuid) -> Result<bool, StorageError> {
        let context = format!("Failed to delete from {}", table);
        let request = self
            .request(Method::DELETE, table)
            .query(&id_query(id))
            .header("Prefer", "return=representation");
        let rows = self.rows(request, &context).await?;
        Ok(!rows.is_empty())
    }
}
