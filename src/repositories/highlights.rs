use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::database::{FilterSet, Record, RecordStore, Repository};
use crate::error::StorageError;
use crate::models::{Highlight, HighlightCreate, HighlightPatch};

const DELETE_BATCH: i64 = 100;

#[derive(Clone)]
pub struct HighlightRepository {
    repo: Repository<Highlight>,
}

impl HighlightRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { repo: Repository::new("highlights", store) }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Highlight>, StorageError> {
        self.repo.get(id).await
    }

    /// All highlights of one book, newest first.
    pub async fn list_for_book(&self, book_id: Uuid) -> Result<Vec<Highlight>, StorageError> {
        let mut filters = FilterSet::new();
        filters.insert("book_id".to_string(), json!(book_id.to_string()));
        let mut highlights = self.repo.list(0, i64::MAX, &filters).await?;
        highlights.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(highlights)
    }

    pub async fn create(
        &self,
        user_id: Option<Uuid>,
        highlight: &HighlightCreate,
    ) -> Result<Highlight, StorageError> {
        let mut record = crate::database::repository::to_record("highlights", highlight)?;
        if let Some(user_id) = user_id {
            record.insert("user_id".to_string(), json!(user_id.to_string()));
        }
        self.repo.create(&record).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: &HighlightPatch,
    ) -> Result<Option<Highlight>, StorageError> {
        self.repo.update(id, patch).await
    }

    pub async fn update_note(
        &self,
        id: Uuid,
        note: &str,
    ) -> Result<Option<Highlight>, StorageError> {
        let mut changes = Record::new();
        changes.insert("note".to_string(), json!(note));
        self.repo.update(id, &changes).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        self.repo.delete(id).await
    }

    /// Remove every highlight whose text matches exactly. Returns true iff
    /// at least one record was removed.
    pub async fn delete_by_text(&self, text: &str) -> Result<bool, StorageError> {
        let mut filters = FilterSet::new();
        filters.insert("text".to_string(), json!(text));

        let mut removed_any = false;
        loop {
            let batch = self.repo.list(0, DELETE_BATCH, &filters).await?;
            if batch.is_empty() {
                return Ok(removed_any);
            }
            for highlight in batch {
                removed_any |= self.repo.delete(highlight.id).await?;
            }
        }
    }
}
