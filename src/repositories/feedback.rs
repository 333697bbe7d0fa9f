use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::database::{FilterSet, RecordStore, Repository};
use crate::error::StorageError;
use crate::models::{Feedback, FeedbackCreate};

#[derive(Clone)]
pub struct FeedbackRepository {
    repo: Repository<Feedback>,
}

impl FeedbackRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { repo: Repository::new("feedback", store) }
    }

    /// Feedback is accepted from anonymous callers too; the owner is only
    /// recorded when the submitter was authenticated.
    pub async fn create(
        &self,
        user_id: Option<Uuid>,
        feedback: &FeedbackCreate,
    ) -> Result<Feedback, StorageError> {
        let mut record = crate::database::repository::to_record("feedback", feedback)?;
        if let Some(user_id) = user_id {
            record.insert("user_id".to_string(), json!(user_id.to_string()));
        }
        self.repo.create(&record).await
    }

    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Feedback>, StorageError> {
        self.repo.list(skip, limit, &FilterSet::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedbackType;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn create_and_list() {
        let repo = FeedbackRepository::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();

        repo.create(
            Some(user),
            &FeedbackCreate {
                feedback_type: FeedbackType::Bug,
                description: "page turn is slow".to_string(),
                allow_follow_up: true,
            },
        )
        .await
        .unwrap();

        repo.create(
            None,
            &FeedbackCreate {
                feedback_type: FeedbackType::Other,
                description: "love it".to_string(),
                allow_follow_up: false,
            },
        )
        .await
        .unwrap();

        let all = repo.list(0, 100).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, Some(user));
        assert!(all[1].user_id.is_none());
    }
}
