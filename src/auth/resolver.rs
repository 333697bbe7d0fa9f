use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::database::RecordStore;
use crate::error::ApiError;

/// Resolves the authoritative role for a verified subject.
///
/// The role claim inside a token is only a hint; authorization decisions use
/// the role stored in the profile record, re-read on every authenticated
/// request (no caching, no staleness window).
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve_role(&self, subject_id: &str) -> Result<String, ApiError>;
}

/// Role lookup against the `profiles` table of the record store.
pub struct ProfileRoleResolver {
    store: Arc<dyn RecordStore>,
}

impl ProfileRoleResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RoleResolver for ProfileRoleResolver {
    async fn resolve_role(&self, subject_id: &str) -> Result<String, ApiError> {
        let id = Uuid::parse_str(subject_id)
            .map_err(|_| ApiError::authentication("Invalid subject id"))?;

        let profile = self
            .store
            .get("profiles", id)
            .await?
            .ok_or_else(|| ApiError::authentication("No profile for user"))?;

        profile
            .get("role")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::authentication("Profile has no role"))
    }
}
