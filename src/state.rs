use std::sync::Arc;

use crate::auth::{ProfileRoleResolver, RoleResolver};
use crate::config::Settings;
use crate::database::RecordStore;
use crate::repositories::{BookRepository, FeedbackRepository, HighlightRepository};
use crate::storage::ObjectStorage;

/// Shared application state, constructed once at startup and cloned into
/// every handler. Everything inside is read-only after construction; the
/// store and storage handles are safe for concurrent use without
/// per-request locking.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn RecordStore>,
    pub resolver: Arc<dyn RoleResolver>,
    pub storage: Arc<ObjectStorage>,
    pub books: BookRepository,
    pub highlights: HighlightRepository,
    pub feedback: FeedbackRepository,
    /// Route prefixes exempt from authentication.
    pub public_paths: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn RecordStore>,
        storage: ObjectStorage,
        public_paths: Vec<String>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            resolver: Arc::new(ProfileRoleResolver::new(store.clone())),
            books: BookRepository::new(store.clone()),
            highlights: HighlightRepository::new(store.clone()),
            feedback: FeedbackRepository::new(store.clone()),
            store,
            storage: Arc::new(storage),
            public_paths: Arc::new(public_paths),
        }
    }
}
