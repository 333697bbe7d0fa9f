use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::database::{FilterSet, Record, RecordStore, Repository};
use crate::error::StorageError;
use crate::models::{Book, BookCreate, BookFormat, BookPatch, BookProgress};

/// Book persistence: generic CRUD plus the owner-scoped and progress queries
/// the route layer needs. Everything here is built from the store's
/// get/list/mutate primitives.
#[derive(Clone)]
pub struct BookRepository {
    repo: Repository<Book>,
}

impl BookRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { repo: Repository::new("books", store) }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Book>, StorageError> {
        self.repo.get(id).await
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Book>, StorageError> {
        let mut filters = FilterSet::new();
        filters.insert("user_id".to_string(), json!(user_id.to_string()));
        self.repo.list(skip, limit, &filters).await
    }

    pub async fn get_by_title(&self, title: &str) -> Result<Option<Book>, StorageError> {
        let mut filters = FilterSet::new();
        filters.insert("title".to_string(), json!(title));
        let mut books = self.repo.list(0, 1, &filters).await?;
        Ok(books.pop())
    }

    pub async fn create(&self, book: &BookCreate) -> Result<Book, StorageError> {
        self.repo.create(book).await
    }

    pub async fn update(&self, id: Uuid, patch: &BookPatch) -> Result<Option<Book>, StorageError> {
        self.repo.update(id, patch).await
    }

    /// Write the half of the progress payload that matches the book's
    /// format: the epub position blob for epub books, the current page for
    /// everything else.
    pub async fn update_progress(
        &self,
        id: Uuid,
        progress: &BookProgress,
    ) -> Result<Option<Book>, StorageError> {
        let book = match self.repo.get(id).await? {
            Some(book) => book,
            None => return Ok(None),
        };

        let mut changes = Record::new();
        match book.format {
            BookFormat::Epub => {
                changes.insert(
                    "epub_progress".to_string(),
                    progress.epub_progress.clone().unwrap_or(json!({})),
                );
            }
            BookFormat::Pdf => {
                changes.insert(
                    "pdf_current_page".to_string(),
                    json!(progress.pdf_current_page.unwrap_or(0)),
                );
            }
        }

        self.repo.update(id, &changes).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        self.repo.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn repo() -> BookRepository {
        BookRepository::new(Arc::new(MemoryStore::new()))
    }

    fn create_payload(user_id: Uuid, title: &str, format: BookFormat) -> BookCreate {
        BookCreate {
            user_id,
            title: title.to_string(),
            author: None,
            description: None,
            file_url: None,
            format,
        }
    }

    #[tokio::test]
    async fn list_for_user_only_returns_owned_books() {
        let repo = repo();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        repo.create(&create_payload(alice, "Dune", BookFormat::Epub)).await.unwrap();
        repo.create(&create_payload(alice, "Solaris", BookFormat::Pdf)).await.unwrap();
        repo.create(&create_payload(bob, "Blindsight", BookFormat::Epub)).await.unwrap();

        let books = repo.list_for_user(alice, 0, 100).await.unwrap();
        assert_eq!(books.len(), 2);
        assert!(books.iter().all(|b| b.user_id == alice));
    }

    #[tokio::test]
    async fn progress_update_depends_on_format() {
        let repo = repo();
        let user = Uuid::new_v4();
        let epub = repo.create(&create_payload(user, "Dune", BookFormat::Epub)).await.unwrap();
        let pdf = repo.create(&create_payload(user, "Solaris", BookFormat::Pdf)).await.unwrap();

        let progress = BookProgress {
            epub_progress: Some(json!({"cfi": "epubcfi(/6/4)"})),
            pdf_current_page: Some(42),
        };

        let epub = repo.update_progress(epub.id, &progress).await.unwrap().unwrap();
        assert_eq!(epub.epub_progress, Some(json!({"cfi": "epubcfi(/6/4)"})));
        assert!(epub.pdf_current_page.is_none());

        let pdf = repo.update_progress(pdf.id, &progress).await.unwrap().unwrap();
        assert_eq!(pdf.pdf_current_page, Some(42));
        assert!(pdf.epub_progress.is_none());
    }

    #[tokio::test]
    async fn progress_update_of_unknown_book_is_none() {
        let repo = repo();
        let result = repo
            .update_progress(Uuid::new_v4(), &BookProgress::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn get_by_title_finds_exact_match() {
        let repo = repo();
        let user = Uuid::new_v4();
        repo.create(&create_payload(user, "Dune", BookFormat::Epub)).await.unwrap();

        assert!(repo.get_by_title("Dune").await.unwrap().is_some());
        assert!(repo.get_by_title("dune").await.unwrap().is_none());
    }
}
