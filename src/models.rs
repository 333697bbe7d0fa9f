//! Typed entities for the logical tables. The generic store moves untyped
//! records; these are the shapes the route layer speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Epub,
    Pdf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    pub format: BookFormat,
    /// Reading position for epub books; structure is owned by the client.
    #[serde(default)]
    pub epub_progress: Option<Value>,
    #[serde(default)]
    pub pdf_current_page: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCreate {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    pub format: BookFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub format: Option<BookFormat>,
}

/// Progress payload; which half applies depends on the book's format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookProgress {
    #[serde(default)]
    pub epub_progress: Option<Value>,
    #[serde(default)]
    pub pdf_current_page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub id: Uuid,
    pub book_id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub text: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub color: Option<HighlightColor>,
    #[serde(default)]
    pub page_number: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightCreate {
    pub book_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub color: Option<HighlightColor>,
    #[serde(default)]
    pub page_number: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighlightPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub color: Option<HighlightColor>,
    #[serde(default)]
    pub page_number: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Bug,
    Suggestion,
    Confusing,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub feedback_type: FeedbackType,
    pub description: String,
    #[serde(default)]
    pub allow_follow_up: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackCreate {
    pub feedback_type: FeedbackType,
    pub description: String,
    #[serde(default)]
    pub allow_follow_up: bool,
}
