pub mod books;
pub mod feedback;
pub mod highlights;
pub mod system;
pub mod upload;

use serde::Deserialize;

fn default_limit() -> i64 {
    100
}

/// Offset pagination shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
