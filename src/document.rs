use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Declared persistence shape for scanned documents. Nothing in the scan
/// pipeline reads or writes this table; it is an optional capability for
/// callers that want to catalogue produced PDFs.
pub const DOCUMENTS_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    description TEXT,
    file_path VARCHAR(255) NOT NULL,
    created_at INTEGER NOT NULL
)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub created_at: i64,
}

impl Document {
    pub fn new(id: i64, title: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            file_path: file_path.into(),
            created_at: time::OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("document title is empty"));
        }
        if self.file_path.trim().is_empty() {
            return Err(anyhow!("document file path is empty"));
        }
        Ok(())
    }
}
