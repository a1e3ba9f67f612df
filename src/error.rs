use thiserror::Error;

// Failures reported by the catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    // A uniqueness constraint rejected the write: the row already exists.
    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
