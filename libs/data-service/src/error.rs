use table_api::{Segment, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Ошибка store, без переинтерпретации.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("config: {0}")]
    Config(String),

    #[error("record codec for table '{table}': {detail}")]
    Codec { table: String, detail: String },

    #[error("scan segment {segment} did not finish: {detail}")]
    Segment { segment: Segment, detail: String },
}

impl ServiceError {
    /// Исходная ошибка store, если она есть.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ServiceError::Store(e) => Some(e),
            _ => None,
        }
    }
}
