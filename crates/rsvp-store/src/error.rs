use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("codec error: {0}")]
    Codec(String),
}

impl StoreError {
    pub(crate) fn database(err: impl core::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    pub(crate) fn codec(err: impl core::fmt::Display) -> Self {
        Self::Codec(err.to_string())
    }
}
