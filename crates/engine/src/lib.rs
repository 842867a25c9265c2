pub mod config;
pub mod models;
pub mod playbook;
pub mod providers;
pub mod reliability;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transient external error: {0}")]
    Transient(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    /// Whether the retry layer is allowed to attempt the operation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(Error::Transient("connection reset".into()).is_transient());
        assert!(!Error::Validation("bad input".into()).is_transient());
        assert!(!Error::NotFound("playbook".into()).is_transient());
    }
}
