use thiserror::Error;

/// Errors returned by cache operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The key is absent or its entry has expired
    #[error("key not found")]
    KeyNotFound,

    /// No tokio runtime was available to run the background sweeper
    #[error("no tokio runtime available to spawn the sweeper; build inside a runtime or pass a handle")]
    NoRuntime,
}

impl CacheError {
    /// Returns true for [`CacheError::KeyNotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::KeyNotFound)
    }
}
