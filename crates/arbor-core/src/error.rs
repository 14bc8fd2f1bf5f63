//! Error types for `arbor-core`.

use thiserror::Error;

use crate::tree::TreeId;

#[derive(Debug, Error)]
pub enum Error {
  /// A required input field was missing or inconsistent. Raised before any
  /// mutation takes place.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("tree not found: {0}")]
  TreeNotFound(TreeId),

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
