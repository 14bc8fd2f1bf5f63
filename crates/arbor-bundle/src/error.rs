//! Error types for the arbor-bundle codec.
//!
//! Only structural failures are errors. A malformed table row is skipped and
//! reported through [`crate::SkippedRow`] instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("archive has no {} manifest", crate::MANIFEST_NAME)]
  MissingManifest,

  #[error("archive error: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("manifest is not valid UTF-8")]
  Encoding(#[from] std::string::FromUtf8Error),

  #[error(transparent)]
  Core(#[from] arbor_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
