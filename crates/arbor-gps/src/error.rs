//! Error types for `arbor-gps`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
  /// The capture window closed without a single usable fix.
  #[error("no GPS signal: no usable fix was received")]
  NoSignal,

  /// The fix subscription could not be opened.
  #[error("GPS source error: {0}")]
  Source(String),

  /// The capture task stopped before producing a result.
  #[error("GPS capture interrupted: {0}")]
  Interrupted(String),
}

pub type Result<T, E = CaptureError> = std::result::Result<T, E>;
