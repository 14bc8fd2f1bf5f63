//! GPS fix aggregation for the Arbor tree inventory.
//!
//! A capture collects fixes for a fixed window, discards imprecise ones, and
//! averages the rest into a single [`Reading`] projected into the configured
//! UTM zone. [`FixCollector`] is the synchronous state machine;
//! [`Capture`] drives it from a [`FixSource`] on the tokio runtime.

pub mod capture;
pub mod collector;
pub mod error;

pub use capture::{CancelHandle, Capture, FixSource};
pub use collector::{CaptureConfig, CaptureState, Fix, FixCollector, Reading};
pub use error::{CaptureError, Result};
