//! The async capture driver: subscribes to a [`FixSource`], feeds a
//! [`FixCollector`] until the window closes or the capture is cancelled, and
//! publishes the remaining time on a tick.

use std::{sync::Arc, time::Duration};

use tokio::{
  sync::{mpsc, watch},
  task::JoinHandle,
  time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
  collector::{CaptureConfig, CaptureState, Fix, FixCollector, Reading},
  error::{CaptureError, Result},
};

/// A stream of position fixes, e.g. a receiver wired to a GNSS device.
pub trait FixSource {
  /// Open the subscription. Called once per capture.
  fn subscribe(&mut self) -> Result<mpsc::Receiver<Fix>>;

  /// Close the subscription. Called exactly once after a successful
  /// [`FixSource::subscribe`].
  fn unsubscribe(&mut self);
}

/// Cancels a running [`Capture`] from elsewhere, e.g. a signal handler.
#[derive(Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
  /// Idempotent.
  pub fn cancel(&self) { self.0.send_replace(true); }
}

/// A running capture.
pub struct Capture {
  cancel:    CancelHandle,
  remaining: watch::Receiver<Duration>,
  state:     watch::Receiver<CaptureState>,
  task:      JoinHandle<Result<Reading>>,
}

impl Capture {
  /// Subscribe to `source` and open the capture window.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start<S>(mut source: S, config: CaptureConfig) -> Result<Self>
  where
    S: FixSource + Send + 'static,
  {
    let fixes = source.subscribe()?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (remaining_tx, remaining_rx) = watch::channel(config.window);
    let (state_tx, state_rx) = watch::channel(CaptureState::Capturing);

    let mut collector = FixCollector::new(config);
    collector.start(Instant::now());
    debug!(window = ?config.window, max_accuracy_m = config.max_accuracy_m, "capture started");

    let task = tokio::spawn(drive(source, fixes, collector, cancel_rx, remaining_tx, state_tx));

    Ok(Self {
      cancel:    CancelHandle(Arc::new(cancel_tx)),
      remaining: remaining_rx,
      state:     state_rx,
      task,
    })
  }

  /// Stop capturing now and average whatever has been collected. Safe to
  /// call any number of times.
  pub fn cancel(&self) { self.cancel.cancel(); }

  pub fn cancel_handle(&self) -> CancelHandle { self.cancel.clone() }

  /// Time left in the window as of the last tick.
  pub fn remaining(&self) -> Duration { *self.remaining.borrow() }

  /// A receiver that changes on every tick, for display.
  pub fn watch_remaining(&self) -> watch::Receiver<Duration> { self.remaining.clone() }

  pub fn state(&self) -> CaptureState { *self.state.borrow() }

  /// Wait for the window to close and return the averaged reading.
  pub async fn finish(self) -> Result<Reading> {
    let Self { cancel, task, .. } = self;
    let outcome = task.await;
    drop(cancel);
    outcome.map_err(|e| CaptureError::Interrupted(e.to_string()))?
  }
}

async fn drive<S: FixSource>(
  mut source: S,
  mut fixes: mpsc::Receiver<Fix>,
  mut collector: FixCollector,
  mut cancel: watch::Receiver<bool>,
  remaining: watch::Sender<Duration>,
  state: watch::Sender<CaptureState>,
) -> Result<Reading> {
  let tick_every = collector.config().tick;
  let deadline = collector.deadline().unwrap_or_else(Instant::now);

  let mut ticker = time::interval_at(Instant::now() + tick_every, tick_every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  let window = time::sleep_until(deadline);
  tokio::pin!(window);

  let mut stream_open = true;
  loop {
    tokio::select! {
      biased;

      changed = cancel.changed() => {
        // Dropping every handle counts as a cancellation.
        if changed.is_err() || *cancel.borrow() {
          debug!("capture cancelled");
          break;
        }
      }
      () = &mut window => {
        // Fixes already queued arrived inside the window.
        while let Ok(fix) = fixes.try_recv() {
          collector.offer(fix);
        }
        break;
      }
      _ = ticker.tick() => {
        remaining.send_replace(collector.remaining(Instant::now()));
      }
      fix = fixes.recv(), if stream_open => match fix {
        Some(fix) => { collector.offer(fix); }
        None => {
          warn!("fix stream ended before the capture window closed");
          stream_open = false;
        }
      },
    }
  }

  source.unsubscribe();
  drop(fixes);
  collector.close();
  remaining.send_replace(Duration::ZERO);
  state.send_replace(collector.state());

  let result = collector.finish();
  state.send_replace(collector.state());
  match &result {
    Ok(r) => info!(
      fixes = r.fix_count,
      lat = r.position.lat,
      lon = r.position.lon,
      accuracy_m = r.accuracy_m,
      "GPS capture complete"
    ),
    Err(e) => warn!(error = %e, "GPS capture failed"),
  }
  result
}
