//! GPS capture from fixes piped on stdin.

use std::{io::BufRead, time::Duration};

use anyhow::Context as _;
use arbor_core::tree::{PhotoChange, TreeId};
use arbor_gps::{Capture, CaptureError, Fix, FixSource, Reading};
use clap::Args;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Store, config::ArborConfig};

#[derive(Args)]
pub struct GpsArgs {
  /// Capture window in seconds.
  #[arg(long)]
  window:       Option<u64>,
  /// Discard fixes with an accuracy radius at or above this, in metres.
  #[arg(long)]
  max_accuracy: Option<f64>,
  /// Store the averaged position on this tree.
  #[arg(long, value_name = "ID")]
  apply:        Option<TreeId>,
}

/// Reads `lat,lon,accuracy` lines from stdin.
///
/// The read runs on a plain OS thread: a blocking stdin read cannot be
/// cancelled, and a thread outside the runtime does not hold up its
/// shutdown. The thread ends at EOF, or at the first fix after the receiver
/// is gone.
#[derive(Default)]
struct StdinSource {
  subscribed: bool,
}

impl FixSource for StdinSource {
  fn subscribe(&mut self) -> arbor_gps::Result<mpsc::Receiver<Fix>> {
    if self.subscribed {
      return Err(CaptureError::Source("stdin is already being read".into()));
    }
    let (tx, rx) = mpsc::channel(64);
    std::thread::Builder::new()
      .name("gps-stdin".into())
      .spawn(move || read_fixes(std::io::stdin().lock(), &tx))
      .map_err(|e| CaptureError::Source(format!("failed to start stdin reader: {e}")))?;
    self.subscribed = true;
    Ok(rx)
  }

  fn unsubscribe(&mut self) {
    // Dropping the receiver stops the reader at its next line.
    debug!("closing stdin fix stream");
  }
}

/// Forward parsed fixes from `input` until EOF or until `tx` is closed.
fn read_fixes(input: impl BufRead, tx: &mpsc::Sender<Fix>) {
  for line in input.lines() {
    let line = match line {
      Ok(line) => line,
      Err(e) => {
        warn!(error = %e, "failed to read stdin");
        return;
      }
    };
    match parse_fix(&line) {
      Some(fix) => {
        if tx.blocking_send(fix).is_err() {
          return;
        }
      }
      None if line.trim().is_empty() => {}
      None => warn!(%line, "ignoring malformed fix"),
    }
  }
}

/// Parse `lat,lon,accuracy`; also accepts `;` or whitespace between values.
fn parse_fix(line: &str) -> Option<Fix> {
  let mut parts = line
    .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
    .filter(|p| !p.is_empty())
    .map(str::parse::<f64>);
  let lat = parts.next()?.ok()?;
  let lon = parts.next()?.ok()?;
  let accuracy = parts.next()?.ok()?;
  if parts.next().is_some() {
    return None;
  }
  Some(Fix::new(lat, lon, accuracy))
}

pub async fn capture(inv: &mut Store, cfg: &ArborConfig, args: GpsArgs) -> anyhow::Result<()> {
  if let Some(id) = args.apply {
    inv.get(id).with_context(|| format!("tree {id} not found"))?;
  }

  let mut config = cfg.capture();
  if let Some(secs) = args.window {
    config.window = Duration::from_secs(secs);
  }
  if let Some(max) = args.max_accuracy {
    config.max_accuracy_m = max;
  }

  let capture = Capture::start(StdinSource::default(), config)?;

  let handle = capture.cancel_handle();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      handle.cancel();
    }
  });

  let mut remaining = capture.watch_remaining();
  let progress = tokio::spawn(async move {
    while remaining.changed().await.is_ok() {
      let left = *remaining.borrow_and_update();
      if left.is_zero() {
        break;
      }
      eprintln!("{}s remaining", left.as_secs());
    }
  });

  let reading = capture.finish().await;
  progress.abort();
  let reading = reading?;
  print_reading(&reading);

  if let Some(id) = args.apply {
    let Some(p) = reading.projected else {
      anyhow::bail!("position cannot be projected into zone {}", reading.zone_number);
    };
    let mut input = inv.get(id).with_context(|| format!("tree {id} not found"))?.to_input();
    input.coord_x = Some(p.easting);
    input.coord_y = Some(p.northing);
    input.zone_number = Some(reading.zone_number);
    input.zone_letter = Some(reading.zone_letter);
    inv.edit(id, input, PhotoChange::Keep).await?;
    println!("stored position on tree {id}");
  }
  Ok(())
}

fn print_reading(r: &Reading) {
  println!(
    "{:.6}, {:.6}  ±{:.1} m  ({} fixes)",
    r.position.lat, r.position.lon, r.accuracy_m, r.fix_count
  );
  match r.projected {
    Some(p) => println!(
      "{:.1} E {:.1} N  zone {}{}",
      p.easting, p.northing, r.zone_number, r.zone_letter
    ),
    None => println!("outside zone {}", r.zone_number),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_fix_lines() {
    assert_eq!(parse_fix("-23.55,-46.63,12.5"), Some(Fix::new(-23.55, -46.63, 12.5)));
    assert_eq!(parse_fix(" -23.55 ; -46.63 ; 4 "), Some(Fix::new(-23.55, -46.63, 4.0)));
    assert_eq!(parse_fix("-23.55 -46.63 4"), Some(Fix::new(-23.55, -46.63, 4.0)));
    assert_eq!(parse_fix("-23.55,-46.63"), None);
    assert_eq!(parse_fix("-23.55,-46.63,4,9"), None);
    assert_eq!(parse_fix("lat,lon,acc"), None);
  }

  #[test]
  fn reader_forwards_fixes_and_stops_when_receiver_is_gone() {
    let (tx, mut rx) = mpsc::channel(8);
    read_fixes("1,2,3\nbad\n\n4,5,6\n".as_bytes(), &tx);
    assert_eq!(rx.try_recv().unwrap(), Fix::new(1.0, 2.0, 3.0));
    assert_eq!(rx.try_recv().unwrap(), Fix::new(4.0, 5.0, 6.0));
    assert!(rx.try_recv().is_err());

    drop(rx);
    // Returns instead of blocking on a closed channel.
    read_fixes("1,2,3\n4,5,6\n".as_bytes(), &tx);
  }
}
