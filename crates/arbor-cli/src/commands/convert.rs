//! Coordinate conversion without touching the inventory.

use arbor_core::coords::{self, Hemisphere};
use clap::Subcommand;

use crate::config::ArborConfig;

#[derive(Subcommand)]
pub enum ConvertCommand {
  /// UTM easting/northing to latitude/longitude.
  ToGeo {
    #[arg(allow_negative_numbers = true)]
    x:      f64,
    #[arg(allow_negative_numbers = true)]
    y:      f64,
    /// Defaults to the configured zone.
    #[arg(long)]
    zone:   Option<u8>,
    /// Latitude band; picks the hemisphere. Defaults to the configured band.
    #[arg(long)]
    letter: Option<char>,
  },

  /// Latitude/longitude to UTM easting/northing.
  ToUtm {
    #[arg(allow_negative_numbers = true)]
    lat:  f64,
    #[arg(allow_negative_numbers = true)]
    lon:  f64,
    /// Defaults to the zone containing `lon`.
    #[arg(long)]
    zone: Option<u8>,
  },
}

pub fn run(cmd: ConvertCommand, cfg: &ArborConfig) -> anyhow::Result<()> {
  match cmd {
    ConvertCommand::ToGeo { x, y, zone, letter } => {
      let zone = zone.unwrap_or(cfg.zone_number);
      let letter = letter.unwrap_or(cfg.zone_letter);
      match coords::to_geographic(x, y, zone, Hemisphere::from_zone_letter(letter)) {
        Some(g) => println!("{:.6}, {:.6}", g.lat, g.lon),
        None => println!("not convertible"),
      }
    }
    ConvertCommand::ToUtm { lat, lon, zone } => {
      let zone = zone.or_else(|| coords::zone_number(lon)).unwrap_or(cfg.zone_number);
      let letter = coords::zone_letter(lat);
      match (coords::to_projected(lat, lon, zone, Hemisphere::from_latitude(lat)), letter) {
        (Some(p), Some(letter)) => {
          println!("{:.3} E {:.3} N  zone {zone}{letter}", p.easting, p.northing)
        }
        (Some(p), None) => println!("{:.3} E {:.3} N  zone {zone}", p.easting, p.northing),
        (None, _) => println!("not convertible"),
      }
    }
  }
  Ok(())
}
