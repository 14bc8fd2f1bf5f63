//! Subcommand definitions and dispatch.

mod convert;
mod gps;
mod plan;
mod transfer;
mod tree;

use arbor_core::tree::TreeId;
use clap::Subcommand;

use crate::{Store, config::ArborConfig};

#[derive(Subcommand)]
pub enum Command {
  /// Record a new tree.
  Add(tree::TreeFields),

  /// Change an existing tree. Unset flags keep their current values.
  Edit {
    id:     TreeId,
    #[command(flatten)]
    fields: tree::TreeFields,
    /// Delete the stored photo.
    #[arg(long, conflicts_with = "photo")]
    remove_photo: bool,
  },

  /// Show one tree with its position and plans.
  Show {
    id:   TreeId,
    /// Print the record as JSON.
    #[arg(long)]
    json: bool,
  },

  /// List trees with a summary by risk level.
  List {
    /// Only trees at this level.
    #[arg(long, value_enum)]
    level: Option<tree::LevelArg>,
  },

  /// Delete a tree and its photo.
  Delete { id: TreeId },

  /// Delete every tree and photo. Plans are kept.
  Clear {
    /// Confirm the deletion.
    #[arg(long)]
    yes: bool,
  },

  /// Write the inventory to a zip bundle (or a bare table with `.csv`).
  Export(transfer::ExportArgs),

  /// Add the trees from a bundle or table to the inventory.
  Import(transfer::ImportArgs),

  /// Create an intervention plan for a tree.
  Plan(plan::PlanArgs),

  /// List intervention plans.
  Plans {
    /// Only plans for this tree.
    tree: Option<TreeId>,
  },

  /// Average GPS fixes read from stdin as `lat,lon,accuracy` lines.
  Gps(gps::GpsArgs),

  /// Convert between UTM and latitude/longitude.
  #[command(subcommand)]
  Convert(convert::ConvertCommand),

  /// Print the risk factor table with the active weights.
  Factors,
}

impl Command {
  pub fn needs_store(&self) -> bool { !matches!(self, Self::Convert(_) | Self::Factors) }
}

pub async fn run(cmd: Command, inv: &mut Store, cfg: &ArborConfig) -> anyhow::Result<()> {
  match cmd {
    Command::Add(fields) => tree::add(inv, cfg, fields).await,
    Command::Edit { id, fields, remove_photo } => tree::edit(inv, id, fields, remove_photo).await,
    Command::Show { id, json } => tree::show(inv, id, json),
    Command::List { level } => {
      tree::list(inv, level);
      Ok(())
    }
    Command::Delete { id } => tree::delete(inv, id).await,
    Command::Clear { yes } => tree::clear(inv, yes).await,
    Command::Export(args) => transfer::export(inv, args).await,
    Command::Import(args) => transfer::import(inv, args).await,
    Command::Plan(args) => plan::create(inv, args).await,
    Command::Plans { tree } => {
      plan::list(inv, tree);
      Ok(())
    }
    Command::Gps(args) => gps::capture(inv, cfg, args).await,
    Command::Convert(_) | Command::Factors => run_offline(cmd, cfg),
  }
}

pub fn run_offline(cmd: Command, cfg: &ArborConfig) -> anyhow::Result<()> {
  match cmd {
    Command::Convert(c) => convert::run(c, cfg),
    Command::Factors => {
      tree::factors(&cfg.weights());
      Ok(())
    }
    _ => anyhow::bail!("this command needs an inventory"),
  }
}

/// Show and drain any queued notices.
pub fn print_notices(inv: &mut Store) {
  for notice in inv.take_notices() {
    eprintln!("warning: {notice}");
  }
}
