//! Intervention plan commands.

use arbor_core::{
  plan::{InterventionKind, PlanInput, PlanRecord, Schedule, TeamComposition},
  tree::TreeId,
};
use chrono::NaiveDate;
use clap::Args;

use crate::Store;

#[derive(Args)]
pub struct PlanArgs {
  /// Tree the plan is for.
  tree:         TreeId,
  /// Intervention, e.g. `pruning`, `crown-reduction`, `removal`.
  #[arg(long)]
  intervention: String,
  /// First scheduled day (YYYY-MM-DD).
  #[arg(long)]
  start:        NaiveDate,
  /// Last scheduled day; defaults to the start day.
  #[arg(long)]
  end:          Option<NaiveDate>,
  /// Repeatable.
  #[arg(long = "technique", value_name = "TEXT")]
  techniques:   Vec<String>,
  /// Repeatable.
  #[arg(long = "tool", value_name = "TEXT")]
  tools:        Vec<String>,
  /// Protective equipment. Repeatable.
  #[arg(long, value_name = "TEXT")]
  ppe:          Vec<String>,
  #[arg(long, default_value_t = 0)]
  arborists:    u32,
  #[arg(long, default_value_t = 0)]
  assistants:   u32,
  #[arg(long, default_value_t = 0)]
  operators:    u32,
  /// Where cut material goes.
  #[arg(long, default_value = "")]
  waste:        String,
  #[arg(long, default_value = "")]
  responsible:  String,
  #[arg(long, default_value = "")]
  notes:        String,
}

impl From<PlanArgs> for PlanInput {
  fn from(a: PlanArgs) -> Self {
    Self {
      intervention:      InterventionKind::parse(&a.intervention),
      techniques:        a.techniques,
      tools:             a.tools,
      ppe:               a.ppe,
      team:              TeamComposition {
        arborists:  a.arborists,
        assistants: a.assistants,
        operators:  a.operators,
      },
      schedule:          Schedule { start: a.start, end: a.end.unwrap_or(a.start) },
      waste_destination: a.waste,
      responsible:       a.responsible,
      notes:             a.notes,
    }
  }
}

pub async fn create(inv: &mut Store, args: PlanArgs) -> anyhow::Result<()> {
  let tree = args.tree;
  let plan = inv.create_plan(tree, args.into()).await?;
  println!("created plan {} for tree {tree}", plan.id);
  print_plan(&plan);
  Ok(())
}

pub fn list(inv: &Store, tree: Option<TreeId>) {
  let plans: Vec<&PlanRecord> = match tree {
    Some(id) => inv.plans_for(id).collect(),
    None => inv.plans().iter().collect(),
  };
  if plans.is_empty() {
    println!("no plans");
  }
  for p in plans {
    print_plan(p);
  }
}

fn print_plan(p: &PlanRecord) {
  println!(
    "{}  tree {}  {}  {}..{}  crew {}",
    p.id,
    p.tree_id,
    p.intervention,
    p.schedule.start,
    p.schedule.end,
    p.team.total()
  );
  for (label, items) in [("techniques", &p.techniques), ("tools", &p.tools), ("ppe", &p.ppe)] {
    if !items.is_empty() {
      println!("    {label}: {}", items.join(", "));
    }
  }
  if !p.waste_destination.is_empty() {
    println!("    waste: {}", p.waste_destination);
  }
  if !p.responsible.is_empty() {
    println!("    responsible: {}", p.responsible);
  }
  if !p.notes.is_empty() {
    println!("    notes: {}", p.notes);
  }
}
