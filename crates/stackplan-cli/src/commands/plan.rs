//! `stackplan plan` — Print the ordered startup plan.

use clap::{Args, ValueEnum};

use super::GlobalArgs;
use crate::output::PlanReport;

/// Output format of the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    /// Human-readable listing.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
    pub format: PlanFormat,
}

/// Executes the `plan` command.
///
/// Loads the descriptor, orders its services, resolves every reference
/// and prints one launch step per service.
///
/// # Errors
///
/// Returns an error if loading, validation, ordering, or resolution fails.
pub fn execute(global: &GlobalArgs, args: &PlanArgs) -> anyhow::Result<()> {
    let loaded = global.load()?;
    let plan = stackplan_compose::planner::launch_plan(&loaded.store, &loaded.config)?;

    match args.format {
        PlanFormat::Text => print!(
            "{}",
            PlanReport {
                source: &loaded.path,
                plan: &plan,
            }
        ),
        PlanFormat::Json => println!("{}", plan.to_json()?),
    }
    Ok(())
}
