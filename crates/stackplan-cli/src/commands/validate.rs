//! `stackplan validate` — Check a descriptor without printing a plan.

use clap::Args;

use super::GlobalArgs;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also check that the services can be ordered.
    #[arg(long)]
    pub order: bool,
}

/// Executes the `validate` command.
///
/// # Errors
///
/// Returns an error if the descriptor is invalid or, with `--order`,
/// if its references form a cycle.
pub fn execute(global: &GlobalArgs, args: &ValidateArgs) -> anyhow::Result<()> {
    let loaded = global.load()?;
    if args.order {
        let _ = stackplan_compose::planner::plan(&loaded.store, &loaded.config)?;
    }
    println!(
        "{}: {} service(s), valid",
        loaded.path.display(),
        loaded.store.len()
    );
    Ok(())
}
