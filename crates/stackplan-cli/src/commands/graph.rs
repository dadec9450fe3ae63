//! `stackplan graph` — Print the service dependency graph.

use clap::Args;

use super::GlobalArgs;

/// Arguments for the `graph` command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Emit Graphviz DOT instead of an edge list.
    #[arg(long)]
    pub dot: bool,
}

/// Executes the `graph` command.
///
/// # Errors
///
/// Returns an error if the descriptor cannot be loaded or names undeclared services.
pub fn execute(global: &GlobalArgs, args: &GraphArgs) -> anyhow::Result<()> {
    let loaded = global.load()?;
    let graph = stackplan_compose::planner::build_graph(&loaded.store, &loaded.config)?;

    if args.dot {
        println!("{}", graph.to_dot());
        return Ok(());
    }

    let edges = graph.edges();
    if edges.is_empty() {
        println!("no dependencies between {} service(s)", graph.node_count());
    }
    for (dependency, dependent) in edges {
        println!("{dependent} -> {dependency}");
    }
    Ok(())
}
