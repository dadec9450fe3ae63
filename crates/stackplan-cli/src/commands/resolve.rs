//! `stackplan resolve` — Show the resolved environment of one service.

use std::collections::BTreeSet;

use clap::Args;
use stackplan_compose::resolver::Resolver;

use super::GlobalArgs;
use crate::output::ResolvedReport;

/// Arguments for the `resolve` command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Service to resolve.
    pub service: String,

    /// Services considered running; references to any other service stay
    /// deferred. Without this flag every service counts as running.
    #[arg(long, value_delimiter = ',')]
    pub running: Option<Vec<String>>,
}

/// Executes the `resolve` command.
///
/// # Errors
///
/// Returns an error if the service is unknown or a reference cannot be resolved.
pub fn execute(global: &GlobalArgs, args: &ResolveArgs) -> anyhow::Result<()> {
    let loaded = global.load()?;
    let spec = loaded.store.get(&args.service)?;
    let resolver = Resolver::new(&loaded.store, &loaded.config);

    let resolved = match &args.running {
        Some(running) => {
            for name in running {
                let _ = loaded.store.get(name)?;
            }
            let running: BTreeSet<String> = running.iter().cloned().collect();
            resolver.resolve_with(spec, &running)?
        }
        None => resolver.resolve(spec)?,
    };

    print!("{}", ResolvedReport(&resolved));
    Ok(())
}
