//! CLI command definitions and dispatch.

pub mod graph;
pub mod plan;
pub mod resolve;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use stackplan_common::config::PlannerConfig;
use stackplan_common::constants::{ENV_DESCRIPTOR_FILE, ENV_PROJECT_DIR};
use stackplan_compose::store::ServiceStore;

/// stackplan — resolve and order the services of a Compose descriptor.
#[derive(Parser, Debug)]
#[command(name = "stackplan", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to the descriptor. Defaults to the first conventional
    /// file name found in the project directory.
    #[arg(short, long, global = true, env = ENV_DESCRIPTOR_FILE)]
    pub file: Option<PathBuf>,

    /// Directory that relative paths are anchored to. Defaults to the
    /// descriptor's directory.
    #[arg(long, global = true, env = ENV_PROJECT_DIR)]
    pub project_directory: Option<PathBuf>,

    /// Do not treat environment values equal to a service name as references.
    #[arg(long, global = true)]
    pub no_bare_references: bool,

    /// Log output format (logs go to stderr; filter with `RUST_LOG`).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Locates the descriptor file.
    ///
    /// # Errors
    ///
    /// Returns an error if no file was given and none is found.
    pub fn descriptor_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }
        let dir = self
            .project_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(stackplan_compose::descriptor::find_descriptor(&dir)?)
    }

    /// Builds the planner configuration for a descriptor at `descriptor`.
    #[must_use]
    pub fn config(&self, descriptor: &Path) -> PlannerConfig {
        let project_dir = self.project_directory.clone().unwrap_or_else(|| {
            descriptor
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        });
        PlannerConfig {
            project_dir,
            bare_name_references: !self.no_bare_references,
        }
    }

    /// Loads the descriptor into a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be found, read, or validated.
    pub fn load(&self) -> anyhow::Result<Loaded> {
        let path = self.descriptor_path()?;
        let descriptor = stackplan_compose::descriptor::load_descriptor(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let store = ServiceStore::from_descriptor(descriptor)?;
        let config = self.config(&path);
        Ok(Loaded {
            path,
            store,
            config,
        })
    }
}

/// A loaded descriptor ready for planning.
#[derive(Debug)]
pub struct Loaded {
    /// Descriptor path.
    pub path: PathBuf,
    /// Service definitions.
    pub store: ServiceStore,
    /// Effective configuration.
    pub config: PlannerConfig,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the ordered startup plan.
    Plan(plan::PlanArgs),
    /// Check the descriptor without planning.
    Validate(validate::ValidateArgs),
    /// Show the resolved environment of one service.
    Resolve(resolve::ResolveArgs),
    /// Print the service dependency graph.
    Graph(graph::GraphArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => plan::execute(&cli.global, &args),
        Command::Validate(args) => validate::execute(&cli.global, &args),
        Command::Resolve(args) => resolve::execute(&cli.global, &args),
        Command::Graph(args) => graph::execute(&cli.global, &args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stackplan",
            "plan",
            "--file",
            "stack.yml",
            "--no-bare-references",
        ])
        .expect("should parse");
        assert_eq!(cli.global.file, Some(PathBuf::from("stack.yml")));
        assert!(cli.global.no_bare_references);
        assert!(matches!(cli.command, Command::Plan(_)));
    }

    #[test]
    fn project_dir_defaults_to_descriptor_parent() {
        let cli = Cli::try_parse_from(["stackplan", "validate"]).expect("should parse");
        let config = cli.global.config(Path::new("/srv/app/docker-compose.yml"));
        assert_eq!(config.project_dir, PathBuf::from("/srv/app"));
        assert!(config.bare_name_references);

        let config = cli.global.config(Path::new("docker-compose.yml"));
        assert_eq!(config.project_dir, PathBuf::from("."));
    }

    #[test]
    fn explicit_project_directory_wins() {
        let cli = Cli::try_parse_from([
            "stackplan",
            "--project-directory",
            "/work",
            "graph",
        ])
        .expect("should parse");
        let config = cli.global.config(Path::new("/srv/app/docker-compose.yml"));
        assert_eq!(config.project_dir, PathBuf::from("/work"));
    }

    #[test]
    fn load_discovers_descriptor() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("docker-compose.yml"),
            "services:\n  db:\n    image: rethinkdb\n",
        )
        .expect("write");
        let project = dir.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["stackplan", "--project-directory", &project, "plan"])
            .expect("should parse");

        let loaded = cli.global.load().expect("should load");
        assert_eq!(loaded.store.len(), 1);
        assert_eq!(loaded.config.project_dir, dir.path());
    }
}
