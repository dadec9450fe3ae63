//! Formatted output for CLI commands.

use std::fmt;
use std::path::Path;

use stackplan_compose::planner::{LaunchSource, StartupPlan};
use stackplan_compose::resolver::{Binding, ResolvedSpec};

const RULE_WIDTH: usize = 35;

/// Joins displayable items with `", "`.
fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable rendering of a startup plan.
pub struct PlanReport<'a> {
    /// Descriptor the plan was built from.
    pub source: &'a Path,
    /// The plan.
    pub plan: &'a StartupPlan,
}

impl fmt::Display for PlanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Startup Plan for: {}", self.source.display())?;
        writeln!(f, "{}", "\u{2550}".repeat(RULE_WIDTH))?;
        writeln!(f)?;

        for step in &self.plan.steps {
            writeln!(f, "  {}. {}", step.position, step.service)?;
            match &step.source {
                LaunchSource::Image(image) => writeln!(f, "      image: {image}")?,
                LaunchSource::Build {
                    context,
                    dockerfile,
                    tag,
                } => {
                    write!(f, "      build: {}", context.display())?;
                    if let Some(dockerfile) = dockerfile {
                        write!(f, " ({})", dockerfile.display())?;
                    }
                    if let Some(tag) = tag {
                        write!(f, " as {tag}")?;
                    }
                    writeln!(f)?;
                }
            }
            if !step.ports.is_empty() {
                writeln!(f, "      ports: {}", join(&step.ports))?;
            }
            if !step.volumes.is_empty() {
                writeln!(f, "      volumes: {}", join(&step.volumes))?;
            }
            for (key, value) in &step.environment {
                writeln!(f, "      env: {key}={value}")?;
            }
            if let Some(command) = &step.command {
                writeln!(f, "      command: {command}")?;
            }
            if !step.waits_for.is_empty() {
                writeln!(f, "      after: {}", step.waits_for.join(", "))?;
            }
        }

        writeln!(f)?;
        writeln!(f, "  {} service(s) will be started.", self.plan.len())
    }
}

/// Human-readable rendering of a resolved service environment.
pub struct ResolvedReport<'a>(pub &'a ResolvedSpec);

impl fmt::Display for ResolvedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = self.0;
        writeln!(f, "{}", spec.name)?;
        if spec.environment.is_empty() {
            writeln!(f, "  (no environment)")?;
        }
        for (key, binding) in &spec.environment {
            match binding {
                Binding::Concrete { value } => writeln!(f, "  {key}={value}")?,
                Binding::Deferred {
                    template,
                    waiting_on,
                } => writeln!(
                    f,
                    "  {key}={template}  (deferred: waiting on {})",
                    waiting_on.join(", ")
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    use stackplan_common::config::PlannerConfig;
    use stackplan_common::types::{Command, PortBinding};
    use stackplan_compose::planner::LaunchStep;

    use super::*;

    fn sample_plan() -> StartupPlan {
        let mut environment = BTreeMap::new();
        let _ = environment.insert("BDB_HOST".to_string(), "bdb-server".to_string());
        StartupPlan {
            steps: vec![
                LaunchStep {
                    position: 1,
                    service: "rdb".into(),
                    source: LaunchSource::Image("rethinkdb".into()),
                    ports: vec![PortBinding::published(58585, 8080), PortBinding::container(28015)],
                    volumes: Vec::new(),
                    environment: BTreeMap::new(),
                    command: None,
                    waits_for: Vec::new(),
                },
                LaunchStep {
                    position: 2,
                    service: "bdb-driver".into(),
                    source: LaunchSource::Build {
                        context: PathBuf::from("/work"),
                        dockerfile: Some(PathBuf::from("./compose/Dockerfile")),
                        tag: None,
                    },
                    ports: Vec::new(),
                    volumes: Vec::new(),
                    environment,
                    command: Some(Command::Shell("pytest -v".into())),
                    waits_for: vec!["rdb".into()],
                },
            ],
        }
    }

    #[test]
    fn plan_report_lists_steps_in_order() {
        let plan = sample_plan();
        let text = PlanReport {
            source: Path::new("docker-compose.yml"),
            plan: &plan,
        }
        .to_string();

        assert!(text.starts_with("Startup Plan for: docker-compose.yml\n"));
        let rdb = text.find("1. rdb").expect("rdb line");
        let driver = text.find("2. bdb-driver").expect("driver line");
        assert!(rdb < driver);
        assert!(text.contains("ports: 58585:8080, 28015"));
        assert!(text.contains("build: /work (./compose/Dockerfile)"));
        assert!(text.contains("env: BDB_HOST=bdb-server"));
        assert!(text.contains("command: pytest -v"));
        assert!(text.contains("after: rdb"));
        assert!(text.ends_with("2 service(s) will be started.\n"));
    }

    #[test]
    fn resolved_report_marks_deferred_bindings() {
        let store = stackplan_compose::store::ServiceStore::new(vec![
            stackplan_compose::model::ServiceSpec {
                environment: [("BDB_HOST".to_string(), "bdb-server".to_string())].into(),
                ..stackplan_compose::model::ServiceSpec::with_image("bdb-driver", "driver")
            },
            stackplan_compose::model::ServiceSpec::with_image("bdb-server", "server"),
        ])
        .expect("store");
        let resolver =
            stackplan_compose::resolver::Resolver::new(&store, &PlannerConfig::default());
        let resolved = resolver
            .resolve_with(store.get("bdb-driver").expect("driver"), &BTreeSet::new())
            .expect("resolve");

        let text = ResolvedReport(&resolved).to_string();
        assert_eq!(
            text,
            "bdb-driver\n  BDB_HOST=bdb-server  (deferred: waiting on bdb-server)\n"
        );
    }

    #[test]
    fn join_separates_with_commas() {
        assert_eq!(join(&[1, 2, 3]), "1, 2, 3");
        assert_eq!(join::<u8>(&[]), "");
    }
}
