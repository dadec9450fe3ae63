//! Startup planning.
//!
//! Orders services so that every referenced service starts before the
//! services referencing it, then resolves each service against the set of
//! services started ahead of it to emit launch steps.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use stackplan_common::config::PlannerConfig;
use stackplan_common::error::{StackplanError, Result};
use stackplan_common::types::{Command, PortBinding, VolumeMount};

use crate::graph::DependencyGraph;
use crate::model::ServiceSpec;
use crate::reference;
use crate::resolver::Resolver;
use crate::store::ServiceStore;

/// Builds the dependency graph of every service in `store`.
///
/// Nodes are added in declaration order.
///
/// # Errors
///
/// Returns [`StackplanError::NotFound`] if a dependency names an undeclared service.
pub fn build_graph(store: &ServiceStore, config: &PlannerConfig) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::new();
    let nodes: Vec<_> = store.names().map(|name| graph.add_service(name)).collect();

    for (position, spec) in store.all().iter().enumerate() {
        let deps = reference::dependencies(
            spec,
            |name| store.contains(name),
            config.bare_name_references,
        );
        for dep in deps {
            let target = store
                .position(&dep.target)
                .ok_or_else(|| StackplanError::NotFound {
                    kind: "service",
                    id: dep.target.clone(),
                })?;
            tracing::debug!(service = %spec.name, dependency = %dep.target, via = %dep.via, "dependency edge");
            graph.add_dependency(nodes[position], nodes[target]);
        }
    }
    Ok(graph)
}

/// Orders the services of `store` for startup.
///
/// For any services A and B where A references B, B precedes A. Services
/// with no ordering constraint between them keep declaration order.
///
/// # Errors
///
/// Returns [`StackplanError::NotFound`] for references to undeclared
/// services and [`StackplanError::CyclicDependency`] if references form a cycle.
pub fn plan<'a>(store: &'a ServiceStore, config: &PlannerConfig) -> Result<Vec<&'a ServiceSpec>> {
    let graph = build_graph(store, config)?;
    let order = graph.resolve_order()?;
    tracing::info!(services = order.len(), "startup order resolved");
    order.iter().map(|name| store.get(name)).collect()
}

/// Where a service's image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchSource {
    /// Pull a prebuilt image.
    Image(String),
    /// Build from a local context.
    Build {
        /// Absolute build context directory.
        context: PathBuf,
        /// Dockerfile path, relative to the context.
        dockerfile: Option<PathBuf>,
        /// Image name to tag the build with, if declared.
        tag: Option<String>,
    },
}

/// One instruction of the startup plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchStep {
    /// 1-based position in the plan.
    pub position: usize,
    /// Service to start.
    pub service: String,
    /// Image to run or build.
    pub source: LaunchSource,
    /// Ports to expose.
    pub ports: Vec<PortBinding>,
    /// Volumes to mount; bind sources are anchored at the project directory.
    pub volumes: Vec<VolumeMount>,
    /// Fully resolved environment.
    pub environment: BTreeMap<String, String>,
    /// Command override.
    pub command: Option<Command>,
    /// Services this one depends on, in plan order.
    pub waits_for: Vec<String>,
}

/// The ordered startup plan for a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartupPlan {
    /// Launch steps in startup order.
    pub steps: Vec<LaunchStep>,
}

impl StartupPlan {
    /// Service names in startup order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.service.as_str())
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there is nothing to launch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Renders the plan as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StackplanError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Plans startup and resolves every service into a [`LaunchStep`].
///
/// Each service is resolved with the services planned before it treated as
/// running, so every binding in the result is concrete.
///
/// # Errors
///
/// Returns any error from [`plan`] or from reference resolution.
pub fn launch_plan(store: &ServiceStore, config: &PlannerConfig) -> Result<StartupPlan> {
    let graph = build_graph(store, config)?;
    let order = graph.resolve_order()?;
    let resolver = Resolver::new(store, config);

    let mut running: BTreeSet<String> = BTreeSet::new();
    let mut steps = Vec::with_capacity(order.len());
    for (i, name) in order.iter().enumerate() {
        let spec = store.get(name)?;
        let resolved = resolver.resolve_with(spec, &running)?;
        let environment =
            resolved
                .concrete_environment()
                .ok_or_else(|| StackplanError::UnresolvedReference {
                    service: spec.name.clone(),
                    reference: resolved.waiting_on().join(", "),
                    reason: "referenced services are not started earlier in the plan".into(),
                })?;

        let waits_for = started_dependencies(spec, store, config, &order);
        steps.push(LaunchStep {
            position: i + 1,
            service: spec.name.clone(),
            source: launch_source(spec, config)?,
            ports: spec.ports.clone(),
            volumes: spec
                .volumes
                .iter()
                .map(|v| anchor_volume(v, config))
                .collect(),
            environment,
            command: spec.command.clone(),
            waits_for,
        });
        let _ = running.insert(spec.name.clone());
    }

    tracing::info!(steps = steps.len(), "launch plan built");
    Ok(StartupPlan { steps })
}

fn started_dependencies(
    spec: &ServiceSpec,
    store: &ServiceStore,
    config: &PlannerConfig,
    order: &[String],
) -> Vec<String> {
    let targets: BTreeSet<String> = reference::dependencies(
        spec,
        |name| store.contains(name),
        config.bare_name_references,
    )
    .into_iter()
    .map(|d| d.target)
    .collect();
    order
        .iter()
        .filter(|name| targets.contains(*name))
        .cloned()
        .collect()
}

fn launch_source(spec: &ServiceSpec, config: &PlannerConfig) -> Result<LaunchSource> {
    match (&spec.build, &spec.image) {
        (Some(build), tag) => Ok(LaunchSource::Build {
            context: config.anchor(&build.context),
            dockerfile: build.dockerfile.clone(),
            tag: tag.clone(),
        }),
        (None, Some(image)) => Ok(LaunchSource::Image(image.clone())),
        (None, None) => Err(StackplanError::Config {
            message: format!("service \"{}\" has neither image nor build", spec.name),
        }),
    }
}

fn anchor_volume(volume: &VolumeMount, config: &PlannerConfig) -> VolumeMount {
    if !volume.is_bind() {
        return volume.clone();
    }
    let source = volume.source.as_deref().map(|s| {
        if s.starts_with('~') {
            s.to_string()
        } else {
            config.anchor(Path::new(s)).display().to_string()
        }
    });
    VolumeMount {
        source,
        ..volume.clone()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn service(name: &str, env: &[(&str, &str)]) -> ServiceSpec {
        let mut spec = ServiceSpec::with_image(name, name);
        for (k, v) in env {
            let _ = spec.environment.insert((*k).to_string(), (*v).to_string());
        }
        spec
    }

    fn names(specs: &[&ServiceSpec]) -> Vec<String> {
        specs.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn server_after_db() {
        let store = ServiceStore::new(vec![
            service("server", &[("DB_HOST", "${db.host}")]),
            service("db", &[]),
        ])
        .expect("store");
        let order = plan(&store, &PlannerConfig::default()).expect("should plan");
        assert_eq!(names(&order), vec!["db", "server"]);
    }

    #[test]
    fn mutual_references_are_cyclic() {
        let store = ServiceStore::new(vec![
            service("a", &[("B", "${b.host}")]),
            service("b", &[("A", "${a.host}")]),
        ])
        .expect("store");
        let err = plan(&store, &PlannerConfig::default()).unwrap_err();
        assert!(
            matches!(err, StackplanError::CyclicDependency { ref cycle } if cycle == &["a", "b"]),
            "got: {err}"
        );
    }

    #[test]
    fn bare_name_cycle_detected() {
        let store = ServiceStore::new(vec![
            service("a", &[("PEER", "c")]),
            service("c", &[("PEER", "a")]),
        ])
        .expect("store");
        assert!(matches!(
            plan(&store, &PlannerConfig::default()),
            Err(StackplanError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn bare_cycle_ignored_when_bare_references_disabled() {
        let store = ServiceStore::new(vec![
            service("a", &[("PEER", "c")]),
            service("c", &[("PEER", "a")]),
        ])
        .expect("store");
        let config = PlannerConfig {
            bare_name_references: false,
            ..PlannerConfig::default()
        };
        let order = plan(&store, &config).expect("should plan");
        assert_eq!(names(&order), vec!["a", "c"]);
    }

    #[test]
    fn self_reference_is_cyclic() {
        let store =
            ServiceStore::new(vec![service("a", &[("ME", "${a.host}")])]).expect("store");
        assert!(matches!(
            plan(&store, &PlannerConfig::default()),
            Err(StackplanError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn own_name_in_environment_is_not_a_cycle() {
        let store = ServiceStore::new(vec![
            service("postgres", &[("POSTGRES_USER", "postgres")]),
            service("app", &[("DB_HOST", "postgres")]),
        ])
        .expect("store");
        let order = plan(&store, &PlannerConfig::default()).expect("should plan");
        assert_eq!(names(&order), vec!["postgres", "app"]);

        let launch = launch_plan(&store, &PlannerConfig::default()).expect("should plan");
        assert_eq!(launch.steps[0].environment["POSTGRES_USER"], "postgres");
        assert_eq!(launch.steps[1].waits_for, vec!["postgres"]);
    }

    #[test]
    fn undeclared_depends_on_is_not_found() {
        let mut api = service("api", &[]);
        api.depends_on = vec!["ghost".into()];
        let store = ServiceStore::new(vec![api]).expect("store");
        let err = plan(&store, &PlannerConfig::default()).unwrap_err();
        assert!(
            matches!(err, StackplanError::NotFound { ref id, .. } if id == "ghost"),
            "got: {err}"
        );
    }

    #[test]
    fn undeclared_placeholder_is_not_found() {
        let store =
            ServiceStore::new(vec![service("api", &[("C", "${cache.host}")])]).expect("store");
        assert!(matches!(
            plan(&store, &PlannerConfig::default()),
            Err(StackplanError::NotFound { .. })
        ));
    }

    #[test]
    fn launch_plan_resolves_in_order() {
        let mut db = service("db", &[]);
        db.ports = vec![PortBinding::container(5432)];
        let store = ServiceStore::new(vec![
            service("api", &[("DATABASE_URL", "postgres://${db.address}/app")]),
            db,
            service("metrics", &[]),
        ])
        .expect("store");

        let plan = launch_plan(&store, &PlannerConfig::default()).expect("should plan");
        assert_eq!(plan.order().collect::<Vec<_>>(), vec!["db", "api", "metrics"]);
        let api = &plan.steps[1];
        assert_eq!(api.position, 2);
        assert_eq!(api.environment["DATABASE_URL"], "postgres://db:5432/app");
        assert_eq!(api.waits_for, vec!["db"]);
        assert!(plan.steps[0].waits_for.is_empty());
    }

    #[test]
    fn launch_plan_anchors_build_and_bind_mounts() {
        let mut driver = ServiceSpec {
            name: "driver".into(),
            build: Some(stackplan_common::types::BuildContext {
                context: PathBuf::from("."),
                dockerfile: Some(PathBuf::from("compose/Dockerfile")),
            }),
            ..ServiceSpec::default()
        };
        driver.volumes = vec![
            VolumeMount {
                source: Some("./tests".into()),
                target: "/usr/src/app/tests".into(),
                read_only: false,
            },
            VolumeMount {
                source: Some("data".into()),
                target: "/data".into(),
                read_only: false,
            },
        ];
        let store = ServiceStore::new(vec![driver]).expect("store");
        let config = PlannerConfig {
            project_dir: PathBuf::from("/srv/driver"),
            ..PlannerConfig::default()
        };

        let plan = launch_plan(&store, &config).expect("should plan");
        let step = &plan.steps[0];
        assert_eq!(
            step.source,
            LaunchSource::Build {
                context: PathBuf::from("/srv/driver"),
                dockerfile: Some(PathBuf::from("compose/Dockerfile")),
                tag: None,
            }
        );
        assert_eq!(step.volumes[0].source.as_deref(), Some("/srv/driver/tests"));
        assert_eq!(step.volumes[1].source.as_deref(), Some("data"));
    }

    #[test]
    fn plan_renders_as_json() {
        let mut db = service("db", &[]);
        db.ports = vec![PortBinding::published(5432, 5432)];
        let store = ServiceStore::new(vec![service("api", &[("DB", "db")]), db]).expect("store");
        let plan = launch_plan(&store, &PlannerConfig::default()).expect("should plan");

        let json = plan.to_json().expect("should encode");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["steps"][0]["service"], "db");
        assert_eq!(value["steps"][1]["environment"]["DB"], "db");
        assert_eq!(value["steps"][1]["waits_for"][0], "db");
    }

    #[test]
    fn empty_store_plans_nothing() {
        let store = ServiceStore::default();
        assert!(plan(&store, &PlannerConfig::default()).expect("plan").is_empty());
        assert!(launch_plan(&store, &PlannerConfig::default()).expect("plan").is_empty());
    }
}
