//! Reference resolution.
//!
//! Substitutes service references in environment values with the address
//! of the referenced service. On the project network a service is reachable
//! under its own name, at its first declared container port.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use stackplan_common::config::PlannerConfig;
use stackplan_common::error::{StackplanError, Result};
use stackplan_common::types::{BuildContext, Command, PortBinding, VolumeMount};

use crate::model::ServiceSpec;
use crate::reference::{self, Attribute, Reference, Segment};
use crate::store::ServiceStore;

/// The resolved value of one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Binding {
    /// Every reference was substituted.
    Concrete {
        /// Final value.
        value: String,
    },
    /// Some referenced services are not running yet.
    Deferred {
        /// Value with references kept in `${service.attribute}` form.
        template: String,
        /// Services that must be running before the value is known.
        waiting_on: Vec<String>,
    },
}

impl Binding {
    /// Returns the concrete value, if known.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Concrete { value } => Some(value),
            Self::Deferred { .. } => None,
        }
    }
}

/// A service with its environment resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSpec {
    /// Service name.
    pub name: String,
    /// Prebuilt image reference.
    pub image: Option<String>,
    /// Build instructions.
    pub build: Option<BuildContext>,
    /// Volume mounts.
    pub volumes: Vec<VolumeMount>,
    /// Ports.
    pub ports: Vec<PortBinding>,
    /// Command override.
    pub command: Option<Command>,
    /// Resolved environment.
    pub environment: BTreeMap<String, Binding>,
}

impl ResolvedSpec {
    /// Returns `true` when no binding is deferred.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.environment
            .values()
            .all(|b| matches!(b, Binding::Concrete { .. }))
    }

    /// Services still awaited by deferred bindings, sorted and deduplicated.
    #[must_use]
    pub fn waiting_on(&self) -> Vec<String> {
        let pending: BTreeSet<&String> = self
            .environment
            .values()
            .filter_map(|b| match b {
                Binding::Deferred { waiting_on, .. } => Some(waiting_on),
                Binding::Concrete { .. } => None,
            })
            .flatten()
            .collect();
        pending.into_iter().cloned().collect()
    }

    /// Returns the environment as plain strings, or `None` if any binding is deferred.
    #[must_use]
    pub fn concrete_environment(&self) -> Option<BTreeMap<String, String>> {
        self.environment
            .iter()
            .map(|(k, b)| b.value().map(|v| (k.clone(), v.to_string())))
            .collect()
    }
}

/// Resolves service references against a [`ServiceStore`].
#[derive(Debug)]
pub struct Resolver<'a> {
    store: &'a ServiceStore,
    bare_name_references: bool,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `store`.
    #[must_use]
    pub const fn new(store: &'a ServiceStore, config: &PlannerConfig) -> Self {
        Self {
            store,
            bare_name_references: config.bare_name_references,
        }
    }

    /// Resolves `spec` treating every referenced service as running.
    ///
    /// # Errors
    ///
    /// Returns [`StackplanError::UnresolvedReference`] if a reference names
    /// an undeclared service or asks for the port of a service without ports.
    pub fn resolve(&self, spec: &ServiceSpec) -> Result<ResolvedSpec> {
        self.resolve_inner(spec, None)
    }

    /// Resolves `spec` given the set of services already running.
    ///
    /// Values referencing a service outside `running` become
    /// [`Binding::Deferred`].
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve`].
    pub fn resolve_with(
        &self,
        spec: &ServiceSpec,
        running: &BTreeSet<String>,
    ) -> Result<ResolvedSpec> {
        self.resolve_inner(spec, Some(running))
    }

    fn resolve_inner(
        &self,
        spec: &ServiceSpec,
        running: Option<&BTreeSet<String>>,
    ) -> Result<ResolvedSpec> {
        let mut environment = BTreeMap::new();
        for (key, raw) in &spec.environment {
            let binding = self.resolve_value(spec, raw, running)?;
            tracing::debug!(service = %spec.name, key = %key, ?binding, "resolved environment value");
            let _ = environment.insert(key.clone(), binding);
        }

        Ok(ResolvedSpec {
            name: spec.name.clone(),
            image: spec.image.clone(),
            build: spec.build.clone(),
            volumes: spec.volumes.clone(),
            ports: spec.ports.clone(),
            command: spec.command.clone(),
            environment,
        })
    }

    fn resolve_value(
        &self,
        spec: &ServiceSpec,
        raw: &str,
        running: Option<&BTreeSet<String>>,
    ) -> Result<Binding> {
        let segments = reference::scan_value(
            raw,
            &spec.name,
            |name| self.store.contains(name),
            self.bare_name_references,
        );

        let mut value = String::with_capacity(raw.len());
        let mut waiting_on: Vec<String> = Vec::new();
        for seg in &segments {
            match seg {
                Segment::Literal(text) => value.push_str(text),
                Segment::Ref(reference) => {
                    let target = self.target(spec, reference)?;
                    if running.is_some_and(|r| !r.contains(&target.name)) {
                        if !waiting_on.contains(&target.name) {
                            waiting_on.push(target.name.clone());
                        }
                        continue;
                    }
                    value.push_str(&attribute_value(spec, target, reference)?);
                }
            }
        }

        if waiting_on.is_empty() {
            Ok(Binding::Concrete { value })
        } else {
            Ok(Binding::Deferred {
                template: reference::render_template(&segments),
                waiting_on,
            })
        }
    }

    fn target(&self, spec: &ServiceSpec, reference: &Reference) -> Result<&'a ServiceSpec> {
        self.store
            .get(&reference.service)
            .map_err(|_| StackplanError::UnresolvedReference {
                service: spec.name.clone(),
                reference: reference.to_string(),
                reason: format!("service \"{}\" is not declared", reference.service),
            })
    }
}

fn attribute_value(spec: &ServiceSpec, target: &ServiceSpec, reference: &Reference) -> Result<String> {
    let port = || {
        target
            .primary_port()
            .ok_or_else(|| StackplanError::UnresolvedReference {
                service: spec.name.clone(),
                reference: reference.to_string(),
                reason: format!("service \"{}\" exposes no port", target.name),
            })
    };
    match reference.attribute {
        Attribute::Host => Ok(target.name.clone()),
        Attribute::Port => Ok(port()?.to_string()),
        Attribute::Address => Ok(format!("{}:{}", target.name, port()?)),
    }
}
