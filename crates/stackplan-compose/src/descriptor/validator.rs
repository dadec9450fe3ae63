//! Static analysis of a loaded descriptor.
//!
//! Checks for malformed or duplicate names, services with nothing to run,
//! and references to services that are not declared.

use std::collections::HashSet;

use stackplan_common::error::{StackplanError, Result};
use stackplan_common::types::is_valid_service_name;

use crate::model::Descriptor;
use crate::reference::{self, Segment};

/// Validates a descriptor for semantic correctness.
///
/// # Checks performed
///
/// 1. Service names are well formed and unique.
/// 2. Every service declares an `image` or a `build`.
/// 3. Every `${service.attribute}` placeholder, `depends_on` and `links`
///    entry names a declared service.
///
/// # Errors
///
/// Returns an error if any check fails; undeclared references yield
/// [`StackplanError::NotFound`].
pub fn validate(descriptor: &Descriptor) -> Result<()> {
    tracing::info!(services = descriptor.services.len(), "validating descriptor");
    check_service_names(descriptor)?;
    check_image_or_build(descriptor)?;
    check_references(descriptor)?;
    Ok(())
}

fn check_service_names(descriptor: &Descriptor) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in &descriptor.services {
        if !is_valid_service_name(&spec.name) {
            return Err(StackplanError::Config {
                message: format!("invalid service name: \"{}\"", spec.name),
            });
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(StackplanError::Config {
                message: format!("duplicate service name: \"{}\"", spec.name),
            });
        }
    }
    Ok(())
}

fn check_image_or_build(descriptor: &Descriptor) -> Result<()> {
    for spec in &descriptor.services {
        if spec.image.is_none() && spec.build.is_none() {
            return Err(StackplanError::Config {
                message: format!("service \"{}\" has neither image nor build", spec.name),
            });
        }
    }
    Ok(())
}

fn check_references(descriptor: &Descriptor) -> Result<()> {
    let names: HashSet<&str> = descriptor
        .services
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    let undeclared = |service: &str, target: &str, via: String| StackplanError::NotFound {
        kind: "service",
        id: format!("\"{target}\" (referenced by \"{service}\" in {via})"),
    };

    for spec in &descriptor.services {
        for target in &spec.depends_on {
            if !names.contains(target.as_str()) {
                return Err(undeclared(&spec.name, target, "depends_on".into()));
            }
        }
        for target in spec.link_targets() {
            if !names.contains(target) {
                return Err(undeclared(&spec.name, target, "links".into()));
            }
        }
        for (key, value) in &spec.environment {
            for seg in reference::parse_value(value) {
                if let Segment::Ref(r) = seg {
                    if !names.contains(r.service.as_str()) {
                        return Err(undeclared(
                            &spec.name,
                            &r.service,
                            format!("environment {key}"),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}
