//! Immutable service definitions produced by the descriptor loader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackplan_common::types::{BuildContext, Command, PortBinding, VolumeMount};

/// A loaded descriptor: schema version plus services in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Value of the top-level `version` key.
    pub version: Option<String>,
    /// Service definitions in declaration order.
    pub services: Vec<ServiceSpec>,
}

/// One service as declared in the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name, unique within the descriptor.
    pub name: String,
    /// Prebuilt image reference.
    pub image: Option<String>,
    /// Build instructions when the image is built locally.
    pub build: Option<BuildContext>,
    /// Volume mounts in declaration order.
    pub volumes: Vec<VolumeMount>,
    /// Environment variables.
    pub environment: BTreeMap<String, String>,
    /// Exposed and published ports in declaration order.
    pub ports: Vec<PortBinding>,
    /// Command override.
    pub command: Option<Command>,
    /// Services that must start first.
    pub depends_on: Vec<String>,
    /// Linked services (`service` or `service:alias`).
    pub links: Vec<String>,
}

impl ServiceSpec {
    /// Creates an image-based service with no other attributes.
    #[must_use]
    pub fn with_image(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: Some(image.into()),
            ..Self::default()
        }
    }

    /// Returns the first container port, used as the service's address port.
    #[must_use]
    pub fn primary_port(&self) -> Option<u16> {
        self.ports.first().map(|p| p.container_port)
    }

    /// Returns the service names targeted by `links`, without aliases.
    pub fn link_targets(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .map(|link| link.split_once(':').map_or(link.as_str(), |(name, _)| name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_port_is_first_container_port() {
        let spec = ServiceSpec {
            ports: vec![PortBinding::published(58585, 8080), PortBinding::container(28015)],
            ..ServiceSpec::with_image("rdb", "rethinkdb")
        };
        assert_eq!(spec.primary_port(), Some(8080));
        assert_eq!(ServiceSpec::with_image("x", "y").primary_port(), None);
    }

    #[test]
    fn link_targets_strip_alias() {
        let spec = ServiceSpec {
            links: vec!["rdb:database".into(), "cache".into()],
            ..ServiceSpec::with_image("api", "api")
        };
        let targets: Vec<&str> = spec.link_targets().collect();
        assert_eq!(targets, vec!["rdb", "cache"]);
    }
}
