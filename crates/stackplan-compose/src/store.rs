//! Read-only service definition store.

use std::collections::HashMap;

use stackplan_common::error::{StackplanError, Result};

use crate::model::{Descriptor, ServiceSpec};

/// Service definitions indexed by name, in declaration order.
///
/// The store is immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ServiceStore {
    services: Vec<ServiceSpec>,
    index: HashMap<String, usize>,
}

impl ServiceStore {
    /// Builds a store from services in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if two services share a name.
    pub fn new(services: Vec<ServiceSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(services.len());
        for (position, spec) in services.iter().enumerate() {
            if index.insert(spec.name.clone(), position).is_some() {
                return Err(StackplanError::Config {
                    message: format!("duplicate service name: \"{}\"", spec.name),
                });
            }
        }
        tracing::debug!(services = services.len(), "service store built");
        Ok(Self { services, index })
    }

    /// Builds a store from a loaded descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if two services share a name.
    pub fn from_descriptor(descriptor: Descriptor) -> Result<Self> {
        Self::new(descriptor.services)
    }

    /// Looks up a service by name.
    ///
    /// # Errors
    ///
    /// Returns [`StackplanError::NotFound`] if no service has that name.
    pub fn get(&self, name: &str) -> Result<&ServiceSpec> {
        self.index
            .get(name)
            .map(|&position| &self.services[position])
            .ok_or_else(|| StackplanError::NotFound {
                kind: "service",
                id: name.to_string(),
            })
    }

    /// Returns every service in declaration order.
    #[must_use]
    pub fn all(&self) -> &[ServiceSpec] {
        &self.services
    }

    /// Returns `true` if a service with that name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the declaration index of a service.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns service names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name.as_str())
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the store holds no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ServiceStore {
        ServiceStore::new(vec![
            ServiceSpec::with_image("rdb", "rethinkdb"),
            ServiceSpec::with_image("bdb-server", "bigchaindb/bigchaindb"),
        ])
        .expect("should build")
    }

    #[test]
    fn get_existing_service() {
        let store = store();
        let spec = store.get("rdb").expect("rdb");
        assert_eq!(spec.image.as_deref(), Some("rethinkdb"));
    }

    #[test]
    fn get_missing_service_is_not_found() {
        let err = store().get("ghost").unwrap_err();
        assert!(matches!(err, StackplanError::NotFound { kind: "service", ref id } if id == "ghost"));
    }

    #[test]
    fn all_keeps_declaration_order() {
        let store = store();
        let names: Vec<&str> = store.names().collect();
        assert_eq!(names, vec!["rdb", "bdb-server"]);
        assert_eq!(store.all().len(), 2);
        assert_eq!(store.position("bdb-server"), Some(1));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ServiceStore::new(vec![
            ServiceSpec::with_image("db", "a"),
            ServiceSpec::with_image("db", "b"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate service name"), "got: {err}");
    }

    #[test]
    fn empty_store() {
        let store = ServiceStore::default();
        assert!(store.is_empty());
        assert!(!store.contains("anything"));
    }
}
