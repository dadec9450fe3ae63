//! # stackplan-compose
//!
//! Turns a Compose descriptor into an ordered startup plan.
//!
//! Handles:
//! - **Descriptor**: Loading and validating the supported Compose subset.
//! - **Store**: Read-only lookup of service definitions by name.
//! - **Reference**: The `${service.attribute}` and bare-name reference grammar.
//! - **Resolver**: Substitution of references with addresses or deferred bindings.
//! - **Graph**: Dependency graph with stable topological ordering.
//! - **Planner**: Startup ordering and launch step emission.

pub mod descriptor;
pub mod graph;
pub mod model;
pub mod planner;
pub mod reference;
pub mod resolver;
pub mod store;
