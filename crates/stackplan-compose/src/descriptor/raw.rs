//! Serde shapes of the supported Compose schema subset.
//!
//! These mirror the YAML as written; [`super::parse_descriptor`] lowers
//! them into [`crate::model::ServiceSpec`]s.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Root of a Compose document.
#[derive(Debug, Deserialize)]
pub struct RawDescriptor {
    /// Schema version, written as a string or a number.
    #[serde(default)]
    pub version: Option<serde_yaml::Value>,
    /// Services keyed by name. A `Mapping` keeps declaration order.
    #[serde(default)]
    pub services: serde_yaml::Mapping,
}

/// A single entry of the `services` mapping.
#[derive(Debug, Default, Deserialize)]
pub struct RawService {
    /// `image` option.
    #[serde(default)]
    pub image: Option<String>,
    /// `build` option.
    #[serde(default)]
    pub build: Option<RawBuild>,
    /// `volumes` option, short syntax only.
    #[serde(default)]
    pub volumes: Vec<String>,
    /// `environment` option.
    #[serde(default)]
    pub environment: Option<RawEnvironment>,
    /// `ports` option.
    #[serde(default)]
    pub ports: Vec<RawPort>,
    /// `command` option.
    #[serde(default)]
    pub command: Option<RawCommand>,
    /// `depends_on` option.
    #[serde(default)]
    pub depends_on: Option<RawDependsOn>,
    /// `links` option.
    #[serde(default)]
    pub links: Vec<String>,
    /// Every option this loader does not interpret.
    #[serde(flatten)]
    pub unsupported: BTreeMap<String, serde_yaml::Value>,
}

/// `build: <context>` or `build: { context, dockerfile }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawBuild {
    /// Context directory only.
    Context(String),
    /// Long form.
    Detailed {
        /// Build context directory.
        #[serde(default = "default_context")]
        context: String,
        /// Dockerfile path.
        #[serde(default)]
        dockerfile: Option<String>,
    },
}

fn default_context() -> String {
    ".".to_string()
}

/// `environment` as a mapping or as a `KEY=VALUE` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawEnvironment {
    /// Mapping form; values may be any scalar or null.
    Map(BTreeMap<String, serde_yaml::Value>),
    /// List form.
    List(Vec<String>),
}

/// A `ports` entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawPort {
    /// Bare container port number.
    Number(u16),
    /// Short syntax string.
    Text(String),
}

/// `depends_on` as a list of names or a mapping of names to conditions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawDependsOn {
    /// List form.
    List(Vec<String>),
    /// Mapping form; only the keys are used.
    Map(serde_yaml::Mapping),
}

/// `command` as a shell string or an argument list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawCommand {
    /// Shell form.
    Shell(String),
    /// Exec form.
    Exec(Vec<String>),
}

/// Renders a YAML scalar the way it would appear in the environment.
pub fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
