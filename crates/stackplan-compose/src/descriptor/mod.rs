//! Compose descriptor loading built on `serde_yaml`.
//!
//! Transforms raw descriptor text into validated [`Descriptor`]s through
//! deserialization, short-syntax decoding, and static analysis.

pub mod raw;
pub mod syntax;
pub mod validator;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stackplan_common::constants::{DESCRIPTOR_FILE_NAMES, SUPPORTED_VERSION_MAJORS};
use stackplan_common::error::{StackplanError, Result};
use stackplan_common::types::{BuildContext, Command};

use self::raw::{
    RawBuild, RawCommand, RawDependsOn, RawDescriptor, RawEnvironment, RawPort, RawService,
};
use crate::model::{Descriptor, ServiceSpec};

const fn config_err(message: String) -> StackplanError {
    StackplanError::Config { message }
}

/// Parses a descriptor from its YAML text.
///
/// # Errors
///
/// Returns an error if the YAML is malformed, an entry uses an unsupported
/// form, or validation fails.
pub fn parse_descriptor(input: &str) -> Result<Descriptor> {
    tracing::info!("parsing descriptor");
    if input.trim().is_empty() {
        return Ok(Descriptor::default());
    }

    let raw: RawDescriptor = serde_yaml::from_str(input)?;
    let version = raw.version.as_ref().map(parse_version).transpose()?;

    let mut services = Vec::with_capacity(raw.services.len());
    for (key, value) in raw.services {
        let name = key
            .as_str()
            .ok_or_else(|| config_err(format!("service name must be a string, got {key:?}")))?
            .to_string();
        let raw_service: RawService = if value.is_null() {
            RawService::default()
        } else {
            serde_yaml::from_value(value)?
        };
        services.push(lower_service(name, raw_service)?);
    }

    let descriptor = Descriptor { version, services };
    validator::validate(&descriptor)?;
    Ok(descriptor)
}

/// Reads and parses a descriptor file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_descriptor(path: &Path) -> Result<Descriptor> {
    tracing::info!(path = %path.display(), "loading descriptor");
    let content = std::fs::read_to_string(path).map_err(|e| StackplanError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_descriptor(&content)
}

/// Finds the descriptor file in `dir` using the conventional file names.
///
/// # Errors
///
/// Returns [`StackplanError::NotFound`] if none of the names exist.
pub fn find_descriptor(dir: &Path) -> Result<PathBuf> {
    DESCRIPTOR_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| StackplanError::NotFound {
            kind: "descriptor",
            id: format!("no {} in {}", DESCRIPTOR_FILE_NAMES.join(", "), dir.display()),
        })
}

fn parse_version(value: &serde_yaml::Value) -> Result<String> {
    let version = raw::scalar_to_string(value)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| config_err(format!("invalid version: {value:?}")))?;
    let major = version.split('.').next().unwrap_or_default();
    if !SUPPORTED_VERSION_MAJORS.contains(&major) {
        return Err(config_err(format!(
            "unsupported descriptor version \"{version}\" (supported: {})",
            SUPPORTED_VERSION_MAJORS.join(", ")
        )));
    }
    Ok(version)
}

fn lower_service(name: String, raw: RawService) -> Result<ServiceSpec> {
    for key in raw.unsupported.keys() {
        tracing::warn!(service = %name, option = %key, "ignoring unsupported service option");
    }

    let build = raw.build.map(|b| match b {
        RawBuild::Context(context) => BuildContext {
            context: PathBuf::from(context),
            dockerfile: None,
        },
        RawBuild::Detailed {
            context,
            dockerfile,
        } => BuildContext {
            context: PathBuf::from(context),
            dockerfile: dockerfile.map(PathBuf::from),
        },
    });

    let ports = raw
        .ports
        .iter()
        .map(|p| match p {
            RawPort::Number(0) => Err(config_err(format!(
                "invalid port \"0\" in service \"{name}\""
            ))),
            RawPort::Number(n) => Ok(stackplan_common::types::PortBinding::container(*n)),
            RawPort::Text(text) => syntax::parse_port(text),
        })
        .collect::<Result<Vec<_>>>()?;

    let volumes = raw
        .volumes
        .iter()
        .map(|v| syntax::parse_volume(v))
        .collect::<Result<Vec<_>>>()?;

    let environment = match raw.environment {
        None => BTreeMap::new(),
        Some(env) => lower_environment(&name, env)?,
    };

    let depends_on = match raw.depends_on {
        None => Vec::new(),
        Some(deps) => lower_depends_on(&name, deps)?,
    };

    let command = raw.command.map(|c| match c {
        RawCommand::Shell(line) => Command::Shell(line),
        RawCommand::Exec(args) => Command::Exec(args),
    });

    tracing::debug!(service = %name, ports = ports.len(), volumes = volumes.len(), "loaded service");
    Ok(ServiceSpec {
        name,
        image: raw.image,
        build,
        volumes,
        environment,
        ports,
        command,
        depends_on,
        links: raw.links,
    })
}

fn lower_depends_on(service: &str, deps: RawDependsOn) -> Result<Vec<String>> {
    match deps {
        RawDependsOn::List(names) => Ok(names),
        RawDependsOn::Map(map) => map
            .into_iter()
            .map(|(key, options)| {
                let target = key.as_str().map(str::to_string).ok_or_else(|| {
                    config_err(format!(
                        "depends_on entry of service \"{service}\" must be a name, got {key:?}"
                    ))
                })?;
                if let serde_yaml::Value::Mapping(options) = &options {
                    for option in options.keys() {
                        tracing::warn!(
                            service = %service,
                            dependency = %target,
                            option = ?option,
                            "ignoring unsupported depends_on option"
                        );
                    }
                }
                Ok::<_, StackplanError>(target)
            })
            .collect(),
    }
}

fn lower_environment(service: &str, env: RawEnvironment) -> Result<BTreeMap<String, String>> {
    match env {
        RawEnvironment::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = raw::scalar_to_string(&value).ok_or_else(|| {
                    config_err(format!(
                        "environment {key} of service \"{service}\" must be a scalar"
                    ))
                })?;
                Ok::<_, StackplanError>((key, value))
            })
            .collect(),
        RawEnvironment::List(entries) => Ok(entries
            .into_iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry, String::new()),
            })
            .collect()),
    }
}
