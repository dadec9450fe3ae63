//! Domain primitive types used across the stackplan workspace.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP (the default).
    #[default]
    Tcp,
    /// UDP.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// A port exposed by a service, optionally published on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Host interface to bind, if restricted.
    pub host_ip: Option<String>,
    /// Host port; `None` lets the runtime pick one.
    pub host_port: Option<u16>,
    /// Port inside the container.
    pub container_port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl PortBinding {
    /// Creates a container-only binding over TCP.
    #[must_use]
    pub const fn container(port: u16) -> Self {
        Self {
            host_ip: None,
            host_port: None,
            container_port: port,
            protocol: Protocol::Tcp,
        }
    }

    /// Creates a `host:container` binding over TCP.
    #[must_use]
    pub const fn published(host: u16, container: u16) -> Self {
        Self {
            host_ip: None,
            host_port: Some(host),
            container_port: container,
            protocol: Protocol::Tcp,
        }
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = &self.host_ip {
            write!(f, "{ip}:")?;
        }
        match self.host_port {
            Some(host) => write!(f, "{host}:")?,
            None if self.host_ip.is_some() => write!(f, ":")?,
            None => {}
        }
        write!(f, "{}", self.container_port)?;
        if self.protocol != Protocol::Tcp {
            write!(f, "/{}", self.protocol)?;
        }
        Ok(())
    }
}

/// A volume mounted into a service container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Host path or named volume; `None` for an anonymous volume.
    pub source: Option<String>,
    /// Mount point inside the container.
    pub target: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

impl VolumeMount {
    /// Returns `true` when the source is a host path rather than a named volume.
    #[must_use]
    pub fn is_bind(&self) -> bool {
        self.source
            .as_deref()
            .is_some_and(|s| s.starts_with('.') || s.starts_with('/') || s.starts_with('~'))
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{source}:")?;
        }
        write!(f, "{}", self.target)?;
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

/// Build instructions for a service without a prebuilt image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    /// Build context directory.
    pub context: PathBuf,
    /// Dockerfile path, relative to the context.
    pub dockerfile: Option<PathBuf>,
}

/// Command overriding the image default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Shell form, split by the runtime.
    Shell(String),
    /// Exec form, one argument per element.
    Exec(Vec<String>),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(line) => write!(f, "{line}"),
            Self::Exec(args) => write!(f, "{}", args.join(" ")),
        }
    }
}

/// Returns `true` if `name` is a well-formed service name.
#[must_use]
pub fn is_valid_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            c.is_ascii_alphanumeric() || crate::constants::SERVICE_NAME_EXTRA_CHARS.contains(&c)
        })
}
