//! System-wide constants and default names.

/// Descriptor file names looked up, in order, when no file is given.
pub const DESCRIPTOR_FILE_NAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Major schema versions accepted in the top-level `version` key.
pub const SUPPORTED_VERSION_MAJORS: &[&str] = &["2", "3"];

/// Environment variable naming the descriptor file.
pub const ENV_DESCRIPTOR_FILE: &str = "STACKPLAN_FILE";

/// Environment variable naming the project directory.
pub const ENV_PROJECT_DIR: &str = "STACKPLAN_PROJECT_DIR";

/// Characters allowed in a service name besides ASCII alphanumerics.
pub const SERVICE_NAME_EXTRA_CHARS: &[char] = &['_', '-', '.'];
