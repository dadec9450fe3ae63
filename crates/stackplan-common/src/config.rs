//! Planner configuration model.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings that shape how a descriptor is resolved and planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Directory relative bind mounts and build contexts are anchored to.
    pub project_dir: PathBuf,
    /// Treat environment values equal to a service name as host references.
    pub bare_name_references: bool,
}

impl PlannerConfig {
    /// Anchors a relative path at the project directory.
    ///
    /// Leading `.` components are dropped.
    #[must_use]
    pub fn anchor(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let relative: PathBuf = path
            .components()
            .skip_while(|c| matches!(c, Component::CurDir))
            .collect();
        if relative.as_os_str().is_empty() {
            self.project_dir.clone()
        } else {
            self.project_dir.join(relative)
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            bare_name_references: true,
        }
    }
}
