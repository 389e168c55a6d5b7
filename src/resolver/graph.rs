//! The externally resolved dependency graph.
//!
//! Installing dependencies is the package manager's job. What it hands back
//! is, per requirement, the version it installed and the root directory it
//! installed into. [`StaticGraph`] is that answer as a plain table, either
//! built in memory or read from an `installed.toml`:
//!
//! ```toml
//! [deps.zlib]
//! version = "1.2.11"
//! root = "/opt/conan/zlib"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::requirement::Requirement;

/// Where and at which version a requirement was installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledDependency {
    pub version: String,
    pub root: PathBuf,
}

/// Answers "was this requirement installed, and where?".
pub trait DependencyGraph {
    fn installed(&self, req: &Requirement) -> Option<InstalledDependency>;
}

/// An in-memory dependency graph keyed by package name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticGraph {
    #[serde(default)]
    deps: BTreeMap<String, InstalledDependency>,
}

impl StaticGraph {
    pub fn new() -> Self {
        StaticGraph::default()
    }

    /// Record an installed dependency.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        root: impl Into<PathBuf>,
    ) {
        self.deps.insert(
            name.into(),
            InstalledDependency {
                version: version.into(),
                root: root.into(),
            },
        );
    }

    /// Forget a dependency.
    pub fn remove(&mut self, name: &str) -> Option<InstalledDependency> {
        self.deps.remove(name)
    }

    /// Load a graph from an `installed.toml` file.
    ///
    /// Relative roots are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dependency graph: {}", path.display()))?;
        let mut graph: StaticGraph = toml::from_str(&contents)
            .with_context(|| format!("failed to parse dependency graph: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for dep in graph.deps.values_mut() {
            if dep.root.is_relative() {
                dep.root = base.join(&dep.root);
            }
        }

        tracing::debug!("loaded {} installed dependencies", graph.deps.len());
        Ok(graph)
    }
}

impl DependencyGraph for StaticGraph {
    fn installed(&self, req: &Requirement) -> Option<InstalledDependency> {
        self.deps.get(&req.name).cloned()
    }
}
