//! Test utilities and doubles for ffpack unit tests.
//!
//! The native toolchain and the external dependency graph are the two seams
//! that cannot run inside a unit test. This module provides stand-ins for
//! both, plus fixture trees shaped like a real source checkout and a real
//! toolchain output directory.

pub mod fixtures;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::builder::toolchain::{BuildDescriptor, Toolchain, ToolchainError};
use crate::core::requirement::RequirementSet;
use crate::resolver::graph::StaticGraph;

pub use fixtures::*;

/// A dependency graph where every requirement is installed under `base`.
///
/// Each dependency gets `include/` and `lib/` directories so the resolved
/// search paths point at real locations.
pub fn installed_graph(base: &Path, requirements: &RequirementSet) -> StaticGraph {
    let mut graph = StaticGraph::new();
    for req in requirements {
        let root = base.join(&req.name);
        fs::create_dir_all(root.join("include")).unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();
        graph.insert(&req.name, &req.version, root);
    }
    graph
}

/// One recorded toolchain invocation.
#[derive(Debug, Clone)]
pub struct ToolchainCall {
    pub descriptor: BuildDescriptor,
    /// Value of the watched include variable at invocation time.
    pub include: Option<OsString>,
}

/// Toolchain double that records invocations instead of building.
#[derive(Debug)]
pub struct RecordingToolchain {
    include_env: String,
    calls: Mutex<Vec<ToolchainCall>>,
    failure: Mutex<Option<ToolchainError>>,
    produce: Option<PathBuf>,
}

impl RecordingToolchain {
    /// Record calls, capturing `include_env` at each one.
    pub fn new(include_env: impl Into<String>) -> Self {
        RecordingToolchain {
            include_env: include_env.into(),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            produce: None,
        }
    }

    /// Fail the first invocation with `error`.
    pub fn failing(include_env: impl Into<String>, error: ToolchainError) -> Self {
        let toolchain = RecordingToolchain::new(include_env);
        *toolchain.failure.lock().unwrap() = Some(error);
        toolchain
    }

    /// Write a toolchain output tree into `output_dir` on success.
    pub fn producing(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.produce = Some(output_dir.into());
        self
    }

    pub fn calls(&self) -> Vec<ToolchainCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Toolchain for RecordingToolchain {
    fn name(&self) -> &str {
        "recording"
    }

    fn invoke(&self, descriptor: &BuildDescriptor) -> Result<(), ToolchainError> {
        self.calls.lock().unwrap().push(ToolchainCall {
            descriptor: descriptor.clone(),
            include: std::env::var_os(&self.include_env),
        });

        if let Some(err) = self.failure.lock().unwrap().take() {
            return Err(err);
        }

        if let Some(ref dir) = self.produce {
            write_msvc_output(dir, &[descriptor.platform.as_str()]);
        }
        Ok(())
    }
}
