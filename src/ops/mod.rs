//! High-level operations.
//!
//! This module contains the package assembler, the descriptor generator and
//! the pipeline that drives them after a build.

pub mod assemble;
pub mod descriptors;
pub mod package;

pub use assemble::{assemble, check_outside_managed, AssembleReport};
pub use descriptors::{generate_descriptors, render_descriptors, ModuleDescriptor, TemplateSet};
pub use package::{build, collect_libs, package, PackageOptions, PackageReport, PipelineError, Stage};
