//! Configuration resolver.
//!
//! Derives the effective build parameters from platform settings, build
//! options and the dependency graph produced by the external package
//! manager. Transitive resolution is not done here.

pub mod graph;
pub mod resolve;

pub use graph::{DependencyGraph, InstalledDependency, StaticGraph};
pub use resolve::{build_type_label, resolve, ResolvedConfiguration};
