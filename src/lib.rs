//! ffpack - build and package recipe engine for the FFmpeg libraries
//!
//! This crate resolves platform settings and build options into a build
//! configuration, drives the native toolchain, and assembles headers,
//! binaries, licenses and pkg-config descriptors into an installable package.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test doubles and fixture trees for ffpack unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    derive_options, BuildOptions, LinkMode, PackageLayout, PlatformSettings, Recipe, RecipeError,
    RequirementSet,
};

pub use crate::resolver::{resolve, ResolvedConfiguration};
