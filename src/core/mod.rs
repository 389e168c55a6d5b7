//! Core data structures for ffpack.
//!
//! This module contains the foundational types used throughout the engine:
//! - Platform settings and build options
//! - Requirement declarations and the recipe table
//! - The architecture table and package layout
//! - The error type shared by every stage

pub mod errors;
pub mod layout;
pub mod options;
pub mod platform;
pub mod recipe;
pub mod requirement;
pub mod settings;

pub use errors::RecipeError;
pub use layout::PackageLayout;
pub use options::{derive_options, BuildOptions, LinkMode};
pub use platform::ArchMap;
pub use recipe::{ModuleSpec, Recipe};
pub use requirement::{declare_requirements, Requirement, RequirementSet};
pub use settings::{Arch, BuildType, CompilerSettings, Os, PlatformSettings};
