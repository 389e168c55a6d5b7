//! Native build driver.
//!
//! Patches the upstream project files, sets up the header search path and
//! invokes the platform toolchain on the vendor solution.

pub mod env;
pub mod orchestrator;
pub mod patch;
pub mod toolchain;

pub use env::EnvOverride;
pub use orchestrator::{BuildOrchestrator, BuildOutput, BuildState};
pub use patch::{apply_patches, Patch, PatchReport};
pub use toolchain::{BuildDescriptor, MsBuild, Toolchain, ToolchainError};
