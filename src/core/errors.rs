//! Recipe error types and diagnostics.
//!
//! Every error raised by the recipe engine is fatal: it aborts the whole
//! resolve/build/package sequence and is never retried.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error raised by the configuration resolver, build orchestrator,
/// package assembler or metadata generator.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum RecipeError {
    /// An option was queried or set that does not exist for this platform.
    #[error("option `{option}` is not available: {reason}")]
    #[diagnostic(code(ffpack::options::configuration))]
    Configuration { option: String, reason: String },

    /// One or more declared requirements are not satisfied by the
    /// externally resolved dependency graph.
    #[error("unresolved dependencies: {}", .missing.join(", "))]
    #[diagnostic(code(ffpack::resolve::unresolved_dependency))]
    UnresolvedDependency { missing: Vec<String> },

    /// The target architecture has no toolchain platform token.
    #[error("unsupported architecture `{arch}`")]
    #[diagnostic(code(ffpack::platform::unsupported_architecture))]
    UnsupportedArchitecture { arch: String, known: Vec<String> },

    /// An output module has no pinned version.
    #[error("no version pinned for module `{module}`")]
    #[diagnostic(code(ffpack::metadata::missing_version))]
    MissingVersion { module: String },

    /// The native toolchain failed.
    #[error(transparent)]
    #[diagnostic(code(ffpack::build::toolchain))]
    Toolchain(#[from] crate::builder::toolchain::ToolchainError),

    /// A source patch could not be applied.
    #[error("failed to patch `{}`: {message}", .file.display())]
    #[diagnostic(code(ffpack::build::patch))]
    Patch { file: PathBuf, message: String },

    /// A requirement declaration is malformed.
    #[error("invalid requirement `{requirement}`: {reason}")]
    #[diagnostic(code(ffpack::recipe::invalid_requirement))]
    InvalidRequirement { requirement: String, reason: String },

    /// The recipe data itself is malformed.
    #[error("invalid recipe: {0}")]
    #[diagnostic(code(ffpack::recipe::invalid))]
    InvalidRecipe(String),

    /// The upstream source tree could not be made available.
    #[error("failed to fetch source: {0}")]
    #[diagnostic(code(ffpack::source::fetch))]
    Source(String),

    /// A previous build attempt failed against this source tree.
    #[error("source tree `{}` is left over from a failed build", .path.display())]
    #[diagnostic(code(ffpack::build::tainted_source))]
    TaintedSource { path: PathBuf },

    /// A build input lives inside a directory the package assembler replaces.
    #[error("`{}` is inside the package directory `{}`", .path.display(), .managed.display())]
    #[diagnostic(code(ffpack::assemble::overlapping_output))]
    OverlappingOutput { path: PathBuf, managed: PathBuf },

    /// Filesystem failure while patching, copying or writing descriptors.
    #[error("{context}")]
    #[diagnostic(code(ffpack::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RecipeError {
    /// Wrap an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RecipeError::Io {
            context: context.into(),
            source,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            RecipeError::Configuration { option, reason } => {
                Diagnostic::error(format!("option `{}` is not available", option))
                    .with_context(reason.clone())
                    .with_suggestion(format!(
                        "Remove `{}` from the options for this platform",
                        option
                    ))
            }

            RecipeError::UnresolvedDependency { missing } => {
                let mut diag = Diagnostic::error("the dependency graph is incomplete");
                for req in missing {
                    diag = diag.with_context(format!("`{}` was not resolved", req));
                }
                diag.with_suggestion("Install the missing packages and regenerate installed.toml")
                    .with_suggestion("Check that the pinned versions match the installed ones")
            }

            RecipeError::UnsupportedArchitecture { arch, known } => {
                let mut diag = Diagnostic::error(format!("unsupported architecture `{}`", arch));
                if !known.is_empty() {
                    diag = diag.with_context(format!("supported: {}", known.join(", ")));
                }
                diag.with_suggestion("Add a platform token for it to the recipe's [arch] table")
            }

            RecipeError::MissingVersion { module } => {
                Diagnostic::error(format!("no version pinned for module `{}`", module))
                    .with_context("no descriptor was written")
                    .with_suggestion(format!(
                        "Add a `version` to the `{}` entry in the recipe's [[modules]]",
                        module
                    ))
            }

            RecipeError::Toolchain(err) => Diagnostic::error(err.to_string())
                .with_suggestion("Run with --verbose to see the full toolchain output")
                .with_suggestion("Re-fetch the source tree before retrying"),

            RecipeError::Patch { file, message } => {
                Diagnostic::error(format!("failed to patch source file: {}", message))
                    .with_location(file.clone())
                    .with_suggestion("Re-fetch the source tree before retrying")
            }

            RecipeError::InvalidRequirement {
                requirement,
                reason,
            } => Diagnostic::error(format!("invalid requirement `{}`", requirement))
                .with_context(reason.clone())
                .with_suggestion("Requirements are written as `name/version@user/channel`"),

            RecipeError::InvalidRecipe(message) => {
                Diagnostic::error(format!("invalid recipe: {}", message))
            }

            RecipeError::Source(message) => Diagnostic::error("failed to fetch source")
                .with_context(message.clone())
                .with_suggestion("Pass --source-dir to use an existing checkout")
                .with_suggestion("Drop --offline to allow downloading the archive"),

            RecipeError::TaintedSource { path } => {
                Diagnostic::error("refusing to reuse a source tree from a failed build")
                    .with_location(path.clone())
                    .with_suggestion("Delete the source directory and fetch it again")
            }

            RecipeError::OverlappingOutput { path, managed } => {
                Diagnostic::error("build files would be overwritten by the package")
                    .with_location(path.clone())
                    .with_context(format!("`{}` is replaced on every assembly", managed.display()))
                    .with_suggestion(
                        "Use a --work-dir outside the package's managed directories",
                    )
            }

            RecipeError::Io { context, source } => {
                Diagnostic::error(context.clone()).with_context(source.to_string())
            }
        }
    }
}
