//! Architecture to toolchain-platform mapping.
//!
//! The native toolchain names its platforms differently from the recipe
//! (`x86` builds as `Win32`, `x86_64` as `x64`). Both the build
//! orchestrator and the package assembler look tokens up here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::RecipeError;
use crate::core::settings::Arch;

/// Lookup table from internal architecture name to toolchain platform token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchMap {
    tokens: BTreeMap<String, String>,
}

impl ArchMap {
    pub fn new(tokens: BTreeMap<String, String>) -> Self {
        ArchMap { tokens }
    }

    /// The toolchain platform token for `arch`.
    pub fn platform_token(&self, arch: &Arch) -> Result<&str, RecipeError> {
        self.tokens
            .get(arch.as_str())
            .map(String::as_str)
            .ok_or_else(|| RecipeError::UnsupportedArchitecture {
                arch: arch.to_string(),
                known: self.tokens.keys().cloned().collect(),
            })
    }

    /// Internal architecture names with a mapping.
    pub fn architectures(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }
}
