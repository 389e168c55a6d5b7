//! Requirement declarations - WHAT the recipe depends on.
//!
//! A requirement pins one package to an exact version within an origin
//! namespace (`user/channel`). Resolving and installing requirements is the
//! job of the external package manager; this module only declares intent.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::RecipeError;
use crate::core::recipe::Recipe;

/// Characters that turn a version pin into a range.
const RANGE_CHARS: &[char] = &['^', '~', '>', '<', '*', '=', ',', '|', ' '];

/// One pinned dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub version: String,
    pub origin: String,
}

impl Requirement {
    /// Create a requirement, rejecting version ranges.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        origin: impl Into<String>,
    ) -> Result<Self, RecipeError> {
        let req = Requirement {
            name: name.into(),
            version: version.into(),
            origin: origin.into(),
        };

        let invalid = |reason: &str| RecipeError::InvalidRequirement {
            requirement: req.to_string(),
            reason: reason.to_string(),
        };

        if req.name.is_empty() || req.name.contains(['/', '@']) {
            return Err(invalid("name must be non-empty and contain no `/` or `@`"));
        }
        if req.version.is_empty() || req.version.contains(RANGE_CHARS) {
            return Err(invalid("versions must be exact pins, not ranges"));
        }
        if req.origin.split('/').count() != 2 || req.origin.split('/').any(str::is_empty) {
            return Err(invalid("origin must be `user/channel`"));
        }

        Ok(req)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.name, self.version, self.origin)
    }
}

impl std::str::FromStr for Requirement {
    type Err = RecipeError;

    /// Parse `name/version@user/channel`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RecipeError::InvalidRequirement {
            requirement: s.to_string(),
            reason: "expected `name/version@user/channel`".to_string(),
        };

        let (reference, origin) = s.split_once('@').ok_or_else(malformed)?;
        let (name, version) = reference.split_once('/').ok_or_else(malformed)?;
        Requirement::new(name, version, origin)
    }
}

/// Ordered set of requirements, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementSet {
    entries: Vec<Requirement>,
}

impl RequirementSet {
    /// Build a set, failing on duplicate names.
    pub fn new(entries: Vec<Requirement>) -> Result<Self, RecipeError> {
        let mut seen = HashSet::new();
        for req in &entries {
            if !seen.insert(req.name.as_str()) {
                return Err(RecipeError::InvalidRequirement {
                    requirement: req.to_string(),
                    reason: format!("`{}` is declared more than once", req.name),
                });
            }
        }
        Ok(RequirementSet { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Requirement> {
        self.entries.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = &'a Requirement;
    type IntoIter = std::slice::Iter<'a, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The requirements of the built-in FFmpeg recipe.
pub fn declare_requirements() -> Result<RequirementSet, RecipeError> {
    Recipe::embedded()?.requirements()
}
