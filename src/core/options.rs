//! Build options - the two user-facing switches.
//!
//! `shared` selects the link mode. `fPIC` only exists on platforms that can
//! toggle position-independent code on its own; elsewhere it is removed from
//! the option set entirely and any query for it is an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::RecipeError;
use crate::core::settings::Os;

/// Name of the link-mode option.
pub const SHARED: &str = "shared";

/// Name of the position-independent-code option.
pub const FPIC: &str = "fPIC";

/// Shared vs static output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Static,
    Shared,
}

impl LinkMode {
    pub fn is_shared(&self) -> bool {
        matches!(self, LinkMode::Shared)
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkMode::Static => f.write_str("static"),
            LinkMode::Shared => f.write_str("shared"),
        }
    }
}

/// The active option set for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildOptions {
    shared: bool,
    /// `None` when the platform has no PIC toggle.
    fpic: Option<bool>,
}

/// Produce the option set valid for `os`, with the recipe defaults
/// (`shared = true`, `fPIC = true`).
pub fn derive_options(os: Os) -> BuildOptions {
    let fpic = if os.has_pic_control() {
        Some(true)
    } else {
        tracing::debug!("removing option `{}` on {}", FPIC, os);
        None
    };

    BuildOptions { shared: true, fpic }
}

impl BuildOptions {
    pub fn shared(&self) -> bool {
        self.shared
    }

    pub fn link_mode(&self) -> LinkMode {
        if self.shared {
            LinkMode::Shared
        } else {
            LinkMode::Static
        }
    }

    /// Query the PIC toggle.
    pub fn fpic(&self) -> Result<bool, RecipeError> {
        self.fpic.ok_or_else(|| removed(FPIC))
    }

    /// Whether `name` is part of the active option set.
    pub fn has_option(&self, name: &str) -> bool {
        match name {
            SHARED => true,
            FPIC => self.fpic.is_some(),
            _ => false,
        }
    }

    /// Names of the active options, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = vec![SHARED];
        if self.fpic.is_some() {
            names.push(FPIC);
        }
        names
    }

    /// Query an option by name.
    pub fn get(&self, name: &str) -> Result<bool, RecipeError> {
        match name {
            SHARED => Ok(self.shared),
            FPIC => self.fpic(),
            _ => Err(unknown(name)),
        }
    }

    /// Set an option by name.
    pub fn set(&mut self, name: &str, value: bool) -> Result<(), RecipeError> {
        match name {
            SHARED => self.shared = value,
            FPIC => match self.fpic.as_mut() {
                Some(fpic) => *fpic = value,
                None => return Err(removed(FPIC)),
            },
            _ => return Err(unknown(name)),
        }
        Ok(())
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_fpic(mut self, fpic: bool) -> Result<Self, RecipeError> {
        self.set(FPIC, fpic)?;
        Ok(self)
    }

    /// The PIC value if the option exists on this platform.
    pub(crate) fn fpic_if_present(&self) -> Option<bool> {
        self.fpic
    }
}

fn removed(option: &str) -> RecipeError {
    RecipeError::Configuration {
        option: option.to_string(),
        reason: "it was removed for the target platform".to_string(),
    }
}

fn unknown(option: &str) -> RecipeError {
    RecipeError::Configuration {
        option: option.to_string(),
        reason: format!("recognized options are `{}` and `{}`", SHARED, FPIC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_has_no_fpic() {
        let opts = derive_options(Os::Windows);

        assert!(!opts.has_option(FPIC));
        assert_eq!(opts.names(), vec![SHARED]);
        assert!(matches!(
            opts.fpic(),
            Err(RecipeError::Configuration { ref option, .. }) if option == FPIC
        ));
        assert!(opts.get(FPIC).is_err());
    }

    #[test]
    fn test_setting_removed_option_fails() {
        let mut opts = derive_options(Os::Windows);
        assert!(opts.set(FPIC, false).is_err());
        assert!(derive_options(Os::Windows).with_fpic(true).is_err());
    }

    #[test]
    fn test_linux_keeps_fpic() {
        let opts = derive_options(Os::Linux).with_fpic(false).unwrap();

        assert!(opts.has_option(FPIC));
        assert!(!opts.fpic().unwrap());
        assert_eq!(opts.names(), vec![SHARED, FPIC]);
    }

    #[test]
    fn test_defaults_and_link_mode() {
        let opts = derive_options(Os::Linux);
        assert!(opts.shared());
        assert!(opts.fpic().unwrap());
        assert_eq!(opts.link_mode(), LinkMode::Shared);

        let opts = opts.with_shared(false);
        assert_eq!(opts.link_mode(), LinkMode::Static);
    }

    #[test]
    fn test_unknown_option() {
        let opts = derive_options(Os::Linux);
        assert!(opts.get("lto").is_err());
    }
}
