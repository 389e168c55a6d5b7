//! Scoped environment overrides.
//!
//! The toolchain reads its header search path from the process environment.
//! An [`EnvOverride`] sets a variable for as long as the guard lives and puts
//! the previous value back when it is dropped, including on early returns
//! and unwinding.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::core::errors::RecipeError;

/// Guard restoring one environment variable on drop.
#[derive(Debug)]
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct EnvOverride {
    key: OsString,
    previous: Option<OsString>,
}

impl EnvOverride {
    /// Set `key` to `value` until the guard is dropped.
    pub fn set(key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        let key = key.as_ref().to_os_string();
        let previous = env::var_os(&key);
        env::set_var(&key, value);
        EnvOverride { key, previous }
    }

    /// Prepend `paths` to the path list in `key`, keeping existing entries.
    pub fn prepend_paths(
        key: impl AsRef<OsStr>,
        paths: &[PathBuf],
    ) -> Result<Self, RecipeError> {
        let key = key.as_ref();
        let mut entries: Vec<PathBuf> = paths.to_vec();
        if let Some(existing) = env::var_os(key) {
            entries.extend(env::split_paths(&existing));
        }

        let joined = env::join_paths(&entries).map_err(|e| RecipeError::Configuration {
            option: key.to_string_lossy().into_owned(),
            reason: format!("cannot build search path: {}", e),
        })?;

        Ok(EnvOverride::set(key, joined))
    }

    pub fn key(&self) -> &OsStr {
        &self.key
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => env::set_var(&self.key, value),
            None => env::remove_var(&self.key),
        }
    }
}
