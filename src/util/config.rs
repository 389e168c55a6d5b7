//! Configuration file support for ffpack.
//!
//! Two configuration file locations are read:
//! - Global: `~/.ffpack/config.toml` - User-wide defaults
//! - Project: `.ffpack/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// ffpack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default platform settings
    pub settings: SettingsConfig,

    /// Default build options
    pub options: OptionsConfig,

    /// Toolchain locations
    pub toolchain: ToolchainSettings,

    /// Network settings
    pub net: NetConfig,
}

/// Platform settings defaults. Unset values fall back to the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub os: Option<String>,
    pub compiler: Option<String>,
    pub compiler_version: Option<String>,
    pub arch: Option<String>,
    pub build_type: Option<String>,
}

/// Build option defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub shared: Option<bool>,
    pub fpic: Option<bool>,
}

/// Toolchain locations and tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to MSBuild (found on PATH when unset)
    pub msbuild: Option<PathBuf>,

    /// Path to devenv, used to upgrade solutions
    pub devenv: Option<PathBuf>,

    /// Parallel project builds (None = toolchain default)
    pub jobs: Option<usize>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Never download sources; require an existing source tree
    #[serde(default)]
    pub offline: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let s = other.settings;
        merge_opt(&mut self.settings.os, s.os);
        merge_opt(&mut self.settings.compiler, s.compiler);
        merge_opt(&mut self.settings.compiler_version, s.compiler_version);
        merge_opt(&mut self.settings.arch, s.arch);
        merge_opt(&mut self.settings.build_type, s.build_type);

        merge_opt(&mut self.options.shared, other.options.shared);
        merge_opt(&mut self.options.fpic, other.options.fpic);

        merge_opt(&mut self.toolchain.msbuild, other.toolchain.msbuild);
        merge_opt(&mut self.toolchain.devenv, other.toolchain.devenv);
        merge_opt(&mut self.toolchain.jobs, other.toolchain.jobs);

        if other.net.offline {
            self.net.offline = true;
        }
    }
}

fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ffpack/config.toml)
/// 2. Global config (~/.ffpack/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global ffpack config directory (~/.ffpack).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ffpack"))
}

/// Get the global config path (~/.ffpack/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.ffpack/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ffpack").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.settings.os.is_none());
        assert!(config.options.shared.is_none());
        assert!(config.toolchain.msbuild.is_none());
        assert!(!config.net.offline);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[settings]
os = "Windows"
arch = "x86_64"
build_type = "Debug"

[options]
shared = false

[toolchain]
msbuild = "C:/BuildTools/MSBuild.exe"
jobs = 8
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.settings.os, Some("Windows".to_string()));
        assert_eq!(config.settings.build_type, Some("Debug".to_string()));
        assert_eq!(config.options.shared, Some(false));
        assert_eq!(config.options.fpic, None);
        assert_eq!(
            config.toolchain.msbuild,
            Some(PathBuf::from("C:/BuildTools/MSBuild.exe"))
        );
        assert_eq!(config.toolchain.jobs, Some(8));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.settings.os = Some("Linux".to_string());
        base.toolchain.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.settings.os = Some("Windows".to_string());

        base.merge(override_cfg);

        assert_eq!(base.settings.os, Some("Windows".to_string()));
        assert_eq!(base.toolchain.jobs, Some(4)); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[settings]
build_type = "Release"
arch = "x86"

[net]
offline = true
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[settings]
build_type = "Debug"
"#,
        )
        .unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(config.settings.build_type, Some("Debug".to_string()));
        assert_eq!(config.settings.arch, Some("x86".to_string()));
        assert!(config.net.offline);
    }

    #[test]
    fn test_malformed_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[settings\nos = ").unwrap();

        let config = Config::load_or_default(&path);
        assert!(config.settings.os.is_none());
    }
}
