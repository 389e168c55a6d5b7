//! Platform settings - WHAT the package is built for.
//!
//! Settings are supplied once per invocation and never change afterwards.
//! The compiler's C++ standard library (`libcxx`) is accepted on input but
//! dropped by [`PlatformSettings::new`]: FFmpeg is a C library, so two
//! builds differing only in libcxx must resolve identically.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    Windows,
    Linux,
    Macos,
    FreeBsd,
    Android,
    Ios,
}

impl Os {
    /// Detect the host operating system.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            "freebsd" => Os::FreeBsd,
            "android" => Os::Android,
            "ios" => Os::Ios,
            _ => Os::Linux,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Os::Windows)
    }

    /// Whether position-independent code can be toggled independently of
    /// the link mode. The Windows linker has no such switch.
    pub fn has_pic_control(&self) -> bool {
        !self.is_windows()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "Windows",
            Os::Linux => "Linux",
            Os::Macos => "Macos",
            Os::FreeBsd => "FreeBSD",
            Os::Android => "Android",
            Os::Ios => "iOS",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win32" | "win" => Ok(Os::Windows),
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" => Ok(Os::Macos),
            "freebsd" => Ok(Os::FreeBsd),
            "android" => Ok(Os::Android),
            "ios" => Ok(Os::Ios),
            _ => Err(SettingParseError::new("os", s)),
        }
    }
}

/// Target CPU architecture.
///
/// Unknown names are kept verbatim so that the architecture lookup, not the
/// parser, reports them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
    Other(String),
}

impl Arch {
    /// Detect the host architecture.
    pub fn host() -> Self {
        Arch::from(std::env::consts::ARCH)
    }

    /// The internal architecture name used as the key in platform tables.
    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
            Arch::Other(name) => name,
        }
    }
}

impl From<&str> for Arch {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "x86" | "i386" | "i686" => Arch::X86,
            "x86_64" | "amd64" | "x64" => Arch::X86_64,
            "armv7" | "arm" => Arch::Armv7,
            "armv8" | "aarch64" | "arm64" => Arch::Armv8,
            _ => Arch::Other(s.to_string()),
        }
    }
}

impl From<String> for Arch {
    fn from(s: String) -> Self {
        Arch::from(s.as_str())
    }
}

impl From<Arch> for String {
    fn from(arch: Arch) -> Self {
        arch.as_str().to_string()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build type (optimization profile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildType {
    type Err = SettingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(SettingParseError::new("build_type", s)),
        }
    }
}

/// Compiler settings as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Compiler family (Visual Studio, gcc, clang, apple-clang)
    pub name: String,
    pub version: Option<String>,
    /// C++ standard library; never reaches the resolved settings
    pub libcxx: Option<String>,
    /// MSVC runtime (MD, MDd, MT, MTd)
    pub runtime: Option<String>,
}

impl CompilerSettings {
    pub fn new(name: impl Into<String>) -> Self {
        CompilerSettings {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_libcxx(mut self, libcxx: impl Into<String>) -> Self {
        self.libcxx = Some(libcxx.into());
        self
    }

    /// Default compiler family for an operating system.
    pub fn default_for(os: Os) -> Self {
        match os {
            Os::Windows => CompilerSettings::new("Visual Studio"),
            Os::Macos | Os::Ios => CompilerSettings::new("apple-clang"),
            Os::FreeBsd | Os::Android => CompilerSettings::new("clang"),
            Os::Linux => CompilerSettings::new("gcc"),
        }
    }
}

/// Compiler identity with the irrelevant sub-settings removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compiler {
    pub name: String,
    pub version: Option<String>,
    pub runtime: Option<String>,
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The platform a package is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub os: Os,
    pub compiler: Compiler,
    pub arch: Arch,
    pub build_type: BuildType,
}

impl PlatformSettings {
    /// Create platform settings, discarding the compiler's `libcxx`.
    pub fn new(os: Os, compiler: CompilerSettings, arch: Arch, build_type: BuildType) -> Self {
        if let Some(ref libcxx) = compiler.libcxx {
            tracing::debug!("ignoring compiler.libcxx={}", libcxx);
        }

        PlatformSettings {
            os,
            compiler: Compiler {
                name: compiler.name,
                version: compiler.version,
                runtime: compiler.runtime,
            },
            arch,
            build_type,
        }
    }

    /// Settings for the host machine with the default compiler.
    pub fn host(build_type: BuildType) -> Self {
        let os = Os::host();
        PlatformSettings::new(os, CompilerSettings::default_for(os), Arch::host(), build_type)
    }
}

/// Error returned when parsing an invalid setting value.
#[derive(Debug, Clone)]
pub struct SettingParseError {
    pub setting: &'static str,
    pub value: String,
}

impl SettingParseError {
    fn new(setting: &'static str, value: &str) -> Self {
        SettingParseError {
            setting,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for SettingParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value '{}' for setting `{}`", self.value, self.setting)
    }
}

impl std::error::Error for SettingParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libcxx_is_discarded() {
        let with = PlatformSettings::new(
            Os::Linux,
            CompilerSettings::new("gcc").with_version("7").with_libcxx("libstdc++11"),
            Arch::X86_64,
            BuildType::Release,
        );
        let without = PlatformSettings::new(
            Os::Linux,
            CompilerSettings::new("gcc").with_version("7"),
            Arch::X86_64,
            BuildType::Release,
        );

        assert_eq!(with, without);
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!("windows".parse::<Os>().unwrap(), Os::Windows);
        assert_eq!("Linux".parse::<Os>().unwrap(), Os::Linux);
        assert!("plan9".parse::<Os>().is_err());

        assert_eq!("debug".parse::<BuildType>().unwrap(), BuildType::Debug);
        assert!("fast".parse::<BuildType>().is_err());
    }

    #[test]
    fn test_unknown_arch_is_preserved() {
        assert_eq!(Arch::from("amd64"), Arch::X86_64);
        assert_eq!(
            Arch::from("armUnknown"),
            Arch::Other("armUnknown".to_string())
        );
        assert_eq!(Arch::from("armUnknown").as_str(), "armUnknown");
    }

    #[test]
    fn test_pic_control() {
        assert!(!Os::Windows.has_pic_control());
        assert!(Os::Linux.has_pic_control());
        assert!(Os::Macos.has_pic_control());
    }
}
