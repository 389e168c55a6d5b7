//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ffpack - build and package the FFmpeg libraries
#[derive(Parser)]
#[command(name = "ffpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Recipe file to use instead of the built-in one
    #[arg(long, global = true, env = "FFPACK_RECIPE")]
    pub recipe: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the pinned requirements
    Requirements(RequirementsArgs),

    /// Resolve the build configuration
    Resolve(ResolveArgs),

    /// Generate pkg-config descriptors into a package directory
    Descriptors(DescriptorsArgs),

    /// Fetch, patch and build the sources
    Build(BuildArgs),

    /// Build and assemble the installable package
    Package(PackageArgs),
}

/// Platform settings and build options.
#[derive(Args, Clone)]
pub struct SettingsArgs {
    /// Target operating system (defaults to the host)
    #[arg(long)]
    pub os: Option<String>,

    /// Compiler family
    #[arg(long)]
    pub compiler: Option<String>,

    /// Compiler version
    #[arg(long)]
    pub compiler_version: Option<String>,

    /// Compiler C++ library (accepted and ignored)
    #[arg(long)]
    pub libcxx: Option<String>,

    /// Target architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build type (Debug, Release, RelWithDebInfo, MinSizeRel)
    #[arg(long)]
    pub build_type: Option<String>,

    /// Build shared libraries
    #[arg(long, conflicts_with = "static_libs")]
    pub shared: bool,

    /// Build static libraries
    #[arg(long = "static")]
    pub static_libs: bool,

    /// Position-independent code (not available on Windows)
    #[arg(long, value_name = "BOOL")]
    pub fpic: Option<bool>,
}

#[derive(Args)]
pub struct RequirementsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Installed dependency graph (installed.toml)
    #[arg(long, value_name = "FILE")]
    pub deps: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DescriptorsArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Installed dependency graph (installed.toml)
    #[arg(long, value_name = "FILE")]
    pub deps: PathBuf,

    /// Package root to write lib/pkgconfig into
    #[arg(long, value_name = "DIR")]
    pub package_dir: PathBuf,

    /// Directory of lib<name>.pc.in templates (built-in when omitted)
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Installed dependency graph (installed.toml)
    #[arg(long, value_name = "FILE")]
    pub deps: PathBuf,

    /// Use an existing source tree instead of downloading
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Directory to download and build in
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Never download sources
    #[arg(long)]
    pub offline: bool,

    /// Number of parallel project builds
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct PackageArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Package root
    #[arg(long, value_name = "DIR")]
    pub package_dir: PathBuf,

    /// Directory of lib<name>.pc.in templates (built-in when omitted)
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Print the package report as JSON
    #[arg(long)]
    pub json: bool,
}
