//! Native toolchain invocation.
//!
//! The engine never looks inside the toolchain. It hands over a
//! [`BuildDescriptor`] (solution, configuration name, platform token) and
//! gets back success or an opaque [`ToolchainError`].

use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::util::config::ToolchainSettings;
use crate::util::process::{find_devenv, find_msbuild, ProcessBuilder};

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    /// Solution or project file.
    pub solution: PathBuf,
    /// Toolchain configuration name (`Release`, `DebugDLL`, ...).
    pub configuration: String,
    /// Toolchain platform token (`Win32`, `x64`, ...).
    pub platform: String,
    /// Upgrade project files to the installed toolchain version first.
    pub upgrade_project: bool,
}

/// Failure reported by a native toolchain.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ToolchainError {
    #[error("`{program}` not found")]
    #[diagnostic(
        code(ffpack::toolchain::not_found),
        help("Install Visual Studio build tools or set [toolchain] msbuild and devenv in the config")
    )]
    NotFound { program: String },

    #[error("failed to run `{command}`: {message}")]
    #[diagnostic(code(ffpack::toolchain::spawn))]
    Spawn { command: String, message: String },

    #[error("`{command}` failed with exit code {code:?}\n{output}")]
    #[diagnostic(code(ffpack::toolchain::failed))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

/// A native build tool.
pub trait Toolchain {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Build `descriptor`, inheriting the current process environment.
    fn invoke(&self, descriptor: &BuildDescriptor) -> Result<(), ToolchainError>;
}

/// MSBuild driving a Visual Studio solution.
#[derive(Debug, Clone)]
pub struct MsBuild {
    msbuild: PathBuf,
    devenv: Option<PathBuf>,
    jobs: Option<usize>,
}

impl MsBuild {
    pub fn new(msbuild: impl Into<PathBuf>) -> Self {
        MsBuild {
            msbuild: msbuild.into(),
            devenv: None,
            jobs: None,
        }
    }

    /// Locate MSBuild (and devenv for project upgrades), honouring
    /// configured overrides.
    pub fn detect(settings: &ToolchainSettings) -> Result<Self, ToolchainError> {
        let msbuild = settings
            .msbuild
            .clone()
            .or_else(find_msbuild)
            .ok_or_else(|| ToolchainError::NotFound {
                program: "msbuild".to_string(),
            })?;

        tracing::debug!("using msbuild at {}", msbuild.display());

        Ok(MsBuild {
            msbuild,
            devenv: settings.devenv.clone().or_else(find_devenv),
            jobs: settings.jobs,
        })
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// The MSBuild command line for `descriptor`.
    pub fn build_command(&self, descriptor: &BuildDescriptor) -> ProcessBuilder {
        let jobs = match self.jobs {
            Some(n) => format!("/m:{}", n),
            None => "/m".to_string(),
        };

        ProcessBuilder::new(&self.msbuild)
            .arg(&descriptor.solution)
            .arg(format!("/p:Configuration={}", descriptor.configuration))
            .arg(format!("/p:Platform={}", descriptor.platform))
            .arg(jobs)
            .arg("/nologo")
            .cwd(solution_dir(&descriptor.solution))
    }

    fn upgrade(&self, solution: &Path) -> Result<(), ToolchainError> {
        let Some(devenv) = &self.devenv else {
            return Err(ToolchainError::NotFound {
                program: "devenv".to_string(),
            });
        };

        tracing::info!("Upgrading {}", solution.display());
        run(ProcessBuilder::new(devenv)
            .arg(solution)
            .arg("/upgrade")
            .cwd(solution_dir(solution)))
    }
}

impl Toolchain for MsBuild {
    fn name(&self) -> &str {
        "msbuild"
    }

    fn invoke(&self, descriptor: &BuildDescriptor) -> Result<(), ToolchainError> {
        if descriptor.upgrade_project {
            self.upgrade(&descriptor.solution)?;
        }

        tracing::info!(
            "Building {} ({}|{})",
            descriptor.solution.display(),
            descriptor.configuration,
            descriptor.platform
        );
        run(self.build_command(descriptor))
    }
}

fn solution_dir(solution: &Path) -> &Path {
    solution.parent().unwrap_or_else(|| Path::new("."))
}

fn run(cmd: ProcessBuilder) -> Result<(), ToolchainError> {
    let command = cmd.display_command();
    tracing::debug!("running `{}`", command);

    let output = cmd.exec().map_err(|e| ToolchainError::Spawn {
        command: command.clone(),
        message: format!("{:#}", e),
    })?;

    if !output.status.success() {
        // MSBuild reports errors on stdout.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(ToolchainError::Failed {
            command,
            code: output.status.code(),
            output: text,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> BuildDescriptor {
        BuildDescriptor {
            solution: PathBuf::from("/src/SMP/ffmpeg.sln"),
            configuration: "DebugDLL".to_string(),
            platform: "x64".to_string(),
            upgrade_project: true,
        }
    }

    #[test]
    fn test_msbuild_command_line() {
        let cmd = MsBuild::new("msbuild").build_command(&descriptor());

        assert_eq!(
            cmd.display_command(),
            "msbuild /src/SMP/ffmpeg.sln /p:Configuration=DebugDLL /p:Platform=x64 /m /nologo"
        );
        assert_eq!(cmd.get_cwd(), Some(Path::new("/src/SMP")));
    }

    #[test]
    fn test_msbuild_jobs() {
        let cmd = MsBuild::new("msbuild").with_jobs(4).build_command(&descriptor());
        assert!(cmd.get_args().contains(&"/m:4".to_string()));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let toolchain = MsBuild::new("/nonexistent/ffpack-msbuild");
        let mut desc = descriptor();
        desc.upgrade_project = false;

        assert!(matches!(
            toolchain.invoke(&desc),
            Err(ToolchainError::Spawn { .. })
        ));
    }

    #[test]
    fn test_upgrade_without_devenv_fails() {
        let toolchain = MsBuild::new("/nonexistent/ffpack-msbuild");

        match toolchain.invoke(&descriptor()) {
            Err(ToolchainError::NotFound { program }) => assert_eq!(program, "devenv"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_toolchain_reports_exit_code() {
        let toolchain = MsBuild::new("false");
        let mut desc = descriptor();
        desc.solution = std::env::temp_dir().join("ffmpeg.sln");
        desc.upgrade_project = false;

        match toolchain.invoke(&desc) {
            Err(ToolchainError::Failed { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
