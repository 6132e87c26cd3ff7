use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::info;

use crate::error::{DeployError, DeployResult};

/// An external command: program, arguments, optional working
/// directory, and environment variables layered on top of the
/// inherited process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Command {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// `sh -c <script>`.
    #[must_use]
    pub fn shell(script: &str) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    #[must_use]
    pub fn envs(mut self, vars: &[(String, String)]) -> Self {
        self.env.extend(vars.iter().cloned());
        self
    }

    /// The command line as a single string, for logs and errors.
    #[must_use]
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Runs external commands to completion.
///
/// Implementations must treat a non-zero exit as
/// [`DeployError::CommandFailed`].
pub trait CommandRunner {
    fn run(&self, command: &Command) -> DeployResult<()>;
}

/// Spawns real processes with stdin/stdout/stderr inherited so tool
/// output streams straight to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &Command) -> DeployResult<()> {
        info!("$ {}", command.display());

        let mut process = std::process::Command::new(&command.program);
        process
            .args(&command.args)
            .envs(command.env.iter().cloned())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &command.cwd {
            process.current_dir(dir);
        }

        let status = process.status().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeployError::CommandNotFound(command.program.clone())
            } else {
                DeployError::Io(e)
            }
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(DeployError::CommandFailed {
                command: command.display(),
                status,
            })
        }
    }
}
