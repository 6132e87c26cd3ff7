use std::path::PathBuf;
use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command} ({status})")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("invalid manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("unrecognized application type: {0}")]
    UnknownAppType(String),

    #[error("unsupported runtime '{0}' and no dockerfile given")]
    UnsupportedRuntime(String),

    #[error("checkout failed in {}: {message}", path.display())]
    Checkout { path: PathBuf, message: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("build output not found: {}", .0.display())]
    BuildOutputMissing(PathBuf),

    #[error("failed to publish {} to {}: {source}", from.display(), to.display())]
    Publish {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("registry {} is unreadable: {message}", path.display())]
    Registry { path: PathBuf, message: String },

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Configuration problems and missing build output exit with 2,
    /// everything else with 1.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Manifest { .. }
            | Self::UnknownAppType(_)
            | Self::UnsupportedRuntime(_)
            | Self::BuildOutputMissing(_) => 2,
            _ => 1,
        }
    }
}
