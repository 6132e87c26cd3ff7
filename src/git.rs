use std::path::Path;

use tracing::info;

use crate::cmd::{Command, CommandRunner};
use crate::error::{DeployError, DeployResult};

#[must_use]
pub fn clone_command(reference: &str, dest: &Path) -> Command {
    Command::new("git")
        .arg("clone")
        .arg(reference)
        .arg(dest.to_string_lossy())
}

#[must_use]
pub fn pull_command(repo: &Path) -> Command {
    Command::new("git")
        .arg("-C")
        .arg(repo.to_string_lossy())
        .args(["pull", "--ff-only"])
}

/// Clone `reference` into `dest`, or fast-forward an existing clone.
/// A pull that cannot fast-forward is a hard error; local state is
/// never reset.
pub fn sync(runner: &dyn CommandRunner, reference: &str, dest: &Path) -> DeployResult<()> {
    if dest.exists() {
        info!(repo = %dest.display(), "Repo exists, pulling latest");
        runner
            .run(&pull_command(dest))
            .map_err(|e| DeployError::Checkout {
                path: dest.to_path_buf(),
                message: format!("fast-forward pull failed ({e}); resolve the clone by hand"),
            })
    } else {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(%reference, dest = %dest.display(), "Cloning");
        runner.run(&clone_command(reference, dest))
    }
}
