use std::path::Path;

use crate::cmd::Command;

/// Mount point of the checkout inside a disposable build container.
pub const WORKSPACE: &str = "/workspace";

/// Compose project name for an application.
#[must_use]
pub fn project_name(id: &str) -> String {
    format!("vibe-{id}")
}

/// Deterministic image tag for an application.
#[must_use]
pub fn image_tag(id: &str) -> String {
    format!("vibe-{id}:latest")
}

/// Build and start a stack in the background, rebuilding changed
/// images.
#[must_use]
pub fn compose_up(project: &str, compose_file: &Path) -> Command {
    compose(project, compose_file).args(["up", "-d", "--build", "--remove-orphans"])
}

/// Stop a stack and remove its containers and default resources.
#[must_use]
pub fn compose_down(project: &str, compose_file: &Path) -> Command {
    compose(project, compose_file).args(["down", "--remove-orphans"])
}

fn compose(project: &str, compose_file: &Path) -> Command {
    Command::new("docker")
        .args(["compose", "-p", project, "-f"])
        .arg(compose_file.to_string_lossy())
}

/// `docker run --rm` with `dir` bind-mounted read-write at
/// [`WORKSPACE`], running `script` through `sh -c`.
#[must_use]
pub fn run_disposable(image: &str, dir: &Path, env: &[(String, String)], script: &str) -> Command {
    let mut cmd = Command::new("docker")
        .args(["run", "--rm", "-v"])
        .arg(format!("{}:{WORKSPACE}", dir.display()))
        .args(["-w", WORKSPACE]);
    for (key, value) in env {
        cmd = cmd.arg("-e").arg(format!("{key}={value}"));
    }
    cmd.arg(image).args(["sh", "-c", script])
}
