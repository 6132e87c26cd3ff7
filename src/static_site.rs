use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cmd::{Command, CommandRunner};
use crate::docker;
use crate::env::{Ambient, EffectiveEnv};
use crate::error::{DeployError, DeployResult};
use crate::manifest::{BuildConfig, MANIFEST_FILE};

/// Directories probed, in order, when no `output_dir` is configured.
pub const OUTPUT_CANDIDATES: [&str; 3] = ["dist", "build", "public"];

/// Names never published: VCS and CI metadata, dependency caches, OS
/// droppings and the manifest itself.
pub const IGNORED: [&str; 12] = [
    ".git",
    ".hg",
    ".svn",
    ".github",
    ".gitlab",
    ".circleci",
    "node_modules",
    "__pycache__",
    ".venv",
    ".DS_Store",
    "Thumbs.db",
    MANIFEST_FILE,
];

/// Builds a static site in its checkout and publishes the output.
pub struct StaticBuild<'a> {
    runner: &'a dyn CommandRunner,
    ambient: &'a Ambient,
    builder_image: &'a str,
}

impl<'a> StaticBuild<'a> {
    #[must_use]
    pub const fn new(runner: &'a dyn CommandRunner, ambient: &'a Ambient, builder_image: &'a str) -> Self {
        Self {
            runner,
            ambient,
            builder_image,
        }
    }

    /// Compose the build environment for `id`.
    pub fn environment(&self, checkout: &Path, id: &str, build: &BuildConfig) -> DeployResult<EffectiveEnv> {
        let mut env = EffectiveEnv::new().whitelist(self.ambient, &build.env);
        if let Some(file) = &build.env_file {
            env = env.env_file(&checkout.join(file))?;
        }
        if let Some(var) = &build.base_path_env {
            env = env.base_path(var, id);
        }
        Ok(env)
    }

    /// Run the optional install and build steps, then return the
    /// directory holding the build output.
    pub fn build(&self, checkout: &Path, id: &str, build: &BuildConfig) -> DeployResult<PathBuf> {
        let env = self.environment(checkout, id, build)?;
        let steps: Vec<&str> = [build.install.as_deref(), build.command.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();

        if steps.is_empty() {
            debug!(%id, "no install or build command");
        } else if build.use_docker {
            let image = build.image.as_deref().unwrap_or(self.builder_image);
            info!(%id, %image, "Building in a disposable container");
            let script = steps.join(" && ");
            self.runner
                .run(&docker::run_disposable(image, checkout, &env.pairs(), &script))?;
        } else {
            for step in steps {
                info!(%id, "Running {step}");
                let cmd = Command::shell(step).current_dir(checkout).envs(&env.pairs());
                self.runner.run(&cmd)?;
            }
        }

        resolve_output_dir(checkout, build.output_dir.as_deref())
    }
}

/// Locate the build output: the configured directory, else the first
/// existing candidate, else the checkout itself. The result must be
/// an existing directory.
pub fn resolve_output_dir(checkout: &Path, configured: Option<&str>) -> DeployResult<PathBuf> {
    let dir = match configured {
        Some(out) => checkout.join(out),
        None => OUTPUT_CANDIDATES
            .iter()
            .map(|name| checkout.join(name))
            .find(|p| p.is_dir())
            .unwrap_or_else(|| checkout.to_path_buf()),
    };

    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(DeployError::BuildOutputMissing(dir))
    }
}

fn is_ignored(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| IGNORED.contains(&n))
}

/// Symlinks are published as copies of their target only when that
/// target is a regular file inside the output directory. Links to
/// directories are skipped, as are links leaving the output.
fn link_to_file_within(link: &Path, root: &Path) -> bool {
    match std::fs::canonicalize(link) {
        Ok(target) if target.starts_with(root) && target.is_file() => true,
        Ok(target) if target.starts_with(root) => {
            debug!(link = %link.display(), "skipping directory symlink");
            false
        }
        Ok(target) => {
            warn!(link = %link.display(), target = %target.display(), "refusing symlink outside the build output");
            false
        }
        Err(e) => {
            warn!(link = %link.display(), "skipping dangling symlink: {e}");
            false
        }
    }
}

/// Replace `dest` with a copy of `src`, skipping [`IGNORED`] names.
/// Returns the number of files copied.
///
/// On failure `dest` may be partially written.
pub fn publish(src: &Path, dest: &Path) -> DeployResult<usize> {
    let fail = |source: std::io::Error| DeployError::Publish {
        from: src.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    };

    let root = std::fs::canonicalize(src).map_err(fail)?;
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(fail)?;
    }
    std::fs::create_dir_all(dest).map_err(fail)?;

    let mut files = 0;
    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| fail(e.into()))?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);

        if entry.path_is_symlink() && !link_to_file_within(entry.path(), &root) {
            continue;
        }
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(fail)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(fail)?;
            files += 1;
        }
    }

    info!(from = %src.display(), to = %dest.display(), files, "Copied static files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_output_missing() {
        let dir = tempfile::tempdir().unwrap();

        let err = resolve_output_dir(dir.path(), Some("out")).unwrap_err();

        assert!(matches!(err, DeployError::BuildOutputMissing(p) if p.ends_with("out")));
    }

    #[test]
    fn probe_order_prefers_dist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("public")).unwrap();
        std::fs::create_dir(dir.path().join("dist")).unwrap();

        let out = resolve_output_dir(dir.path(), None).unwrap();

        assert_eq!(out, dir.path().join("dist"));
    }

    #[test]
    fn candidate_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("build"), "not a dir").unwrap();

        let out = resolve_output_dir(dir.path(), None).unwrap();

        assert_eq!(out, dir.path());
    }
}
