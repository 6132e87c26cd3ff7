#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

use vibes::cmd::{Command, CommandRunner, SystemRunner};
use vibes::error::{DeployError, DeployResult};
use walkdir::WalkDir;

/// Records every command. `git clone`/`git pull` copy a registered
/// fixture directory, `docker` is a no-op, and `sh -c` scripts run
/// for real so tests can fake build steps.
#[derive(Clone, Default)]
pub struct FakeRunner {
    calls: Rc<RefCell<Vec<Command>>>,
    repos: Rc<RefCell<HashMap<String, PathBuf>>>,
    failing: Rc<RefCell<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `reference` from the local directory `source`.
    pub fn repo(&self, reference: &str, source: &Path) -> &Self {
        self.repos
            .borrow_mut()
            .insert(reference.to_string(), source.to_path_buf());
        self
    }

    /// Fail every command whose command line contains `needle`.
    pub fn fail_on(&self, needle: &str) -> &Self {
        self.failing.borrow_mut().push(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Command> {
        self.calls.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Command::display).collect()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    fn source_for(&self, reference: &str) -> Option<PathBuf> {
        self.repos.borrow().get(reference).cloned()
    }

    fn reference_for_clone(&self, dest: &Path) -> Option<PathBuf> {
        let origin = std::fs::read_to_string(dest.join(".git").join("origin")).ok()?;
        self.source_for(origin.trim())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &Command) -> DeployResult<()> {
        self.calls.borrow_mut().push(command.clone());

        let line = command.display();
        if self.failing.borrow().iter().any(|n| line.contains(n.as_str())) {
            return Err(DeployError::CommandFailed {
                command: line,
                status: ExitStatus::from_raw(256),
            });
        }

        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        match (command.program.as_str(), args.as_slice()) {
            ("git", ["clone", reference, dest]) => {
                let dest = Path::new(dest);
                std::fs::create_dir_all(dest.join(".git"))?;
                std::fs::write(dest.join(".git").join("origin"), reference)?;
                if let Some(source) = self.source_for(reference) {
                    copy_tree(&source, dest)?;
                }
                Ok(())
            }
            ("git", ["-C", repo, "pull", "--ff-only"]) => {
                let repo = Path::new(repo);
                if let Some(source) = self.reference_for_clone(repo) {
                    copy_tree(&source, repo)?;
                }
                Ok(())
            }
            ("sh", _) => SystemRunner::new().run(command),
            _ => Ok(()),
        }
    }
}

/// Copy `src` into `dest`, overwriting files that exist.
pub fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap();
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Write `files` (relative path, contents) under `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// Relative paths of all files under `root`, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();
    files
}
