use std::ffi::OsString;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};

/// Snapshot of the process environment, captured once at startup.
pub type Ambient = IndexMap<String, String>;

/// Capture the current process environment. Variables whose name or
/// value is not valid UTF-8 are skipped.
#[must_use]
pub fn capture() -> Ambient {
    utf8_only(std::env::vars_os())
}

fn utf8_only(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Ambient {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                debug!(name = ?key, "skipping non-UTF-8 environment variable");
                None
            }
        })
        .collect()
}

/// Variables layered on top of the ambient environment for a build or
/// a service. Later layers win: whitelisted ambient names, then the
/// env file, then the base path variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveEnv {
    overlay: IndexMap<String, String>,
}

impl EffectiveEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the listed names from the ambient environment. Names that
    /// are not set are skipped.
    #[must_use]
    pub fn whitelist(mut self, ambient: &Ambient, names: &[String]) -> Self {
        for name in names {
            match ambient.get(name) {
                Some(value) => {
                    self.overlay.insert(name.clone(), value.clone());
                }
                None => debug!(%name, "whitelisted variable not set, skipping"),
            }
        }
        self
    }

    /// Layer the entries of an env file. The file must exist.
    pub fn env_file(mut self, path: &Path) -> DeployResult<Self> {
        if !path.is_file() {
            return Err(DeployError::FileNotFound(format!(
                "env file {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        for (key, value) in parse_env_file(&content) {
            self.overlay.insert(key, value);
        }
        Ok(self)
    }

    #[must_use]
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.overlay.insert(key.to_string(), value.to_string());
        self
    }

    /// Inject `/app/<id>/` under the given variable name so
    /// client-side routers can mount under the prefix.
    #[must_use]
    pub fn base_path(self, var: &str, id: &str) -> Self {
        let value = crate::config::base_path(id);
        info!("Set {var}={value}");
        self.set(var, &value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overlay.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    #[must_use]
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.overlay
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are ignored,
/// as are lines without `=`. An `export ` prefix and matching
/// surrounding quotes are stripped.
#[must_use]
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
