use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};

/// Manifest file name at the root of a checkout.
pub const MANIFEST_FILE: &str = "vibe.yaml";

/// Static-site build settings (`build:` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub install: Option<String>,
    pub command: Option<String>,
    pub output_dir: Option<String>,
    pub base_path_env: Option<String>,
    #[serde(default)]
    pub use_docker: bool,
    pub image: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub env_file: Option<String>,
}

/// Long-running service settings (`server:` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub runtime: Option<String>,
    pub install: Option<String>,
    pub start: Option<String>,
    pub port: Option<u16>,
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub env_file: Option<String>,
}

/// Application type as stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    Static,
    Spa,
    Server,
}

impl AppKind {
    /// Parse a manifest `type` value, case-insensitively.
    pub fn parse(raw: &str) -> DeployResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "spa" => Ok(Self::Spa),
            "server" => Ok(Self::Server),
            _ => Err(DeployError::UnknownAppType(raw.to_string())),
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Spa => "spa",
            Self::Server => "server",
        })
    }
}

/// What to build, decided by the manifest `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSpec {
    Static { spa: bool, build: BuildConfig },
    Server { server: ServerConfig },
}

impl AppSpec {
    #[must_use]
    pub const fn kind(&self) -> AppKind {
        match self {
            Self::Static { spa: false, .. } => AppKind::Static,
            Self::Static { spa: true, .. } => AppKind::Spa,
            Self::Server { .. } => AppKind::Server,
        }
    }
}

impl Default for AppSpec {
    fn default() -> Self {
        Self::Static {
            spa: false,
            build: BuildConfig::default(),
        }
    }
}

/// A decoded `vibe.yaml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub spec: AppSpec,
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    #[must_use]
    pub const fn kind(&self) -> AppKind {
        self.spec.kind()
    }

    /// Decode manifest text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> DeployResult<Self> {
        let invalid = |message: String| DeployError::Manifest {
            path: path.to_path_buf(),
            message,
        };

        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Option<RawManifest> =
            serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        let kind = match raw.kind.as_deref() {
            Some(t) => AppKind::parse(t)?,
            None => AppKind::Static,
        };

        let spec = match kind {
            AppKind::Static | AppKind::Spa => {
                if raw.server.is_some() {
                    warn!(path = %path.display(), "ignoring `server` section for {kind} app");
                }
                AppSpec::Static {
                    spa: kind == AppKind::Spa,
                    build: raw.build.unwrap_or_default(),
                }
            }
            AppKind::Server => {
                if raw.build.is_some() {
                    warn!(path = %path.display(), "ignoring `build` section for server app");
                }
                AppSpec::Server {
                    server: raw.server.unwrap_or_default(),
                }
            }
        };

        Ok(Self {
            id: raw.id.filter(|s| !s.trim().is_empty()),
            name: raw.name.filter(|s| !s.trim().is_empty()),
            spec,
            meta: raw.meta.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    build: Option<BuildConfig>,
    server: Option<ServerConfig>,
    meta: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Load `vibe.yaml` from a checkout. A missing file yields the
/// default manifest (a bare static site).
pub fn load(checkout: &Path) -> DeployResult<Manifest> {
    let path = checkout.join(MANIFEST_FILE);
    if !path.is_file() {
        debug!(path = %path.display(), "no manifest, using defaults");
        return Ok(Manifest::default());
    }
    let text = std::fs::read_to_string(&path)?;
    Manifest::parse(&text, &path)
}
