use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::cmd::CommandRunner;
use crate::compose::ServiceDef;
use crate::config::{Config, scratch_dir};
use crate::docker;
use crate::dockerfile::Dockerfile;
use crate::env::{Ambient, EffectiveEnv};
use crate::error::{DeployError, DeployResult};
use crate::manifest::ServerConfig;
use crate::routing::Routes;

/// Port used when neither configuration nor runtime says otherwise.
pub const GENERIC_PORT: u16 = 8080;

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const DOCKERFILE: &str = "Dockerfile";

static START_PORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(?:--port(?:=|\s+)|-p\s+)(\d{1,5})\b").expect("valid port regex")
});

static EXPOSE_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*EXPOSE\s+(\d{1,5})").expect("valid expose regex"));

/// Runtimes with a built-in Dockerfile template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Node,
    Python,
}

impl Runtime {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "node" | "nodejs" => Some(Self::Node),
            "python" => Some(Self::Python),
            _ => None,
        }
    }

    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Node => 3000,
            Self::Python => 8000,
        }
    }

    #[must_use]
    pub const fn base_image(self) -> &'static str {
        match self {
            Self::Node => "node:20-alpine",
            Self::Python => "python:3.12-slim",
        }
    }

    #[must_use]
    pub const fn default_install(self) -> &'static str {
        match self {
            Self::Node => "npm install --omit=dev",
            Self::Python => "pip install --no-cache-dir -r requirements.txt",
        }
    }

    #[must_use]
    pub const fn default_start(self) -> &'static str {
        match self {
            Self::Node => "npm start",
            Self::Python => "python app.py",
        }
    }

    /// Minimal Dockerfile for this runtime listening on `port`.
    #[must_use]
    pub fn dockerfile(self, server: &ServerConfig, port: u16) -> Dockerfile {
        let install = non_empty(server.install.as_deref()).unwrap_or(self.default_install());
        let start = non_empty(server.start.as_deref()).unwrap_or(self.default_start());

        let mut df = Dockerfile::new(self.base_image())
            .workdir("/app")
            .copy(".", ".")
            .run(install);
        if self == Self::Python {
            df = df.env("PYTHONUNBUFFERED", "1");
        }
        df.env("PORT", &port.to_string())
            .expose(port)
            .cmd_shell(start)
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Python => "python",
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.parse::<u16>().ok().filter(|p| *p != 0)
}

/// Port from `--port N`, `--port=N` or `-p N` in a start command.
#[must_use]
pub fn port_from_start(start: &str) -> Option<u16> {
    START_PORT
        .captures_iter(start)
        .find_map(|c| parse_port(&c[1]))
}

/// First `EXPOSE` port of a Dockerfile.
#[must_use]
pub fn port_from_dockerfile(text: &str) -> Option<u16> {
    EXPOSE_PORT
        .captures_iter(text)
        .find_map(|c| parse_port(&c[1]))
}

/// First match wins: configured port, start command flags, the named
/// Dockerfile's `EXPOSE`, the runtime default, [`GENERIC_PORT`].
#[must_use]
pub fn resolve_port(server: &ServerConfig, runtime: Option<Runtime>, dockerfile: Option<&str>) -> u16 {
    server
        .port
        .filter(|p| *p != 0)
        .or_else(|| server.start.as_deref().and_then(port_from_start))
        .or_else(|| dockerfile.and_then(port_from_dockerfile))
        .or_else(|| runtime.map(Runtime::default_port))
        .unwrap_or(GENERIC_PORT)
}

/// Where the container build definition comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerfileSource {
    /// A Dockerfile shipped in the repository, used as-is.
    Existing(PathBuf),
    /// Synthesized from a runtime template, written to the scratch
    /// area.
    Generated(Dockerfile),
}

/// Everything a server deploy produces, before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPlan {
    pub port: u16,
    pub dockerfile: DockerfileSource,
    pub dockerfile_path: PathBuf,
    pub routes: Routes,
    pub service: ServiceDef,
    pub compose_file: PathBuf,
}

/// Builds and starts a containerized service behind the proxy.
pub struct ServerBuild<'a> {
    runner: &'a dyn CommandRunner,
    ambient: &'a Ambient,
    config: &'a Config,
}

impl<'a> ServerBuild<'a> {
    #[must_use]
    pub const fn new(runner: &'a dyn CommandRunner, ambient: &'a Ambient, config: &'a Config) -> Self {
        Self {
            runner,
            ambient,
            config,
        }
    }

    /// Work out port, Dockerfile, routing and service definition.
    /// Reads the checkout but writes nothing.
    pub fn plan(&self, checkout: &Path, workdir: &Path, id: &str, server: &ServerConfig) -> DeployResult<ServerPlan> {
        let runtime = match non_empty(server.runtime.as_deref()) {
            Some(raw) => Runtime::parse(raw).ok_or_else(|| raw.to_string()),
            None => Ok(Runtime::Node),
        };
        let scratch = scratch_dir(workdir);

        let (port, dockerfile, dockerfile_path) = match non_empty(server.dockerfile.as_deref()) {
            Some(named) => {
                let path = checkout.join(named);
                if !path.is_file() {
                    return Err(DeployError::FileNotFound(format!(
                        "dockerfile {}",
                        path.display()
                    )));
                }
                let text = std::fs::read_to_string(&path)?;
                let declared = non_empty(server.runtime.as_deref()).and_then(Runtime::parse);
                let port = resolve_port(server, declared, Some(&text));
                (port, DockerfileSource::Existing(path), PathBuf::from(named))
            }
            None => {
                let runtime = runtime.map_err(DeployError::UnsupportedRuntime)?;
                let port = resolve_port(server, Some(runtime), None);
                let df = runtime.dockerfile(server, port);
                (port, DockerfileSource::Generated(df), scratch.join(DOCKERFILE))
            }
        };

        let routes = Routes::new(id, &self.config.public_host, port)
            .network(&self.config.network)
            .entrypoint(&self.config.entrypoint)
            .cert_resolver(&self.config.cert_resolver);

        let mut service = ServiceDef::new(
            id,
            checkout.to_path_buf(),
            dockerfile_path.clone(),
            &self.config.network,
        )
        .routes(&routes)
        .env("PORT", &port.to_string());

        let whitelisted = EffectiveEnv::new().whitelist(self.ambient, &server.env);
        for (key, value) in whitelisted.pairs() {
            if key == "PORT" {
                warn!(%id, "ignoring whitelisted PORT, the resolved port wins");
                continue;
            }
            service = service.env(&key, &value);
        }

        if let Some(file) = non_empty(server.env_file.as_deref()) {
            let path = checkout.join(file);
            if !path.is_file() {
                return Err(DeployError::FileNotFound(format!(
                    "env file {}",
                    path.display()
                )));
            }
            service = service.env_file(path);
        }

        Ok(ServerPlan {
            port,
            dockerfile,
            dockerfile_path,
            routes,
            service,
            compose_file: scratch.join(COMPOSE_FILE),
        })
    }

    /// Persist the generated files of a plan into the scratch area.
    pub fn write(plan: &ServerPlan) -> DeployResult<()> {
        if let Some(dir) = plan.compose_file.parent() {
            std::fs::create_dir_all(dir)?;
        }
        if let DockerfileSource::Generated(df) = &plan.dockerfile {
            std::fs::write(&plan.dockerfile_path, df.to_string())?;
        }
        std::fs::write(&plan.compose_file, plan.service.render()?)?;
        Ok(())
    }

    /// Plan, write, then build and start the stack detached.
    pub fn deploy(&self, checkout: &Path, workdir: &Path, id: &str, server: &ServerConfig) -> DeployResult<ServerPlan> {
        let plan = self.plan(checkout, workdir, id, server)?;
        info!(%id, port = plan.port, "Writing container definitions");
        Self::write(&plan)?;

        info!(%id, "Starting containers");
        self.runner.run(&docker::compose_up(
            &docker::project_name(id),
            &plan.compose_file,
        ))?;
        Ok(plan)
    }
}
