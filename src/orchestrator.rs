use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::cmd::{CommandRunner, SystemRunner};
use crate::compose;
use crate::config::{Config, repo_dir, scratch_dir};
use crate::docker;
use crate::env::{self, Ambient};
use crate::error::{DeployError, DeployResult};
use crate::git;
use crate::manifest::{self, AppKind, AppSpec, Manifest};
use crate::registry::{Entry, Links, Record, Registry};
use crate::server::{COMPOSE_FILE, ServerBuild, ServerPlan};
use crate::slug::{infer_app_id, slugify};
use crate::static_site::{self, StaticBuild};

/// Deploy stages, in order. Any stage may end in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Checkout,
    Configure,
    StaticBuild,
    ServerBuild,
    RegistryUpdate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Checkout => "checkout",
            Self::Configure => "configure",
            Self::StaticBuild => "static-build",
            Self::ServerBuild => "server-build",
            Self::RegistryUpdate => "registry-update",
        })
    }
}

/// What a deploy produced besides the registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifacts {
    Static { output: PathBuf, published: PathBuf, files: usize },
    Server(Box<ServerPlan>),
}

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub record: Record,
    pub artifacts: Artifacts,
}

/// Undeploy steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndeployStep {
    StopStack,
    RemoveStaticArtifacts,
    RemoveAuxArtifacts,
    RemoveRegistryEntry,
    PurgeCheckout,
}

impl fmt::Display for UndeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StopStack => "stop stack",
            Self::RemoveStaticArtifacts => "remove static files",
            Self::RemoveAuxArtifacts => "remove generated files",
            Self::RemoveRegistryEntry => "remove registry entry",
            Self::PurgeCheckout => "purge checkout",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NothingToDo,
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Done => "done",
            Self::NothingToDo => "nothing to do",
            Self::Skipped => "skipped",
        })
    }
}

/// Per-step outcomes of an undeploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndeployReport {
    pub id: String,
    pub steps: Vec<(UndeployStep, Outcome)>,
}

impl UndeployReport {
    #[must_use]
    pub fn outcome(&self, step: UndeployStep) -> Option<Outcome> {
        self.steps
            .iter()
            .find_map(|(s, o)| (*s == step).then_some(*o))
    }

    /// True when no step found anything to remove.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|(_, o)| *o != Outcome::Done)
    }

    fn push(&mut self, step: UndeployStep, outcome: Outcome) {
        info!(id = %self.id, "{step}: {outcome}");
        self.steps.push((step, outcome));
    }
}

/// Coordinates checkout, configuration, build strategies and the
/// registry.
///
/// # Example
///
/// ```rust,no_run
/// use vibes::{Config, Orchestrator};
///
/// fn main() -> anyhow::Result<()> {
///     let orchestrator = Orchestrator::new(Config::from_env());
///     let deployment =
///         orchestrator.deploy("https://github.com/acme/landing.git", None)?;
///     println!("{}", deployment.record.links.app);
///     Ok(())
/// }
/// ```
pub struct Orchestrator {
    config: Config,
    runner: Box<dyn CommandRunner>,
    ambient: Ambient,
    registry: Registry,
}

impl Orchestrator {
    /// Orchestrator running real processes with the current process
    /// environment.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let registry = Registry::new(&config.registry_path());
        Self {
            config,
            runner: Box::new(SystemRunner::new()),
            ambient: env::capture(),
            registry,
        }
    }

    #[must_use]
    pub fn runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    #[must_use]
    pub fn ambient(mut self, ambient: Ambient) -> Self {
        self.ambient = ambient;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Deploy a repository. `app_id` overrides the id inferred from
    /// the reference; a manifest `id` overrides both.
    pub fn deploy(&self, reference: &str, app_id: Option<&str>) -> DeployResult<Deployment> {
        let reference = reference.trim().trim_end_matches('/');
        let checkout_id = app_id.map_or_else(|| infer_app_id(reference), slugify);
        let workdir = self.config.workdir(&checkout_id);
        let checkout = repo_dir(&workdir);

        let mut stage = Stage::Checkout;
        let result = self.run_deploy(reference, &checkout_id, &workdir, &checkout, &mut stage);
        if let Err(e) = &result {
            error!(id = %checkout_id, %stage, "deploy failed: {e}");
        }
        result
    }

    fn run_deploy(
        &self,
        reference: &str,
        checkout_id: &str,
        workdir: &Path,
        checkout: &Path,
        stage: &mut Stage,
    ) -> DeployResult<Deployment> {
        info!(id = %checkout_id, %stage, "Deploying {reference}");
        git::sync(self.runner.as_ref(), reference, checkout)?;

        *stage = Stage::Configure;
        let manifest = manifest::load(checkout)?;
        let id = manifest
            .id
            .as_deref()
            .map_or_else(|| checkout_id.to_string(), slugify);
        info!(%id, %stage, kind = %manifest.kind(), "Configured");

        let artifacts = match &manifest.spec {
            AppSpec::Static { build, .. } => {
                *stage = Stage::StaticBuild;
                info!(%id, %stage, "Building static site");
                let builder =
                    StaticBuild::new(self.runner.as_ref(), &self.ambient, &self.config.builder_image);
                let output = builder.build(checkout, &id, build)?;
                let published = self.config.static_dir(&id);
                let files = static_site::publish(&output, &published)?;
                Artifacts::Static {
                    output,
                    published,
                    files,
                }
            }
            AppSpec::Server { server } => {
                *stage = Stage::ServerBuild;
                info!(%id, %stage, "Building server");
                let builder = ServerBuild::new(self.runner.as_ref(), &self.ambient, &self.config);
                Artifacts::Server(Box::new(builder.deploy(checkout, workdir, &id, server)?))
            }
        };

        *stage = Stage::RegistryUpdate;
        if let Some(previous) = self.registry.get(&id)? {
            self.retire_previous_shape(&previous, manifest.kind())?;
        }
        let record = self.registry.upsert(self.entry(&id, reference, &manifest, workdir))?;

        info!(%id, url = %record.links.app, "Deployed");
        Ok(Deployment { record, artifacts })
    }

    /// Tear down what an earlier deploy of a different shape left
    /// behind: a compose stack when switching to static, published
    /// files when switching to server.
    fn retire_previous_shape(&self, previous: &Record, kind: AppKind) -> DeployResult<()> {
        let was_server = previous.kind == AppKind::Server;
        if was_server == (kind == AppKind::Server) {
            return Ok(());
        }
        warn!(id = %previous.id, from = %previous.kind, to = %kind, "application type changed, removing old artifacts");

        if was_server {
            let workdir = self.record_workdir(previous);
            self.stop_stack(&previous.id, &workdir)?;
            remove_dir(&scratch_dir(&workdir))?;
        } else {
            remove_dir(&self.config.static_dir(&previous.id))?;
        }
        Ok(())
    }

    fn record_workdir(&self, record: &Record) -> PathBuf {
        record
            .workdir
            .clone()
            .unwrap_or_else(|| self.config.workdir(&record.id))
    }

    /// `compose down` for the stack defined in `workdir`, if any. The
    /// project is taken from the service the compose file defines so a
    /// stack is always stopped under the name it was started with.
    fn stop_stack(&self, id: &str, workdir: &Path) -> DeployResult<Outcome> {
        let compose_file = scratch_dir(workdir).join(COMPOSE_FILE);
        if !compose_file.is_file() {
            return Ok(Outcome::NothingToDo);
        }
        let owner = compose::service_name(&compose_file).unwrap_or_else(|e| {
            warn!(file = %compose_file.display(), "unreadable compose file, assuming {id}: {e}");
            None
        });
        let project = docker::project_name(owner.as_deref().unwrap_or(id));
        self.runner
            .run(&docker::compose_down(&project, &compose_file))?;
        Ok(Outcome::Done)
    }

    /// True when `workdir` is the work directory of a registered
    /// application other than `id`.
    fn claimed_by_other(&self, id: &str, workdir: &Path) -> DeployResult<bool> {
        Ok(self
            .registry
            .list()?
            .iter()
            .any(|r| r.id != id && self.record_workdir(r) == workdir))
    }

    fn entry(&self, id: &str, reference: &str, manifest: &Manifest, workdir: &Path) -> Entry {
        Entry {
            id: id.to_string(),
            name: manifest.name.clone().unwrap_or_else(|| id.to_string()),
            kind: manifest.kind(),
            repo: reference.to_string(),
            links: Links {
                app: self.config.app_url(id),
                blog: self.config.blog_url(id),
                source: source_url(reference),
            },
            meta: manifest.meta.clone(),
            workdir: Some(workdir.to_path_buf()),
        }
    }

    /// Tear an application down. Missing pieces are reported as
    /// [`Outcome::NothingToDo`]; only command and IO failures are
    /// errors. The checkout is removed only when `purge` is set.
    pub fn undeploy(&self, app_id: &str, purge: bool) -> DeployResult<UndeployReport> {
        let id = slugify(app_id);
        let record = self.registry.get(&id)?;
        let workdir = record
            .as_ref()
            .map_or_else(|| self.config.workdir(&id), |r| self.record_workdir(r));
        let foreign = record.is_none() && self.claimed_by_other(&id, &workdir)?;
        if foreign {
            warn!(%id, workdir = %workdir.display(), "work directory belongs to another application, leaving it alone");
        }

        let mut report = UndeployReport {
            id: id.clone(),
            steps: Vec::new(),
        };

        let outcome = if foreign {
            Outcome::NothingToDo
        } else {
            self.stop_stack(&id, &workdir)?
        };
        report.push(UndeployStep::StopStack, outcome);

        let outcome = remove_dir(&self.config.static_dir(&id))?;
        report.push(UndeployStep::RemoveStaticArtifacts, outcome);

        let outcome = if foreign {
            Outcome::NothingToDo
        } else {
            remove_dir(&scratch_dir(&workdir))?
        };
        report.push(UndeployStep::RemoveAuxArtifacts, outcome);

        let outcome = if self.registry.remove(&id)? {
            Outcome::Done
        } else {
            Outcome::NothingToDo
        };
        report.push(UndeployStep::RemoveRegistryEntry, outcome);

        let outcome = match (purge, foreign) {
            (false, _) => Outcome::Skipped,
            (true, true) => Outcome::NothingToDo,
            (true, false) => remove_dir(&workdir)?,
        };
        report.push(UndeployStep::PurgeCheckout, outcome);

        Ok(report)
    }

    /// Registered applications, ordered by id.
    pub fn list(&self) -> DeployResult<Vec<Record>> {
        self.registry.list()
    }

    /// Work directory undeploy would purge for `app_id`.
    pub fn workdir_of(&self, app_id: &str) -> DeployResult<PathBuf> {
        let id = slugify(app_id);
        Ok(self
            .registry
            .get(&id)?
            .map_or_else(|| self.config.workdir(&id), |r| self.record_workdir(&r)))
    }
}

/// Browsable source link: URLs as-is, anything else treated as a
/// GitHub `owner/repo`.
#[must_use]
pub fn source_url(reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        reference.to_string()
    } else {
        format!("https://github.com/{reference}")
    }
}

fn remove_dir(dir: &Path) -> DeployResult<Outcome> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| {
            DeployError::Other(format!("failed to remove {}: {e}", dir.display()))
        })?;
        Ok(Outcome::Done)
    } else {
        Ok(Outcome::NothingToDo)
    }
}
