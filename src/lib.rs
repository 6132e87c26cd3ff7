//! Deploy git-hosted applications onto a shared host.
//!
//! `vibes` clones a repository, reads its optional `vibe.yaml`
//! manifest and publishes it under `/app/<id>/` in one of two shapes:
//!
//! - **static / spa**: run an optional install and build step
//!   (locally or in a throwaway container), then copy the build output
//!   into the shared static root, replacing whatever was there
//! - **server**: derive a Dockerfile (or use the repository's own),
//!   generate Traefik routing labels and a `docker-compose.yml`, then
//!   build and start the service behind the reverse proxy
//!
//! Every successful deploy is recorded in a JSON registry, and every
//! deploy and undeploy is safe to re-run.
//!
//! # Layout
//!
//! All state lives under one root (`VIBES_ROOT`, default
//! `/srv/vibes`):
//!
//! ```text
//! registry/apps.json        registry document
//! apps/<id>/repo/           git checkout
//! apps/<id>/.deploy/        generated Dockerfile and compose file
//! static/<id>/              published static output
//! ```
//!
//! # Manifest
//!
//! ```yaml
//! id: my-app
//! name: My App
//! type: spa            # static | spa | server
//! build:
//!   install: npm ci
//!   command: npm run build
//!   output_dir: dist
//!   base_path_env: VITE_BASE
//! meta:
//!   tags: [demo]
//! ```
//!
//! ```yaml
//! type: server
//! server:
//!   runtime: node      # node | python
//!   start: node server.js --port 4000
//!   env: [DATABASE_URL]
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use vibes::{Config, Orchestrator};
//!
//! fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::new(Config::new("/srv/vibes"));
//!
//!     orchestrator.deploy("https://github.com/acme/landing.git", None)?;
//!     for record in orchestrator.list()? {
//!         println!("{} -> {}", record.id, record.links.app);
//!     }
//!     orchestrator.undeploy("landing", false)?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod compose;
pub mod config;
pub mod docker;
pub mod dockerfile;
pub mod env;
pub mod error;
pub mod git;
pub mod manifest;
pub mod orchestrator;
pub mod registry;
pub mod routing;
pub mod server;
pub mod slug;
pub mod static_site;

pub use cmd::{Command, CommandRunner, SystemRunner};
pub use config::Config;
pub use error::{DeployError, DeployResult};
pub use manifest::{AppKind, AppSpec, Manifest};
pub use orchestrator::{Deployment, Orchestrator, Outcome, UndeployReport, UndeployStep};
pub use registry::{Record, Registry};
pub use slug::slugify;
