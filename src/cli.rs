use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::error::DeployResult;
use crate::orchestrator::{Artifacts, Orchestrator, Outcome, UndeployStep};
use crate::registry::Record;

#[derive(Parser)]
#[command(name = "vibe")]
#[command(about = "Deploy git-hosted apps to the shared host")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a repository to /app/<id>/
    Deploy {
        /// Git URL, local path, or owner/repo
        repo: String,

        /// Override the inferred app id
        #[arg(long)]
        app_id: Option<String>,
    },

    /// Stop and remove a deployed app
    Undeploy {
        /// App id
        app_id: String,

        /// Also delete the local checkout
        #[arg(long)]
        purge: bool,

        /// Do not ask before purging
        #[arg(long)]
        yes: bool,
    },

    /// List registered apps
    List,
}

/// Dispatch a parsed command.
pub fn run(cli: &Cli, config: Config) -> DeployResult<()> {
    let orchestrator = Orchestrator::new(config);

    match &cli.command {
        Command::Deploy { repo, app_id } => cmd_deploy(&orchestrator, repo, app_id.as_deref()),
        Command::Undeploy { app_id, purge, yes } => {
            cmd_undeploy(&orchestrator, app_id, *purge, *yes)
        }
        Command::List => cmd_list(&orchestrator),
    }
}

fn cmd_deploy(orchestrator: &Orchestrator, repo: &str, app_id: Option<&str>) -> DeployResult<()> {
    let deployment = orchestrator.deploy(repo, app_id)?;

    match &deployment.artifacts {
        Artifacts::Static { published, files, .. } => {
            info!("Published {files} files to {}", published.display());
        }
        Artifacts::Server(plan) => {
            info!(
                "Service {} listening on {} behind {}",
                plan.service.container_name,
                plan.port,
                plan.routes.path_prefix()
            );
        }
    }

    eprintln!();
    eprintln!("Deployed! -> {}", deployment.record.links.app);
    Ok(())
}

fn cmd_undeploy(orchestrator: &Orchestrator, app_id: &str, purge: bool, yes: bool) -> DeployResult<()> {
    let purge = purge && (yes || confirm_purge(orchestrator, app_id)?);

    let report = orchestrator.undeploy(app_id, purge)?;
    for (step, outcome) in &report.steps {
        eprintln!("  {step}: {outcome}");
    }

    if report.outcome(UndeployStep::PurgeCheckout) == Some(Outcome::Skipped) {
        eprintln!("Checkout kept; pass --purge to delete it.");
    }
    if report.is_noop() {
        eprintln!("{} was not deployed, nothing removed.", report.id);
    } else {
        eprintln!("Undeployed {}", report.id);
    }
    Ok(())
}

fn confirm_purge(orchestrator: &Orchestrator, app_id: &str) -> DeployResult<bool> {
    let workdir = orchestrator.workdir_of(app_id)?;
    eprintln!(
        "WARNING: this will permanently delete {}",
        workdir.display()
    );
    eprint!("Are you sure? Type 'yes' to confirm: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    if input.trim() == "yes" {
        Ok(true)
    } else {
        eprintln!("Purge aborted, continuing without it.");
        Ok(false)
    }
}

fn cmd_list(orchestrator: &Orchestrator) -> DeployResult<()> {
    let records = orchestrator.list()?;
    if records.is_empty() {
        eprintln!("No apps registered.");
        return Ok(());
    }
    print!("{}", render_table(&records));
    Ok(())
}

/// Plain-text table of registry records: id, type, app URL, repo.
#[must_use]
pub fn render_table(records: &[Record]) -> String {
    let header = ["ID", "TYPE", "APP URL", "REPO"];
    let rows: Vec<[String; 4]> = records
        .iter()
        .map(|r| {
            [
                r.id.clone(),
                r.kind.to_string(),
                r.links.app.clone(),
                r.repo.clone(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |cells: [&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(header);
    for row in &rows {
        out.push_str(&line([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
        ]));
    }
    out
}
