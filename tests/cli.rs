use chrono::{TimeZone, Utc};
use clap::Parser;
use vibes::AppKind;
use vibes::cli::{Cli, Command, render_table};
use vibes::registry::{Links, Record};

fn record(id: &str, kind: AppKind, repo: &str) -> Record {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    Record {
        id: id.to_string(),
        name: id.to_string(),
        kind,
        repo: repo.to_string(),
        links: Links {
            app: format!("https://h/app/{id}/"),
            blog: format!("https://h/blog/{id}"),
            source: repo.to_string(),
        },
        created_at: at,
        updated_at: at,
        meta: serde_json::Map::new(),
        workdir: None,
    }
}

#[test]
fn table_aligns_columns() {
    let table = render_table(&[
        record("a", AppKind::Static, "acme/a"),
        record("long-name", AppKind::Server, "https://x/y.git"),
    ]);

    assert_eq!(
        table,
        "\
ID         TYPE    APP URL                   REPO
a          static  https://h/app/a/          acme/a
long-name  server  https://h/app/long-name/  https://x/y.git
"
    );
}

#[test]
fn empty_table_is_header_only() {
    assert_eq!(render_table(&[]), "ID  TYPE  APP URL  REPO\n");
}

#[test]
fn parses_deploy_with_app_id() {
    let cli = Cli::try_parse_from(["vibe", "deploy", "acme/site", "--app-id", "site"]).unwrap();

    assert!(matches!(
        cli.command,
        Command::Deploy { ref repo, app_id: Some(ref id) } if repo == "acme/site" && id == "site"
    ));
}

#[test]
fn parses_undeploy_flags() {
    let cli = Cli::try_parse_from(["vibe", "-v", "undeploy", "site", "--purge", "--yes"]).unwrap();

    assert!(cli.verbose);
    assert!(matches!(
        cli.command,
        Command::Undeploy { purge: true, yes: true, .. }
    ));
}

#[test]
fn undeploy_requires_an_id() {
    assert!(Cli::try_parse_from(["vibe", "undeploy"]).is_err());
}
