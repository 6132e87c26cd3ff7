use vibes::error::DeployError;
use vibes::manifest::AppKind;
use vibes::registry::{Entry, Links, Registry};

fn entry(id: &str) -> Entry {
    Entry {
        id: id.to_string(),
        name: id.to_uppercase(),
        kind: AppKind::Static,
        repo: format!("acme/{id}"),
        links: Links {
            app: format!("https://localhost/app/{id}/"),
            blog: format!("https://localhost/blog/{id}"),
            source: format!("https://github.com/acme/{id}"),
        },
        meta: serde_json::Map::new(),
        workdir: None,
    }
}

#[test]
fn missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(&dir.path().join("registry/apps.json"));

    let doc = registry.load().unwrap();

    assert!(doc.apps.is_empty());
    assert!(registry.list().unwrap().is_empty());
}

#[test]
fn upsert_creates_parent_and_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry/apps.json");
    let registry = Registry::new(&path);

    let record = registry.upsert(entry("site")).unwrap();

    assert_eq!(record.created_at, record.updated_at);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["apps"]["site"]["type"], "static");
    assert_eq!(json["apps"]["site"]["name"], "SITE");
    assert_eq!(
        json["apps"]["site"]["links"]["source"],
        "https://github.com/acme/site"
    );
    assert!(json["apps"]["site"].get("workdir").is_none());
}

#[test]
fn upsert_preserves_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(&dir.path().join("apps.json"));

    let first = registry.upsert(entry("site")).unwrap();
    let mut changed = entry("site");
    changed.kind = AppKind::Spa;
    changed.name = "Renamed".into();
    let second = registry.upsert(changed).unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.kind, AppKind::Spa);
    assert_eq!(second.name, "Renamed");
}

#[test]
fn remove_reports_presence() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(&dir.path().join("apps.json"));
    registry.upsert(entry("a")).unwrap();
    registry.upsert(entry("b")).unwrap();

    assert!(registry.remove("a").unwrap());
    assert!(!registry.remove("a").unwrap());
    assert!(!registry.remove("never").unwrap());

    let ids: Vec<String> = registry.list().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn remove_on_missing_file_does_not_create_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apps.json");
    let registry = Registry::new(&path);

    assert!(!registry.remove("ghost").unwrap());
    assert!(!path.exists());
}

#[test]
fn list_is_sorted_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(&dir.path().join("apps.json"));
    for id in ["zeta", "alpha", "mid"] {
        registry.upsert(entry(id)).unwrap();
    }

    let ids: Vec<String> = registry.list().unwrap().into_iter().map(|r| r.id).collect();

    assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn corrupt_document_is_a_registry_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apps.json");
    std::fs::write(&path, "{ not json").unwrap();
    let registry = Registry::new(&path);

    let err = registry.load().unwrap_err();

    assert!(matches!(err, DeployError::Registry { .. }));
    assert!(registry.upsert(entry("x")).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn save_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(&dir.path().join("apps.json"));

    registry.upsert(entry("a")).unwrap();
    registry.upsert(entry("b")).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["apps.json"]);
}

#[test]
fn new_document_is_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apps.json");
    let registry = Registry::new(&path);

    registry.upsert(entry("a")).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}

#[test]
fn save_keeps_existing_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apps.json");
    let registry = Registry::new(&path);
    registry.upsert(entry("a")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

    registry.upsert(entry("b")).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o640);
}
