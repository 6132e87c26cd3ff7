use std::collections::BTreeMap;
use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::manifest::AppKind;

const DOCUMENT_MODE: u32 = 0o644;

/// Public URLs of a deployed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    pub app: String,
    pub blog: String,
    #[serde(alias = "github")]
    pub source: String,
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AppKind,
    pub repo: String,
    pub links: Links,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

/// The fields a deploy supplies; timestamps are managed by the
/// registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub kind: AppKind,
    pub repo: String,
    pub links: Links,
    pub meta: serde_json::Map<String, serde_json::Value>,
    pub workdir: Option<PathBuf>,
}

/// The whole persisted registry: `{"apps": {<id>: <record>}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub apps: BTreeMap<String, Record>,
}

impl Document {
    /// Insert or replace the record for `entry.id`, keeping an
    /// existing `created_at` and never moving `updated_at` backwards.
    pub fn upsert(&mut self, entry: Entry, now: DateTime<Utc>) -> &Record {
        let now = now.trunc_subsecs(0);
        let (created_at, updated_at) = match self.apps.get(&entry.id) {
            Some(existing) => (existing.created_at, now.max(existing.updated_at)),
            None => (now, now),
        };

        let id = entry.id.clone();
        let record = Record {
            id: entry.id,
            name: entry.name,
            kind: entry.kind,
            repo: entry.repo,
            links: entry.links,
            created_at,
            updated_at,
            meta: entry.meta,
            workdir: entry.workdir,
        };
        self.apps.insert(id.clone(), record);
        &self.apps[&id]
    }

    pub fn remove(&mut self, id: &str) -> Option<Record> {
        self.apps.remove(id)
    }
}

/// File-backed registry. Every mutation is a full
/// read-modify-write of the document.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is an empty registry.
    pub fn load(&self) -> DeployResult<Document> {
        if !self.path.exists() {
            return Ok(Document::default());
        }
        let corrupt = |message: String| DeployError::Registry {
            path: self.path.clone(),
            message,
        };
        let text = std::fs::read_to_string(&self.path).map_err(|e| corrupt(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))
    }

    /// Write the whole document through a temp file in the same
    /// directory, then rename it over the old one.
    pub fn save(&self, doc: &Document) -> DeployResult<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(doc)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().set_permissions(self.permissions())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| DeployError::Io(e.error))?;

        info!(path = %self.path.display(), "Updated registry");
        Ok(())
    }

    /// Mode for a rewritten document: the current file's, or
    /// world-readable for a new one so the web server can read it.
    fn permissions(&self) -> Permissions {
        std::fs::metadata(&self.path).map_or_else(
            |_| Permissions::from_mode(DOCUMENT_MODE),
            |meta| meta.permissions(),
        )
    }

    pub fn upsert(&self, entry: Entry) -> DeployResult<Record> {
        let mut doc = self.load()?;
        let record = doc.upsert(entry, Utc::now()).clone();
        self.save(&doc)?;
        Ok(record)
    }

    /// Remove an entry. Returns `false` when there was nothing to
    /// remove; the file is left untouched in that case.
    pub fn remove(&self, id: &str) -> DeployResult<bool> {
        let mut doc = self.load()?;
        if doc.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&doc)?;
        Ok(true)
    }

    pub fn get(&self, id: &str) -> DeployResult<Option<Record>> {
        Ok(self.load()?.apps.remove(id))
    }

    /// All records, ordered by id.
    pub fn list(&self) -> DeployResult<Vec<Record>> {
        Ok(self.load()?.apps.into_values().collect())
    }
}
