use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT: &str = "/srv/vibes";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_NETWORK: &str = "web";
pub const DEFAULT_CERT_RESOLVER: &str = "letsencrypt";
pub const DEFAULT_ENTRYPOINT: &str = "websecure";
pub const DEFAULT_BUILDER_IMAGE: &str = "node:20-alpine";

/// Host-wide settings, resolved once at startup and handed to every
/// component.
///
/// # Example
///
/// ```
/// use vibes::Config;
///
/// let config = Config::new("/tmp/vibes").public_host("apps.example.com");
///
/// assert_eq!(config.static_root(), std::path::Path::new("/tmp/vibes/static"));
/// assert_eq!(config.app_url("demo"), "https://apps.example.com/app/demo/");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub public_host: String,
    pub network: String,
    pub cert_resolver: String,
    pub entrypoint: String,
    pub builder_image: String,
}

impl Config {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_host: DEFAULT_HOST.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            cert_resolver: DEFAULT_CERT_RESOLVER.to_string(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            builder_image: DEFAULT_BUILDER_IMAGE.to_string(),
        }
    }

    /// Read `VIBES_*` variables from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset or empty
    /// values keep their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get("VIBES_ROOT").unwrap_or_else(|| DEFAULT_ROOT.into()));
        if let Some(host) = get("VIBES_HOST") {
            config.public_host = host;
        }
        if let Some(network) = get("VIBES_NETWORK") {
            config.network = network;
        }
        if let Some(resolver) = get("VIBES_CERT_RESOLVER") {
            config.cert_resolver = resolver;
        }
        if let Some(entrypoint) = get("VIBES_ENTRYPOINT") {
            config.entrypoint = entrypoint;
        }
        if let Some(image) = get("VIBES_BUILDER_IMAGE") {
            config.builder_image = image;
        }
        config
    }

    #[must_use]
    pub fn public_host(mut self, host: &str) -> Self {
        self.public_host = host.to_string();
        self
    }

    #[must_use]
    pub fn network(mut self, network: &str) -> Self {
        self.network = network.to_string();
        self
    }

    #[must_use]
    pub fn cert_resolver(mut self, resolver: &str) -> Self {
        self.cert_resolver = resolver.to_string();
        self
    }

    #[must_use]
    pub fn entrypoint(mut self, entrypoint: &str) -> Self {
        self.entrypoint = entrypoint.to_string();
        self
    }

    #[must_use]
    pub fn builder_image(mut self, image: &str) -> Self {
        self.builder_image = image.to_string();
        self
    }

    #[must_use]
    pub fn static_root(&self) -> PathBuf {
        self.root.join("static")
    }

    #[must_use]
    pub fn apps_root(&self) -> PathBuf {
        self.root.join("apps")
    }

    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry").join("apps.json")
    }

    /// `<apps-root>/<id>`: holds `repo/` and `.deploy/`.
    #[must_use]
    pub fn workdir(&self, id: &str) -> PathBuf {
        self.apps_root().join(id)
    }

    #[must_use]
    pub fn static_dir(&self, id: &str) -> PathBuf {
        self.static_root().join(id)
    }

    #[must_use]
    pub fn app_url(&self, id: &str) -> String {
        format!("https://{}{}", self.public_host, base_path(id))
    }

    #[must_use]
    pub fn blog_url(&self, id: &str) -> String {
        format!("https://{}/blog/{id}", self.public_host)
    }
}

/// Path prefix an application is mounted under: `/app/<id>/`.
#[must_use]
pub fn base_path(id: &str) -> String {
    format!("/app/{id}/")
}

/// The checkout inside a work directory.
#[must_use]
pub fn repo_dir(workdir: &Path) -> PathBuf {
    workdir.join("repo")
}

/// Scratch area for generated container files.
#[must_use]
pub fn scratch_dir(workdir: &Path) -> PathBuf {
    workdir.join(".deploy")
}
