use std::path::{Path, PathBuf};

use docker_compose_types::{
    AdvancedBuildStep, BuildStep, Compose, ComposeNetwork, ComposeNetworks, Environment, Labels,
    MapOrEmpty, NetworkSettings, Networks, Service, Services, StringOrList,
};
use indexmap::IndexMap;

use crate::docker;
use crate::error::DeployResult;
use crate::routing::Routes;

pub const RESTART_POLICY: &str = "unless-stopped";

/// The single service a server deployment runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDef {
    pub name: String,
    pub image: String,
    pub container_name: String,
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub restart: String,
    pub network: String,
    pub labels: IndexMap<String, String>,
    pub environment: IndexMap<String, String>,
    pub env_file: Option<PathBuf>,
}

impl ServiceDef {
    /// Service for application `id` built from `context` with
    /// `dockerfile`, attached to the external `network`.
    #[must_use]
    pub fn new(id: &str, context: PathBuf, dockerfile: PathBuf, network: &str) -> Self {
        Self {
            name: id.to_string(),
            image: docker::image_tag(id),
            container_name: docker::project_name(id),
            context,
            dockerfile,
            restart: RESTART_POLICY.to_string(),
            network: network.to_string(),
            labels: IndexMap::new(),
            environment: IndexMap::new(),
            env_file: None,
        }
    }

    #[must_use]
    pub fn routes(mut self, routes: &Routes) -> Self {
        self.labels.extend(routes.labels());
        self
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.environment.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn env_file(mut self, path: PathBuf) -> Self {
        self.env_file = Some(path);
        self
    }

    /// The compose document for this service.
    #[must_use]
    pub fn to_compose(&self) -> Compose {
        let mut services = IndexMap::new();
        services.insert(self.name.clone(), Some(self.service()));

        Compose {
            services: Services(services),
            networks: self.external_network(),
            ..Default::default()
        }
    }

    /// Render `docker-compose.yml`.
    pub fn render(&self) -> DeployResult<String> {
        Ok(serde_yaml::to_string(&self.to_compose())?)
    }

    fn service(&self) -> Service {
        let environment = if self.environment.is_empty() {
            Environment::default()
        } else {
            Environment::List(
                self.environment
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect(),
            )
        };

        let env_file = self
            .env_file
            .as_ref()
            .map(|p| StringOrList::Simple(p.to_string_lossy().into_owned()));

        Service {
            image: Some(self.image.clone()),
            container_name: Some(self.container_name.clone()),
            build_: Some(BuildStep::Advanced(AdvancedBuildStep {
                context: self.context.to_string_lossy().into_owned(),
                dockerfile: Some(self.dockerfile.to_string_lossy().into_owned()),
                ..Default::default()
            })),
            restart: Some(self.restart.clone()),
            environment,
            env_file,
            labels: Labels::Map(self.labels.clone()),
            networks: Networks::Simple(vec![self.network.clone()]),
            ..Default::default()
        }
    }

    fn external_network(&self) -> ComposeNetworks {
        let mut nets = IndexMap::new();
        nets.insert(
            self.network.clone(),
            MapOrEmpty::Map(NetworkSettings {
                external: Some(ComposeNetwork::Bool(true)),
                ..Default::default()
            }),
        );
        ComposeNetworks(nets)
    }
}

/// Name of the first service in an existing compose file. Server
/// deploys write exactly one service, named after the application.
pub fn service_name(path: &Path) -> DeployResult<Option<String>> {
    let text = std::fs::read_to_string(path)?;
    let compose: Compose = serde_yaml::from_str(&text)?;
    Ok(compose.services.0.keys().next().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> ServiceDef {
        ServiceDef::new(
            "api",
            PathBuf::from("/srv/vibes/apps/api/repo"),
            PathBuf::from("/srv/vibes/apps/api/.deploy/Dockerfile"),
            "web",
        )
    }

    #[test]
    fn defaults() {
        let def = def();

        assert_eq!(def.image, "vibe-api:latest");
        assert_eq!(def.container_name, "vibe-api");
        assert_eq!(def.restart, "unless-stopped");
        assert!(def.labels.is_empty());
        assert!(def.environment.is_empty());
        assert!(def.env_file.is_none());
    }

    #[test]
    fn env_overrides_by_key() {
        let def = def().env("PORT", "1").env("PORT", "2");

        assert_eq!(def.environment.len(), 1);
        assert_eq!(def.environment["PORT"], "2");
    }

    #[test]
    fn service_name_of_rendered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(&path, def().render().unwrap()).unwrap();

        assert_eq!(service_name(&path).unwrap().as_deref(), Some("api"));
    }
}
