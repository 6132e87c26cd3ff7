use indexmap::IndexMap;

use crate::slug::proxy_ident;

/// Reverse-proxy routing for one application, expressed as Traefik
/// docker labels.
///
/// Requests for `https://<host>/app/<id>...` are routed to the
/// container on `port` with the `/app/<id>` prefix stripped; TLS is
/// terminated by the proxy using its certificate resolver.
///
/// # Example
///
/// ```
/// use vibes::routing::Routes;
///
/// let routes = Routes::new("my-api", "apps.example.com", 4000);
///
/// assert_eq!(routes.router(), "my_api");
/// assert_eq!(routes.path_prefix(), "/app/my-api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub network: Option<String>,
    pub entrypoint: String,
    pub cert_resolver: String,
}

impl Routes {
    #[must_use]
    pub fn new(id: &str, host: &str, port: u16) -> Self {
        Self {
            id: id.to_string(),
            host: host.to_string(),
            port,
            network: None,
            entrypoint: crate::config::DEFAULT_ENTRYPOINT.to_string(),
            cert_resolver: crate::config::DEFAULT_CERT_RESOLVER.to_string(),
        }
    }

    #[must_use]
    pub fn network(mut self, network: &str) -> Self {
        self.network = Some(network.to_string());
        self
    }

    #[must_use]
    pub fn entrypoint(mut self, entrypoint: &str) -> Self {
        self.entrypoint = entrypoint.to_string();
        self
    }

    #[must_use]
    pub fn cert_resolver(mut self, resolver: &str) -> Self {
        self.cert_resolver = resolver.to_string();
        self
    }

    /// Router and service name.
    #[must_use]
    pub fn router(&self) -> String {
        proxy_ident(&self.id)
    }

    #[must_use]
    pub fn middleware(&self) -> String {
        format!("{}_strip", self.router())
    }

    #[must_use]
    pub fn path_prefix(&self) -> String {
        format!("/app/{}", self.id)
    }

    #[must_use]
    pub fn rule(&self) -> String {
        format!(
            "Host(`{}`) && PathPrefix(`{}`)",
            self.host,
            self.path_prefix()
        )
    }

    /// The complete label set, in a stable order.
    #[must_use]
    pub fn labels(&self) -> IndexMap<String, String> {
        let router = format!("traefik.http.routers.{}", self.router());
        let middleware = self.middleware();

        let mut labels = IndexMap::new();
        labels.insert("traefik.enable".to_string(), "true".to_string());
        if let Some(network) = &self.network {
            labels.insert("traefik.docker.network".to_string(), network.clone());
        }
        labels.insert(format!("{router}.rule"), self.rule());
        labels.insert(format!("{router}.entrypoints"), self.entrypoint.clone());
        labels.insert(format!("{router}.tls"), "true".to_string());
        labels.insert(
            format!("{router}.tls.certresolver"),
            self.cert_resolver.clone(),
        );
        labels.insert(
            format!("traefik.http.middlewares.{middleware}.stripprefix.prefixes"),
            self.path_prefix(),
        );
        labels.insert(format!("{router}.middlewares"), middleware);
        labels.insert(format!("{router}.service"), self.router());
        labels.insert(
            format!(
                "traefik.http.services.{}.loadbalancer.server.port",
                self.router()
            ),
            self.port.to_string(),
        );
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let routes = Routes::new("x", "h", 1);

        assert_eq!(routes.entrypoint, "websecure");
        assert_eq!(routes.cert_resolver, "letsencrypt");
        assert!(routes.network.is_none());
        assert!(!routes.labels().contains_key("traefik.docker.network"));
    }
}
