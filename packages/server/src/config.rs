//! Server configuration from environment variables.
//!
//! Read once at start-up; every collaborator client is built from the
//! resulting [`ServerConfig`].

use std::time::Duration;

/// Settings for the server and the services it talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Triplestore host URL.
    pub triplestore_url: String,
    /// Triplestore port.
    pub triplestore_port: u16,
    /// Repository name under `/repositories/`.
    pub triplestore_repository: String,
    /// Search index host URL.
    pub es_url: String,
    /// Search index port.
    pub es_port: u16,
    /// Geometry data service base URL.
    pub geometry_endpoint: String,
    /// Budget for one whole inbound request.
    pub response_timeout: Duration,
    /// Idle pooled connections kept per upstream host.
    pub pool_max_idle_per_host: usize,
    /// Listen address.
    pub bind_addr: String,
    /// Listen port.
    pub port: u16,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for missing or unparseable values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| {
            lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };
        let port = |key: &str, default: u16| {
            lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };

        Self {
            triplestore_url: text("TRIPLESTORE_CACHE_URL", "http://db.loci.cat"),
            triplestore_port: port("TRIPLESTORE_CACHE_PORT", 80),
            triplestore_repository: text("TRIPLESTORE_CACHE_REPOSITORY", "loci-cache"),
            es_url: text("ES_URL", "http://elasticsearch"),
            es_port: port("ES_PORT", 9200),
            geometry_endpoint: text("GEOM_DATA_SVC_ENDPOINT", "https://gds.loci.cat"),
            response_timeout: Duration::from_secs(number("RESPONSE_TIMEOUT", 4800)),
            pool_max_idle_per_host: usize::try_from(number("POOL_MAX_IDLE_PER_HOST", 8))
                .unwrap_or(8),
            bind_addr: text("BIND_ADDR", "127.0.0.1"),
            port: port("PORT", 8080),
        }
    }

    /// The SPARQL query endpoint.
    #[must_use]
    pub fn sparql_endpoint(&self) -> String {
        format!(
            "{}:{}/repositories/{}",
            self.triplestore_url.trim_end_matches('/'),
            self.triplestore_port,
            self.triplestore_repository
        )
    }

    /// The search index `_search` endpoint.
    #[must_use]
    pub fn search_endpoint(&self) -> String {
        format!("{}:{}/_search", self.es_url.trim_end_matches('/'), self.es_port)
    }

    /// Builds the pooled HTTP client shared by one upstream collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .timeout(self.response_timeout)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_public_services() {
        let config = config(&[]);
        assert_eq!(
            config.sparql_endpoint(),
            "http://db.loci.cat:80/repositories/loci-cache"
        );
        assert_eq!(config.search_endpoint(), "http://elasticsearch:9200/_search");
        assert_eq!(config.geometry_endpoint, "https://gds.loci.cat");
        assert_eq!(config.response_timeout, Duration::from_secs(4800));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn overrides_and_bad_values() {
        let config = config(&[
            ("TRIPLESTORE_CACHE_URL", "http://localhost/"),
            ("TRIPLESTORE_CACHE_PORT", "7200"),
            ("RESPONSE_TIMEOUT", "soon"),
            ("PORT", "9000"),
        ]);
        assert_eq!(
            config.sparql_endpoint(),
            "http://localhost:7200/repositories/loci-cache"
        );
        assert_eq!(config.response_timeout, Duration::from_secs(4800));
        assert_eq!(config.port, 9000);
    }
}
