//! Label search over the LOCI search index.
//!
//! The index is an Elasticsearch-compatible `_search` endpoint. Hits are
//! handed back exactly as the index returned them.

use serde_json::json;

use crate::{Lookup, LookupError, check_status};

const SERVICE: &str = "Search index";

/// Client for the search index.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    /// Creates a client for `endpoint`
    /// (e.g. `http://elasticsearch:9200/_search`).
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<serde_json::Value, LookupError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&label_query(query))
            .send()
            .await?;
        Ok(check_status(SERVICE, resp)?.json().await?)
    }

    /// Searches feature labels for `query`.
    ///
    /// Failures are returned as [`Lookup::Failed`], never raised.
    pub async fn search_location_by_label(&self, query: &str) -> Lookup<serde_json::Value> {
        log::debug!("Label search for {query:?}");
        Lookup::from_result(SERVICE, self.fetch(query).await)
    }
}

fn label_query(query: &str) -> serde_json::Value {
    json!({
        "query": {
            "match": {
                "label": query
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_label() {
        assert_eq!(
            label_query("Brisbane River"),
            json!({"query": {"match": {"label": "Brisbane River"}}})
        );
    }

    #[test]
    fn hits_pass_through_unchanged() {
        let hits = json!({"hits": {"total": 1, "hits": [{"_source": {"label": "A"}}]}});
        let lookup = Lookup::Found(hits.clone());
        assert_eq!(serde_json::to_value(&lookup).unwrap(), hits);
    }

    #[tokio::test]
    async fn unreachable_index_is_structured_failure() {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let search = SearchClient::new(client, "http://127.0.0.1:9/_search");
        let lookup = search.search_location_by_label("anything").await;
        assert!(!lookup.is_ok());
    }
}
