//! HTTP SPARQL client for the LOCI cache triplestore.
//!
//! Queries are `POST`ed as form parameters together with the store's
//! `infer` / `sameAs` flags and the page window. The `reqwest::Client`
//! handed in at construction owns the connection pool and is shared by
//! every request.

use async_trait::async_trait;
use loci_graph_models::SparqlResults;

use crate::{GraphError, GraphStore, QueryRequest, retry};

/// `Accept` header sent with every query.
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json,*/*;q=0.9";

/// A [`GraphStore`] backed by a remote SPARQL endpoint.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SparqlClient {
    /// Creates a client for `endpoint` (e.g.
    /// `http://db.loci.cat:80/repositories/loci-cache`).
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// The endpoint URL queries are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

const fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[async_trait]
impl GraphStore for SparqlClient {
    async fn query(&self, request: &QueryRequest) -> Result<SparqlResults, GraphError> {
        let limit = request.limit.to_string();
        let offset = request.offset.to_string();
        let form = [
            ("query", request.query.as_str()),
            ("infer", flag(request.infer)),
            ("sameAs", flag(request.same_as)),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];

        let body = retry::send_json(|| {
            self.client
                .post(&self.endpoint)
                .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
                .form(&form)
        })
        .await?;

        Ok(serde_json::from_value(body)?)
    }
}
