#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Graph store access for the LOCI integration API.
//!
//! The backing triplestore is reached through the [`GraphStore`] trait so
//! that the HTTP client ([`client::SparqlClient`]) can be swapped for an
//! in-memory fake in tests. Queries are never assembled by splicing text:
//! they are built from structured clauses in [`query`], which validates
//! every IRI before it is rendered.
//!
//! On top of the raw store this crate provides the simple entity listings
//! ([`listings`]) and deep resource description ([`resource`]) that
//! normalize typed bindings into plain values.

pub mod client;
pub mod listings;
pub mod query;
pub mod resource;
mod retry;
pub mod vocab;

use async_trait::async_trait;
use loci_graph_models::SparqlResults;
use thiserror::Error;

use crate::query::Query;

/// Default page size for listing queries.
pub const DEFAULT_LIMIT: u64 = 1000;

/// Errors from graph store operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid SPARQL JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store answered with a non-success status.
    #[error("Graph store returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// A caller-supplied IRI cannot be embedded in a query.
    #[error("Invalid IRI {iri:?}: {reason}")]
    InvalidIri {
        /// The rejected value.
        iri: String,
        /// What the IRI parser objected to.
        reason: String,
    },
}

/// A query together with the store-side evaluation flags and page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Rendered SPARQL text.
    pub query: String,
    /// Whether the store should apply inference.
    pub infer: bool,
    /// Whether the store should expand `owl:sameAs`.
    pub same_as: bool,
    /// Maximum rows to return.
    pub limit: u64,
    /// Rows to skip.
    pub offset: u64,
}

impl QueryRequest {
    /// Renders `query` with inference and `sameAs` expansion enabled and
    /// the default page window.
    #[must_use]
    pub fn new(query: &Query) -> Self {
        Self {
            query: query.to_string(),
            infer: true,
            same_as: true,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Sets the page window.
    #[must_use]
    pub const fn with_page(mut self, limit: u64, offset: u64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// A read-only SPARQL endpoint.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Evaluates a query and returns its typed bindings.
    ///
    /// A response without a `results` wrapper is not an error; it simply
    /// yields no rows.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the transport fails or the response
    /// cannot be decoded.
    async fn query(&self, request: &QueryRequest) -> Result<SparqlResults, GraphError>;
}

/// Runs a `SELECT` query over one page.
///
/// # Errors
///
/// Returns [`GraphError`] if the store call fails.
pub async fn select(
    store: &dyn GraphStore,
    query: &Query,
    limit: u64,
    offset: u64,
) -> Result<SparqlResults, GraphError> {
    let request = QueryRequest::new(query).with_page(limit, offset);
    log::debug!("SPARQL select (limit={limit}, offset={offset})");
    store.query(&request).await
}

/// Runs an `ASK` query. A missing `boolean` is read as `false`.
///
/// # Errors
///
/// Returns [`GraphError`] if the store call fails.
pub async fn ask(store: &dyn GraphStore, query: &Query) -> Result<bool, GraphError> {
    let request = QueryRequest::new(query);
    Ok(store.query(&request).await?.boolean.unwrap_or(false))
}
