#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the LOCI integration API.
//!
//! Exposes the entity listings, resource descriptions, and overlap and
//! crosswalk functions over the LOCI cache triplestore, plus point lookup
//! and label search through the auxiliary services. Every upstream client
//! is built once at start-up and shared by all requests through
//! [`AppState`].

pub mod config;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use loci_graph::GraphStore;
use loci_graph::client::SparqlClient;
use loci_lookup::geometry::GeometryClient;
use loci_lookup::search::SearchClient;
use loci_overlaps::hierarchy::HierarchyRegistry;
use loci_overlaps::relations::GraphBackend;

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// The LOCI cache triplestore.
    pub store: Arc<dyn GraphStore>,
    /// Overlap engine view of the same store.
    pub graph: GraphBackend,
    /// Known spatial hierarchies.
    pub registry: HierarchyRegistry,
    /// Point-in-polygon lookups.
    pub geometry: GeometryClient,
    /// Label search.
    pub search: SearchClient,
    /// Budget for one whole request.
    pub response_timeout: Duration,
}

impl AppState {
    /// Builds every upstream client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if an HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        let store: Arc<dyn GraphStore> = Arc::new(SparqlClient::new(
            config.http_client()?,
            config.sparql_endpoint(),
        ));
        Ok(Self::new(
            store,
            GeometryClient::new(config.http_client()?, config.geometry_endpoint.clone()),
            SearchClient::new(config.http_client()?, config.search_endpoint()),
            config.response_timeout,
        ))
    }

    /// Assembles state around an existing store.
    #[must_use]
    pub fn new(
        store: Arc<dyn GraphStore>,
        geometry: GeometryClient,
        search: SearchClient,
        response_timeout: Duration,
    ) -> Self {
        Self {
            graph: GraphBackend::new(store.clone()),
            store,
            registry: HierarchyRegistry::embedded(),
            geometry,
            search,
            response_timeout,
        }
    }
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/v1")
                    .route("/linksets", web::get().to(handlers::linksets))
                    .route("/datasets", web::get().to(handlers::datasets))
                    .route("/dataset/type", web::get().to(handlers::dataset_types))
                    .route("/locations", web::get().to(handlers::locations))
                    .route("/resource", web::get().to(handlers::resource))
                    .route("/location/within", web::get().to(handlers::location_within))
                    .route("/location/contains", web::get().to(handlers::location_contains))
                    .route("/location/overlaps", web::get().to(handlers::location_overlaps))
                    .route(
                        "/location/find_at_location",
                        web::get().to(handlers::find_at_location),
                    )
                    .route(
                        "/location/find-by-label",
                        web::get().to(handlers::find_by_label),
                    ),
            ),
    );
}

/// Starts the LOCI integration API server.
///
/// Reads [`ServerConfig`] from the environment, builds the upstream
/// clients, and serves until shut down. The caller provides the async
/// runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if an upstream client cannot be
/// built, or the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();
    log::info!("Triplestore: {}", config.sparql_endpoint());
    log::info!("Search index: {}", config.search_endpoint());
    log::info!("Geometry service: {}", config.geometry_endpoint);

    let state = web::Data::new(AppState::from_config(&config).map_err(std::io::Error::other)?);
    log::info!(
        "Loaded {} spatial hierarchies",
        state.registry.all().len()
    );

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.clone(), config.port))?
    .run()
    .await
}
