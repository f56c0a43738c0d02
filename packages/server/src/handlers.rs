//! HTTP handler functions for the LOCI integration API.

use std::future::Future;
use std::str::FromStr;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use loci_graph::GraphError;
use loci_graph::listings;
use loci_graph::resource::get_resource;
use loci_lookup::geometry::{DEFAULT_CRS, LociType, PointQuery};
use loci_overlaps::OverlapError;
use loci_overlaps::crosswalk::get_location_overlaps_crosswalk;
use loci_overlaps::get_location_overlaps;
use loci_overlaps_models::Overlaps;
use loci_server_models::{
    ApiDatasetTypes, ApiDatasets, ApiError, ApiHealth, ApiLinksets, ApiLocations, ApiOverlaps,
    DatasetTypeParams, FindAtLocationParams, LabelSearchParams, OverlapParams, PageParams,
    UriParams, is_truthy,
};
use serde::Serialize;
use thiserror::Error;

use crate::AppState;

/// Why a request failed.
#[derive(Debug, Error)]
enum ApiFailure {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Overlap(#[from] OverlapError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Request did not complete within {0} seconds")]
    Timeout(u64),
}

impl ApiFailure {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Graph(GraphError::InvalidIri { .. })
            | Self::Overlap(OverlapError::Graph(GraphError::InvalidIri { .. }))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Graph(_) | Self::Overlap(OverlapError::Graph(_)) => StatusCode::BAD_GATEWAY,
            Self::Overlap(OverlapError::Reportable { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn into_response(self, context: &str) -> HttpResponse {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Failed to {context}: {self}");
        } else {
            log::warn!("Rejected request to {context}: {self}");
        }
        HttpResponse::build(status).json(ApiError::new(self.to_string()))
    }
}

/// Runs `work` within the state's request budget.
async fn within_budget<T, E>(
    state: &AppState,
    work: impl Future<Output = Result<T, E>>,
) -> Result<T, ApiFailure>
where
    ApiFailure: From<E>,
{
    match tokio::time::timeout(state.response_timeout, work).await {
        Ok(result) => result.map_err(ApiFailure::from),
        Err(_) => Err(ApiFailure::Timeout(state.response_timeout.as_secs())),
    }
}

fn respond<T: Serialize>(context: &str, result: Result<T, ApiFailure>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => e.into_response(context),
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/v1/linksets`
pub async fn linksets(state: web::Data<AppState>, params: web::Query<PageParams>) -> HttpResponse {
    let result = within_budget(
        &state,
        listings::get_linksets(state.store.as_ref(), params.count(), params.offset()),
    )
    .await
    .map(|(meta, linksets)| ApiLinksets { meta, linksets });
    respond("list linksets", result)
}

/// `GET /api/v1/datasets`
pub async fn datasets(state: web::Data<AppState>, params: web::Query<PageParams>) -> HttpResponse {
    let result = within_budget(
        &state,
        listings::get_datasets(state.store.as_ref(), params.count(), params.offset()),
    )
    .await
    .map(|(meta, datasets)| ApiDatasets { meta, datasets });
    respond("list datasets", result)
}

/// `GET /api/v1/dataset/type`
///
/// Lists `(dataset, featureType)` pairs, optionally filtered by dataset
/// and type, or restricted to base feature types.
pub async fn dataset_types(
    state: web::Data<AppState>,
    params: web::Query<DatasetTypeParams>,
) -> HttpResponse {
    let page = PageParams {
        count: params.count,
        offset: params.offset,
    };
    let result = within_budget(
        &state,
        listings::get_dataset_types(
            state.store.as_ref(),
            params.dataset_uri.as_deref(),
            params.type_uri.as_deref(),
            is_truthy(params.basetype.as_deref()),
            page.count(),
            page.offset(),
        ),
    )
    .await
    .map(|(meta, datasets)| ApiDatasetTypes { meta, datasets });
    respond("list dataset types", result)
}

/// `GET /api/v1/locations`
pub async fn locations(state: web::Data<AppState>, params: web::Query<PageParams>) -> HttpResponse {
    let result = within_budget(
        &state,
        listings::get_locations(state.store.as_ref(), params.count(), params.offset()),
    )
    .await
    .map(|(meta, locations)| ApiLocations { meta, locations });
    respond("list locations", result)
}

/// `GET /api/v1/resource`
pub async fn resource(state: web::Data<AppState>, params: web::Query<UriParams>) -> HttpResponse {
    let result = within_budget(&state, get_resource(state.store.as_ref(), &params.uri)).await;
    respond("describe resource", result)
}

/// `GET /api/v1/location/within`
pub async fn location_within(
    state: web::Data<AppState>,
    params: web::Query<UriParams>,
) -> HttpResponse {
    let page = params.page();
    let result = within_budget(
        &state,
        listings::get_location_is_within(
            state.store.as_ref(),
            &params.uri,
            page.count(),
            page.offset(),
        ),
    )
    .await
    .map(|(meta, locations)| ApiLocations { meta, locations });
    respond("list containing locations", result)
}

/// `GET /api/v1/location/contains`
pub async fn location_contains(
    state: web::Data<AppState>,
    params: web::Query<UriParams>,
) -> HttpResponse {
    let page = params.page();
    let result = within_budget(
        &state,
        listings::get_location_contains(
            state.store.as_ref(),
            &params.uri,
            page.count(),
            page.offset(),
        ),
    )
    .await
    .map(|(meta, locations)| ApiLocations { meta, locations });
    respond("list contained locations", result)
}

/// `GET /api/v1/location/overlaps`
///
/// One page of overlapping features, or with `crosswalk` the complete
/// cross-hierarchy listing (paging is ignored).
pub async fn location_overlaps(
    state: web::Data<AppState>,
    params: web::Query<OverlapParams>,
) -> HttpResponse {
    let options = params.options();
    let output_type = params.output_type();
    let result = if params.is_crosswalk() {
        within_budget(
            &state,
            get_location_overlaps_crosswalk(
                &state.graph,
                &state.registry,
                &params.uri,
                output_type,
                &options,
            ),
        )
        .await
    } else {
        within_budget(
            &state,
            get_location_overlaps(
                &state.graph,
                &params.uri,
                output_type,
                &options,
                params.linkset.as_deref(),
                params.count.unwrap_or(loci_server_models::DEFAULT_COUNT),
                params.offset.unwrap_or(0),
            ),
        )
        .await
    };
    let result = result.map(|(meta, records)| ApiOverlaps {
        meta,
        overlaps: Overlaps::from_records(records, &options),
    });
    respond("compute overlaps", result)
}

/// `GET /api/v1/location/find_at_location`
///
/// Upstream failures come back as `{"ok": false, ...}` with status 200.
pub async fn find_at_location(
    state: web::Data<AppState>,
    params: web::Query<FindAtLocationParams>,
) -> HttpResponse {
    let loci_type = match params.loci_type.as_deref().map(LociType::from_str) {
        None => LociType::default(),
        Some(Ok(loci_type)) => loci_type,
        Some(Err(_)) => {
            return ApiFailure::BadRequest(format!(
                "Unknown loci_type {:?}; expected any, mb or cc",
                params.loci_type.as_deref().unwrap_or_default()
            ))
            .into_response("find features at location");
        }
    };
    let query = PointQuery {
        lat: params.lat,
        lon: params.lon,
        loci_type,
        crs: params.crs.unwrap_or(DEFAULT_CRS),
        count: params.count.unwrap_or(loci_server_models::DEFAULT_COUNT),
        offset: params.offset.unwrap_or(0),
    };
    let result = within_budget(&state, async {
        Ok::<_, ApiFailure>(state.geometry.find_at_location(&query).await)
    })
    .await;
    respond("find features at location", result)
}

/// `GET /api/v1/location/find-by-label`
///
/// Returns the search index hits unchanged.
pub async fn find_by_label(
    state: web::Data<AppState>,
    params: web::Query<LabelSearchParams>,
) -> HttpResponse {
    let result = within_budget(&state, async {
        Ok::<_, ApiFailure>(state.search.search_location_by_label(&params.query).await)
    })
    .await;
    respond("search labels", result)
}
