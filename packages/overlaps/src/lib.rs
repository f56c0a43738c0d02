#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overlap aggregation and cross-hierarchy proportion engine.
//!
//! Given a target feature, this crate finds every feature that overlaps,
//! contains, or is contained by it ([`relations`]), measures the shared
//! areas as exact percentages ([`proportion`]), pages through arbitrarily
//! many results ([`fan_out`]), and carries those percentages across
//! spatial hierarchies that only meet at their base units ([`crosswalk`]).
//!
//! The graph is reached through the [`relations::SpatialGraph`] trait;
//! [`relations::GraphBackend`] implements it over a SPARQL store.

pub mod crosswalk;
pub mod fan_out;
pub mod hierarchy;
pub mod proportion;
pub mod relations;

use loci_graph::GraphError;
use loci_overlaps_models::{OverlapMeta, OverlapOptions, OverlapRecord};
use thiserror::Error;

use crate::relations::{SpatialGraph, relations_page};

/// Errors from overlap computations.
#[derive(Debug, Error)]
pub enum OverlapError {
    /// The graph store could not be queried.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The requested output cannot be produced from the data available.
    #[error("{message}")]
    Reportable {
        /// Explanation for the caller.
        message: String,
    },
}

/// Lists one page of features related to `uri`.
///
/// When `output_type` is given the page is narrowed to instances of that
/// type, so a page may hold fewer records than were fetched.
///
/// # Errors
///
/// Returns [`OverlapError::Reportable`] if measurements were requested and
/// `uri` has no known area, or any graph error.
pub async fn get_location_overlaps(
    graph: &dyn SpatialGraph,
    uri: &str,
    output_type: Option<&str>,
    options: &OverlapOptions,
    linkset: Option<&str>,
    count: u64,
    offset: u64,
) -> Result<(OverlapMeta, Vec<OverlapRecord>), OverlapError> {
    let source_area = if options.wants_measures() {
        Some(proportion::require_source_area(
            graph.feature_area(uri).await?,
        )?)
    } else {
        None
    };
    let rows = relations_page(graph, uri, options, linkset, count, offset).await?;
    let (mut meta, mut records) = proportion::calculate(&rows, source_area, options, offset)?;

    if let Some(type_uri) = output_type {
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if graph.has_type(&record.uri, type_uri).await? {
                kept.push(record);
            }
        }
        records = kept;
        meta.count = records.len();
    }
    Ok((meta, records))
}
