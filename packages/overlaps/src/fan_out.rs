//! Unbounded pagination over relation lookups.

use loci_overlaps_models::{OverlapOptions, OverlapRecord};
use rust_decimal::Decimal;

use crate::OverlapError;
use crate::proportion::{calculate, require_source_area};
use crate::relations::{RelationRow, SpatialGraph, relations_page};

/// Rows requested per page. A shorter page ends the fan-out.
pub const PAGE_SIZE: u64 = 100_000;

/// Fetches every relation row of `uri`, one page at a time.
///
/// # Errors
///
/// Returns [`OverlapError`] if any page fails.
pub async fn fetch_all_rows(
    graph: &dyn SpatialGraph,
    uri: &str,
    options: &OverlapOptions,
    linkset: Option<&str>,
) -> Result<Vec<RelationRow>, OverlapError> {
    let mut rows = Vec::new();
    let mut offset = 0;
    let mut pages = 0_u32;
    loop {
        let page = relations_page(graph, uri, options, linkset, PAGE_SIZE, offset).await?;
        pages += 1;
        let len = page.len() as u64;
        rows.extend(page);
        if len < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    log::debug!("Fanned out {uri}: {} rows over {pages} pages", rows.len());
    Ok(rows)
}

/// Fetches and measures every feature related to `uri`.
///
/// The source area is looked up once, up front, and only when areas or
/// proportions were requested; otherwise it is reported as `None`.
///
/// # Errors
///
/// Returns [`OverlapError::Reportable`] if measurements were requested
/// and the source has no known area, or any graph error.
pub async fn get_all_overlaps(
    graph: &dyn SpatialGraph,
    uri: &str,
    options: &OverlapOptions,
    linkset: Option<&str>,
) -> Result<(Option<Decimal>, Vec<OverlapRecord>), OverlapError> {
    let source_area = if options.wants_measures() {
        Some(require_source_area(graph.feature_area(uri).await?)?)
    } else {
        None
    };
    let rows = fetch_all_rows(graph, uri, options, linkset).await?;
    let (_, records) = calculate(&rows, source_area, options, 0)?;
    Ok((source_area, records))
}
