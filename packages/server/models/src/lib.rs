#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the LOCI integration server.
//!
//! Query parameter structs keep boolean flags as raw strings: the API
//! accepts any value whose first character is truthy (see [`is_truthy`]),
//! which serde's own `bool` parsing would reject.

use loci_graph_models::{DatasetType, PageMeta};
use loci_overlaps_models::{OverlapMeta, OverlapOptions, Overlaps};
use serde::{Deserialize, Serialize};

/// Default page size for listings.
pub const DEFAULT_COUNT: u64 = 1000;

/// Whether a flag value counts as "true": its first character is one of
/// `t`, `T`, `1`, or `y`.
#[must_use]
pub fn is_truthy(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.chars().next())
        .is_some_and(|c| matches!(c, 't' | 'T' | '1' | 'y' | 'Y'))
}

/// Query parameters for plain listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// Number of items to return.
    pub count: Option<u64>,
    /// Number of items to skip.
    pub offset: Option<u64>,
}

impl PageParams {
    /// Requested page size.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.unwrap_or(DEFAULT_COUNT)
    }

    /// Requested offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

/// Query parameters naming a target feature.
#[derive(Debug, Clone, Deserialize)]
pub struct UriParams {
    /// Target feature URI.
    pub uri: String,
    /// Number of items to return.
    pub count: Option<u64>,
    /// Number of items to skip.
    pub offset: Option<u64>,
}

impl UriParams {
    /// The page window.
    #[must_use]
    pub const fn page(&self) -> PageParams {
        PageParams {
            count: self.count,
            offset: self.offset,
        }
    }
}

/// Query parameters for the dataset type listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetTypeParams {
    /// Only this dataset.
    #[serde(rename = "datasetUri")]
    pub dataset_uri: Option<String>,
    /// Only this feature type.
    #[serde(rename = "type")]
    pub type_uri: Option<String>,
    /// Only each dataset's base feature type.
    pub basetype: Option<String>,
    /// Number of items to return.
    pub count: Option<u64>,
    /// Number of items to skip.
    pub offset: Option<u64>,
}

/// Query parameters for the overlaps function.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlapParams {
    /// Target feature URI.
    pub uri: String,
    /// Include areas in square metres.
    pub areas: Option<String>,
    /// Include overlap percentages.
    pub proportion: Option<String>,
    /// Include features wholly contained by the target.
    pub contains: Option<String>,
    /// Include features the target is wholly within.
    pub within: Option<String>,
    /// Only return features of this type.
    pub output_type: Option<String>,
    /// Walk across spatial hierarchies.
    pub crosswalk: Option<String>,
    /// Only follow relations asserted by this linkset.
    pub linkset: Option<String>,
    /// Number of items to return.
    pub count: Option<u64>,
    /// Number of items to skip.
    pub offset: Option<u64>,
}

impl OverlapParams {
    /// Whether the crosswalk was requested.
    #[must_use]
    pub fn is_crosswalk(&self) -> bool {
        is_truthy(self.crosswalk.as_deref())
    }

    /// The requested measurements and relations. The crosswalk never
    /// includes within relations.
    #[must_use]
    pub fn options(&self) -> OverlapOptions {
        OverlapOptions {
            include_areas: is_truthy(self.areas.as_deref()),
            include_proportion: is_truthy(self.proportion.as_deref()),
            include_within: is_truthy(self.within.as_deref()) && !self.is_crosswalk(),
            include_contains: is_truthy(self.contains.as_deref()),
        }
    }

    /// The output type filter, ignoring an empty value.
    #[must_use]
    pub fn output_type(&self) -> Option<&str> {
        self.output_type.as_deref().filter(|t| !t.is_empty())
    }
}

/// Query parameters for point lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct FindAtLocationParams {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// EPSG code of the coordinates (default 4326).
    pub crs: Option<u32>,
    /// `any`, `mb`, or `cc`.
    pub loci_type: Option<String>,
    /// Number of items to return.
    pub count: Option<u64>,
    /// Number of items to skip.
    pub offset: Option<u64>,
}

/// Query parameters for label search.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelSearchParams {
    /// Free-text query.
    pub query: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `true` when the server answers.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error envelope returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Always `false`.
    pub ok: bool,
    /// Human-readable cause.
    pub error_message: String,
}

impl ApiError {
    /// An error envelope carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_message: message.into(),
        }
    }
}

/// `GET /api/v1/linksets`
#[derive(Debug, Clone, Serialize)]
pub struct ApiLinksets {
    pub meta: PageMeta,
    pub linksets: Vec<String>,
}

/// `GET /api/v1/datasets`
#[derive(Debug, Clone, Serialize)]
pub struct ApiDatasets {
    pub meta: PageMeta,
    pub datasets: Vec<String>,
}

/// `GET /api/v1/dataset/type`
#[derive(Debug, Clone, Serialize)]
pub struct ApiDatasetTypes {
    pub meta: PageMeta,
    pub datasets: Vec<DatasetType>,
}

/// Location listings: all locations, within, and contains.
#[derive(Debug, Clone, Serialize)]
pub struct ApiLocations {
    pub meta: PageMeta,
    pub locations: Vec<String>,
}

/// `GET /api/v1/location/overlaps`
#[derive(Debug, Clone, Serialize)]
pub struct ApiOverlaps {
    pub meta: OverlapMeta,
    pub overlaps: Overlaps,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_first_character() {
        for value in ["true", "T", "1", "yes", "t_anything"] {
            assert!(is_truthy(Some(value)), "{value} should be truthy");
        }
        for value in ["false", "0", "", "no", "F"] {
            assert!(!is_truthy(Some(value)), "{value} should be falsy");
        }
        assert!(!is_truthy(None));
    }

    #[test]
    fn crosswalk_forces_within_off() {
        let params = OverlapParams {
            uri: "http://example.org/a".to_string(),
            areas: Some("true".to_string()),
            proportion: None,
            contains: Some("1".to_string()),
            within: Some("true".to_string()),
            output_type: Some(String::new()),
            crosswalk: Some("t".to_string()),
            linkset: None,
            count: None,
            offset: None,
        };
        let options = params.options();
        assert!(options.include_areas);
        assert!(options.include_contains);
        assert!(!options.include_within);
        assert_eq!(params.output_type(), None);
    }

    #[test]
    fn page_defaults() {
        let page = PageParams::default();
        assert_eq!(page.count(), DEFAULT_COUNT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn error_envelope_shape() {
        assert_eq!(
            serde_json::to_value(ApiError::new("boom")).unwrap(),
            serde_json::json!({"ok": false, "errorMessage": "boom"})
        );
    }
}
