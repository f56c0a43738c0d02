//! Geometry data service client.
//!
//! Finds the LOCI features whose geometry contains a point. The service
//! answers `GET {base}/search/latlng/{lat},{lon}` with
//! `{"count": n, "res": [...]}`, where each entry is either a feature URI
//! or an object carrying one under `uri`.

use loci_graph_models::PageMeta;
use serde::Serialize;
use strum_macros::{AsRefStr, EnumString};

use crate::{Lookup, LookupError, check_status};

const SERVICE: &str = "Geometry service";

/// WGS 84.
pub const DEFAULT_CRS: u32 = 4326;

/// Which features to look for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LociType {
    /// Every indexed feature type.
    #[default]
    Any,
    /// ASGS mesh blocks.
    Mb,
    /// Geofabric contracted catchments.
    Cc,
}

/// A point lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointQuery {
    /// Latitude in `crs`.
    pub lat: f64,
    /// Longitude in `crs`.
    pub lon: f64,
    /// Feature type filter.
    pub loci_type: LociType,
    /// EPSG code of the coordinates.
    pub crs: u32,
    /// Maximum features to return.
    pub count: u64,
    /// Features to skip.
    pub offset: u64,
}

/// Features found at a point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtLocation {
    /// Always `true`.
    pub ok: bool,
    /// Page window.
    pub meta: PageMeta,
    /// Matching feature URIs.
    pub locations: Vec<String>,
}

/// Client for the geometry data service.
#[derive(Debug, Clone)]
pub struct GeometryClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeometryClient {
    /// Creates a client for the service at `base_url`
    /// (e.g. `https://gds.loci.cat`).
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, query: &PointQuery) -> String {
        format!("{}/search/latlng/{},{}", self.base_url, query.lat, query.lon)
    }

    async fn fetch(&self, query: &PointQuery) -> Result<AtLocation, LookupError> {
        let mut params = vec![
            ("crs", query.crs.to_string()),
            ("count", query.count.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if query.loci_type != LociType::Any {
            params.push(("loci_type", query.loci_type.as_ref().to_string()));
        }

        let resp = self.client.get(self.url(query)).query(&params).send().await?;
        let body: serde_json::Value = check_status(SERVICE, resp)?.json().await?;
        parse_response(&body, query.offset)
    }

    /// Finds the features at a point.
    ///
    /// Failures are returned as [`Lookup::Failed`], never raised.
    pub async fn find_at_location(&self, query: &PointQuery) -> Lookup<AtLocation> {
        log::debug!(
            "Point lookup at {},{} (crs={}, type={})",
            query.lat,
            query.lon,
            query.crs,
            query.loci_type.as_ref()
        );
        Lookup::from_result(SERVICE, self.fetch(query).await)
    }
}

fn parse_response(body: &serde_json::Value, offset: u64) -> Result<AtLocation, LookupError> {
    let entries = body["res"].as_array().ok_or_else(|| LookupError::Parse {
        message: "Geometry service response has no 'res' list".to_string(),
    })?;

    let locations: Vec<String> = entries
        .iter()
        .filter_map(|entry| {
            entry
                .as_str()
                .or_else(|| entry["uri"].as_str())
                .map(String::from)
        })
        .collect();

    if let Some(count) = body["count"].as_u64() {
        if count != locations.len() as u64 {
            log::debug!(
                "Geometry service reported {count} matches, returned {}",
                locations.len()
            );
        }
    }

    Ok(AtLocation {
        ok: true,
        meta: PageMeta {
            count: locations.len(),
            offset,
        },
        locations,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_mixed_entries() {
        let body = serde_json::json!({
            "count": 2,
            "res": [
                "http://linked.data.gov.au/dataset/asgs2016/meshblock/1",
                {"uri": "http://linked.data.gov.au/dataset/geofabric/contractedcatchment/2"},
                {"no_uri": true}
            ]
        });
        let found = parse_response(&body, 5).unwrap();
        assert!(found.ok);
        assert_eq!(found.meta, PageMeta { count: 2, offset: 5 });
        assert_eq!(
            found.locations[1],
            "http://linked.data.gov.au/dataset/geofabric/contractedcatchment/2"
        );
    }

    #[test]
    fn rejects_body_without_results() {
        let body = serde_json::json!({"error": "bad point"});
        assert!(matches!(
            parse_response(&body, 0),
            Err(LookupError::Parse { .. })
        ));
    }

    #[test]
    fn parses_loci_types() {
        assert_eq!(LociType::from_str("mb").unwrap(), LociType::Mb);
        assert_eq!(LociType::from_str("any").unwrap(), LociType::Any);
        assert!(LociType::from_str("nope").is_err());
        assert_eq!(LociType::Cc.as_ref(), "cc");
    }

    #[test]
    fn builds_latlng_path() {
        let client = GeometryClient::new(reqwest::Client::new(), "https://gds.loci.cat/");
        let query = PointQuery {
            lat: -27.5,
            lon: 153.0,
            loci_type: LociType::Mb,
            crs: DEFAULT_CRS,
            count: 1000,
            offset: 0,
        };
        assert_eq!(
            client.url(&query),
            "https://gds.loci.cat/search/latlng/-27.5,153"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_structured_failure() {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let geometry = GeometryClient::new(client, "http://127.0.0.1:9");
        let query = PointQuery {
            lat: 0.0,
            lon: 0.0,
            loci_type: LociType::Any,
            crs: DEFAULT_CRS,
            count: 1,
            offset: 0,
        };
        match geometry.find_at_location(&query).await {
            Lookup::Failed(failure) => {
                assert!(!failure.ok);
                assert!(!failure.error_message.is_empty());
            }
            Lookup::Found(found) => panic!("unexpected success: {found:?}"),
        }
    }
}
