#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clients for the auxiliary LOCI lookup services.
//!
//! - [`geometry`]: point-in-polygon lookups against the geometry data
//!   service.
//! - [`search`]: free-text label search against the search index.
//!
//! Neither client raises on upstream failure. Transport errors, non-success
//! statuses, and malformed bodies all come back as a [`Lookup::Failed`]
//! value that serializes to `{"ok": false, "errorMessage": ...}`.

pub mod geometry;
pub mod search;

use serde::Serialize;
use thiserror::Error;

/// Errors from lookup service calls.
#[derive(Debug, Error)]
pub enum LookupError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned status {status}")]
    Status {
        /// Which service answered.
        service: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// What was wrong with it.
        message: String,
    },
}

/// The structured failure returned in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupFailure {
    /// Always `false`.
    pub ok: bool,
    /// Human-readable cause.
    pub error_message: String,
}

impl From<LookupError> for LookupFailure {
    fn from(err: LookupError) -> Self {
        Self {
            ok: false,
            error_message: err.to_string(),
        }
    }
}

/// Either a service result or a structured failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Lookup<T> {
    /// The service answered.
    Found(T),
    /// The service could not be used.
    Failed(LookupFailure),
}

impl<T> Lookup<T> {
    /// Whether the lookup succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Converts an internal result, logging failures.
    pub(crate) fn from_result(service: &str, result: Result<T, LookupError>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(e) => {
                log::warn!("{service} lookup failed: {e}");
                Self::Failed(e.into())
            }
        }
    }
}

/// Returns the response if its status is a success.
fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, LookupError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(LookupError::Status {
            service,
            status: status.as_u16(),
        })
    }
}
