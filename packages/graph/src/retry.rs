//! HTTP retry helper for graph store requests.
//!
//! Every query is an idempotent read, so transient failures (connection
//! errors, timeouts, HTTP 429 and 5xx) are retried with exponential
//! backoff before the error is handed back to the caller.

use std::time::Duration;

use crate::GraphError;

/// Maximum number of retry attempts for transient failures.
///
/// With backoff of 500ms, 1s, 2s the total wait before giving up is 3.5s;
/// the whole inbound request is additionally bounded by the server's
/// response timeout.
const MAX_RETRIES: u32 = 3;

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`GraphError`] if the request fails after all retries, the
/// store answers with a non-success status, or the body is not JSON.
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, GraphError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request).await?;
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("Graph store returned {status} for {url}");
        return Err(GraphError::Status {
            status: status.as_u16(),
            body: preview(&body),
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "Graph store JSON parse failed.\n  \
             url: {url}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        GraphError::Json(e)
    })
}

async fn send_inner<F>(build_request: &F) -> Result<reqwest::Response, GraphError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        match build_request().send().await {
            Ok(response) if is_retryable_status(response.status()) && attempt < MAX_RETRIES => {
                log::warn!(
                    "Graph store returned {} (retry {}/{MAX_RETRIES})",
                    response.status(),
                    attempt + 1
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if is_retryable_error(&e) && attempt < MAX_RETRIES => {
                log::warn!(
                    "Graph store request failed (retry {}/{MAX_RETRIES}): {e}",
                    attempt + 1
                );
            }
            Err(e) => return Err(GraphError::Http(e)),
        }

        let delay = Duration::from_millis(500u64 << attempt);
        attempt += 1;
        tokio::time::sleep(delay).await;
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

fn preview(text: &str) -> String {
    if text.chars().count() > BODY_PREVIEW_LEN {
        let head: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
