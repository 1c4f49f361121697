use crate::errors::{GatewayError, Result};
use crate::metrics_defs::UPSTREAM_REQUEST_DURATION;
use crate::params::QueryParams;
use axum::body::Bytes;
use http::StatusCode;
use serde_json::Value;
use shared::histogram;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

/// Longest body excerpt written to the logs for a failed upstream call.
const LOG_BODY_LIMIT: usize = 500;

/// Raw answer from the procurement API.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// HTTP client for the procurement API.
///
/// Never retries. Callers that have several candidate URLs iterate them.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("pncp-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(UpstreamClient {
            client,
            timeout: request_timeout,
        })
    }

    /// Sends a GET and reads the whole body, whatever the status.
    pub async fn get(&self, url: &str, params: &QueryParams) -> Result<UpstreamResponse> {
        let start = Instant::now();

        let exchange = async {
            let response = self.client.get(url).query(params).send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(UpstreamResponse { status, body })
        };

        let result = timeout(self.timeout, exchange)
            .await
            .map_err(|_| GatewayError::UpstreamTimeout(url.to_string()))
            .and_then(|r| r.map_err(|e| classify(url, e)));

        let outcome = match &result {
            Ok(response) if response.status.is_success() => "ok",
            Ok(_) => "status",
            Err(GatewayError::UpstreamTimeout(_)) => "timeout",
            Err(_) => "unavailable",
        };
        histogram!(UPSTREAM_REQUEST_DURATION, "outcome" => outcome)
            .record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            tracing::warn!(url, error = %e, "Upstream request failed");
        }
        result
    }

    /// Sends a GET and decodes a JSON body. Anything but 200 is an error.
    pub async fn get_json(&self, url: &str, params: &QueryParams) -> Result<Value> {
        let response = self.get(url, params).await?;
        if response.status != StatusCode::OK {
            tracing::warn!(
                url,
                status = %response.status,
                body = %body_excerpt(&response.body),
                "Upstream returned an error status"
            );
            return Err(GatewayError::UpstreamStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        parse_json(url, &response.body)
    }
}

/// Decodes an upstream body, rejecting empty and non-JSON payloads.
pub fn parse_json(url: &str, body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::UpstreamMalformed(
            url.to_string(),
            "empty body".into(),
        ));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(url, body = %body_excerpt(body), "Upstream returned invalid JSON");
        GatewayError::UpstreamMalformed(url.to_string(), e.to_string())
    })
}

/// Appends a relative path to a base URL, keeping the base's own path.
pub fn join_url(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn classify(url: &str, error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::UpstreamTimeout(url.to_string())
    } else {
        GatewayError::UpstreamUnavailable(url.to_string(), error.to_string())
    }
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(LOG_BODY_LIMIT).collect()
}
