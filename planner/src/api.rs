//! Client for the AquaIntel routing service.
//!
//! The client owns transport details only: request bodies, status
//! classification and decoding into [`RouteResult`]. It never retries and sets
//! no timeout; both are the caller's decision.

use std::future::Future;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{GeoPoint, HealthStatus, RouteRequest, RouteResponse};

const ROUTE_FALLBACK_DETAIL: &str = "Route calculation failed";
const HEALTH_FALLBACK_DETAIL: &str = "Health check failed";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// No response was received at all.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("routing service returned {status}: {detail}")]
    Api { status: StatusCode, detail: String },
    #[error("malformed response from routing service: {0}")]
    MalformedResponse(String),
}

/// Outcome of a successful calculation, decoded and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub path: Vec<GeoPoint>,
    pub distance_km: Option<f64>,
    pub estimated_time_hours: Option<f64>,
    pub message: Option<String>,
}

impl TryFrom<RouteResponse> for RouteResult {
    type Error = ApiClientError;

    fn try_from(body: RouteResponse) -> Result<Self, Self::Error> {
        let path = body
            .path
            .into_iter()
            .map(GeoPoint::from_pair)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiClientError::MalformedResponse(format!("path point rejected: {e}")))?;
        Ok(Self {
            path,
            distance_km: body.distance,
            estimated_time_hours: body.estimated_time,
            message: body.message,
        })
    }
}

/// The routing operations a session depends on.
pub trait RouteApi {
    fn calculate_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> impl Future<Output = Result<RouteResult, ApiClientError>> + Send;

    fn health_check(&self) -> impl Future<Output = Result<HealthStatus, ApiClientError>> + Send;
}

#[derive(Debug, Clone)]
pub struct RouteApiClient {
    http: Client,
    base_url: String,
}

impl RouteApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl RouteApi for RouteApiClient {
    async fn calculate_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteResult, ApiClientError> {
        let payload = RouteRequest { start, end };
        tracing::debug!(
            "sending route request start=({:.5},{:.5}) end=({:.5},{:.5})",
            start.lat(),
            start.lon(),
            end.lat(),
            end.lon()
        );
        let response = self
            .http
            .post(self.endpoint("route/calculate"))
            .json(&payload)
            .send()
            .await
            .map_err(ApiClientError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response, ROUTE_FALLBACK_DETAIL).await);
        }

        let body: RouteResponse = response
            .json()
            .await
            .map_err(|e| ApiClientError::MalformedResponse(e.to_string()))?;
        tracing::debug!("route response with {} points", body.path.len());
        RouteResult::try_from(body)
    }

    async fn health_check(&self) -> Result<HealthStatus, ApiClientError> {
        let response = self
            .http
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(ApiClientError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response, HEALTH_FALLBACK_DETAIL).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiClientError::MalformedResponse(e.to_string()))
    }
}

async fn status_error(
    status: StatusCode,
    response: reqwest::Response,
    fallback: &str,
) -> ApiClientError {
    let body = response.json::<Value>().await.ok();
    let detail = body
        .as_ref()
        .and_then(extract_detail)
        .unwrap_or_else(|| fallback.to_string());
    tracing::warn!("routing service answered {status}: {detail}");
    ApiClientError::Api { status, detail }
}

/// `detail` verbatim when it is a string; validation errors come back as
/// arrays, which are passed through as JSON text.
fn extract_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
