use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use planner::api::{ApiClientError, RouteApi, RouteApiClient};
use planner::session::normalize_path;
use serde_json::json;
use shared::{GeoPoint, RouteRequest};

async fn spawn_service(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn calculate_handler(Json(req): Json<RouteRequest>) -> impl IntoResponse {
    if req.start.lat() == 0.0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "unreachable"})),
        );
    }
    let mid = [
        (req.start.lat() + req.end.lat()) / 2.0,
        (req.start.lon() + req.end.lon()) / 2.0,
    ];
    (
        StatusCode::OK,
        Json(json!({
            "path": [mid],
            "distance": 55.3,
            "estimatedTime": 2.1,
            "message": "Route calculated successfully"
        })),
    )
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "message": "AquaIntel API is running",
        "version": "1.0.0"
    }))
}

fn routing_service() -> Router {
    Router::new()
        .route("/api/route/calculate", post(calculate_handler))
        .route("/api/health", get(health_handler))
}

fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
}

#[tokio::test]
async fn calculate_decodes_successful_response() {
    let client = RouteApiClient::new(spawn_service(routing_service()).await);

    let result = client
        .calculate_route(point(18.0, 72.0), point(19.0, 74.0))
        .await
        .unwrap();

    assert_eq!(result.path, vec![point(18.5, 73.0)]);
    assert_eq!(result.distance_km, Some(55.3));
    assert_eq!(result.estimated_time_hours, Some(2.1));
    assert_eq!(result.message.as_deref(), Some("Route calculated successfully"));
}

#[tokio::test]
async fn error_status_carries_detail() {
    let client = RouteApiClient::new(spawn_service(routing_service()).await);

    let err = client
        .calculate_route(point(0.0, 72.0), point(19.0, 74.0))
        .await
        .unwrap_err();

    match err {
        ApiClientError::Api { status, detail } => {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(detail, "unreachable");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_without_body_uses_generic_detail() {
    let router = Router::new().route(
        "/api/route/calculate",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let client = RouteApiClient::new(spawn_service(router).await);

    let err = client
        .calculate_route(point(18.0, 72.0), point(19.0, 74.0))
        .await
        .unwrap_err();

    match err {
        ApiClientError::Api { status, detail } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(detail, "Route calculation failed");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_body_is_malformed() {
    let router = Router::new().route(
        "/api/route/calculate",
        post(|| async { Json(json!({"path": "not a path"})) }),
    );
    let client = RouteApiClient::new(spawn_service(router).await);

    let err = client
        .calculate_route(point(18.0, 72.0), point(19.0, 74.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = RouteApiClient::new(format!("http://{addr}/api"));

    let err = client
        .calculate_route(point(18.0, 72.0), point(19.0, 74.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiClientError::Network(_)));

    let health = client.health_check().await.unwrap_err();
    assert!(matches!(health, ApiClientError::Network(_)));
}

#[tokio::test]
async fn health_check_reports_service_status() {
    let client = RouteApiClient::new(format!("{}/", spawn_service(routing_service()).await));

    let status = client.health_check().await.unwrap();
    assert_eq!(status.status, "healthy");
    assert_eq!(status.version, "1.0.0");
}

#[tokio::test]
async fn failed_health_check_uses_generic_detail() {
    let router = Router::new().route(
        "/api/health",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let client = RouteApiClient::new(spawn_service(router).await);

    match client.health_check().await.unwrap_err() {
        ApiClientError::Api { status, detail } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(detail, "Health check failed");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

async fn echo_handler(Json(req): Json<RouteRequest>) -> Json<serde_json::Value> {
    Json(json!({
        "path": [req.start.to_pair(), [18.70, 73.20], req.end.to_pair()],
        "message": "Route calculated successfully"
    }))
}

#[tokio::test]
async fn echoed_endpoints_keep_full_precision() {
    let router = Router::new().route("/api/route/calculate", post(echo_handler));
    let client = RouteApiClient::new(spawn_service(router).await);
    let start = point(18.525514123456789, 73.856743891234567);
    let end = point(-33.868819723456781, 151.209295612345679);

    let result = client.calculate_route(start, end).await.unwrap();
    assert_eq!(result.path.first(), Some(&start));
    assert_eq!(result.path.last(), Some(&end));

    let normalized = normalize_path(result.path.clone(), start, end);
    assert_eq!(normalized, result.path);
    assert_eq!(normalized.len(), 3);
}
