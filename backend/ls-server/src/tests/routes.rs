use crate::{ServiceInfo, build_router};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn info() -> ServiceInfo {
    ServiceInfo {
        name: String::from("Living Room"),
        address: String::from("http://192.168.1.20:8000"),
    }
}

async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
    let app = build_router(info());
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn given_router_when_get_health_then_reports_name_and_version() {
    let (status, json) = get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["name"], "Living Room");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn given_router_when_get_ready_then_ready() {
    let (status, json) = get_json("/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
}

#[tokio::test]
async fn given_router_when_get_join_then_advertises_address() {
    let (status, json) = get_json("/join").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["address"], "http://192.168.1.20:8000");
    assert_eq!(json["name"], "Living Room");
}

#[tokio::test]
async fn given_router_when_get_live_then_ok_text() {
    let app = build_router(info());
    let request = Request::builder()
        .uri("/live")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn given_cross_origin_request_when_get_join_then_cors_allowed() {
    let app = build_router(info());
    let request = Request::builder()
        .uri("/join")
        .header("Origin", "http://phone.local")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn given_unknown_path_when_requested_then_not_found() {
    let app = build_router(info());
    let request = Request::builder()
        .uri("/admin")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
