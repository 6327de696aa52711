//! Integration test: pricing form server endpoints

mod common;

use autoprice::server::{create_router, AppState, PredictResponse, ServerConfig};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn test_app(dir: &Path) -> axum::Router {
    let config = ServerConfig::default()
        .with_host("127.0.0.1")
        .with_port(0)
        .with_model_path(dir.join("models").join("gbr.json"))
        .with_lookup_csv(dir.join("makes_models.csv"));
    create_router(Arc::new(AppState::new(config)))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn post_json(app: axum::Router, uri: &str, json: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

const FIESTA: &str = r#"{"mileage":50000,"vehicle_age":5,"body_type":"SUV","fuel_type":"Petrol","make":"Ford","model":"Fiesta","colour":"Black","crossover":false}"#;

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], false);
}

#[tokio::test]
async fn test_root_serves_form() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<form"));
    assert!(html.contains(r#"<option value="Convertible">"#));
    assert!(html.contains(r#"max="500000""#));
    assert!(!html.contains("{{"));
}

#[tokio::test]
async fn test_form_fills_lookup_selects_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let (_, body) = get(test_app(dir.path()), "/").await;
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("new Option(v, v)"));
    assert!(!html.contains("innerHTML"));
}

#[tokio::test]
async fn test_makes_and_models() {
    let dir = tempfile::tempdir().unwrap();
    common::write_lookup(dir.path());

    let (status, body) = get(test_app(dir.path()), "/api/makes").await;
    assert_eq!(status, StatusCode::OK);
    let makes: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(makes, vec!["Audi", "BMW", "Ford", "Kia"]);

    let (status, body) = get(test_app(dir.path()), "/api/makes/Ford/models").await;
    assert_eq!(status, StatusCode::OK);
    let models: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(models, vec!["Fiesta", "Focus", "Kuga"]);
}

#[tokio::test]
async fn test_predict_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    common::train_quick(dir.path(), 240);

    let (status, body) = post_json(test_app(dir.path()), "/api/predict", FIESTA).await;
    assert_eq!(status, StatusCode::OK);
    let response: PredictResponse = serde_json::from_slice(&body).unwrap();
    assert!(response.price > 0.0);
    assert!(response.formatted.starts_with('£'));
}

#[tokio::test]
async fn test_predict_without_model_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post_json(test_app(dir.path()), "/api/predict", FIESTA).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], true);
}

#[tokio::test]
async fn test_predict_rejects_unknown_body_type() {
    let dir = tempfile::tempdir().unwrap();
    let bad = FIESTA.replace("SUV", "Tank");
    let (status, _) = post_json(test_app(dir.path()), "/api/predict", &bad).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = get(test_app(dir.path()), "/api/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
