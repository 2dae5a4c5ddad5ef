//! Integration tests for the Skincare Analysis Server API
//!
//! These tests verify the complete request/response cycle for all endpoints.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use skincare_analysis_server::{
    models::AnalysisResult, open_database, routes, AppState, Config, Db, FacialAnalyzer,
};

// Test configuration constants
const TEST_SECRET: &str = "test-secret-key";
const TEST_PEPPER: &str = "test-pepper";
const TEST_ADMIN_KEY: &str = "test-admin-key";
const TEST_PASSWORD: &str = "testpass123";
const MULTIPART_BOUNDARY: &str = "skincare-test-boundary";

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a test configuration rooted in a temporary directory
fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_path: temp_dir.path().join("test.db").display().to_string(),
        media_root: temp_dir.path().join("media").display().to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        environment: "test".to_string(),
        app_secret_key: TEST_SECRET.to_string(),
        password_pepper: TEST_PEPPER.to_string(),
        access_token_ttl_secs: 300,
        refresh_token_ttl_secs: 86400,
        admin_secret_key: Some(TEST_ADMIN_KEY.to_string()),
        log_requests: false,
    }
}

/// Create a test database in a temporary directory
fn create_test_db(temp_dir: &TempDir) -> Db {
    open_database(temp_dir.path().join("test.db")).expect("Failed to create test database")
}

/// Create a test app router using the mock analyzer
fn create_test_app(temp_dir: &TempDir) -> Router {
    let db = create_test_db(temp_dir);
    routes::router(AppState::new(db, test_config(temp_dir)))
}

/// Analyzer that always fails, standing in for a broken model
struct FailingAnalyzer;

impl FacialAnalyzer for FailingAnalyzer {
    fn analyze(&self, _image: &Path) -> Result<AnalysisResult, String> {
        Err("model unavailable".to_string())
    }
}

/// Analyzer that panics mid-analysis
struct PanickingAnalyzer;

impl FacialAnalyzer for PanickingAnalyzer {
    fn analyze(&self, _image: &Path) -> Result<AnalysisResult, String> {
        panic!("model crashed")
    }
}

/// Parse response body as JSON
async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a POST request with JSON body
fn make_post_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Create an authenticated request with an optional JSON body
fn make_authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Create an authenticated multipart upload with a single file field
fn make_upload_request(
    token: &str,
    field_name: &str,
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            MULTIPART_BOUNDARY, field_name, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analysis/")
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Minimal JPEG-looking payload
fn fake_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend(std::iter::repeat(0x42).take(256));
    data.extend([0xFF, 0xD9]);
    data
}

/// Register a user and return the full response JSON
async fn register(app: &Router, email: &str) -> Value {
    let body = json!({
        "email": email,
        "full_name": "Test User",
        "password": TEST_PASSWORD
    });

    let response = app
        .clone()
        .oneshot(make_post_request("/api/auth/register/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    body_to_json(response.into_body()).await
}

/// Register a user and return their access token
async fn setup_user(app: &Router, email: &str) -> String {
    let json = register(app, email).await;
    json["tokens"]["access"].as_str().unwrap().to_string()
}

/// Upload an image and return the created analysis JSON
async fn upload_image(app: &Router, token: &str) -> Value {
    let response = app
        .clone()
        .oneshot(make_upload_request(
            token,
            "image",
            "face.jpg",
            "image/jpeg",
            &fake_jpeg(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    body_to_json(response.into_body()).await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "connected");
}

// =============================================================================
// Registration & Login Tests
// =============================================================================

#[tokio::test]
async fn test_register_user_success() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let json = register(&app, "test@Example.com").await;

    assert_eq!(json["user"]["email"], "test@example.com");
    assert_eq!(json["user"]["full_name"], "Test User");
    assert!(json["user"]["id"].is_string());
    assert!(json["user"].get("password_hash").is_none());
    assert!(json["tokens"]["access"].as_str().unwrap().starts_with("access."));
    assert!(json["tokens"]["refresh"].as_str().unwrap().starts_with("refresh."));
}

#[tokio::test]
async fn test_register_duplicate_email_returns_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    register(&app, "test@example.com").await;

    let body = json!({
        "email": "test@EXAMPLE.com",
        "full_name": "Someone Else",
        "password": "anotherpass"
    });
    let response = app
        .oneshot(make_post_request("/api/auth/register/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let cases = [
        json!({ "email": "not-an-email", "full_name": "Test", "password": TEST_PASSWORD }),
        json!({ "email": "test@example.com", "full_name": "", "password": TEST_PASSWORD }),
        json!({ "email": "test@example.com", "full_name": "Test", "password": "short" }),
        json!({ "full_name": "Test", "password": TEST_PASSWORD }),
    ];

    for body in cases {
        let response = app
            .clone()
            .oneshot(make_post_request("/api/auth/register/", body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

#[tokio::test]
async fn test_login_success() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let registered = register(&app, "test@example.com").await;

    let body = json!({ "email": "test@example.com", "password": TEST_PASSWORD });
    let response = app
        .oneshot(make_post_request("/api/auth/login/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["user"]["id"], registered["user"]["id"]);
    assert!(json["tokens"]["access"].is_string());
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    register(&app, "test@example.com").await;

    for body in [
        json!({ "email": "test@example.com", "password": "wrongpass123" }),
        json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }),
    ] {
        let response = app
            .clone()
            .oneshot(make_post_request("/api/auth/login/", body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_login_missing_fields() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let body = json!({ "email": "test@example.com" });
    let response = app
        .oneshot(make_post_request("/api/auth/login/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Must include email and password");
}

#[tokio::test]
async fn test_malformed_json_bodies_return_json_errors() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    // Missing field
    let response = app
        .clone()
        .oneshot(make_post_request("/api/auth/token/refresh/", "{}".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("refresh"));

    // Syntactically invalid JSON
    let response = app
        .clone()
        .oneshot(make_post_request("/api/auth/login/", "{not json".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].is_string());

    // No body or content type at all
    let response = app
        .oneshot(make_authed_request("DELETE", "/api/user/profile/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_token_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let registered = register(&app, "test@example.com").await;

    let body = json!({ "refresh": registered["tokens"]["refresh"] });
    let response = app
        .clone()
        .oneshot(make_post_request("/api/auth/token/refresh/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    let access = json["access"].as_str().unwrap();

    // The new access token authenticates
    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/user/profile/", access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // An access token cannot be used as a refresh token
    let body = json!({ "refresh": registered["tokens"]["access"] });
    let response = app
        .oneshot(make_post_request("/api/auth/token/refresh/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Profile Tests
// =============================================================================

#[tokio::test]
async fn test_profile_requires_authentication() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/profile/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(make_authed_request(
            "GET",
            "/api/user/profile/",
            "access.someone.9999999999.deadbeef",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_and_update_profile() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/user/profile/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["email"], "test@example.com");
    assert!(json["date_joined"].is_string());

    let response = app
        .clone()
        .oneshot(make_authed_request(
            "PATCH",
            "/api/user/profile/",
            &token,
            Some(json!({ "full_name": "Renamed User" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["full_name"], "Renamed User");
    assert_eq!(json["email"], "test@example.com");

    // Login works with a changed email
    let response = app
        .clone()
        .oneshot(make_authed_request(
            "PUT",
            "/api/user/profile/",
            &token,
            Some(json!({ "email": "new@example.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json!({ "email": "new@example.com", "password": TEST_PASSWORD });
    let response = app
        .oneshot(make_post_request("/api/auth/login/", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Facial Analysis Tests
// =============================================================================

#[tokio::test]
async fn test_upload_image_creates_analysis() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let json = upload_image(&app, &token).await;

    assert_eq!(json["user_email"], "test@example.com");
    assert_eq!(json["analysis_result"]["overall_score"], 7.5);
    assert_eq!(json["analysis_result"]["skin_health"]["acne"], "low");
    assert_eq!(
        json["analysis_result"]["recommendations"]
            .as_array()
            .unwrap()
            .len(),
        5
    );

    // Image was written under the media root and is served back
    let image_url = json["image"].as_str().unwrap();
    let relative = image_url.strip_prefix("/media/").unwrap();
    assert!(temp_dir.path().join("media").join(relative).is_file());

    let response = app
        .oneshot(Request::builder().uri(image_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), fake_jpeg().as_slice());
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .clone()
        .oneshot(make_upload_request(
            &token,
            "image",
            "notes.txt",
            "text/plain",
            b"hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(make_upload_request(
            &token,
            "picture",
            "face.jpg",
            "image/jpeg",
            &fake_jpeg(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "No image was submitted");
}

#[tokio::test]
async fn test_upload_requires_authentication() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let response = app
        .oneshot(make_upload_request(
            "not-a-token",
            "image",
            "face.jpg",
            "image/jpeg",
            &fake_jpeg(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_analysis_leaves_nothing_behind() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);
    let state =
        AppState::with_analyzer(db, test_config(&temp_dir), Arc::new(FailingAnalyzer));
    let app = routes::router(state);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .clone()
        .oneshot(make_upload_request(
            &token,
            "image",
            "face.jpg",
            "image/jpeg",
            &fake_jpeg(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Analysis failed: model unavailable");

    // No record and no stray image
    let response = app
        .oneshot(make_authed_request("GET", "/api/analysis/list/", &token, None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert!(json.as_array().unwrap().is_empty());

    let images_dir = temp_dir.path().join("media").join("facial_images");
    assert_eq!(std::fs::read_dir(images_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_analyzer_panic_leaves_nothing_behind() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);
    let state =
        AppState::with_analyzer(db, test_config(&temp_dir), Arc::new(PanickingAnalyzer));
    let app = routes::router(state);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .clone()
        .oneshot(make_upload_request(
            &token,
            "image",
            "face.jpg",
            "image/jpeg",
            &fake_jpeg(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_to_json(response.into_body()).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Analysis failed: "));

    let response = app
        .oneshot(make_authed_request("GET", "/api/analysis/list/", &token, None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert!(json.as_array().unwrap().is_empty());

    let images_dir = temp_dir.path().join("media").join("facial_images");
    assert_eq!(std::fs::read_dir(images_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_list_and_detail_are_scoped_to_owner() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let alice = setup_user(&app, "alice@example.com").await;
    let bob = setup_user(&app, "bob@example.com").await;

    let first = upload_image(&app, &alice).await;
    let second = upload_image(&app, &alice).await;

    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/analysis/list/", &alice, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![second["id"].as_str().unwrap(), first["id"].as_str().unwrap()]
    );

    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/analysis/list/", &bob, None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert!(json.as_array().unwrap().is_empty());

    let detail_uri = format!("/api/analysis/{}/", first["id"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(make_authed_request("GET", &detail_uri, &alice, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["id"], first["id"]);

    let response = app
        .oneshot(make_authed_request("GET", &detail_uri, &bob, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Weekly Summary Tests
// =============================================================================

#[tokio::test]
async fn test_weekly_summary_without_analyses() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .oneshot(make_authed_request("GET", "/api/summary/weekly/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total_analyses"], 0);
    assert_eq!(json["summary_data"], json!({ "message": "No analyses this week" }));
    assert_eq!(json["user_email"], "test@example.com");
}

#[tokio::test]
async fn test_weekly_summary_aggregates_analyses() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    for _ in 0..3 {
        upload_image(&app, &token).await;
    }

    let response = app
        .oneshot(make_authed_request("GET", "/api/summary/weekly/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total_analyses"], 3);

    let summary = &json["summary_data"];
    assert_eq!(summary["total_analyses"], 3);
    assert_eq!(summary["average_score"], 7.5);
    assert_eq!(summary["trend"], "improving");

    // Mock result labels per analysis: low x3, medium x2, good x1
    let issues = summary["most_common_issues"].as_object().unwrap();
    let ranked: Vec<(&str, u64)> = issues
        .iter()
        .map(|(label, count)| (label.as_str(), count.as_u64().unwrap()))
        .collect();
    assert_eq!(ranked, vec![("low", 9), ("medium", 6), ("good", 3)]);
}

#[tokio::test]
async fn test_weekly_summary_is_overwritten_not_appended() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/summary/weekly/", &token, None))
        .await
        .unwrap();
    let first = body_to_json(response.into_body()).await;

    upload_image(&app, &token).await;

    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/summary/weekly/", &token, None))
        .await
        .unwrap();
    let second = body_to_json(response.into_body()).await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["week_start"], second["week_start"]);
    assert_eq!(second["total_analyses"], 1);

    let response = app
        .oneshot(make_authed_request("GET", "/api/summary/history/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_to_json(response.into_body()).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["total_analyses"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_weekly_summaries_share_one_record() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;
    upload_image(&app, &token).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let app = app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let response = app
                    .oneshot(make_authed_request("GET", "/api/summary/weekly/", &token, None))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                body_to_json(response.into_body()).await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let json = handle.await.unwrap();
        assert_eq!(json["total_analyses"], 1);
        ids.push(json["id"].as_str().unwrap().to_string());
    }

    let response = app
        .oneshot(make_authed_request("GET", "/api/summary/history/", &token, None))
        .await
        .unwrap();
    let history = body_to_json(response.into_body()).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert!(ids.iter().all(|id| history[0]["id"] == id.as_str()));
}

// =============================================================================
// Account Deletion Tests
// =============================================================================

#[tokio::test]
async fn test_delete_account_cascades() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let analysis = upload_image(&app, &token).await;
    let relative = analysis["image"]
        .as_str()
        .unwrap()
        .strip_prefix("/media/")
        .unwrap()
        .to_string();
    let image_path = temp_dir.path().join("media").join(relative);
    assert!(image_path.is_file());

    app.clone()
        .oneshot(make_authed_request("GET", "/api/summary/weekly/", &token, None))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(make_authed_request(
            "DELETE",
            "/api/user/profile/",
            &token,
            Some(json!({ "password": TEST_PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], true);

    assert!(!image_path.exists());

    // Token no longer resolves to a user
    let response = app
        .clone()
        .oneshot(make_authed_request("GET", "/api/user/profile/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Email is free again
    register(&app, "test@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/admin/stats?key={}", TEST_ADMIN_KEY))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let stats = body_to_json(response.into_body()).await;
    assert_eq!(stats["user_count"], 1);
    assert_eq!(stats["analysis_count"], 0);
    assert_eq!(stats["summary_count"], 0);
}

#[tokio::test]
async fn test_delete_account_wrong_password() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;

    let response = app
        .clone()
        .oneshot(make_authed_request(
            "DELETE",
            "/api/user/profile/",
            &token,
            Some(json!({ "password": "wrongpass123" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(make_authed_request("GET", "/api/user/profile/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Admin Tests
// =============================================================================

#[tokio::test]
async fn test_admin_stats_success() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);
    let token = setup_user(&app, "test@example.com").await;
    upload_image(&app, &token).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/admin/stats?key={}", TEST_ADMIN_KEY))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["user_count"], 1);
    assert_eq!(json["analysis_count"], 1);
    assert!(json["database_size_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_admin_stats_invalid_key() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_test_app(&temp_dir);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/stats?key=wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_stats_disabled_without_key() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_db(&temp_dir);
    let config = Config {
        admin_secret_key: None,
        ..test_config(&temp_dir)
    };
    let app = routes::router(AppState::new(db, config));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/admin/stats?key={}", TEST_ADMIN_KEY))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
