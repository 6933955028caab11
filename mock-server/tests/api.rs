use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, MockConfig, TokenResponse, PERSON_NAMES_QUERY, TOKEN_PATH};
use serde_json::Value;
use tower::ServiceExt;

// base64("test-client:test-secret")
const GOOD_BASIC: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";
// base64("test-client:wrong")
const BAD_BASIC: &str = "Basic dGVzdC1jbGllbnQ6d3Jvbmc=";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn token_request(authorization: &str, form: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(TOKEN_PATH)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(http::header::AUTHORIZATION, authorization)
        .body(form.to_string())
        .unwrap()
}

fn query_request(database: &str, token: &str, statement: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(format!("/db/{database}/query/v2"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(serde_json::json!({ "statement": statement }).to_string())
        .unwrap()
}

// --- token ---

#[tokio::test]
async fn token_issued_for_valid_client() {
    let resp = app()
        .oneshot(token_request(GOOD_BASIC, "grant_type=client_credentials&scope=neo4j"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let token: TokenResponse = body_json(resp).await;
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.scope, "neo4j");
    assert!(!token.access_token.is_empty());
}

#[tokio::test]
async fn fixed_token_is_issued_when_configured() {
    let config = MockConfig {
        access_token: Some("abc123".to_string()),
        ..MockConfig::default()
    };
    let resp = app_with(config)
        .oneshot(token_request(GOOD_BASIC, "grant_type=client_credentials&scope=neo4j"))
        .await
        .unwrap();

    let token: TokenResponse = body_json(resp).await;
    assert_eq!(token.access_token, "abc123");
}

#[tokio::test]
async fn wrong_secret_is_invalid_client() {
    let resp = app()
        .oneshot(token_request(BAD_BASIC, "grant_type=client_credentials&scope=neo4j"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "invalid_client");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn missing_authorization_is_invalid_client() {
    let req = Request::builder()
        .method("POST")
        .uri(TOKEN_PATH)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("grant_type=client_credentials&scope=neo4j".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_grant_types_are_rejected() {
    let resp = app()
        .oneshot(token_request(GOOD_BASIC, "grant_type=password&scope=neo4j"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn unknown_scope_is_rejected() {
    let resp = app()
        .oneshot(token_request(GOOD_BASIC, "grant_type=client_credentials&scope=admin"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "invalid_scope");
}

// --- query ---

#[tokio::test]
async fn query_with_issued_token_returns_people() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(token_request(GOOD_BASIC, "grant_type=client_credentials&scope=neo4j"))
        .await
        .unwrap();
    let token: TokenResponse = body_json(resp).await;

    let resp = app
        .oneshot(query_request("neo4j", &token.access_token, PERSON_NAMES_QUERY))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["data"]["fields"], serde_json::json!(["name"]));
    assert_eq!(
        body["data"]["values"],
        serde_json::json!([["Alice"], ["Bob"], ["Carol"]])
    );
}

#[tokio::test]
async fn query_with_unknown_token_is_unauthorized() {
    let resp = app()
        .oneshot(query_request("neo4j", "never-issued", PERSON_NAMES_QUERY))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["errors"][0]["code"], "Neo.ClientError.Security.Unauthorized");
}

#[tokio::test]
async fn query_against_unknown_database_is_not_found() {
    let config = MockConfig {
        access_token: Some("abc123".to_string()),
        ..MockConfig::default()
    };
    let app = app_with(config);
    app.clone()
        .oneshot(token_request(GOOD_BASIC, "grant_type=client_credentials&scope=neo4j"))
        .await
        .unwrap();

    let resp = app
        .oneshot(query_request("movies", "abc123", PERSON_NAMES_QUERY))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- test helpers ---

#[tokio::test]
async fn echo_returns_body_unchanged() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"a":[1,2,3]}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(body_bytes(resp).await.as_ref(), br#"{"a":[1,2,3]}"#);
}

#[tokio::test]
async fn status_route_returns_requested_code() {
    let req = Request::builder()
        .uri("/status/503")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_route_rejects_invalid_code() {
    let req = Request::builder()
        .uri("/status/1000")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
