use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, API_KEY};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Simple {API_KEY}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn data_type(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get("X-Data-Type")
        .and_then(|v| v.to_str().ok())
}

async fn send(app: &Router, method: &str, uri: &str, body: &str) -> axum::response::Response {
    app.clone().oneshot(request(method, uri, body)).await.unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_key_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/algo/util/Echo")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["message"], "authorization required");
}

#[tokio::test]
async fn wrong_key_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v1/connector/data/.my")
                .header(http::header::AUTHORIZATION, "Simple nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- algo ---

#[tokio::test]
async fn echo_wraps_input_in_envelope() {
    let resp = send(&app(), "POST", "/v1/algo/util/Echo?timeout=300&stdout=1", r#"{"a":1}"#).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"], json!({"a": 1}));
    assert_eq!(body["metadata"]["content_type"], "json");
    assert_eq!(body["metadata"]["stdout"], "called util/Echo\n");
}

#[tokio::test]
async fn void_output_returns_request_id() {
    let resp = send(&app(), "POST", "/v1/algo/util/Echo/0.1.0?output=void", "{}").await;

    let body = body_json(resp).await;
    assert_eq!(body["async"], "void");
    assert!(!body["request_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn raw_output_drops_envelope() {
    let resp = send(&app(), "POST", "/v1/algo/util/Length?output=raw", r#"{"a":1,"b":2}"#).await;
    assert_eq!(&body_bytes(resp).await[..], b"2");
}

#[tokio::test]
async fn failing_algo_reports_error_details() {
    let resp = send(&app(), "POST", "/v1/algo/util/Fail", "{}").await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "AlgorithmError");
    assert_eq!(body["error"]["error_subcode"], 3);
}

#[tokio::test]
async fn unknown_algo_returns_404() {
    let resp = send(&app(), "POST", "/v1/algo/nobody/Nothing", "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- connector ---

#[tokio::test]
async fn home_lists_empty_directory() {
    let resp = send(&app(), "GET", "/v1/connector/data/.my?acl=true", "").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data_type(&resp), Some("directory"));
    let body = body_json(resp).await;
    assert_eq!(body["files"], json!([]));
    assert_eq!(body["folders"], json!([]));
    assert_eq!(body["acl"], json!({"read": []}));
}

#[tokio::test]
async fn upload_then_download_file() {
    let app = app();
    let resp = send(&app, "PUT", "/v1/connector/data/.my/a.txt", "hello").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["result"], "data://.my/a.txt");

    let resp = send(&app, "GET", "/v1/connector/data/.my/a.txt", "").await;
    assert_eq!(data_type(&resp), Some("file"));
    assert_eq!(&body_bytes(resp).await[..], b"hello");

    let resp = send(&app, "GET", "/v1/connector/data/.my", "").await;
    let body = body_json(resp).await;
    assert_eq!(body["files"], json!([{"filename": "a.txt", "size": 5}]));
}

#[tokio::test]
async fn head_reports_file_type() {
    let app = app();
    send(&app, "PUT", "/v1/connector/data/.my/a.txt", "x").await;

    let resp = send(&app, "HEAD", "/v1/connector/data/.my/a.txt", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data_type(&resp), Some("file"));

    let resp = send(&app, "HEAD", "/v1/connector/data/.my/b.txt", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_into_missing_directory_returns_404() {
    let resp = send(&app(), "PUT", "/v1/connector/data/.my/none/a.txt", "x").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_update_and_list_directory() {
    let app = app();
    let resp = send(&app, "POST", "/v1/connector/data/.my", r#"{"name":"docs"}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data_type(&resp), Some("directory"));

    let resp = send(&app, "POST", "/v1/connector/data/.my", r#"{"name":"docs"}"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        "PATCH",
        "/v1/connector/data/.my/docs",
        r#"{"acl":{"read":["user://*"]}}"#,
    )
    .await;
    assert_eq!(body_json(resp).await["acl"], json!({"read": ["user://*"]}));

    let resp = send(&app, "GET", "/v1/connector/data/.my", "").await;
    assert_eq!(body_json(resp).await["folders"], json!([{"name": "docs"}]));
}

#[tokio::test]
async fn delete_non_empty_directory_needs_force() {
    let app = app();
    send(&app, "POST", "/v1/connector/data/.my", r#"{"name":"docs"}"#).await;
    send(&app, "PUT", "/v1/connector/data/.my/docs/a", "a").await;
    send(&app, "PUT", "/v1/connector/data/.my/docs/b", "b").await;

    let resp = send(&app, "DELETE", "/v1/connector/data/.my/docs?force=false", "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["deleted"], 0);

    let resp = send(&app, "DELETE", "/v1/connector/data/.my/docs?force=true", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["result"]["deleted"], 2);

    let resp = send(&app, "GET", "/v1/connector/data/.my/docs", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_file_reports_one() {
    let app = app();
    send(&app, "PUT", "/v1/connector/data/.my/a.txt", "x").await;

    let resp = send(&app, "DELETE", "/v1/connector/data/.my/a.txt", "").await;
    assert_eq!(body_json(resp).await["result"]["deleted"], 1);

    let resp = send(&app, "DELETE", "/v1/connector/data/.my/a.txt", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
