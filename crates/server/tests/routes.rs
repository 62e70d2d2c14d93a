use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use configs::IdStrategy;
use server::routes::{self, AppState};
use service::hospitals::HospitalService;
use service::record::Record;
use service::storage::{CollectionStorage, JsonFileStorage, MemoryStorage};

fn cors() -> tower_http::cors::CorsLayer { tower_http::cors::CorsLayer::very_permissive() }

fn records(v: Value) -> Vec<Record> {
    serde_json::from_value(v).expect("array of objects")
}

const BODY_LIMIT: usize = 2 * 1024 * 1024;

fn app_with_limit(storage: Arc<dyn CollectionStorage>, body_limit: usize) -> Router {
    let hospitals = Arc::new(HospitalService::new(storage, IdStrategy::MaxPlusOne));
    routes::build_router(AppState { hospitals }, "/hospitals", body_limit, cors())
}

fn app_with(storage: Arc<dyn CollectionStorage>) -> Router {
    app_with_limit(storage, BODY_LIMIT)
}

fn temp_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("registry_routes_{}", Uuid::new_v4()))
        .join("hospitals.json")
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> anyhow::Result<(StatusCode, String, Value)> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))?;
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    let json = serde_json::from_slice(&bytes)?;
    Ok((status, content_type, json))
}

#[tokio::test]
async fn empty_collection_lists_as_empty_array() -> anyhow::Result<()> {
    let app = app_with(MemoryStorage::new());
    let (status, ct, body) = send(&app, "GET", "/hospitals", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "application/json");
    assert_eq!(body, json!([]));
    Ok(())
}

#[tokio::test]
async fn post_then_list_returns_created_record() -> anyhow::Result<()> {
    let path = temp_path();
    let storage = JsonFileStorage::new(&path).await?;
    let app = app_with(storage.clone());

    let (status, _, body) = send(&app, "POST", "/hospitals", Some(r#"{"name":"A"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(serde_json::to_string(&body)?, r#"{"name":"A","id":1}"#);

    let (status, _, list) = send(&app, "GET", "/hospitals", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([{"name": "A", "id": 1}]));

    let on_disk = tokio::fs::read_to_string(&path).await?;
    assert_eq!(on_disk, "[\n  {\n    \"name\": \"A\",\n    \"id\": 1\n  }\n]");
    assert_eq!(storage.load().await?.len(), 1);

    let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    Ok(())
}

#[tokio::test]
async fn posting_n_records_yields_ids_one_to_n() -> anyhow::Result<()> {
    let app = app_with(MemoryStorage::new());
    for n in 1..=4 {
        let (status, _, body) = send(&app, "POST", "/hospitals", Some(r#"{"name":"H"}"#)).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], json!(n));
    }
    let (_, _, list) = send(&app, "GET", "/hospitals", None).await?;
    assert_eq!(list.as_array().map(Vec::len), Some(4));
    Ok(())
}

#[tokio::test]
async fn get_by_id_finds_or_reports_not_found() -> anyhow::Result<()> {
    let app = app_with(MemoryStorage::with_records(records(json!([
        {"id": 1, "name": "A"},
        {"id": 2, "name": "B"}
    ]))));

    let (status, _, body) = send(&app, "GET", "/hospitals?id=2", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 2, "name": "B"}));

    let (status, _, body) = send(&app, "GET", "/hospitals?id=5", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Hospital not found"}));
    Ok(())
}

#[tokio::test]
async fn get_with_unusable_id_lists_everything() -> anyhow::Result<()> {
    let app = app_with(MemoryStorage::with_records(records(json!([{"id": 1}, {"id": 2}]))));
    for uri in ["/hospitals?id=abc", "/hospitals?id=0", "/hospitals?id=", "/hospitals?other=1"] {
        let (status, _, body) = send(&app, "GET", uri, None).await?;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body.as_array().map(Vec::len), Some(2), "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn put_merges_fields() -> anyhow::Result<()> {
    let storage = MemoryStorage::with_records(records(json!([{"id": 1, "name": "A", "city": "Turin"}])));
    let app = app_with(storage.clone());

    let (status, _, body) = send(&app, "PUT", "/hospitals?id=1", Some(r#"{"name":"B"}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::to_string(&body)?, r#"{"id":1,"name":"B","city":"Turin"}"#);
    assert_eq!(storage.load().await?, records(json!([{"id": 1, "name": "B", "city": "Turin"}])));
    Ok(())
}

#[tokio::test]
async fn put_unknown_or_missing_id_is_not_found() -> anyhow::Result<()> {
    let seed = records(json!([{"id": 1, "name": "A"}]));
    let storage = MemoryStorage::with_records(seed.clone());
    let app = app_with(storage.clone());

    for uri in ["/hospitals?id=2", "/hospitals", "/hospitals?id=x"] {
        let (status, _, body) = send(&app, "PUT", uri, Some(r#"{"name":"B"}"#)).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body, json!({"message": "Hospital not found"}));
    }
    assert_eq!(storage.load().await?, seed);
    Ok(())
}

#[tokio::test]
async fn delete_existing_and_missing() -> anyhow::Result<()> {
    let storage = MemoryStorage::with_records(records(json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}])));
    let app = app_with(storage.clone());

    let (status, _, body) = send(&app, "DELETE", "/hospitals?id=2", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hospital deleted"}));
    assert_eq!(storage.load().await?, records(json!([{"id": 1, "name": "A"}])));

    let (status, _, body) = send(&app, "DELETE", "/hospitals?id=2", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Hospital not found"}));

    let (status, _, _) = send(&app, "DELETE", "/hospitals", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(storage.load().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_path_and_unsupported_method() -> anyhow::Result<()> {
    let seed = records(json!([{"id": 1, "name": "A"}]));
    let storage = MemoryStorage::with_records(seed.clone());
    let app = app_with(storage.clone());

    let (status, ct, body) = send(&app, "GET", "/unknown", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(ct, "application/json");
    assert_eq!(body, json!({"message": "Not Found"}));

    let (status, ct, body) = send(&app, "PATCH", "/hospitals?id=1", Some(r#"{"name":"Z"}"#)).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(ct, "application/json");
    assert_eq!(body, json!({"message": "Method Not Allowed"}));

    let (status, _, _) = send(&app, "POST", "/hospitals/1", Some(r#"{"name":"Z"}"#)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(storage.load().await?, seed);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_rejected() -> anyhow::Result<()> {
    let seed = records(json!([{"id": 1, "name": "A"}]));
    let storage = MemoryStorage::with_records(seed.clone());
    let app = app_with(storage.clone());

    for (method, uri, body) in [
        ("POST", "/hospitals", "{\"name\":"),
        ("POST", "/hospitals", "[1,2,3]"),
        ("POST", "/hospitals", ""),
        ("PUT", "/hospitals?id=1", "not json"),
    ] {
        let (status, _, resp) = send(&app, method, uri, Some(body)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {body}");
        assert_eq!(resp, json!({"message": "Invalid JSON body"}));
    }
    assert_eq!(storage.load().await?, seed);
    Ok(())
}

#[tokio::test]
async fn broken_storage_answers_internal_error() -> anyhow::Result<()> {
    let path = temp_path();
    let storage = JsonFileStorage::new(&path).await?;
    let app = app_with(storage);
    tokio::fs::write(&path, "{ definitely not an array").await?;

    let (status, _, body) = send(&app, "GET", "/hospitals", None).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "Internal Server Error"}));

    let (status, _, _) = send(&app, "POST", "/hospitals", Some(r#"{"name":"A"}"#)).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(tokio::fs::read_to_string(&path).await?, "{ definitely not an array");

    let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    Ok(())
}

#[tokio::test]
async fn percent_encoded_id_is_decoded() -> anyhow::Result<()> {
    let storage = MemoryStorage::with_records(records(json!([{"id": 1}, {"id": 2}])));
    let app = app_with(storage.clone());

    let (status, _, body) = send(&app, "GET", "/hospitals?id=%31", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1}));

    let (status, _, body) = send(&app, "PUT", "/hospitals?%69%64=%31", Some(r#"{"name":"N"}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "name": "N"}));

    let (status, _, body) = send(&app, "DELETE", "/hospitals?id=%32", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hospital deleted"}));
    assert_eq!(storage.load().await?, records(json!([{"id": 1, "name": "N"}])));
    Ok(())
}

#[tokio::test]
async fn oversized_body_gets_json_413() -> anyhow::Result<()> {
    let seed = records(json!([{"id": 1, "name": "A"}]));
    let storage = MemoryStorage::with_records(seed.clone());
    let app = app_with_limit(storage.clone(), 64);
    let big = format!(r#"{{"name":"{}"}}"#, "x".repeat(256));

    for (method, uri) in [("POST", "/hospitals"), ("PUT", "/hospitals?id=1")] {
        let (status, ct, body) = send(&app, method, uri, Some(&big)).await?;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{method}");
        assert_eq!(ct, "application/json");
        assert_eq!(body, json!({"message": "Payload Too Large"}));
    }
    assert_eq!(storage.load().await?, seed);

    let (status, _, _) = send(&app, "POST", "/hospitals", Some(r#"{"name":"B"}"#)).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn exhausted_id_space_answers_internal_error() -> anyhow::Result<()> {
    let seed = records(json!([{"id": i64::MAX, "name": "last"}]));
    let storage = MemoryStorage::with_records(seed.clone());
    let app = app_with(storage.clone());

    let (status, _, body) = send(&app, "POST", "/hospitals", Some(r#"{"name":"A"}"#)).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "Internal Server Error"}));
    assert_eq!(storage.load().await?, seed);
    Ok(())
}
