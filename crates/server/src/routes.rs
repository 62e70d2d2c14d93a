use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::MessageBody;
use service::{
    errors::ServiceError,
    hospitals::{HospitalService, DELETED_MESSAGE, ENTITY},
    record::{id_from_pairs, parse_body, Record},
};

use crate::errors::ApiError;

/// Decoded query pairs in request order; duplicates are kept.
type QueryPairs = Query<Vec<(String, String)>>;

#[derive(Clone)]
pub struct AppState {
    pub hospitals: Arc<HospitalService>,
}

/// `GET` lists everything unless a non-zero `id` is given.
pub async fn list_or_get(
    State(state): State<AppState>,
    Query(query): QueryPairs,
) -> Result<Response, ApiError> {
    match id_from_pairs(&query) {
        Some(id) if id != 0 => Ok(Json(state.hospitals.get(id).await?).into_response()),
        _ => Ok(Json(state.hospitals.list().await?).into_response()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let record = parse_body(&body?)?;
    let created = state.hospitals.create(record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Query(query): QueryPairs,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Record>, ApiError> {
    let patch = parse_body(&body?)?;
    let id = id_from_pairs(&query).ok_or_else(|| ServiceError::not_found(ENTITY))?;
    Ok(Json(state.hospitals.update(id, patch).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Query(query): QueryPairs,
) -> Result<Json<MessageBody>, ApiError> {
    let id = id_from_pairs(&query).ok_or_else(|| ServiceError::not_found(ENTITY))?;
    state.hospitals.delete(id).await?;
    Ok(Json(MessageBody::new(DELETED_MESSAGE)))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Build the application router: one resource path, JSON everywhere.
/// Bodies larger than `body_limit` bytes are answered with a JSON 413.
pub fn build_router(state: AppState, resource_path: &str, body_limit: usize, cors: CorsLayer) -> Router {
    let resource = get(list_or_get)
        .post(create)
        .put(update)
        .delete(remove)
        .fallback(method_not_allowed);

    Router::new()
        .route(resource_path, resource)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
