use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::Item;
use crate::store::{ItemRepository, StoreError};

/// Store handle shared by every request.
pub type SharedStore = Arc<dyn ItemRepository>;

/// Build an axum `Router` serving the CRUD endpoints over `store`.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(store)
}

/// Serve the store over HTTP at the given address (e.g. `"127.0.0.1:5080"`).
pub async fn serve(store: SharedStore, addr: &str) -> Result<(), std::io::Error> {
    serve_with_shutdown(store, addr, std::future::pending()).await
}

/// Like [`serve`], stopping gracefully once `shutdown` resolves.
pub async fn serve_with_shutdown(
    store: SharedStore,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    debug!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
}

/// `GET /health`
async fn health_handler(State(store): State<SharedStore>) -> Result<Json<serde_json::Value>, StoreError> {
    let count = store.count()?;
    Ok(Json(json!({ "ok": true, "items": count })))
}

/// `GET /items?search=`
async fn list_items(
    State(store): State<SharedStore>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Item>>, StoreError> {
    Ok(Json(store.get_all(query.search.as_deref())?))
}

/// `GET /items/:id`
async fn get_item(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<Json<Item>, StoreError> {
    Ok(Json(store.get_by_id(id)?))
}

/// `POST /items`
async fn create_item(
    State(store): State<SharedStore>,
    Json(item): Json<Item>,
) -> Result<Response, StoreError> {
    let created = store.add(item)?;
    let location = format!("/items/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    )
        .into_response())
}

/// `PUT /items/:id`
async fn update_item(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Json(item): Json<Item>,
) -> Result<StatusCode, StoreError> {
    if id != item.id {
        return Err(StoreError::Validation("ID mismatch".to_string()));
    }
    store.update(item)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /items/:id`
async fn delete_item(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StoreError> {
    store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
