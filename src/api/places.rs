use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::field::display;

use super::routes::error_response;
use crate::places::{self, DEFAULT_EXPLORE_LIMIT};
use crate::providers::PlaceProvider;

#[derive(Debug, Deserialize)]
pub struct ExploreParams {
    pub category: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    #[serde(default)]
    pub destination: String,
}

pub async fn explore_places(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<ExploreParams>,
) -> Response {
    tracing::Span::current()
        .record("table", "places")
        .record("action", "explore_places");

    let limit = params.limit.unwrap_or(DEFAULT_EXPLORE_LIMIT);
    match places::explore(&db, params.category.as_deref(), limit).await {
        Ok(places) => (StatusCode::OK, Json(places)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn location_info(
    Extension(provider): Extension<Arc<dyn PlaceProvider>>,
    Extension(shutdown): Extension<CancellationToken>,
    Query(params): Query<LocationParams>,
) -> Response {
    tracing::Span::current()
        .record("table", "places")
        .record("action", "location_info");

    let cancel = shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    match places::location_info(provider.as_ref(), &params.destination, &cancel).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) if e.status_code().is_server_error() => {
            tracing::error!("❌ Location lookup failed for {}: {}", params.destination, e);
            tracing::Span::current().record("error", display(&e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to get location info"})),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
