use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::field::display;
use tracing::Instrument;

use crate::error::PlannerError;
use crate::metrics::{record_itinerary_created, record_review_backfill};
use crate::planner::{RoutePlanRequest, RoutePlanner};

pub async fn create_route_plan(
    Extension(planner): Extension<Arc<RoutePlanner>>,
    Extension(shutdown): Extension<CancellationToken>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<RoutePlanRequest>,
) -> Response {
    // Fires when this handler is dropped, e.g. on client disconnect. The
    // pipeline runs in its own task so its cancel path still gets to record
    // the outcome.
    let cancel = shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let pipeline = tokio::spawn(
        async move { planner.create_route_plan(user_id, payload, cancel).await }
            .in_current_span(),
    );
    let result = match pipeline.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("❌ Route plan task aborted: {}", e);
            tracing::Span::current()
                .record("action", "create_route_plan_failed")
                .record("error", display(&e));
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to create route plan"})),
            )
                .into_response();
        }
    };

    match result {
        Ok(plan) => {
            tracing::Span::current()
                .record("table", "itineraries")
                .record("action", "create_route_plan")
                .record("itinerary_id", plan.itinerary_id)
                .record("business_event", "Route plan created")
                .record("error", tracing::field::Empty);
            record_itinerary_created(plan.status);

            (StatusCode::OK, Json(plan)).into_response()
        }
        Err(e) => {
            tracing::Span::current()
                .record("table", "itineraries")
                .record("action", "create_route_plan_failed")
                .record("error", display(&e));

            if e.status_code().is_server_error() {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Failed to create route plan"})),
                )
                    .into_response()
            } else {
                e.into_response()
            }
        }
    }
}

pub async fn get_route_plan(
    Extension(planner): Extension<Arc<RoutePlanner>>,
    Extension(user_id): Extension<i32>,
    Path(itinerary_id): Path<i32>,
) -> Response {
    tracing::Span::current()
        .record("table", "itineraries")
        .record("action", "get_route_plan")
        .record("itinerary_id", itinerary_id);

    match planner.get_route_plan(user_id, itinerary_id).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_user_route_plans(
    Extension(planner): Extension<Arc<RoutePlanner>>,
    Extension(user_id): Extension<i32>,
) -> Response {
    tracing::Span::current()
        .record("table", "itineraries")
        .record("action", "list_route_plans");

    match planner.list_route_plans(user_id).await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn enrich_reviews(
    Extension(planner): Extension<Arc<RoutePlanner>>,
    Extension(shutdown): Extension<CancellationToken>,
) -> Response {
    let cancel = shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    match planner.backfill_reviews(cancel).await {
        Ok(summary) => {
            tracing::Span::current()
                .record("table", "google_reviews")
                .record("action", "enrich_reviews")
                .record(
                    "business_event",
                    display(format!(
                        "Review backfill: {} ok, {} failed",
                        summary.success_count, summary.fail_count
                    )),
                );
            record_review_backfill(summary.success_count, summary.fail_count);

            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => {
            tracing::Span::current()
                .record("action", "enrich_reviews_failed")
                .record("error", display(&e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to enrich reviews"})),
            )
                .into_response()
        }
    }
}

pub(crate) fn error_response(e: PlannerError) -> Response {
    if e.status_code().is_server_error() {
        tracing::error!("❌ Request failed: {}", e);
        tracing::Span::current().record("error", display(&e));
    }
    e.into_response()
}
