use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use super::routes::error_response;
use crate::entities::favorite::FavoriteTarget;
use crate::favorites::{self, FavoriteChange};
use crate::metrics::record_favorite_change;

fn target_label(target: FavoriteTarget) -> &'static str {
    match target {
        FavoriteTarget::Place(_) => "place",
        FavoriteTarget::Itinerary(_) => "itinerary",
    }
}

async fn add_favorite(db: &DatabaseConnection, user_id: i32, target: FavoriteTarget) -> Response {
    tracing::Span::current()
        .record("table", "favorites")
        .record("action", "add_favorite");

    match favorites::add(db, user_id, target).await {
        Ok(FavoriteChange::Added(id)) => {
            tracing::Span::current().record("business_event", "Favorite added");
            record_favorite_change(target_label(target), "added");
            (
                StatusCode::OK,
                Json(json!({"message": "Added to favorites", "id": id})),
            )
                .into_response()
        }
        Ok(FavoriteChange::AlreadyPresent) => (
            StatusCode::OK,
            Json(json!({"message": "Already in favorites"})),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn remove_favorite(db: &DatabaseConnection, user_id: i32, target: FavoriteTarget) -> Response {
    tracing::Span::current()
        .record("table", "favorites")
        .record("action", "remove_favorite");

    match favorites::remove(db, user_id, target).await {
        Ok(()) => {
            record_favorite_change(target_label(target), "removed");
            (
                StatusCode::OK,
                Json(json!({"message": "Removed from favorites"})),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn list_favorite_itineraries(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match favorites::itineraries(&db, user_id).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_favorite_itinerary_ids(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match favorites::itinerary_ids(&db, user_id).await {
        Ok(ids) => (StatusCode::OK, Json(ids)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn check_favorite_itinerary(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Path(itinerary_id): Path<i32>,
) -> Response {
    match favorites::contains(&db, user_id, FavoriteTarget::Itinerary(itinerary_id)).await {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn add_favorite_itinerary(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Path(itinerary_id): Path<i32>,
) -> Response {
    add_favorite(&db, user_id, FavoriteTarget::Itinerary(itinerary_id)).await
}

pub async fn remove_favorite_itinerary(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Path(itinerary_id): Path<i32>,
) -> Response {
    remove_favorite(&db, user_id, FavoriteTarget::Itinerary(itinerary_id)).await
}

pub async fn list_favorite_places(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match favorites::places(&db, user_id).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn add_favorite_place(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Path(place_id): Path<i32>,
) -> Response {
    add_favorite(&db, user_id, FavoriteTarget::Place(place_id)).await
}

pub async fn remove_favorite_place(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Path(place_id): Path<i32>,
) -> Response {
    remove_favorite(&db, user_id, FavoriteTarget::Place(place_id)).await
}
