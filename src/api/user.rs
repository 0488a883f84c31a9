use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::json;

use crate::entities::user;

pub async fn get_profile(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match user::Entity::find_by_id(user_id).one(&db).await {
        Ok(Some(u)) => (
            StatusCode::OK,
            Json(json!({
                "id": u.id,
                "name": u.name,
                "email": u.email,
                "age": u.age,
                "country": u.country,
                "city": u.city,
                "createdAt": u.created_at,
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "User not found"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ Profile lookup failed for user {}: {}", user_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}
