//! HTTP surface. Handlers stay thin; behavior lives in `planner` and
//! `favorites`.

pub mod favorites;
pub mod middleware;
pub mod places;
pub mod routes;
pub mod user;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::planner::RoutePlanner;
use crate::providers::PlaceProvider;

async fn health_check() -> &'static str {
    "OK"
}

/// Application routes with their shared state. `shutdown` is the parent of
/// every per-request cancellation token.
pub fn router(
    db: DatabaseConnection,
    planner: Arc<RoutePlanner>,
    place_provider: Arc<dyn PlaceProvider>,
    shutdown: CancellationToken,
) -> Router {
    let protected_routes = Router::new()
        .route("/api/routes/plan", post(routes::create_route_plan))
        .route("/api/routes/user", get(routes::list_user_route_plans))
        .route("/api/routes/enrich-reviews", post(routes::enrich_reviews))
        .route("/api/routes/:id", get(routes::get_route_plan))
        .route(
            "/api/favorites/itineraries",
            get(favorites::list_favorite_itineraries),
        )
        .route(
            "/api/favorites/itineraries/ids",
            get(favorites::list_favorite_itinerary_ids),
        )
        .route(
            "/api/favorites/itineraries/:id",
            post(favorites::add_favorite_itinerary).delete(favorites::remove_favorite_itinerary),
        )
        .route(
            "/api/favorites/itineraries/:id/check",
            get(favorites::check_favorite_itinerary),
        )
        .route("/api/favorites/places", get(favorites::list_favorite_places))
        .route(
            "/api/favorites/places/:id",
            post(favorites::add_favorite_place).delete(favorites::remove_favorite_place),
        )
        .route("/api/places/explore", get(places::explore_places))
        .route("/api/places/location-info", get(places::location_info))
        .route("/api/users/me", get(user::get_profile))
        .route_layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(Extension(db))
        .layer(Extension(planner))
        .layer(Extension(place_provider))
        .layer(Extension(shutdown))
        .layer(tower_cookies::CookieManagerLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlacesConfig, PlannerConfig};
    use crate::entities::prelude::GenerationRequest;
    use crate::entities::sea_orm_active_enums::GenerationStatus;
    use crate::error::GenerationError;
    use crate::providers::{GenerationProvider, LocationInfo};
    use crate::planner::testing::{seed_user, setup_db, FakeGenerator, FakePlaces, FakeWeather};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use sea_orm::EntityTrait;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    const REPLY: &str = r#"{"PlanName":"Mardin","Days":[{"DayNumber":1,"Activities":[{"Title":"Çarşı","StartTime":"9:30 AM","Place":{"Name":"Kasımiye Medresesi"}}]}]}"#;

    async fn app() -> (Router, DatabaseConnection) {
        app_with(Arc::new(FakeGenerator::replying(REPLY))).await
    }

    async fn app_with(generator: Arc<dyn GenerationProvider>) -> (Router, DatabaseConnection) {
        let db = setup_db().await;
        let places: Arc<dyn PlaceProvider> = Arc::new(FakePlaces {
            address: Some(LocationInfo {
                country: Some("Türkiye".to_string()),
                city: Some("Mardin".to_string()),
                formatted_address: None,
            }),
            ..Default::default()
        });
        let planner = RoutePlanner::new(
            db.clone(),
            generator,
            places.clone(),
            Arc::new(FakeWeather::default()),
            &PlacesConfig::default(),
            PlannerConfig::default(),
        );
        (
            router(db.clone(), Arc::new(planner), places, CancellationToken::new()),
            db,
        )
    }

    fn authed(method: &str, uri: &str, user_id: i32, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", user_id));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_credentials() {
        let (app, _db) = app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_credentials_are_unauthorized() {
        let (app, _db) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/routes/user")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn cookie_identifies_caller() {
        let (app, db) = app().await;
        let user = seed_user(&db).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .header(header::COOKIE, format!("smarttrip_user={}", user.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["email"], json!("ayse@example.com"));
    }

    #[tokio::test]
    async fn invalid_plan_request_is_bad_request() {
        let (app, db) = app().await;
        let user = seed_user(&db).await;
        let response = app
            .oneshot(authed(
                "POST",
                "/api/routes/plan",
                user.id,
                Some(json!({"region": "Mardin", "days": 0})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Days must be at least 1"})
        );
    }

    #[tokio::test]
    async fn plan_round_trip_and_favorite() {
        let (app, db) = app().await;
        let user = seed_user(&db).await;

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                "/api/routes/plan",
                user.id,
                Some(json!({"region": "Mardin", "days": 1, "themes": [2, 4]})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(created["planName"], json!("Mardin"));
        assert_eq!(created["status"], json!("completed"));
        assert_eq!(created["days"][0]["activities"][0]["startTime"], json!("09:30"));
        let id = created["itineraryId"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(authed("GET", &format!("/api/routes/{}", id), user.id, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = json_body(response).await;
        assert!(fetched["days"][0]["weatherInfo"].is_object());

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                &format!("/api/favorites/itineraries/{}", id),
                user.id,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["message"], json!("Added to favorites"));

        let response = app
            .clone()
            .oneshot(authed(
                "GET",
                &format!("/api/favorites/itineraries/{}/check", id),
                user.id,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!(true));

        let response = app
            .oneshot(authed("GET", "/api/routes/user", user.id, None))
            .await
            .unwrap();
        let list = json_body(response).await;
        assert_eq!(list[0]["theme"], json!("history"));
    }

    #[tokio::test]
    async fn unknown_route_plan_is_not_found() {
        let (app, db) = app().await;
        let user = seed_user(&db).await;
        let response = app
            .oneshot(authed("GET", "/api/routes/999", user.id, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Route plan not found"})
        );
    }

    /// Never answers.
    struct StalledGenerator;

    #[async_trait::async_trait]
    impl GenerationProvider for StalledGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            std::future::pending().await
        }

        fn model_name(&self) -> &str {
            "stalled-model"
        }
    }

    #[tokio::test]
    async fn client_disconnect_fails_the_generation_request() {
        let (app, db) = app_with(Arc::new(StalledGenerator)).await;
        let user = seed_user(&db).await;

        let request = app.oneshot(authed(
            "POST",
            "/api/routes/plan",
            user.id,
            Some(json!({"region": "Mardin", "days": 1})),
        ));
        // Dropping the in-flight response future is what a disconnect does
        assert!(tokio::time::timeout(Duration::from_millis(100), request)
            .await
            .is_err());

        let mut status = None;
        for _ in 0..100 {
            let requests = GenerationRequest::find().all(&db).await.unwrap();
            status = requests.first().map(|r| r.status);
            if status == Some(GenerationStatus::Failed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, Some(GenerationStatus::Failed));
    }

    #[tokio::test]
    async fn explore_and_location_info() {
        let (app, db) = app().await;
        let user = seed_user(&db).await;

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                "/api/routes/plan",
                user.id,
                Some(json!({"region": "Mardin", "days": 1})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(authed(
                "GET",
                "/api/places/explore?category=All&limit=5",
                user.id,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let places = json_body(response).await;
        assert_eq!(places[0]["name"], json!("Kasımiye Medresesi"));
        assert_eq!(places[0]["location"], json!("Mardin, Turkey"));

        let response = app
            .clone()
            .oneshot(authed(
                "GET",
                "/api/places/location-info?destination=Mardin",
                user.id,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"country": "Türkiye", "city": "Mardin", "formattedAddress": null})
        );

        let response = app
            .oneshot(authed("GET", "/api/places/location-info", user.id, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Destination is required"})
        );
    }
}
