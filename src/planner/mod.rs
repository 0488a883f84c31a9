//! Itinerary generation and enrichment pipeline.

pub mod draft;
pub mod dto;
pub mod enrichment;
pub mod locks;
pub mod materializer;
pub mod prompt;
pub mod request;
pub mod service;
pub mod time_of_day;
pub mod weather;

pub use dto::{ItinerarySummary, ReviewBackfillSummary, RoutePlanResponse};
pub use request::{RoutePlanRequest, TripSelection};
pub use service::RoutePlanner;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::PlannerError;

/// Runs `fut` unless `cancel` fires first.
pub async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, PlannerError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PlannerError::Cancelled),
        output = fut => Ok(output),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use sea_orm::{
        ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Set,
    };
    use sea_orm_migration::MigratorTrait;

    use crate::entities::user;
    use crate::error::{GenerationError, ProviderError};
    use crate::migrator::Migrator;
    use crate::providers::{
        ForecastDay, GenerationProvider, LocationInfo, PlaceCandidate, PlaceProvider,
        PlaceReview, WeatherProvider,
    };

    pub async fn setup_db() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    /// Makes every UPDATE on `table` whose new row matches `condition` fail.
    pub async fn reject_updates(db: &DatabaseConnection, table: &str, condition: &str) {
        db.execute_unprepared(&format!(
            "CREATE TRIGGER reject_{table}_update BEFORE UPDATE ON {table} \
             WHEN {condition} BEGIN SELECT RAISE(ABORT, 'update rejected'); END;"
        ))
        .await
        .unwrap();
    }

    pub async fn seed_user(db: &DatabaseConnection) -> user::Model {
        seed_user_with_email(db, "ayse@example.com").await
    }

    pub async fn seed_user_with_email(db: &DatabaseConnection, email: &str) -> user::Model {
        user::ActiveModel {
            name: Set("Ayşe".to_string()),
            email: Set(email.to_string()),
            age: Set(Some(29)),
            country: Set(Some("Turkey".to_string())),
            city: Set(Some("Istanbul".to_string())),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    /// Returns a canned reply, or a provider error when `reply` is `None`.
    pub struct FakeGenerator {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for FakeGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(GenerationError::Provider {
                status: Some(503),
                body: "model overloaded".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "fake-model"
        }
    }

    /// Place provider keyed by the place name at the start of the query.
    #[derive(Default)]
    pub struct FakePlaces {
        /// Names whose search fails with a provider error.
        pub failing: Vec<String>,
        /// Names with no search match.
        pub unknown: Vec<String>,
        pub reviews: Vec<PlaceReview>,
        pub address: Option<LocationInfo>,
        pub search_calls: Mutex<Vec<String>>,
        pub review_calls: AtomicUsize,
    }

    impl FakePlaces {
        pub fn with_reviews() -> Self {
            Self {
                reviews: vec![
                    review("Mehmet", "Harika manzara", 5),
                    review("Elif", "Çok kalabalık", 3),
                ],
                ..Default::default()
            }
        }

        pub fn searches(&self) -> Vec<String> {
            self.search_calls.lock().unwrap().clone()
        }
    }

    pub fn review(author: &str, text: &str, rating: i32) -> PlaceReview {
        PlaceReview {
            author_name: author.to_string(),
            text: text.to_string(),
            rating,
            profile_photo_url: None,
            time: Some(1_700_000_000),
        }
    }

    fn place_name(query: &str) -> &str {
        query.split(", ").next().unwrap_or(query)
    }

    #[async_trait]
    impl PlaceProvider for FakePlaces {
        async fn search(&self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError> {
            self.search_calls.lock().unwrap().push(query.to_string());
            let name = place_name(query);
            if self.failing.iter().any(|n| n == name) {
                return Err(ProviderError::Status {
                    status: 500,
                    body: "backend error".to_string(),
                });
            }
            if self.unknown.iter().any(|n| n == name) {
                return Ok(None);
            }

            let offset = name.len() as f64 / 100.0;
            Ok(Some(PlaceCandidate {
                place_id: format!("gp-{}", name.to_lowercase().replace(' ', "-")),
                name: name.to_string(),
                formatted_address: Some(format!("{} address", name)),
                latitude: Some(41.0 + offset),
                longitude: Some(29.0 + offset),
                rating: Some(4.5),
                user_ratings_total: Some(1200),
                price_level: Some(2),
                opening_hours: Some(serde_json::json!({ "open_now": true })),
                photo_references: vec!["r1".into(), "r2".into(), "r3".into(), "r4".into()],
            }))
        }

        async fn reviews(&self, _place_id: &str) -> Result<Vec<PlaceReview>, ProviderError> {
            self.review_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reviews.clone())
        }

        async fn address(&self, _place_id: &str) -> Result<Option<LocationInfo>, ProviderError> {
            Ok(self.address.clone())
        }

        fn photo_url(&self, photo_reference: &str, max_width: u32) -> Option<String> {
            Some(format!(
                "https://photos.test/{}?maxwidth={}",
                photo_reference, max_width
            ))
        }
    }

    /// Weather keyed by `"lat,lng"`; unlisted points get a fixed forecast.
    #[derive(Default)]
    pub struct FakeWeather {
        pub failing_points: Vec<(f64, f64)>,
        pub calls: Mutex<Vec<(f64, f64)>>,
        pub overrides: HashMap<String, ForecastDay>,
    }

    pub fn forecast(avg: f64) -> ForecastDay {
        ForecastDay {
            max_temp_c: avg + 4.0,
            min_temp_c: avg - 4.0,
            avg_temp_c: avg,
            max_wind_kph: 18.0,
            avg_humidity: 64.0,
            condition_text: "Güneşli".to_string(),
            condition_code: 1000,
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn daily_forecast(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<Option<ForecastDay>, ProviderError> {
            self.calls.lock().unwrap().push((latitude, longitude));
            if self
                .failing_points
                .iter()
                .any(|(lat, lng)| (lat - latitude).abs() < 1e-9 && (lng - longitude).abs() < 1e-9)
            {
                return Err(ProviderError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            let key = format!("{},{}", latitude, longitude);
            Ok(Some(
                self.overrides.get(&key).cloned().unwrap_or_else(|| forecast(20.0)),
            ))
        }
    }
}
