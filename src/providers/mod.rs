//! Outbound adapters for the generation, place and weather providers.
//!
//! The pipeline only sees the traits below; the HTTP clients translate
//! between these types and each provider's wire format.

pub mod gemini;
pub mod google_places;
pub mod weather_api;

pub use gemini::GeminiClient;
pub use google_places::GooglePlacesClient;
pub use weather_api::WeatherApiClient;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{GenerationError, ProviderError};

/// Sends one prompt, returns the model's raw reply text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// Best text-search hit for a place query.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    pub formatted_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub price_level: Option<i32>,
    pub opening_hours: Option<Value>,
    pub photo_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceReview {
    pub author_name: String,
    pub text: String,
    pub rating: i32,
    pub profile_photo_url: Option<String>,
    /// Epoch seconds
    pub time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub country: Option<String>,
    pub city: Option<String>,
    pub formatted_address: Option<String>,
}

#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// `Ok(None)` when the provider has no match for the query.
    async fn search(&self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError>;

    async fn reviews(&self, place_id: &str) -> Result<Vec<PlaceReview>, ProviderError>;

    async fn address(&self, place_id: &str) -> Result<Option<LocationInfo>, ProviderError>;

    /// Fully qualified photo URL, `None` when no photo URL can be built.
    fn photo_url(&self, photo_reference: &str, max_width: u32) -> Option<String>;

    fn maps_url(&self, place_id: &str) -> String {
        format!("https://www.google.com/maps/place/?q=place_id:{}", place_id)
    }
}

/// One day of forecast at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub avg_temp_c: f64,
    pub max_wind_kph: f64,
    pub avg_humidity: f64,
    pub condition_text: String,
    pub condition_code: i32,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// `Ok(None)` when the provider answered without a forecast day.
    async fn daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<ForecastDay>, ProviderError>;
}
