use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::{ForecastDay, WeatherProvider};
use crate::config::WeatherConfig;
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecast: Option<Forecast>,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    forecastday: Vec<ForecastDayEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastDayEntry {
    day: DaySummary,
}

#[derive(Debug, Deserialize)]
struct DaySummary {
    maxtemp_c: f64,
    mintemp_c: f64,
    avgtemp_c: f64,
    maxwind_kph: f64,
    avghumidity: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    text: String,
    #[serde(default)]
    code: i32,
}

pub struct WeatherApiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    lang: String,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Self {
        if config.api_key.is_none() {
            warn!("⚠️ WEATHERAPI_KEY not set. Weather info will be skipped.");
        }
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            lang: config.lang.clone(),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<ForecastDay>, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("WEATHERAPI_KEY"))?;
        let point = format!("{},{}", latitude, longitude);

        let res = self
            .client
            .get(format!("{}/forecast.json", self.base_url))
            .query(&[
                ("key", key),
                ("q", point.as_str()),
                ("days", "1"),
                ("aqi", "no"),
                ("alerts", "no"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = res.text().await?;
        parse_forecast(&text)
    }
}

fn parse_forecast(body: &str) -> Result<Option<ForecastDay>, ProviderError> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let day = response
        .forecast
        .and_then(|f| f.forecastday.into_iter().next())
        .map(|entry| entry.day);

    Ok(day.map(|d| ForecastDay {
        max_temp_c: d.maxtemp_c,
        min_temp_c: d.mintemp_c,
        avg_temp_c: d.avgtemp_c,
        max_wind_kph: d.maxwind_kph,
        avg_humidity: d.avghumidity,
        condition_text: d.condition.text,
        condition_code: d.condition.code,
    }))
}
