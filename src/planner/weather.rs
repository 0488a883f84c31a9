use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::until_cancelled;
use crate::entities::{activity, itinerary_day, place, prelude::*};
use crate::error::PlannerError;
use crate::providers::{ForecastDay, WeatherProvider};

pub const WEATHER_SOURCE: &str = "weatherapi_forecast";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherReport {
    pub attached: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl WeatherReport {
    pub fn has_warnings(&self) -> bool {
        self.failed > 0
    }
}

/// Compact per-day forecast stored on `itinerary_days.weather_info`.
pub fn weather_summary(forecast: &ForecastDay) -> Value {
    json!({
        "temp": {
            "day": forecast.avg_temp_c,
            "min": forecast.min_temp_c,
            "max": forecast.max_temp_c,
        },
        "weather": {
            "main": forecast.condition_text,
            "description": forecast.condition_text,
        },
        "humidity": forecast.avg_humidity,
        "windSpeed": forecast.max_wind_kph,
        "source": WEATHER_SOURCE,
    })
}

/// Earliest-starting activity whose place has coordinates. Activities
/// without a start time sort last.
pub fn representative_point(
    activities: &[activity::Model],
    places: &HashMap<i32, place::Model>,
) -> Option<(f64, f64)> {
    activities
        .iter()
        .filter_map(|a| {
            let coords = places.get(&a.place_id?)?.coordinates()?;
            Some((a, coords))
        })
        .min_by(|(a, _), (b, _)| match (a.start_time, b.start_time) {
            (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        })
        .map(|(_, coords)| coords)
}

pub struct WeatherAttacher {
    db: DatabaseConnection,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherAttacher {
    pub fn new(db: DatabaseConnection, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { db, provider }
    }

    /// One forecast per day with a usable point. A failing day, provider or
    /// database, is logged and counted; the remaining days are still
    /// processed. Only cancellation aborts the pass.
    pub async fn attach_itinerary(
        &self,
        itinerary_id: i32,
        cancel: &CancellationToken,
    ) -> Result<WeatherReport, PlannerError> {
        let days = ItineraryDay::find()
            .filter(itinerary_day::Column::ItineraryId.eq(itinerary_id))
            .order_by_asc(itinerary_day::Column::DayNumber)
            .all(&self.db)
            .await?;

        let mut report = WeatherReport::default();
        for day in days {
            let outcome = match self.attach_day(&day, cancel).await {
                Ok(outcome) => outcome,
                Err(PlannerError::Cancelled) => return Err(PlannerError::Cancelled),
                Err(e) => {
                    error!("❌ Weather attachment failed for day {}: {}", day.id, e);
                    DayWeather::Failed
                }
            };
            match outcome {
                DayWeather::Attached => report.attached += 1,
                DayWeather::Skipped => report.skipped += 1,
                DayWeather::Failed => report.failed += 1,
            }
            metrics::counter!("smarttrip_weather_total", "outcome" => outcome.kind()).increment(1);
        }

        Ok(report)
    }

    async fn attach_day(
        &self,
        day: &itinerary_day::Model,
        cancel: &CancellationToken,
    ) -> Result<DayWeather, PlannerError> {
        let activities = Activity::find()
            .filter(activity::Column::ItineraryDayId.eq(day.id))
            .all(&self.db)
            .await?;
        let place_ids: Vec<i32> = activities.iter().filter_map(|a| a.place_id).collect();
        let places: HashMap<i32, place::Model> = if place_ids.is_empty() {
            HashMap::new()
        } else {
            Place::find()
                .filter(place::Column::Id.is_in(place_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let Some((lat, lng)) = representative_point(&activities, &places) else {
            info!("ItineraryDay {} has no valid place coordinates", day.id);
            return Ok(DayWeather::Skipped);
        };

        match until_cancelled(cancel, self.provider.daily_forecast(lat, lng)).await? {
            Ok(Some(forecast)) => {
                let mut active = day.clone().into_active_model();
                active.weather_info = Set(Some(weather_summary(&forecast)));
                active.update(&self.db).await?;
                Ok(DayWeather::Attached)
            }
            Ok(None) => {
                info!("No forecast returned for day {}", day.id);
                Ok(DayWeather::Skipped)
            }
            Err(e) => {
                error!("❌ Weather lookup failed for day {}: {}", day.id, e);
                Ok(DayWeather::Failed)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayWeather {
    Attached,
    Skipped,
    Failed,
}

impl DayWeather {
    fn kind(self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}
