use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use super::time_of_day::format_hhmm;
use crate::entities::sea_orm_active_enums::{
    BudgetLevel, IntensityLevel, ItineraryStatus, ThemeType, TransportMode,
};
use crate::entities::{activity, itinerary, place};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanResponse {
    pub itinerary_id: i32,
    pub plan_name: String,
    pub region: String,
    pub days_count: i32,
    pub status: ItineraryStatus,
    pub days: Vec<DayDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetail {
    pub day_number: i32,
    pub activities: Vec<ActivityDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_info: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetail {
    pub title: String,
    pub description: String,
    pub reason: String,
    pub start_time: String,
    pub end_time: String,
    pub place: Option<PlaceDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetail {
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl From<&place::Model> for PlaceDetail {
    fn from(place: &place::Model) -> Self {
        let photos = place.photo_url_list();
        Self {
            name: place.name.clone(),
            description: place.description.clone(),
            city: place.city.clone(),
            country: place.country.clone(),
            image_urls: (!photos.is_empty()).then_some(photos),
            google_rating: place.google_rating,
            latitude: place.latitude,
            longitude: place.longitude,
        }
    }
}

impl ActivityDetail {
    pub fn new(activity: &activity::Model, place: Option<&place::Model>) -> Self {
        Self {
            title: activity.title.clone(),
            description: activity.description.clone().unwrap_or_default(),
            reason: activity.reason.clone().unwrap_or_default(),
            start_time: format_hhmm(activity.start_time),
            end_time: format_hhmm(activity.end_time),
            place: place.map(PlaceDetail::from),
        }
    }
}

/// List projection for `GET /api/routes/user` and favorite itineraries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItinerarySummary {
    pub id: i32,
    pub name: String,
    pub region: String,
    pub days_count: i32,
    pub theme: Option<ThemeType>,
    pub budget: Option<BudgetLevel>,
    pub intensity: Option<IntensityLevel>,
    pub transport: Option<TransportMode>,
    pub is_ai_generated: bool,
    pub status: ItineraryStatus,
    pub created_at: NaiveDateTime,
}

impl From<itinerary::Model> for ItinerarySummary {
    fn from(model: itinerary::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            region: model.region,
            days_count: model.days_count,
            theme: model.theme,
            budget: model.budget,
            intensity: model.intensity,
            transport: model.transport,
            is_ai_generated: model.is_ai_generated,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBackfillSummary {
    pub total_places: usize,
    pub success_count: usize,
    pub fail_count: usize,
}
