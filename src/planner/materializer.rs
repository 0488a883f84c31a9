use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use tracing::{info, warn};

use super::draft::{DraftActivity, DraftDay, DraftPlace};
use super::dto::{ActivityDetail, DayDetail};
use super::locks::KeyedLocks;
use super::request::TripSelection;
use super::time_of_day::parse_time_of_day;
use crate::entities::sea_orm_active_enums::{ItineraryStatus, ThemeType};
use crate::entities::{activity, itinerary, itinerary_day, place, prelude::*};
use crate::error::PlannerError;

const UNTITLED_ACTIVITY: &str = "Untitled activity";

/// Fields of a place row about to be looked up or created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlace {
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub country: String,
    pub category: Option<ThemeType>,
}

/// Find-or-create for places, matched on exact `(name, city)`.
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    async fn find_or_create(&self, new_place: NewPlace) -> Result<place::Model, PlannerError>;
}

pub struct DbPlaceDirectory {
    db: DatabaseConnection,
    locks: Arc<KeyedLocks<(String, String)>>,
}

impl DbPlaceDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: Arc::new(KeyedLocks::new()),
        }
    }
}

#[async_trait]
impl PlaceDirectory for DbPlaceDirectory {
    async fn find_or_create(&self, new_place: NewPlace) -> Result<place::Model, PlannerError> {
        let key = (new_place.name.clone(), new_place.city.clone());
        let _guard = self.locks.lock(&key).await;

        let existing = Place::find()
            .filter(place::Column::Name.eq(new_place.name.as_str()))
            .filter(place::Column::City.eq(new_place.city.as_str()))
            .order_by_asc(place::Column::Id)
            .one(&self.db)
            .await?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let created = place::ActiveModel {
            name: Set(new_place.name),
            description: Set(new_place.description),
            category: Set(new_place.category),
            city: Set(Some(new_place.city)),
            country: Set(Some(new_place.country)),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("Created place {} ({})", created.id, created.name);
        Ok(created)
    }
}

/// Result of materializing one draft activity.
#[derive(Debug)]
pub enum ActivityOutcome {
    Created(ActivityDetail),
    Skipped { title: String, reason: String },
}

/// Writes a draft into itinerary, day, activity and place rows, building
/// the response tree as it goes. Rows are written one by one; a failing
/// activity is skipped and the rest of its day carries on.
pub struct Materializer<'a> {
    db: &'a DatabaseConnection,
    places: &'a dyn PlaceDirectory,
    default_country: &'a str,
}

impl<'a> Materializer<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        places: &'a dyn PlaceDirectory,
        default_country: &'a str,
    ) -> Self {
        Self {
            db,
            places,
            default_country,
        }
    }

    pub async fn create_itinerary(
        &self,
        user_id: i32,
        plan_name: &str,
        selection: &TripSelection,
    ) -> Result<itinerary::Model, PlannerError> {
        let model = itinerary::ActiveModel {
            user_id: Set(user_id),
            name: Set(plan_name.trim().to_string()),
            region: Set(selection.region.clone()),
            days_count: Set(selection.days),
            theme: Set(selection.primary_theme()),
            budget: Set(selection.primary_budget()),
            intensity: Set(selection.primary_intensity()),
            transport: Set(selection.primary_transport()),
            is_ai_generated: Set(true),
            status: Set(ItineraryStatus::Pending),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        info!("Created itinerary {} for user {}", model.id, user_id);
        Ok(model)
    }

    /// Days in draft order, activities in draft order within each day.
    pub async fn materialize_days(
        &self,
        itinerary: &itinerary::Model,
        days: &[DraftDay],
        selection: &TripSelection,
    ) -> Result<Vec<DayDetail>, PlannerError> {
        let mut details = Vec::with_capacity(days.len());

        for (position, draft_day) in days.iter().enumerate() {
            let day_number = draft_day.number(position);
            let day = itinerary_day::ActiveModel {
                itinerary_id: Set(itinerary.id),
                day_number: Set(day_number),
                created_at: Set(chrono::Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(self.db)
            .await?;

            let mut activities = Vec::with_capacity(draft_day.activities.len());
            for draft_activity in &draft_day.activities {
                match self.materialize_activity(day.id, draft_activity, selection).await {
                    ActivityOutcome::Created(detail) => activities.push(detail),
                    ActivityOutcome::Skipped { title, reason } => {
                        warn!(
                            itinerary_id = itinerary.id,
                            day_number, "Skipping activity '{}': {}", title, reason
                        );
                        metrics::counter!("smarttrip_activities_skipped_total").increment(1);
                    }
                }
            }

            details.push(DayDetail {
                day_number,
                activities,
                weather_info: None,
            });
        }

        Ok(details)
    }

    pub async fn materialize_activity(
        &self,
        day_id: i32,
        draft: &DraftActivity,
        selection: &TripSelection,
    ) -> ActivityOutcome {
        let title = draft
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED_ACTIVITY)
            .to_string();

        let place = match draft.place.as_ref().and_then(|p| self.new_place(p, selection)) {
            Some(new_place) => match self.places.find_or_create(new_place).await {
                Ok(place) => Some(place),
                Err(e) => {
                    return ActivityOutcome::Skipped {
                        title,
                        reason: format!("place resolution failed: {}", e),
                    }
                }
            },
            None => None,
        };

        let image_urls = place
            .as_ref()
            .map(place::Model::photo_url_list)
            .filter(|urls| !urls.is_empty())
            .map(|urls| json!(urls));

        let inserted = activity::ActiveModel {
            itinerary_day_id: Set(Some(day_id)),
            place_id: Set(place.as_ref().map(|p| p.id)),
            title: Set(title.clone()),
            description: Set(draft.description.clone()),
            reason: Set(draft.reason.clone()),
            start_time: Set(draft.start_time.as_deref().and_then(parse_time_of_day)),
            end_time: Set(draft.end_time.as_deref().and_then(parse_time_of_day)),
            image_urls: Set(image_urls),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(self.db)
        .await;

        match inserted {
            Ok(model) => ActivityOutcome::Created(ActivityDetail::new(&model, place.as_ref())),
            Err(e) => ActivityOutcome::Skipped {
                title,
                reason: format!("insert failed: {}", e),
            },
        }
    }

    /// `None` when the draft place has no usable name.
    fn new_place(&self, draft: &DraftPlace, selection: &TripSelection) -> Option<NewPlace> {
        let name = non_blank(draft.name.as_deref())?;
        Some(NewPlace {
            name: name.to_string(),
            description: draft.description.clone(),
            city: non_blank(draft.city.as_deref())
                .unwrap_or(&selection.region)
                .to_string(),
            country: non_blank(draft.country.as_deref())
                .unwrap_or(self.default_country)
                .to_string(),
            category: selection.primary_theme(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
