//! Browsing stored places and resolving free-text destinations.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::entities::place;
use crate::entities::prelude::*;
use crate::entities::sea_orm_active_enums::{ThemeType, TripOption};
use crate::error::PlannerError;
use crate::planner::until_cancelled;
use crate::providers::{LocationInfo, PlaceProvider};

pub const DEFAULT_EXPLORE_LIMIT: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorePlace {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<ThemeType>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub google_rating: Option<f64>,
    pub location: String,
}

impl From<place::Model> for ExplorePlace {
    fn from(place: place::Model) -> Self {
        let photos = place.photo_url_list();
        let location = match (place.city.as_deref(), place.country.as_deref()) {
            (Some(city), Some(country)) if !city.is_empty() && !country.is_empty() => {
                format!("{}, {}", city, country)
            }
            _ => place
                .formatted_address
                .clone()
                .unwrap_or_else(|| "Unknown location".to_string()),
        };
        Self {
            id: place.id,
            name: place.name,
            description: place.description,
            category: place.category,
            city: place.city,
            country: place.country,
            image_urls: (!photos.is_empty()).then_some(photos),
            google_rating: place.google_rating,
            location,
        }
    }
}

/// Case-insensitive theme name. `None` for blank, `all`, or unknown names,
/// which all mean "no filter".
pub fn parse_category(raw: Option<&str>) -> Option<ThemeType> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    if raw.eq_ignore_ascii_case("all") {
        return None;
    }
    let theme = ThemeType::VARIANTS
        .iter()
        .copied()
        .find(|t| t.label().eq_ignore_ascii_case(raw));
    if theme.is_none() {
        warn!("Unknown category: {}, returning all places", raw);
    }
    theme
}

/// Up to `limit` stored places in random order, optionally of one theme.
pub async fn explore(
    db: &DatabaseConnection,
    category: Option<&str>,
    limit: u64,
) -> Result<Vec<ExplorePlace>, PlannerError> {
    let mut query = Place::find();
    if let Some(theme) = parse_category(category) {
        query = query.filter(place::Column::Category.eq(theme));
    }

    let places = query
        .order_by(Expr::cust("RANDOM()"), Order::Asc)
        .limit(limit)
        .all(db)
        .await?;
    info!(
        "Returning {} places for category {}",
        places.len(),
        category.unwrap_or("all")
    );
    Ok(places.into_iter().map(ExplorePlace::from).collect())
}

/// Country and city of a free-text destination: text search, then an
/// address-details lookup on the best match.
pub async fn location_info(
    provider: &dyn PlaceProvider,
    destination: &str,
    cancel: &CancellationToken,
) -> Result<LocationInfo, PlannerError> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(PlannerError::Validation("Destination is required".to_string()));
    }
    info!("Getting location info for destination: {}", destination);

    let candidate = until_cancelled(cancel, provider.search(destination))
        .await??
        .filter(|c| !c.place_id.is_empty())
        .ok_or_else(|| PlannerError::NotFound("Location not found".to_string()))?;

    let location = until_cancelled(cancel, provider.address(&candidate.place_id))
        .await??
        .ok_or_else(|| {
            PlannerError::NotFound("Could not extract location information".to_string())
        })?;
    info!(
        "Location info for {}: country {:?}, city {:?}",
        destination, location.country, location.city
    );
    Ok(location)
}
