use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Iterable, PaginatorTrait, QueryFilter};

use crate::entities::sea_orm_active_enums::ItineraryStatus;
use crate::entities::{itinerary, place, prelude::*};

/// Seeds the totals gauges from the database at startup.
pub async fn init_metrics(db: &DatabaseConnection) {
    let user_count = User::find().count(db).await.unwrap_or(0);
    metrics::gauge!("smarttrip_users_total").set(user_count as f64);

    let itinerary_count = Itinerary::find().count(db).await.unwrap_or(0);
    metrics::gauge!("smarttrip_itineraries_total").set(itinerary_count as f64);

    let place_count = Place::find().count(db).await.unwrap_or(0);
    metrics::gauge!("smarttrip_places_total").set(place_count as f64);

    let enriched_count = Place::find()
        .filter(place::Column::GooglePlaceId.is_not_null())
        .count(db)
        .await
        .unwrap_or(0);
    metrics::gauge!("smarttrip_places_enriched_total").set(enriched_count as f64);

    for status in ItineraryStatus::iter() {
        let count = Itinerary::find()
            .filter(itinerary::Column::Status.eq(status))
            .count(db)
            .await
            .unwrap_or(0);
        metrics::gauge!("smarttrip_itineraries_by_status", "status" => status.as_str())
            .set(count as f64);
    }

    tracing::info!(
        "Initialized metrics: Users={}, Itineraries={}, Places={} ({} enriched)",
        user_count,
        itinerary_count,
        place_count,
        enriched_count
    );
}

/// Keeps the startup gauges moving after a successful create.
pub fn record_itinerary_created(status: ItineraryStatus) {
    metrics::gauge!("smarttrip_itineraries_total").increment(1.0);
    metrics::gauge!("smarttrip_itineraries_by_status", "status" => status.as_str())
        .increment(1.0);
}

pub fn record_favorite_change(target: &'static str, action: &'static str) {
    metrics::counter!("smarttrip_favorite_changes_total", "target" => target, "action" => action)
        .increment(1);
}

pub fn record_review_backfill(success: usize, failed: usize) {
    metrics::counter!("smarttrip_review_backfill_places_total", "outcome" => "success")
        .increment(success as u64);
    metrics::counter!("smarttrip_review_backfill_places_total", "outcome" => "failed")
        .increment(failed as u64);
}
