use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::locks::KeyedLocks;
use super::until_cancelled;
use crate::config::PlacesConfig;
use crate::entities::{activity, google_review, itinerary_day, place, place_photo, prelude::*};
use crate::error::{PlannerError, ProviderError};
use crate::providers::{PlaceProvider, PlaceReview};

/// What happened to one place during enrichment.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichOutcome {
    Enriched,
    /// Core fields were written but the review or address follow-up failed.
    Partial(String),
    AlreadyEnriched,
    NotFound,
    Failed(String),
}

impl EnrichOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Enriched => "enriched",
            Self::Partial(_) => "partial",
            Self::AlreadyEnriched => "already_enriched",
            Self::NotFound => "not_found",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub partial: usize,
    pub already_enriched: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl EnrichmentReport {
    fn record(&mut self, outcome: &EnrichOutcome) {
        match outcome {
            EnrichOutcome::Enriched => self.enriched += 1,
            EnrichOutcome::Partial(_) => self.partial += 1,
            EnrichOutcome::AlreadyEnriched => self.already_enriched += 1,
            EnrichOutcome::NotFound => self.not_found += 1,
            EnrichOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Provider trouble worth surfacing as a warning on the itinerary.
    pub fn has_warnings(&self) -> bool {
        self.failed > 0 || self.partial > 0
    }
}

/// Backfills places with place-provider data, photos and reviews.
///
/// Idempotent per place: a place with a provider id is left alone.
pub struct PlaceEnricher {
    db: DatabaseConnection,
    provider: Arc<dyn PlaceProvider>,
    locks: Arc<KeyedLocks<i32>>,
    max_photos: usize,
    photo_max_width: u32,
    max_reviews: usize,
}

impl PlaceEnricher {
    pub fn new(db: DatabaseConnection, provider: Arc<dyn PlaceProvider>, config: &PlacesConfig) -> Self {
        Self {
            db,
            provider,
            locks: Arc::new(KeyedLocks::new()),
            max_photos: config.max_photos,
            photo_max_width: config.photo_max_width,
            max_reviews: config.max_reviews,
        }
    }

    /// Distinct places of the itinerary that still lack a provider id.
    pub async fn places_to_enrich(&self, itinerary_id: i32) -> Result<Vec<place::Model>, PlannerError> {
        let day_ids: Vec<i32> = ItineraryDay::find()
            .filter(itinerary_day::Column::ItineraryId.eq(itinerary_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();
        if day_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let place_ids: Vec<i32> = Activity::find()
            .filter(activity::Column::ItineraryDayId.is_in(day_ids))
            .order_by_asc(activity::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|a| a.place_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if place_ids.is_empty() {
            return Ok(Vec::new());
        }

        let places = Place::find()
            .filter(place::Column::Id.is_in(place_ids))
            .order_by_asc(place::Column::Id)
            .all(&self.db)
            .await?;
        Ok(places.into_iter().filter(|p| !p.is_enriched()).collect())
    }

    /// Enriches every unenriched place of the itinerary. One place failing,
    /// for any reason, does not stop the others; only cancellation aborts
    /// the pass.
    pub async fn enrich_itinerary(
        &self,
        itinerary_id: i32,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentReport, PlannerError> {
        let places = self.places_to_enrich(itinerary_id).await?;
        info!("Found {} places to enrich for itinerary {}", places.len(), itinerary_id);

        let mut report = EnrichmentReport::default();
        for place in places {
            let outcome = match self.enrich_place(place.id, Some(region), cancel).await {
                Ok(outcome) => outcome,
                Err(PlannerError::Cancelled) => return Err(PlannerError::Cancelled),
                Err(e) => {
                    error!("❌ Enrichment failed for place {} ({}): {}", place.id, place.name, e);
                    EnrichOutcome::Failed(e.to_string())
                }
            };
            metrics::counter!("smarttrip_place_enrichment_total", "outcome" => outcome.kind())
                .increment(1);
            report.record(&outcome);
        }

        info!(
            itinerary_id,
            enriched = report.enriched,
            partial = report.partial,
            not_found = report.not_found,
            failed = report.failed,
            "Completed place enrichment"
        );
        Ok(report)
    }

    /// Enriches one place. Provider trouble becomes an outcome, not an error.
    pub async fn enrich_place(
        &self,
        place_id: i32,
        region: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<EnrichOutcome, PlannerError> {
        let _guard = self.locks.lock(&place_id).await;

        // Re-read under the lock; a concurrent pass may have enriched it
        let Some(place) = Place::find_by_id(place_id).one(&self.db).await? else {
            return Err(PlannerError::NotFound(format!("Place {} not found", place_id)));
        };
        if place.is_enriched() {
            info!("Place {} ({}) already enriched, skipping", place.id, place.name);
            return Ok(EnrichOutcome::AlreadyEnriched);
        }

        let hint = region
            .filter(|r| !r.trim().is_empty())
            .or(place.city.as_deref())
            .or(place.country.as_deref());
        let query = match hint {
            Some(hint) => format!("{}, {}", place.name, hint),
            None => place.name.clone(),
        };

        let candidate = match until_cancelled(cancel, self.provider.search(&query)).await? {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                warn!("No place provider match for: {}", place.name);
                return Ok(EnrichOutcome::NotFound);
            }
            Err(e) => {
                error!("❌ Place search failed for {} ({}): {}", place.id, place.name, e);
                return Ok(EnrichOutcome::Failed(e.to_string()));
            }
        };

        let photo_urls: Vec<String> = candidate
            .photo_references
            .iter()
            .take(self.max_photos)
            .filter_map(|r| self.provider.photo_url(r, self.photo_max_width))
            .collect();

        let mut active = place.clone().into_active_model();
        active.google_place_id = Set(Some(candidate.place_id.clone()));
        active.formatted_address = Set(candidate.formatted_address.clone());
        active.latitude = Set(candidate.latitude);
        active.longitude = Set(candidate.longitude);
        active.google_rating = Set(candidate.rating);
        active.user_ratings_total = Set(candidate.user_ratings_total);
        active.price_level = Set(candidate.price_level);
        active.opening_hours = Set(candidate.opening_hours.clone());
        active.google_maps_url = Set(Some(self.provider.maps_url(&candidate.place_id)));
        active.photo_urls = Set(Some(json!(photo_urls)));
        let updated = active.update(&self.db).await?;

        let inserted = self.insert_photos(updated.id, &photo_urls).await?;
        info!("Inserted {} photos for place {}", inserted, updated.id);

        let mut problems = Vec::new();

        if updated.city.is_none() || updated.country.is_none() {
            if let Err(e) = self.backfill_address(&updated, cancel).await? {
                warn!("Address lookup failed for place {}: {}", updated.id, e);
                problems.push(format!("address: {}", e));
            }
        }

        match until_cancelled(cancel, self.provider.reviews(&candidate.place_id)).await? {
            Ok(reviews) if reviews.is_empty() => {
                warn!("No reviews found for place {} ({})", updated.id, updated.name);
            }
            Ok(reviews) => {
                self.insert_reviews(updated.id, &reviews).await?;
            }
            Err(e) => {
                warn!("Review fetch failed for place {}: {}", updated.id, e);
                problems.push(format!("reviews: {}", e));
            }
        }

        info!("✅ Enriched place {} ({})", updated.id, updated.name);
        if problems.is_empty() {
            Ok(EnrichOutcome::Enriched)
        } else {
            Ok(EnrichOutcome::Partial(problems.join("; ")))
        }
    }

    /// Fills missing city/country from the provider's address components.
    /// The inner result carries provider failures.
    async fn backfill_address(
        &self,
        place: &place::Model,
        cancel: &CancellationToken,
    ) -> Result<Result<(), ProviderError>, PlannerError> {
        let Some(place_id) = place.google_place_id.as_deref() else {
            return Ok(Ok(()));
        };
        let location = match until_cancelled(cancel, self.provider.address(place_id)).await? {
            Ok(Some(location)) => location,
            Ok(None) => return Ok(Ok(())),
            Err(e) => return Ok(Err(e)),
        };

        let mut active = place.clone().into_active_model();
        let mut changed = false;
        if place.city.is_none() {
            if let Some(city) = location.city {
                active.city = Set(Some(city));
                changed = true;
            }
        }
        if place.country.is_none() {
            if let Some(country) = location.country {
                active.country = Set(Some(country));
                changed = true;
            }
        }
        if place.formatted_address.is_none() {
            if let Some(address) = location.formatted_address {
                active.formatted_address = Set(Some(address));
                changed = true;
            }
        }
        if changed {
            active.update(&self.db).await?;
        }
        Ok(Ok(()))
    }

    async fn insert_photos(&self, place_id: i32, urls: &[String]) -> Result<usize, PlannerError> {
        let mut inserted = 0;
        for url in urls {
            let exists = PlacePhoto::find()
                .filter(place_photo::Column::PlaceId.eq(place_id))
                .filter(place_photo::Column::ImageUrl.eq(url.as_str()))
                .count(&self.db)
                .await?
                > 0;
            if exists {
                continue;
            }
            place_photo::ActiveModel {
                place_id: Set(place_id),
                image_url: Set(url.clone()),
                created_at: Set(chrono::Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn insert_reviews(&self, place_id: i32, reviews: &[PlaceReview]) -> Result<usize, PlannerError> {
        let mut inserted = 0;
        for review in reviews.iter().take(self.max_reviews) {
            let exists = GoogleReview::find()
                .filter(
                    Condition::all()
                        .add(google_review::Column::PlaceId.eq(place_id))
                        .add(google_review::Column::AuthorName.eq(review.author_name.as_str()))
                        .add(google_review::Column::Comment.eq(review.text.as_str())),
                )
                .count(&self.db)
                .await?
                > 0;
            if exists {
                continue;
            }
            google_review::ActiveModel {
                place_id: Set(place_id),
                author_name: Set(review.author_name.clone()),
                comment: Set(review.text.clone()),
                rating: Set(review.rating),
                profile_photo_url: Set(review.profile_photo_url.clone()),
                review_time: Set(review
                    .time
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                    .map(|t| t.naive_utc())),
                created_at: Set(chrono::Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
            inserted += 1;
        }
        info!("Inserted {} reviews for place {}", inserted, place_id);
        Ok(inserted)
    }

    /// Catch-up pass: fetch reviews for enriched places that have none yet.
    pub async fn backfill_reviews(
        &self,
        cancel: &CancellationToken,
    ) -> Result<super::ReviewBackfillSummary, PlannerError> {
        let places: Vec<place::Model> = Place::find()
            .filter(place::Column::GooglePlaceId.is_not_null())
            .filter(place::Column::GooglePlaceId.ne(""))
            .order_by_asc(place::Column::Id)
            .all(&self.db)
            .await?;

        let mut summary = super::ReviewBackfillSummary {
            total_places: places.len(),
            ..Default::default()
        };

        for place in places {
            let _guard = self.locks.lock(&place.id).await;
            let Some(google_place_id) = place.google_place_id.as_deref() else {
                continue;
            };

            let existing = GoogleReview::find()
                .filter(google_review::Column::PlaceId.eq(place.id))
                .count(&self.db)
                .await?;
            if existing > 0 {
                info!("Place {} already has {} reviews, skipping", place.id, existing);
                summary.success_count += 1;
                continue;
            }

            match until_cancelled(cancel, self.provider.reviews(google_place_id)).await? {
                Ok(reviews) if !reviews.is_empty() => {
                    self.insert_reviews(place.id, &reviews).await?;
                    summary.success_count += 1;
                }
                Ok(_) => {
                    warn!("No reviews found for place {} ({})", place.id, place.name);
                    summary.fail_count += 1;
                }
                Err(e) => {
                    error!("❌ Review fetch failed for place {}: {}", place.id, e);
                    summary.fail_count += 1;
                }
            }
        }

        Ok(summary)
    }
}
