use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::draft::{parse_draft, DraftPlan};
use super::dto::{
    ActivityDetail, DayDetail, ItinerarySummary, ReviewBackfillSummary, RoutePlanResponse,
};
use super::enrichment::PlaceEnricher;
use super::materializer::{DbPlaceDirectory, Materializer, PlaceDirectory};
use super::prompt::build_route_plan_prompt;
use super::request::{RoutePlanRequest, TripSelection};
use super::until_cancelled;
use super::weather::WeatherAttacher;
use crate::config::{PlacesConfig, PlannerConfig};
use crate::entities::sea_orm_active_enums::{GenerationStatus, ItineraryStatus};
use crate::entities::{activity, generation_request, itinerary, itinerary_day, place, prelude::*};
use crate::error::PlannerError;
use crate::providers::{GenerationProvider, PlaceProvider, WeatherProvider};

/// Runs the trip-planning pipeline and serves the itinerary read paths.
pub struct RoutePlanner {
    db: DatabaseConnection,
    generator: Arc<dyn GenerationProvider>,
    places: Arc<dyn PlaceDirectory>,
    enricher: PlaceEnricher,
    weather: WeatherAttacher,
    config: PlannerConfig,
}

impl RoutePlanner {
    pub fn new(
        db: DatabaseConnection,
        generator: Arc<dyn GenerationProvider>,
        place_provider: Arc<dyn PlaceProvider>,
        weather_provider: Arc<dyn WeatherProvider>,
        places_config: &PlacesConfig,
        config: PlannerConfig,
    ) -> Self {
        Self {
            places: Arc::new(DbPlaceDirectory::new(db.clone())),
            enricher: PlaceEnricher::new(db.clone(), place_provider, places_config),
            weather: WeatherAttacher::new(db.clone(), weather_provider),
            db,
            generator,
            config,
        }
    }

    /// Replaces the place find-or-create strategy.
    pub fn with_place_directory(mut self, places: Arc<dyn PlaceDirectory>) -> Self {
        self.places = places;
        self
    }

    /// Generates, materializes and enriches a new itinerary for `user_id`.
    ///
    /// Fails before any itinerary exists when generation fails; enrichment
    /// and weather problems only downgrade the final status.
    pub async fn create_route_plan(
        &self,
        user_id: i32,
        request: RoutePlanRequest,
        cancel: CancellationToken,
    ) -> Result<RoutePlanResponse, PlannerError> {
        let span = tracing::info_span!(
            "create_route_plan",
            "otel.name" = "create_route_plan",
            user_id = user_id
        );
        let start_time = Instant::now();
        let result = self
            .create_route_plan_impl(user_id, request, &cancel)
            .instrument(span)
            .await;

        let duration = start_time.elapsed().as_secs_f64();
        let success = if result.is_ok() { "true" } else { "false" };
        metrics::histogram!("smarttrip_route_plan_duration_seconds", "success" => success)
            .record(duration);
        result
    }

    async fn create_route_plan_impl(
        &self,
        user_id: i32,
        request: RoutePlanRequest,
        cancel: &CancellationToken,
    ) -> Result<RoutePlanResponse, PlannerError> {
        let selection = TripSelection::try_from(request)?;

        if User::find_by_id(user_id).one(&self.db).await?.is_none() {
            return Err(PlannerError::NotFound("User not found".to_string()));
        }

        let now = chrono::Utc::now().naive_utc();
        let audit = generation_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            request_payload: Set(selection.snapshot()),
            status: Set(GenerationStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        info!(
            "Recorded generation request {} for {} ({} days)",
            audit.id, selection.region, selection.days
        );

        let draft = match self
            .generate_draft(&selection, cancel)
            .instrument(tracing::info_span!("generate_itinerary"))
            .await
        {
            Ok(draft) => draft,
            Err(e) => {
                error!("❌ Generation failed for request {}: {}", audit.id, e);
                metrics::counter!("smarttrip_generation_failures_total", "kind" => e.kind())
                    .increment(1);
                self.fail_request(audit, &e).await;
                return Err(e);
            }
        };

        let materializer =
            Materializer::new(&self.db, self.places.as_ref(), &self.config.default_country);
        let itinerary = match materializer
            .create_itinerary(user_id, &draft.plan_name, &selection)
            .await
        {
            Ok(itinerary) => itinerary,
            Err(e) => {
                error!("❌ Could not create itinerary for request {}: {}", audit.id, e);
                self.fail_request(audit, &e).await;
                return Err(e);
            }
        };

        let materialized = materializer
            .materialize_days(&itinerary, &draft.days, &selection)
            .instrument(tracing::info_span!("materialize_itinerary", itinerary_id = itinerary.id))
            .await;
        let days = match materialized {
            Ok(days) => days,
            Err(e) => {
                error!("❌ Materialization failed for itinerary {}: {}", itinerary.id, e);
                self.abandon_itinerary(&itinerary).await;
                self.fail_request(audit, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = self.complete_request(&audit, &draft, itinerary.id).await {
            error!("❌ Could not complete generation request {}: {}", audit.id, e);
            self.abandon_itinerary(&itinerary).await;
            self.fail_request(audit, &e).await;
            return Err(e);
        }
        metrics::counter!("smarttrip_itineraries_created_total").increment(1);

        let itinerary = match self
            .set_itinerary_status(&itinerary, ItineraryStatus::Processing)
            .await
        {
            Ok(itinerary) => itinerary,
            Err(e) => {
                error!("❌ Could not start enrichment of itinerary {}: {}", itinerary.id, e);
                self.abandon_itinerary(&itinerary).await;
                return Err(e);
            }
        };

        let enrichment = self.enrich_and_attach_weather(&itinerary, cancel).await;
        let final_status = match enrichment {
            Ok(false) => ItineraryStatus::Completed,
            Ok(true) => ItineraryStatus::CompletedWithWarnings,
            Err(PlannerError::Cancelled) => {
                warn!("Request cancelled while enriching itinerary {}", itinerary.id);
                if let Err(e) = self
                    .set_itinerary_status(&itinerary, ItineraryStatus::CompletedWithWarnings)
                    .await
                {
                    error!("Could not close cancelled itinerary {}: {}", itinerary.id, e);
                    self.abandon_itinerary(&itinerary).await;
                }
                return Err(PlannerError::Cancelled);
            }
            Err(e) => {
                error!("❌ Enrichment failed for itinerary {}: {}", itinerary.id, e);
                ItineraryStatus::CompletedWithWarnings
            }
        };
        let itinerary = match self.set_itinerary_status(&itinerary, final_status).await {
            Ok(itinerary) => itinerary,
            Err(e) => {
                error!("❌ Could not finish itinerary {}: {}", itinerary.id, e);
                self.abandon_itinerary(&itinerary).await;
                return Err(e);
            }
        };
        info!(
            "✅ Route plan {} ready for user {} ({})",
            itinerary.id,
            user_id,
            itinerary.status.as_str()
        );

        Ok(RoutePlanResponse {
            itinerary_id: itinerary.id,
            plan_name: itinerary.name,
            region: itinerary.region,
            days_count: itinerary.days_count,
            status: itinerary.status,
            days,
        })
    }

    async fn generate_draft(
        &self,
        selection: &TripSelection,
        cancel: &CancellationToken,
    ) -> Result<DraftPlan, PlannerError> {
        let prompt = build_route_plan_prompt(selection, &self.config.default_country);
        info!("Calling {} for {}", self.generator.model_name(), selection.region);

        let reply = until_cancelled(cancel, self.generator.generate(&prompt)).await??;
        let draft = parse_draft(&reply, self.config.json_extraction)?;
        info!("Parsed draft '{}' with {} days", draft.plan_name, draft.days.len());
        Ok(draft)
    }

    /// `Ok(true)` when some place or day could not be enriched. A stage that
    /// breaks as a whole counts as a warning and does not skip the other
    /// stage; only cancellation is returned as an error.
    async fn enrich_and_attach_weather(
        &self,
        itinerary: &itinerary::Model,
        cancel: &CancellationToken,
    ) -> Result<bool, PlannerError> {
        let places = self
            .enricher
            .enrich_itinerary(itinerary.id, &itinerary.region, cancel)
            .instrument(tracing::info_span!("enrich_places", itinerary_id = itinerary.id))
            .await;
        let places_warn = match places {
            Ok(report) => report.has_warnings(),
            Err(PlannerError::Cancelled) => return Err(PlannerError::Cancelled),
            Err(e) => {
                error!("❌ Place enrichment failed for itinerary {}: {}", itinerary.id, e);
                true
            }
        };

        let weather = self
            .weather
            .attach_itinerary(itinerary.id, cancel)
            .instrument(tracing::info_span!("attach_weather", itinerary_id = itinerary.id))
            .await;
        let weather_warn = match weather {
            Ok(report) => {
                if report.failed > 0 {
                    warn!(
                        "Weather missing for {} of itinerary {}'s days",
                        report.failed, itinerary.id
                    );
                }
                report.has_warnings()
            }
            Err(PlannerError::Cancelled) => return Err(PlannerError::Cancelled),
            Err(e) => {
                error!("❌ Weather attachment failed for itinerary {}: {}", itinerary.id, e);
                true
            }
        };

        Ok(places_warn || weather_warn)
    }

    async fn set_itinerary_status(
        &self,
        itinerary: &itinerary::Model,
        next: ItineraryStatus,
    ) -> Result<itinerary::Model, PlannerError> {
        let status = itinerary.status.transition(next)?;
        let mut active = itinerary.clone().into_active_model();
        active.status = Set(status);
        Ok(active.update(&self.db).await?)
    }

    /// Best effort: marks an itinerary whose pipeline broke as failed.
    async fn abandon_itinerary(&self, itinerary: &itinerary::Model) {
        if let Err(e) = self
            .set_itinerary_status(itinerary, ItineraryStatus::Failed)
            .await
        {
            error!("Could not mark itinerary {} failed: {}", itinerary.id, e);
        }
    }

    async fn complete_request(
        &self,
        audit: &generation_request::Model,
        draft: &DraftPlan,
        itinerary_id: i32,
    ) -> Result<(), PlannerError> {
        let status = audit.status.transition(GenerationStatus::Completed)?;
        let mut active = audit.clone().into_active_model();
        active.status = Set(status);
        active.response_payload = Set(Some(draft.to_payload()));
        active.itinerary_id = Set(Some(itinerary_id));
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Best effort: the caller already has an error to return.
    async fn fail_request(&self, audit: generation_request::Model, err: &PlannerError) {
        let id = audit.id;
        let status = match audit.status.transition(GenerationStatus::Failed) {
            Ok(status) => status,
            Err(e) => {
                error!("Generation request {}: {}", id, e);
                return;
            }
        };
        let mut active = audit.into_active_model();
        active.status = Set(status);
        active.response_payload = Set(Some(json!({ "error": err.to_string() })));
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        if let Err(e) = active.update(&self.db).await {
            error!("Could not mark generation request {} failed: {}", id, e);
        }
    }

    /// One itinerary of `user_id`, with days by day number and activities
    /// by start time (untimed last).
    pub async fn get_route_plan(
        &self,
        user_id: i32,
        itinerary_id: i32,
    ) -> Result<RoutePlanResponse, PlannerError> {
        let itinerary = Itinerary::find_by_id(itinerary_id)
            .filter(itinerary::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| PlannerError::NotFound("Route plan not found".to_string()))?;

        let days = ItineraryDay::find()
            .filter(itinerary_day::Column::ItineraryId.eq(itinerary.id))
            .order_by_asc(itinerary_day::Column::DayNumber)
            .all(&self.db)
            .await?;

        let day_ids: Vec<i32> = days.iter().map(|d| d.id).collect();
        let activities = if day_ids.is_empty() {
            Vec::new()
        } else {
            Activity::find()
                .filter(activity::Column::ItineraryDayId.is_in(day_ids))
                .order_by_asc(activity::Column::Id)
                .all(&self.db)
                .await?
        };

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

        let mut by_day: HashMap<i32, Vec<activity::Model>> = HashMap::new();
        for activity in activities {
            if let Some(day_id) = activity.itinerary_day_id {
                by_day.entry(day_id).or_default().push(activity);
            }
        }

        let days = days
            .into_iter()
            .map(|day| {
                let mut activities = by_day.remove(&day.id).unwrap_or_default();
                // None sorts before Some, so order on (is_none, time)
                activities.sort_by_key(|a| (a.start_time.is_none(), a.start_time, a.id));
                DayDetail {
                    day_number: day.day_number,
                    activities: activities
                        .iter()
                        .map(|a| ActivityDetail::new(a, a.place_id.and_then(|id| places.get(&id))))
                        .collect(),
                    weather_info: day.weather_info,
                }
            })
            .collect();

        Ok(RoutePlanResponse {
            itinerary_id: itinerary.id,
            plan_name: itinerary.name,
            region: itinerary.region,
            days_count: itinerary.days_count,
            status: itinerary.status,
            days,
        })
    }

    /// All itineraries of `user_id`, newest first.
    pub async fn list_route_plans(&self, user_id: i32) -> Result<Vec<ItinerarySummary>, PlannerError> {
        let itineraries = Itinerary::find()
            .filter(itinerary::Column::UserId.eq(user_id))
            .order_by_desc(itinerary::Column::CreatedAt)
            .order_by_desc(itinerary::Column::Id)
            .all(&self.db)
            .await?;
        Ok(itineraries.into_iter().map(ItinerarySummary::from).collect())
    }

    pub async fn backfill_reviews(
        &self,
        cancel: CancellationToken,
    ) -> Result<ReviewBackfillSummary, PlannerError> {
        self.enricher
            .backfill_reviews(&cancel)
            .instrument(tracing::info_span!("backfill_reviews"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::ThemeType;
    use crate::planner::materializer::NewPlace;
    use crate::planner::testing::{
        reject_updates, seed_user, seed_user_with_email, setup_db, FakeGenerator, FakePlaces,
        FakeWeather,
    };
    use sea_orm::PaginatorTrait;
    use std::sync::atomic::Ordering;

    const CAPPADOCIA: &str = r#"Here is your plan:
```json
{
  "PlanName": "Kapadokya Rüyası",
  "Days": [
    {
      "DayNumber": 1,
      "Activities": [
        {
          "Title": "Balon turu",
          "Description": "Gün doğumunda balon",
          "Reason": "Bölgenin simgesi",
          "StartTime": "06:00",
          "EndTime": "08:00",
          "Place": { "Name": "Göreme", "City": "Nevşehir", "Country": "Turkey" }
        },
        {
          "Title": "Kale gezisi",
          "StartTime": "10:00",
          "EndTime": "11:30",
          "Place": { "Name": "Uçhisar", "City": "Nevşehir" }
        }
      ]
    },
    {
      "DayNumber": 2,
      "Activities": [
        {
          "Title": "Çömlek atölyesi",
          "StartTime": "14:00",
          "EndTime": "16:00",
          "Place": { "Name": "Avanos", "City": "Nevşehir" }
        },
        {
          "Title": "Gün batımı",
          "StartTime": "18:30",
          "EndTime": "19:30",
          "Place": { "Name": "Göreme", "City": "Nevşehir" }
        }
      ]
    }
  ]
}
```"#;

    struct Harness {
        db: DatabaseConnection,
        generator: Arc<FakeGenerator>,
        weather: Arc<FakeWeather>,
        planner: RoutePlanner,
    }

    async fn harness(generator: FakeGenerator, places: FakePlaces) -> Harness {
        let db = setup_db().await;
        let generator = Arc::new(generator);
        let weather = Arc::new(FakeWeather::default());
        let planner = RoutePlanner::new(
            db.clone(),
            generator.clone(),
            Arc::new(places),
            weather.clone(),
            &PlacesConfig::default(),
            PlannerConfig::default(),
        );
        Harness {
            db,
            generator,
            weather,
            planner,
        }
    }

    fn request() -> RoutePlanRequest {
        RoutePlanRequest {
            region: "Kapadokya".to_string(),
            days: 2,
            theme: Some(0),
            budget: Some(1),
            intensity: Some(0),
            transport: Some(0),
            ..Default::default()
        }
    }

    async fn only_request(db: &DatabaseConnection) -> generation_request::Model {
        let mut requests = GenerationRequest::find().all(db).await.unwrap();
        assert_eq!(requests.len(), 1);
        requests.remove(0)
    }

    #[tokio::test]
    async fn creates_linked_itinerary() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::with_reviews()).await;
        let user = seed_user(&h.db).await;

        let response = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.plan_name, "Kapadokya Rüyası");
        assert_eq!(response.days_count, 2);
        assert_eq!(response.status, ItineraryStatus::Completed);
        assert_eq!(response.days.len(), 2);
        assert_eq!(response.days[0].activities.len(), 2);
        assert_eq!(response.days[0].activities[0].start_time, "06:00");

        let stored = Itinerary::find_by_id(response.itinerary_id)
            .one(&h.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.days_count, 2);
        assert_eq!(stored.theme, Some(ThemeType::Nature));
        assert_eq!(stored.status, ItineraryStatus::Completed);

        let audit = only_request(&h.db).await;
        assert_eq!(audit.status, GenerationStatus::Completed);
        assert_eq!(audit.itinerary_id, Some(response.itinerary_id));
        assert_eq!(audit.request_payload["themes"], json!(["nature"]));
        let payload = audit.response_payload.unwrap();
        assert_eq!(payload["PlanName"], json!("Kapadokya Rüyası"));
        assert_eq!(payload["Days"][1]["DayNumber"], json!(2));

        // Göreme appears on both days but is stored once
        assert_eq!(Place::find().count(&h.db).await.unwrap(), 3);
        assert_eq!(h.weather.calls.lock().unwrap().len(), 2);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_itinerary() {
        let h = harness(FakeGenerator::failing(), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;

        let err = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation_provider");

        let audit = only_request(&h.db).await;
        assert_eq!(audit.status, GenerationStatus::Failed);
        assert_eq!(audit.itinerary_id, None);
        let payload = audit.response_payload.unwrap();
        assert!(payload["error"].as_str().unwrap().contains("model overloaded"));
        assert_eq!(Itinerary::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reply_without_braces_fails_request() {
        let h = harness(
            FakeGenerator::replying("Sorry, I cannot plan that trip."),
            FakePlaces::default(),
        )
        .await;
        let user = seed_user(&h.db).await;

        let err = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation_format");
        assert_eq!(only_request(&h.db).await.status, GenerationStatus::Failed);
        assert_eq!(Itinerary::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_day_numbers_fail_before_materializing() {
        let reply = r#"{"PlanName":"X","Days":[{"DayNumber":1,"Activities":[]},{"DayNumber":1,"Activities":[]}]}"#;
        let h = harness(FakeGenerator::replying(reply), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;

        let err = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation_format");
        assert_eq!(ItineraryDay::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_place_search_gives_warning_status() {
        let places = FakePlaces {
            failing: vec!["Uçhisar".to_string()],
            ..Default::default()
        };
        let h = harness(FakeGenerator::replying(CAPPADOCIA), places).await;
        let user = seed_user(&h.db).await;

        let response = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, ItineraryStatus::CompletedWithWarnings);

        let enriched: Vec<String> = Place::find()
            .order_by_asc(place::Column::Id)
            .all(&h.db)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_enriched())
            .map(|p| p.name)
            .collect();
        assert_eq!(enriched, vec!["Göreme".to_string(), "Avanos".to_string()]);
        assert_eq!(only_request(&h.db).await.status, GenerationStatus::Completed);
    }

    #[tokio::test]
    async fn database_error_on_one_place_spares_the_rest() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;
        reject_updates(&h.db, "places", "NEW.name = 'Uçhisar'").await;

        let response = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, ItineraryStatus::CompletedWithWarnings);

        let enriched: Vec<String> = Place::find()
            .order_by_asc(place::Column::Id)
            .all(&h.db)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_enriched())
            .map(|p| p.name)
            .collect();
        assert_eq!(enriched, vec!["Göreme".to_string(), "Avanos".to_string()]);

        // Weather still runs after the broken place
        assert_eq!(h.weather.calls.lock().unwrap().len(), 2);
        let fetched = h
            .planner
            .get_route_plan(user.id, response.itinerary_id)
            .await
            .unwrap();
        assert!(fetched.days.iter().all(|d| d.weather_info.is_some()));
    }

    #[tokio::test]
    async fn request_completion_failure_fails_request_and_itinerary() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;
        reject_updates(&h.db, "generation_requests", "NEW.status = 'completed'").await;

        let err = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "database");

        let audit = only_request(&h.db).await;
        assert_eq!(audit.status, GenerationStatus::Failed);
        assert!(audit.response_payload.unwrap()["error"].is_string());

        let itinerary = Itinerary::find().one(&h.db).await.unwrap().unwrap();
        assert_eq!(itinerary.status, ItineraryStatus::Failed);
        assert!(h.weather.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn processing_transition_failure_fails_itinerary() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;
        reject_updates(&h.db, "itineraries", "NEW.status = 'processing'").await;

        let err = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "database");

        let itinerary = Itinerary::find().one(&h.db).await.unwrap().unwrap();
        assert_eq!(itinerary.status, ItineraryStatus::Failed);
        // Generation itself succeeded and stays recorded as such
        assert_eq!(only_request(&h.db).await.status, GenerationStatus::Completed);
    }

    struct RejectingDirectory {
        inner: DbPlaceDirectory,
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl PlaceDirectory for RejectingDirectory {
        async fn find_or_create(
            &self,
            new_place: NewPlace,
        ) -> Result<place::Model, PlannerError> {
            if new_place.name == self.name {
                return Err(PlannerError::Validation("rejected".to_string()));
            }
            self.inner.find_or_create(new_place).await
        }
    }

    #[tokio::test]
    async fn skipped_activity_does_not_fail_request() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;
        let planner = h.planner.with_place_directory(Arc::new(RejectingDirectory {
            inner: DbPlaceDirectory::new(h.db.clone()),
            name: "Uçhisar",
        }));

        let response = planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();
        let titles: Vec<&str> = response
            .days
            .iter()
            .flat_map(|d| d.activities.iter().map(|a| a.title.as_str()))
            .collect();
        assert_eq!(titles, vec!["Balon turu", "Çömlek atölyesi", "Gün batımı"]);
        assert_eq!(response.status, ItineraryStatus::Completed);
        assert_eq!(Activity::find().count(&h.db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_persistence() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;

        let err = h
            .planner
            .create_route_plan(
                user.id,
                RoutePlanRequest {
                    region: "  ".to_string(),
                    days: 2,
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));

        let err = h
            .planner
            .create_route_plan(
                user.id,
                RoutePlanRequest {
                    theme: Some(9),
                    ..request()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));

        assert_eq!(GenerationRequest::find().count(&h.db).await.unwrap(), 0);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;

        let err = h
            .planner
            .create_route_plan(999, request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
        assert_eq!(GenerationRequest::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancelled_request_is_audited_as_failed() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h
            .planner
            .create_route_plan(user.id, request(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Cancelled));

        let audit = only_request(&h.db).await;
        assert_eq!(audit.status, GenerationStatus::Failed);
        assert_eq!(
            audit.response_payload.unwrap()["error"],
            json!("request was cancelled")
        );
        assert_eq!(Itinerary::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_path_sorts_and_includes_weather() {
        let reply = r#"{"PlanName":"Sıralı","Days":[
            {"DayNumber":2,"Activities":[{"Title":"Öğle","StartTime":"12:00"}]},
            {"DayNumber":1,"Activities":[
                {"Title":"Serbest"},
                {"Title":"Akşam","StartTime":"19:00","Place":{"Name":"Ürgüp"}},
                {"Title":"Sabah","StartTime":"08:15","Place":{"Name":"Ortahisar"}}
            ]}
        ]}"#;
        let h = harness(FakeGenerator::replying(reply), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;
        let created = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();

        // Creation keeps the draft order
        assert_eq!(created.days[0].day_number, 2);

        let fetched = h
            .planner
            .get_route_plan(user.id, created.itinerary_id)
            .await
            .unwrap();
        assert_eq!(fetched.days[0].day_number, 1);
        let titles: Vec<&str> = fetched.days[0]
            .activities
            .iter()
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Sabah", "Akşam", "Serbest"]);
        assert_eq!(fetched.days[0].activities[2].start_time, "");

        let weather = fetched.days[0].weather_info.as_ref().unwrap();
        assert_eq!(weather["source"], json!("weatherapi_forecast"));
        // Day 2 has no place, so no coordinates and no forecast
        assert!(fetched.days[1].weather_info.is_none());

        let place = fetched.days[0].activities[0].place.as_ref().unwrap();
        assert_eq!(place.city.as_deref(), Some("Kapadokya"));
        assert!(place.latitude.is_some());
        assert_eq!(place.image_urls.as_ref().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn other_users_itineraries_are_hidden() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let owner = seed_user(&h.db).await;
        let stranger = seed_user_with_email(&h.db, "stranger@example.com").await;

        let created = h
            .planner
            .create_route_plan(owner.id, request(), CancellationToken::new())
            .await
            .unwrap();

        let err = h
            .planner
            .get_route_plan(stranger.id, created.itinerary_id)
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
        assert!(h.planner.list_route_plans(stranger.id).await.unwrap().is_empty());

        let err = h.planner.get_route_plan(owner.id, 4242).await.unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let h = harness(FakeGenerator::replying(CAPPADOCIA), FakePlaces::default()).await;
        let user = seed_user(&h.db).await;

        let first = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();
        let second = h
            .planner
            .create_route_plan(user.id, request(), CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<i32> = h
            .planner
            .list_route_plans(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.itinerary_id, first.itinerary_id]);
        // Places are shared across itineraries by (name, city)
        assert_eq!(Place::find().count(&h.db).await.unwrap(), 3);
    }
}
