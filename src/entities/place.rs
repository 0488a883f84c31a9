use super::sea_orm_active_enums::ThemeType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A physical location shared across itineraries.
///
/// Rows are matched on exact `(name, city)`; a place counts as enriched once
/// `google_place_id` is set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "places")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub category: Option<ThemeType>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,

    // Place provider fields
    pub google_place_id: Option<String>,
    pub formatted_address: Option<String>,
    pub google_maps_url: Option<String>,
    pub google_rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub price_level: Option<i32>,
    #[sea_orm(nullable)]
    pub opening_hours: Option<Json>,
    #[sea_orm(nullable)]
    pub photo_urls: Option<Json>,

    pub created_at: DateTime,
}

impl Model {
    pub fn is_enriched(&self) -> bool {
        self.google_place_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn photo_url_list(&self) -> Vec<String> {
        self.photo_urls
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::activity::Entity")]
    Activity,
    #[sea_orm(has_many = "super::place_photo::Entity")]
    PlacePhoto,
    #[sea_orm(has_many = "super::google_review::Entity")]
    GoogleReview,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl Related<super::place_photo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlacePhoto.def()
    }
}

impl Related<super::google_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GoogleReview.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
