use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub itinerary_day_id: Option<i32>,
    pub place_id: Option<i32>,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
    #[sea_orm(nullable)]
    pub image_urls: Option<Json>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::itinerary_day::Entity",
        from = "Column::ItineraryDayId",
        to = "super::itinerary_day::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    ItineraryDay,
    #[sea_orm(
        belongs_to = "super::place::Entity",
        from = "Column::PlaceId",
        to = "super::place::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Place,
}

impl Related<super::itinerary_day::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItineraryDay.def()
    }
}

impl Related<super::place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Place.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
