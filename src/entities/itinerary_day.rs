use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "itinerary_days")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub itinerary_id: i32,
    pub day_number: i32,
    #[sea_orm(nullable)]
    pub weather_info: Option<Json>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::itinerary::Entity",
        from = "Column::ItineraryId",
        to = "super::itinerary::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Itinerary,
    #[sea_orm(has_many = "super::activity::Entity")]
    Activity,
}

impl Related<super::itinerary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Itinerary.def()
    }
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
