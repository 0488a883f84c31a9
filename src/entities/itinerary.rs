use super::sea_orm_active_enums::{
    BudgetLevel, IntensityLevel, ItineraryStatus, ThemeType, TransportMode,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "itineraries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub region: String,
    pub days_count: i32,
    // Primary (first selected) value of each trip dimension
    pub theme: Option<ThemeType>,
    pub budget: Option<BudgetLevel>,
    pub intensity: Option<IntensityLevel>,
    pub transport: Option<TransportMode>,
    pub is_ai_generated: bool,
    pub status: ItineraryStatus,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::itinerary_day::Entity")]
    ItineraryDay,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::itinerary_day::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItineraryDay.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
