use super::sea_orm_active_enums::GenerationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "generation_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: i32,
    pub itinerary_id: Option<i32>,
    // Normalized trip parameters as submitted
    pub request_payload: Json,
    // Draft on success, `{ "error": .. }` on failure
    pub response_payload: Option<Json>,
    pub status: GenerationStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
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
    #[sea_orm(
        belongs_to = "super::itinerary::Entity",
        from = "Column::ItineraryId",
        to = "super::itinerary::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Itinerary,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::itinerary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Itinerary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
