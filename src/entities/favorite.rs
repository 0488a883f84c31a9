use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user's bookmark of exactly one place or one itinerary.
///
/// The `favorites_single_target` check constraint enforces the same rule at
/// the database level.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "favorites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub place_id: Option<i32>,
    pub itinerary_id: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FavoriteTarget {
    Place(i32),
    Itinerary(i32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FavoriteTargetError {
    #[error("a favorite must reference either a place or an itinerary, not both")]
    Both,
    #[error("a favorite must reference a place or an itinerary")]
    Neither,
}

impl FavoriteTarget {
    pub fn from_ids(
        place_id: Option<i32>,
        itinerary_id: Option<i32>,
    ) -> Result<Self, FavoriteTargetError> {
        match (place_id, itinerary_id) {
            (Some(place), None) => Ok(Self::Place(place)),
            (None, Some(itinerary)) => Ok(Self::Itinerary(itinerary)),
            (Some(_), Some(_)) => Err(FavoriteTargetError::Both),
            (None, None) => Err(FavoriteTargetError::Neither),
        }
    }

    pub fn place_id(self) -> Option<i32> {
        match self {
            Self::Place(id) => Some(id),
            Self::Itinerary(_) => None,
        }
    }

    pub fn itinerary_id(self) -> Option<i32> {
        match self {
            Self::Itinerary(id) => Some(id),
            Self::Place(_) => None,
        }
    }
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
        belongs_to = "super::place::Entity",
        from = "Column::PlaceId",
        to = "super::place::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Place,
    #[sea_orm(
        belongs_to = "super::itinerary::Entity",
        from = "Column::ItineraryId",
        to = "super::itinerary::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Itinerary,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Place.def()
    }
}

impl Related<super::itinerary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Itinerary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
