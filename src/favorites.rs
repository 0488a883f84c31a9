//! Per-user bookmarks of itineraries and places.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;

use crate::entities::favorite::{self, FavoriteTarget};
use crate::entities::{itinerary, prelude::*};
use crate::error::PlannerError;
use crate::planner::dto::PlaceDetail;
use crate::planner::ItinerarySummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    Added(i32),
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePlace {
    pub id: i32,
    #[serde(flatten)]
    pub place: PlaceDetail,
}

impl FavoriteTarget {
    fn condition(self) -> Condition {
        match self {
            Self::Place(id) => Condition::all().add(favorite::Column::PlaceId.eq(id)),
            Self::Itinerary(id) => Condition::all().add(favorite::Column::ItineraryId.eq(id)),
        }
    }
}

async fn find_favorite(
    db: &DatabaseConnection,
    user_id: i32,
    target: FavoriteTarget,
) -> Result<Option<favorite::Model>, PlannerError> {
    Ok(Favorite::find()
        .filter(favorite::Column::UserId.eq(user_id))
        .filter(target.condition())
        .one(db)
        .await?)
}

/// Bookmarks `target` for `user_id`. Itineraries must belong to the user.
pub async fn add(
    db: &DatabaseConnection,
    user_id: i32,
    target: FavoriteTarget,
) -> Result<FavoriteChange, PlannerError> {
    match target {
        FavoriteTarget::Itinerary(id) => {
            let owned = Itinerary::find_by_id(id)
                .filter(itinerary::Column::UserId.eq(user_id))
                .count(db)
                .await?
                > 0;
            if !owned {
                return Err(PlannerError::NotFound("Itinerary not found".to_string()));
            }
        }
        FavoriteTarget::Place(id) => {
            if Place::find_by_id(id).count(db).await? == 0 {
                return Err(PlannerError::NotFound("Place not found".to_string()));
            }
        }
    }

    if find_favorite(db, user_id, target).await?.is_some() {
        return Ok(FavoriteChange::AlreadyPresent);
    }

    let created = favorite::ActiveModel {
        user_id: Set(user_id),
        place_id: Set(target.place_id()),
        itinerary_id: Set(target.itinerary_id()),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(FavoriteChange::Added(created.id))
}

pub async fn remove(
    db: &DatabaseConnection,
    user_id: i32,
    target: FavoriteTarget,
) -> Result<(), PlannerError> {
    let favorite = find_favorite(db, user_id, target)
        .await?
        .ok_or_else(|| PlannerError::NotFound("Favorite not found".to_string()))?;
    favorite.delete(db).await?;
    Ok(())
}

pub async fn contains(
    db: &DatabaseConnection,
    user_id: i32,
    target: FavoriteTarget,
) -> Result<bool, PlannerError> {
    Ok(find_favorite(db, user_id, target).await?.is_some())
}

/// Most recently bookmarked first.
pub async fn itineraries(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<ItinerarySummary>, PlannerError> {
    let rows = Favorite::find()
        .filter(favorite::Column::UserId.eq(user_id))
        .filter(favorite::Column::ItineraryId.is_not_null())
        .order_by_desc(favorite::Column::CreatedAt)
        .order_by_desc(favorite::Column::Id)
        .find_also_related(Itinerary)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(_, itinerary)| itinerary.map(ItinerarySummary::from))
        .collect())
}

pub async fn itinerary_ids(db: &DatabaseConnection, user_id: i32) -> Result<Vec<i32>, PlannerError> {
    let ids: Vec<Option<i32>> = Favorite::find()
        .select_only()
        .column(favorite::Column::ItineraryId)
        .filter(favorite::Column::UserId.eq(user_id))
        .filter(favorite::Column::ItineraryId.is_not_null())
        .order_by_asc(favorite::Column::Id)
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().flatten().collect())
}

pub async fn places(db: &DatabaseConnection, user_id: i32) -> Result<Vec<FavoritePlace>, PlannerError> {
    let rows = Favorite::find()
        .filter(favorite::Column::UserId.eq(user_id))
        .filter(favorite::Column::PlaceId.is_not_null())
        .order_by_desc(favorite::Column::CreatedAt)
        .order_by_desc(favorite::Column::Id)
        .find_also_related(Place)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(_, place)| place)
        .map(|place| FavoritePlace {
            id: place.id,
            place: PlaceDetail::from(&place),
        })
        .collect())
}
