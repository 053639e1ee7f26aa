use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride::{self, RideStatus};
use crate::entities::rating;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRating {
    pub ride_id: Uuid,
    pub rated_user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

async fn completed_passenger(db: &DatabaseConnection, ride_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let count = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .filter(booking::Column::PassengerId.eq(user_id))
        .filter(booking::Column::Status.eq(BookingStatus::Completed))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Driver rates a passenger or a passenger rates the driver, once per ride.
pub async fn rate(db: &DatabaseConnection, rater_id: Uuid, new_rating: NewRating) -> AppResult<rating::Model> {
    if !(1..=5).contains(&new_rating.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".to_string()));
    }
    if rater_id == new_rating.rated_user_id {
        return Err(AppError::BadRequest("You cannot rate yourself".to_string()));
    }

    let ride = ride::Entity::find_by_id(new_rating.ride_id)
        .one(db)
        .await?
        .ok_or(AppError::RideNotFound)?;
    if ride.status != RideStatus::Completed {
        return Err(AppError::BadRequest(
            "Rides can only be rated once completed".to_string(),
        ));
    }

    let rated = new_rating.rated_user_id;
    let allowed = if rater_id == ride.driver_id {
        completed_passenger(db, ride.id, rated).await?
    } else if rated == ride.driver_id {
        completed_passenger(db, ride.id, rater_id).await?
    } else {
        false
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "Only the driver and passengers of this ride can rate each other".to_string(),
        ));
    }

    let duplicate = rating::Entity::find()
        .filter(rating::Column::RideId.eq(ride.id))
        .filter(rating::Column::RaterId.eq(rater_id))
        .filter(rating::Column::RatedUserId.eq(rated))
        .count(db)
        .await?;
    if duplicate > 0 {
        return Err(AppError::Conflict(
            "You have already rated this person for this ride".to_string(),
        ));
    }

    let comment = new_rating
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let saved = rating::ActiveModel {
        id: Set(Uuid::new_v4()),
        ride_id: Set(ride.id),
        rater_id: Set(rater_id),
        rated_user_id: Set(rated),
        rating: Set(new_rating.rating),
        comment: Set(comment),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    tracing::info!(ride_id = %ride.id, %rater_id, rated_user_id = %rated, "Rating recorded");
    Ok(saved)
}
