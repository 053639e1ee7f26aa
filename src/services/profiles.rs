//! Onboarding and profile maintenance.
//!
//! A user picks a marketplace role exactly once. Drivers register their
//! vehicle in the same step; afterwards only the contact fields and the
//! vehicle can change.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver_details;
use crate::entities::profile::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::capability::{Access, Identity};
use crate::services::rides::MAX_SEATS_PER_RIDE;
use crate::utils::validation::{require_length, require_range};

#[derive(Debug, Deserialize)]
pub struct VehicleRequest {
    pub car_make: String,
    pub car_model: String,
    pub car_color: Option<String>,
    pub license_plate: String,
    pub seats_available: i32,
}

struct Vehicle {
    car_make: String,
    car_model: String,
    car_color: Option<String>,
    license_plate: String,
    seats_available: i32,
}

impl VehicleRequest {
    fn validate(self) -> AppResult<Vehicle> {
        Ok(Vehicle {
            car_make: require_length("Car make", &self.car_make, 2, 50)?,
            car_model: require_length("Car model", &self.car_model, 1, 50)?,
            car_color: self
                .car_color
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            license_plate: require_length("License plate", &self.license_plate, 3, 20)?
                .to_uppercase(),
            seats_available: require_range("Seats", self.seats_available, 1, MAX_SEATS_PER_RIDE)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    pub role: UserRole,
    pub full_name: String,
    pub phone_number: String,
    pub vehicle: Option<VehicleRequest>,
}

/// Editable profile fields. There is no role here, so a `role` key in the
/// request body is ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub email: String,
    pub access: Access,
    pub is_admin: bool,
    pub profile: Option<profile::Model>,
    pub driver_details: Option<driver_details::Model>,
}

async fn find_profile<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Option<profile::Model>> {
    Ok(profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// Profile plus vehicle for the identity. Access is read from the stored
/// profile, so it reflects an onboarding made earlier in the same request.
pub async fn load<C: ConnectionTrait>(db: &C, identity: &Identity) -> AppResult<ProfileView> {
    let profile = find_profile(db, identity.user_id).await?;

    let driver_details = match profile.as_ref().map(|p| p.role) {
        Some(UserRole::Driver) => {
            driver_details::Entity::find()
                .filter(driver_details::Column::UserId.eq(identity.user_id))
                .one(db)
                .await?
        }
        _ => None,
    };

    Ok(ProfileView {
        user_id: identity.user_id,
        email: identity.email.clone(),
        access: Access::from_profile(profile.as_ref()),
        is_admin: identity.is_admin,
        profile,
        driver_details,
    })
}

/// Creates the profile, and for drivers the vehicle, in one transaction.
pub async fn onboard(
    db: &DatabaseConnection,
    user_id: Uuid,
    email: &str,
    request: OnboardRequest,
) -> AppResult<profile::Model> {
    let full_name = require_length("Full name", &request.full_name, 2, 100)?;
    let phone_number = require_length("Phone number", &request.phone_number, 10, 15)?;
    let vehicle = match (request.role, request.vehicle) {
        (UserRole::Driver, Some(vehicle)) => Some(vehicle.validate()?),
        (UserRole::Driver, None) => {
            return Err(AppError::BadRequest(
                "Drivers must provide vehicle details".to_string(),
            ));
        }
        (UserRole::Passenger, Some(_)) => {
            return Err(AppError::BadRequest(
                "Passengers cannot register a vehicle".to_string(),
            ));
        }
        (UserRole::Passenger, None) => None,
    };

    let txn = db.begin().await?;

    // profiles.user_id is unique, so a concurrent second onboarding fails on
    // insert even if it passes this check.
    if find_profile(&txn, user_id).await?.is_some() {
        return Err(AppError::Conflict("Profile already completed".to_string()));
    }

    let now = Utc::now();
    let created = profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        full_name: Set(full_name),
        phone_number: Set(Some(phone_number)),
        email: Set(Some(email.to_string())),
        role: Set(request.role),
        avatar_url: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    if let Some(v) = vehicle {
        insert_vehicle(&txn, user_id, v).await?;
    }

    txn.commit().await?;
    tracing::info!(%user_id, role = ?created.role, "Onboarding complete");

    Ok(created)
}

/// Changes name, phone or avatar. The role stays as onboarded.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> AppResult<profile::Model> {
    let existing = find_profile(db, user_id)
        .await?
        .ok_or(AppError::OnboardingRequired)?;

    let mut active = existing.into_active_model();
    if let Some(name) = request.full_name {
        active.full_name = Set(require_length("Full name", &name, 2, 100)?);
    }
    if let Some(phone) = request.phone_number {
        active.phone_number = Set(Some(require_length("Phone number", &phone, 10, 15)?));
    }
    if let Some(url) = request.avatar_url {
        let url = url.trim().to_string();
        active.avatar_url = Set((!url.is_empty()).then_some(url));
    }
    active.updated_at = Set(Utc::now().into());

    Ok(active.update(db).await?)
}

/// Replaces the driver's vehicle, creating it when missing.
pub async fn save_vehicle(
    db: &DatabaseConnection,
    user_id: Uuid,
    request: VehicleRequest,
) -> AppResult<driver_details::Model> {
    let v = request.validate()?;

    let existing = driver_details::Entity::find()
        .filter(driver_details::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    let Some(details) = existing else {
        return insert_vehicle(db, user_id, v).await;
    };

    let mut active = details.into_active_model();
    active.car_make = Set(v.car_make);
    active.car_model = Set(v.car_model);
    active.car_color = Set(v.car_color);
    active.license_plate = Set(v.license_plate);
    active.seats_available = Set(v.seats_available);
    active.updated_at = Set(Utc::now().into());

    Ok(active.update(db).await?)
}

async fn insert_vehicle<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    v: Vehicle,
) -> AppResult<driver_details::Model> {
    let now = Utc::now();
    let saved = driver_details::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        car_make: Set(v.car_make),
        car_model: Set(v.car_model),
        car_color: Set(v.car_color),
        license_plate: Set(v.license_plate),
        seats_available: Set(v.seats_available),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    Ok(saved)
}
