use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::profile::{self, UserRole};
use crate::entities::user_role::{self, AppRole};
use crate::error::{AppError, AppResult};

/// What the marketplace lets an identity do, derived from its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    OnboardingRequired,
    Passenger,
    Driver,
}

impl Access {
    pub fn from_profile(profile: Option<&profile::Model>) -> Self {
        match profile.map(|p| p.role) {
            None => Access::OnboardingRequired,
            Some(UserRole::Passenger) => Access::Passenger,
            Some(UserRole::Driver) => Access::Driver,
        }
    }
}

/// Per-request identity. Admin is independent of `access`: an admin may also
/// be a driver, a passenger, or not onboarded at all.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub access: Access,
    pub is_admin: bool,
}

impl Identity {
    pub fn require_onboarded(&self) -> AppResult<()> {
        match self.access {
            Access::OnboardingRequired => Err(AppError::OnboardingRequired),
            _ => Ok(()),
        }
    }

    pub fn require_access(&self, wanted: Access) -> AppResult<()> {
        self.require_onboarded()?;
        if self.access != wanted {
            let label = match wanted {
                Access::Driver => "Driver",
                Access::Passenger => "Passenger",
                Access::OnboardingRequired => "Onboarding",
            };
            return Err(AppError::Forbidden(format!("{} access required", label)));
        }
        Ok(())
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if !self.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(())
    }
}

pub async fn has_role<C: ConnectionTrait>(db: &C, user_id: Uuid, role: AppRole) -> AppResult<bool> {
    let count = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .filter(user_role::Column::Role.eq(role))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Resolves the profile lookup and the admin lookup separately.
pub async fn resolve<C: ConnectionTrait>(db: &C, user_id: Uuid, email: &str) -> AppResult<Identity> {
    let profile = profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    let is_admin = has_role(db, user_id, AppRole::Admin).await?;

    Ok(Identity {
        user_id,
        email: email.to_string(),
        access: Access::from_profile(profile.as_ref()),
        is_admin,
    })
}
