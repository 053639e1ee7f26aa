//! Account lifecycle: registration, email confirmation, sign in and the admin
//! capability grants.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::user;
use crate::entities::user_role::{self, AppRole};
use crate::error::{AppError, AppResult};
use crate::services::capability::has_role;
use crate::utils::validation::{require_email, require_length};

const CONFIRMATION_TOKEN_LEN: usize = 48;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn confirmation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

/// Creates an account. With `require_confirmation` the account starts
/// unconfirmed and carries a one-time confirmation token.
pub async fn register(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    require_confirmation: bool,
) -> AppResult<user::Model> {
    let email = require_email(email)?;
    require_length("Password", password, 6, 128)?;

    if find_by_email(db, &email).await?.is_some() {
        return Err(AppError::AlreadyRegistered);
    }

    let now = Utc::now();
    let (email_confirmed_at, token) = if require_confirmation {
        (None, Some(confirmation_token()))
    } else {
        (Some(now.into()), None)
    };

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        email_confirmed_at: Set(email_confirmed_at),
        confirmation_token: Set(token),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    Ok(user)
}

pub async fn confirm_email(db: &DatabaseConnection, token: &str) -> AppResult<user::Model> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("Confirmation token is required".to_string()));
    }

    let user = user::Entity::find()
        .filter(user::Column::ConfirmationToken.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired confirmation link".to_string()))?;

    let mut active = user.into_active_model();
    active.email_confirmed_at = Set(Some(Utc::now().into()));
    active.confirmation_token = Set(None);
    let user = active.update(db).await?;

    tracing::info!(user_id = %user.id, "Email confirmed");
    Ok(user)
}

/// Checks credentials. Unknown email and wrong password are indistinguishable.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    require_confirmation: bool,
) -> AppResult<user::Model> {
    let email = email.trim().to_lowercase();
    let user = find_by_email(db, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }
    if require_confirmation && user.email_confirmed_at.is_none() {
        return Err(AppError::EmailNotConfirmed);
    }
    Ok(user)
}

pub async fn grant_admin<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<()> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if has_role(db, user_id, AppRole::Admin).await? {
        return Ok(());
    }

    user_role::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        role: Set(AppRole::Admin),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    tracing::info!(%user_id, "Admin capability granted");
    Ok(())
}

pub async fn revoke_admin<C: ConnectionTrait>(db: &C, acting_admin: Uuid, user_id: Uuid) -> AppResult<()> {
    if acting_admin == user_id {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin access".to_string(),
        ));
    }

    let removed = user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(user_id))
        .filter(user_role::Column::Role.eq(AppRole::Admin))
        .exec(db)
        .await?;
    if removed.rows_affected > 0 {
        tracing::info!(%user_id, %acting_admin, "Admin capability revoked");
    }
    Ok(())
}

/// Makes sure the configured admin account exists and holds the admin
/// capability. The account is created already confirmed.
pub async fn seed_admin(db: &DatabaseConnection, email: &str, password: &str) -> AppResult<()> {
    let user = match find_by_email(db, &email.trim().to_lowercase()).await? {
        Some(user) => user,
        None => {
            let user = register(db, email, password, false).await?;
            tracing::info!("Admin account created: {}", user.email);
            user
        }
    };
    grant_admin(db, user.id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_confirmation_tokens_are_random() {
        let a = confirmation_token();
        let b = confirmation_token();
        assert_eq!(a.len(), CONFIRMATION_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
