use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::driver_subscription::{self, SubscriptionStatus};
use crate::entities::mobile_money_payment::{self, PaymentStatus, PaymentType};
use crate::error::{AppError, AppResult};
use crate::services::fares::{SUBSCRIPTION_FEE, SUBSCRIPTION_PERIOD_DAYS};

const RENEWAL_WARNING_DAYS: i64 = 2;

pub async fn driver_has_active_subscription<C: ConnectionTrait>(
    db: &C,
    driver_id: Uuid,
) -> AppResult<bool> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let count = driver_subscription::Entity::find()
        .filter(driver_subscription::Column::DriverId.eq(driver_id))
        .filter(driver_subscription::Column::Status.eq(SubscriptionStatus::Active))
        .filter(driver_subscription::Column::ExpiresAt.gt(now))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn require_active_subscription<C: ConnectionTrait>(
    db: &C,
    driver_id: Uuid,
) -> AppResult<()> {
    if !driver_has_active_subscription(db, driver_id).await? {
        return Err(AppError::SubscriptionRequired);
    }
    Ok(())
}

/// Marks a driver's lapsed periods as expired.
async fn expire_lapsed<C: ConnectionTrait>(db: &C, driver_id: Uuid) -> AppResult<u64> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let result = driver_subscription::Entity::update_many()
        .col_expr(
            driver_subscription::Column::Status,
            Expr::value(SubscriptionStatus::Expired),
        )
        .filter(driver_subscription::Column::DriverId.eq(driver_id))
        .filter(driver_subscription::Column::Status.eq(SubscriptionStatus::Active))
        .filter(driver_subscription::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        tracing::info!(%driver_id, expired = result.rows_affected, "Driver subscription lapsed");
    }
    Ok(result.rows_affected)
}

/// The active period that runs the longest, if any.
pub async fn current_subscription<C: ConnectionTrait>(
    db: &C,
    driver_id: Uuid,
) -> AppResult<Option<driver_subscription::Model>> {
    expire_lapsed(db, driver_id).await?;

    let subscription = driver_subscription::Entity::find()
        .filter(driver_subscription::Column::DriverId.eq(driver_id))
        .filter(driver_subscription::Column::Status.eq(SubscriptionStatus::Active))
        .order_by_desc(driver_subscription::Column::ExpiresAt)
        .one(db)
        .await?;
    Ok(subscription)
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub subscription: Option<driver_subscription::Model>,
    pub is_active: bool,
    pub days_left: i64,
    pub renew_soon: bool,
    pub fee: i64,
    pub period_days: i64,
}

pub fn summarize(
    subscription: Option<driver_subscription::Model>,
    now: DateTime<Utc>,
) -> SubscriptionSummary {
    let (is_active, days_left) = match &subscription {
        Some(s) => {
            let expires = s.expires_at.with_timezone(&Utc);
            (expires > now, (expires - now).num_days().max(0))
        }
        None => (false, 0),
    };

    SubscriptionSummary {
        subscription,
        is_active,
        days_left,
        renew_soon: is_active && days_left <= RENEWAL_WARNING_DAYS,
        fee: SUBSCRIPTION_FEE,
        period_days: SUBSCRIPTION_PERIOD_DAYS,
    }
}

/// Turns a completed subscription payment into a subscription period. A
/// renewal starts where the current active period ends.
pub async fn activate(
    db: &DatabaseConnection,
    driver_id: Uuid,
    payment_id: Uuid,
) -> AppResult<driver_subscription::Model> {
    let txn = db.begin().await?;

    let payment = mobile_money_payment::Entity::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if payment.user_id != driver_id {
        return Err(AppError::Forbidden(
            "You can only use your own payments".to_string(),
        ));
    }
    if payment.payment_type != PaymentType::Subscription {
        return Err(AppError::BadRequest(
            "Payment is not a subscription payment".to_string(),
        ));
    }
    if payment.status != PaymentStatus::Completed {
        return Err(AppError::BadRequest(
            "Payment has not completed yet".to_string(),
        ));
    }
    if payment.amount != SUBSCRIPTION_FEE {
        return Err(AppError::BadRequest(format!(
            "Subscription costs UGX {}",
            SUBSCRIPTION_FEE
        )));
    }

    let already_used = driver_subscription::Entity::find()
        .filter(driver_subscription::Column::PaymentReference.eq(payment_id))
        .count(&txn)
        .await?;
    if already_used > 0 {
        return Err(AppError::Conflict(
            "This payment has already been used".to_string(),
        ));
    }

    let now = Utc::now();
    let starts_at = current_subscription(&txn, driver_id)
        .await?
        .map(|s| s.expires_at.with_timezone(&Utc))
        .filter(|expires| *expires > now)
        .unwrap_or(now);

    let subscription = driver_subscription::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        amount: Set(payment.amount),
        status: Set(SubscriptionStatus::Active),
        payment_method: Set("mobile_money".to_string()),
        payment_reference: Set(payment_id),
        created_at: Set(now.into()),
        expires_at: Set((starts_at + Duration::days(SUBSCRIPTION_PERIOD_DAYS)).into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        %driver_id,
        subscription_id = %subscription.id,
        expires_at = %subscription.expires_at,
        "Driver subscription activated"
    );
    Ok(subscription)
}
