use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use crate::entities::driver_subscription::{self, SubscriptionStatus};
use crate::entities::profile::{self, UserRole};
use crate::entities::transaction::{self, TransactionStatus};
use crate::entities::{booking, ride};
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_users: u64,
    pub total_rides: u64,
    pub total_bookings: u64,
    pub total_commission: i64,
    pub weekly_commission: i64,
    pub daily_commission: i64,
    pub active_drivers: u64,
    pub inactive_drivers: u64,
    pub total_subscription_revenue: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommissionTotals {
    pub total: i64,
    pub weekly: i64,
    pub daily: i64,
}

/// Commission is earned once a ride completes.
pub fn commission_totals(transactions: &[transaction::Model], now: DateTime<Utc>) -> CommissionTotals {
    let week_ago = now - Duration::days(7);
    let day_ago = now - Duration::hours(24);

    transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Completed)
        .fold(CommissionTotals::default(), |mut acc, t| {
            let at = t.updated_at.with_timezone(&Utc);
            acc.total += t.platform_commission;
            if at >= week_ago {
                acc.weekly += t.platform_commission;
            }
            if at >= day_ago {
                acc.daily += t.platform_commission;
            }
            acc
        })
}

pub async fn platform_stats<C: ConnectionTrait>(db: &C) -> AppResult<PlatformStats> {
    let now = Utc::now();

    let total_users = profile::Entity::find().count(db).await?;
    let total_rides = ride::Entity::find().count(db).await?;
    let total_bookings = booking::Entity::find().count(db).await?;

    let transactions = transaction::Entity::find()
        .filter(transaction::Column::Status.eq(TransactionStatus::Completed))
        .all(db)
        .await?;
    let commission = commission_totals(&transactions, now);

    let drivers = profile::Entity::find()
        .filter(profile::Column::Role.eq(UserRole::Driver))
        .count(db)
        .await?;

    let subscriptions = driver_subscription::Entity::find().all(db).await?;
    let active_drivers = subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active && s.expires_at.with_timezone(&Utc) > now)
        .map(|s| s.driver_id)
        .collect::<HashSet<_>>()
        .len() as u64;
    let total_subscription_revenue = subscriptions.iter().map(|s| s.amount).sum();

    Ok(PlatformStats {
        total_users,
        total_rides,
        total_bookings,
        total_commission: commission.total,
        weekly_commission: commission.weekly,
        daily_commission: commission.daily,
        active_drivers,
        inactive_drivers: drivers.saturating_sub(active_drivers),
        total_subscription_revenue,
    })
}
