//! Mobile-money payments against a sandbox provider.
//!
//! A payment is recorded as `pending`, then the sandbox approves it after a
//! short delay. Settling a booking payment confirms the booking and marks its
//! fare transaction as paid in the same database transaction. If the booking
//! was cancelled while the payment was pending, the payment ends as
//! `refund_due` instead.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::mobile_money_payment::{self, PaymentStatus, PaymentType, Provider};
use crate::entities::transaction::{self, TransactionStatus};
use crate::error::{AppError, AppResult};
use crate::services::fares::{FareSplit, SUBSCRIPTION_FEE};
use crate::services::capability::{Access, Identity};
use crate::utils::validation::normalize_ugandan_mobile;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub payment_type: PaymentType,
    /// Booking being paid for; ignored for subscriptions.
    pub reference_id: Option<Uuid>,
    pub provider: Provider,
    pub phone_number: String,
}

/// Records a pending payment. The amount is always derived server-side.
pub async fn initiate(
    db: &DatabaseConnection,
    payer: &Identity,
    request: PaymentRequest,
) -> AppResult<mobile_money_payment::Model> {
    let phone_number = normalize_ugandan_mobile(&request.phone_number).ok_or_else(|| {
        AppError::BadRequest("Please enter a valid Ugandan mobile number".to_string())
    })?;

    let (amount, reference_id) = match request.payment_type {
        PaymentType::Subscription => {
            if payer.access != Access::Driver {
                return Err(AppError::Forbidden(
                    "Only drivers can pay for a subscription".to_string(),
                ));
            }
            (SUBSCRIPTION_FEE, None)
        }
        PaymentType::Booking => {
            let booking_id = request.reference_id.ok_or_else(|| {
                AppError::BadRequest("A booking reference is required".to_string())
            })?;
            let booking = booking::Entity::find_by_id(booking_id)
                .one(db)
                .await?
                .ok_or(AppError::BookingNotFound)?;

            if booking.passenger_id != payer.user_id {
                return Err(AppError::Forbidden(
                    "You can only pay for your own bookings".to_string(),
                ));
            }
            if booking.status != BookingStatus::Pending {
                return Err(AppError::BadRequest(format!(
                    "Booking is already {}",
                    booking.status.to_value()
                )));
            }
            (FareSplit::for_seats(booking.seats_booked).total_amount, Some(booking_id))
        }
    };

    let stamp: DateTime<FixedOffset> = Utc::now().into();
    let payment = mobile_money_payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(payer.user_id),
        payment_type: Set(request.payment_type),
        reference_id: Set(reference_id),
        provider: Set(request.provider),
        phone_number: Set(phone_number),
        amount: Set(amount),
        status: Set(PaymentStatus::Pending),
        transaction_ref: Set(None),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(db)
    .await?;

    tracing::info!(
        payment_id = %payment.id,
        user_id = %payer.user_id,
        provider = request.provider.display_name(),
        amount,
        "Mobile money prompt sent"
    );
    Ok(payment)
}

/// Approves a pending payment. Returns the stored payment unchanged if it was
/// already settled.
pub async fn settle(
    db: &DatabaseConnection,
    payment_id: Uuid,
) -> AppResult<mobile_money_payment::Model> {
    let txn = db.begin().await?;
    let stamp: DateTime<FixedOffset> = Utc::now().into();

    let approved = mobile_money_payment::Entity::update_many()
        .col_expr(
            mobile_money_payment::Column::Status,
            Expr::value(PaymentStatus::Completed),
        )
        .col_expr(
            mobile_money_payment::Column::TransactionRef,
            Expr::value(format!("SIM-{}", Utc::now().timestamp_millis())),
        )
        .col_expr(mobile_money_payment::Column::UpdatedAt, Expr::value(stamp))
        .filter(mobile_money_payment::Column::Id.eq(payment_id))
        .filter(mobile_money_payment::Column::Status.eq(PaymentStatus::Pending))
        .exec(&txn)
        .await?;

    if approved.rows_affected == 0 {
        let unchanged = find_payment(&txn, payment_id).await?;
        return Ok(unchanged);
    }

    let settled = find_payment(&txn, payment_id).await?;
    if let (PaymentType::Booking, Some(booking_id)) = (settled.payment_type, settled.reference_id) {
        if !apply_booking_payment(&txn, booking_id, stamp).await? {
            mobile_money_payment::Entity::update_many()
                .col_expr(
                    mobile_money_payment::Column::Status,
                    Expr::value(PaymentStatus::RefundDue),
                )
                .filter(mobile_money_payment::Column::Id.eq(payment_id))
                .exec(&txn)
                .await?;
            tracing::warn!(
                %payment_id,
                %booking_id,
                amount = settled.amount,
                "Payment arrived for a cancelled booking; marked for refund"
            );
        }
    }

    let payment = find_payment(&txn, payment_id).await?;
    txn.commit().await?;

    tracing::info!(
        %payment_id,
        amount = payment.amount,
        status = ?payment.status,
        provider = payment.provider.display_name(),
        "Mobile money payment settled"
    );
    Ok(payment)
}

/// Confirms the booking and marks its fare paid. Returns false when the
/// booking no longer exists or was cancelled before the money arrived.
async fn apply_booking_payment(
    txn: &DatabaseTransaction,
    booking_id: Uuid,
    stamp: DateTime<FixedOffset>,
) -> AppResult<bool> {
    booking::Entity::update_many()
        .col_expr(booking::Column::Status, BookingStatus::Confirmed.as_enum())
        .col_expr(booking::Column::UpdatedAt, Expr::value(stamp))
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .exec(txn)
        .await?;

    let current = booking::Entity::find_by_id(booking_id).one(txn).await?;
    let Some(current) = current.filter(|b| b.status != BookingStatus::Cancelled) else {
        return Ok(false);
    };

    transaction::Entity::update_many()
        .col_expr(transaction::Column::Status, Expr::value(TransactionStatus::Paid))
        .col_expr(transaction::Column::UpdatedAt, Expr::value(stamp))
        .filter(transaction::Column::BookingId.eq(current.id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(txn)
        .await?;
    Ok(true)
}

async fn find_payment<C: ConnectionTrait>(
    db: &C,
    payment_id: Uuid,
) -> AppResult<mobile_money_payment::Model> {
    mobile_money_payment::Entity::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
}

/// Booking payments waiting for a manual refund, oldest first.
pub async fn refunds_due<C: ConnectionTrait>(db: &C) -> AppResult<Vec<mobile_money_payment::Model>> {
    let payments = mobile_money_payment::Entity::find()
        .filter(mobile_money_payment::Column::Status.eq(PaymentStatus::RefundDue))
        .order_by_asc(mobile_money_payment::Column::UpdatedAt)
        .all(db)
        .await?;
    Ok(payments)
}

/// Sandbox stand-in for the provider callback.
pub fn schedule_sandbox_settlement(db: DatabaseConnection, payment_id: Uuid, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = settle(&db, payment_id).await {
            tracing::error!(%payment_id, error = %e, "Sandbox settlement failed");
        }
    });
}

pub async fn find_owned(
    db: &DatabaseConnection,
    user_id: Uuid,
    payment_id: Uuid,
) -> AppResult<mobile_money_payment::Model> {
    let payment = find_payment(db, payment_id).await?;

    if payment.user_id != user_id {
        return Err(AppError::Forbidden(
            "You can only view your own payments".to_string(),
        ));
    }
    Ok(payment)
}
