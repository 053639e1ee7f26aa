use std::time::Duration;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::entities::mobile_money_payment;
use crate::error::AppResult;
use crate::services::capability::Identity;
use crate::services::payments::{self, PaymentRequest};
use crate::AppState;

/// Start a mobile-money payment. The sandbox approves it after a short delay.
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<PaymentRequest>,
) -> AppResult<Json<mobile_money_payment::Model>> {
    let payment = payments::initiate(&state.db, &identity, payload).await?;

    payments::schedule_sandbox_settlement(
        state.db.clone(),
        payment.id,
        Duration::from_millis(state.config.payment_sandbox_delay_ms),
    );

    Ok(Json(payment))
}

/// Poll a payment's status
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<mobile_money_payment::Model>> {
    let payment = payments::find_owned(&state.db, identity.user_id, id).await?;
    Ok(Json(payment))
}
