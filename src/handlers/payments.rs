use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::bookings::PaymentResponse;
use crate::models::{cents_to_dollars, dollars_to_cents, PaymentType};
use crate::services::reconciliation::{self, ConfirmOutcome};
use crate::state::AppState;

// POST /api/payments/intent
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub booking_id: Option<String>,
    pub amount: Option<f64>,
    pub payment_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub payment_id: String,
    pub amount: f64,
    pub payment_type: String,
}

pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    let (Some(booking_id), Some(amount)) = (req.booking_id, req.amount) else {
        return Err(AppError::Validation(
            "bookingId and amount are required".to_string(),
        ));
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Validation(
            "amount must be a positive value".to_string(),
        ));
    }

    // Defaults to deposit only when omitted; unknown strings are rejected.
    let payment_type = match req.payment_type.as_deref() {
        None => PaymentType::Deposit,
        Some(raw) => PaymentType::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("unknown payment type: {raw}")))?,
    };

    let created =
        reconciliation::create_intent(&state, &booking_id, dollars_to_cents(amount), payment_type)
            .await?;

    Ok(Json(CreateIntentResponse {
        client_secret: created.client_secret,
        payment_id: created.payment_id,
        amount: cents_to_dollars(created.amount_cents),
        payment_type: created.payment_type.as_str().to_string(),
    }))
}

// POST /api/payments/confirm
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_intent_id: Option<String>,
    pub payment_id: Option<String>,
}

pub async fn confirm_intent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Response, AppError> {
    let (Some(intent_id), Some(payment_id)) = (req.payment_intent_id, req.payment_id) else {
        return Err(AppError::Validation(
            "paymentIntentId and paymentId are required".to_string(),
        ));
    };

    let outcome = reconciliation::confirm_intent(&state, &intent_id, &payment_id).await?;

    let response = match outcome {
        ConfirmOutcome::Succeeded(payment) => Json(serde_json::json!({
            "success": true,
            "payment": PaymentResponse::from_payment(payment),
            "message": "Payment confirmed",
        }))
        .into_response(),
        ConfirmOutcome::Processing => Json(serde_json::json!({
            "success": false,
            "message": "Payment is still processing",
        }))
        .into_response(),
        ConfirmOutcome::NotCompleted(status) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "message": format!("Payment not completed (status: {status})"),
            })),
        )
            .into_response(),
    };

    Ok(response)
}
