use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;
use sha2::Sha256;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::bookings::parse_client_date;
use crate::models::{Booking, BookingStatus};
use crate::services::reconciliation::{self, GatewayEvent};
use crate::state::AppState;

/// How far a webhook timestamp may drift before the delivery is rejected as
/// a replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `t=<unix>,v1=<hex hmac>` signature header over the raw request
/// bytes. The payload must be the exact bytes the provider sent; any
/// re-serialization breaks the check.
fn verify_gateway_signature(secret: &str, header: &str, payload: &[u8], now: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = vec![];

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if signatures.is_empty() || (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    signatures.iter().any(|sig| *sig == expected)
}

// POST /webhook/payments — asynchronous, at-least-once deliveries from the
// payment gateway. Responds 200 to everything it cannot act on so the
// provider stops retrying; store failures bubble up as 500 so it retries.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_gateway_signature(
        &state.config.gateway_webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    ) {
        return Err(AppError::InvalidSignature);
    }

    let event: GatewayEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            // Authentic but unparseable; redelivery cannot fix it.
            tracing::warn!(error = %e, "unparseable gateway webhook payload, acknowledging");
            return Ok(Json(serde_json::json!({ "received": true })));
        }
    };

    tracing::info!(event_type = %event.event_type, "gateway webhook received");
    reconciliation::handle_event(&state, &event)?;

    Ok(Json(serde_json::json!({ "received": true })))
}

// ── Voice assistant webhook ──

#[derive(Deserialize)]
#[allow(dead_code)]
pub struct VoiceWebhookForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "ServiceName")]
    pub service_name: String,
    #[serde(rename = "RequestedDate")]
    pub requested_date: String,
    #[serde(rename = "CustomerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "Notes")]
    pub notes: Option<String>,
}

fn validate_voice_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(&str, &str)],
) -> bool {
    // Data to sign: URL + params concatenated in sorted key order
    let mut data = url.to_string();
    let mut sorted_params = params.to_vec();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in &sorted_params {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data.as_bytes());
    let result = mac.finalize().into_bytes();
    let expected = base64::engine::general_purpose::STANDARD.encode(result);

    expected == signature
}

// POST /webhook/voice — the phone assistant reports a booking captured
// during a call. Creates a pending booking; payment happens later over the
// regular payment flow.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<VoiceWebhookForm>,
) -> Result<Response, AppError> {
    let from = form.from.trim().to_string();

    tracing::info!(from = %from, service = %form.service_name, "incoming voice booking");

    // Validate the provider signature (skip if auth token is empty — dev mode)
    if !state.config.voice_auth_token.is_empty() {
        let signature = headers
            .get("x-twilio-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing X-Twilio-Signature header");
            return Ok((StatusCode::FORBIDDEN, "Missing signature").into_response());
        }

        // Reconstruct webhook URL — use X-Forwarded-Proto/Host if behind proxy
        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("https");
        let host = headers
            .get("x-forwarded-host")
            .or_else(|| headers.get("host"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let url = format!("{proto}://{host}/webhook/voice");

        let params = [
            ("From", form.from.as_str()),
            ("CallSid", form.call_sid.as_deref().unwrap_or("")),
            ("ServiceName", form.service_name.as_str()),
            ("RequestedDate", form.requested_date.as_str()),
            ("CustomerName", form.customer_name.as_deref().unwrap_or("")),
            ("Notes", form.notes.as_deref().unwrap_or("")),
        ];

        if !validate_voice_signature(&state.config.voice_auth_token, signature, &url, &params) {
            tracing::warn!("invalid voice webhook signature");
            return Ok((StatusCode::FORBIDDEN, "Invalid signature").into_response());
        }
    }

    let scheduled_date = parse_client_date(form.requested_date.trim()).ok_or_else(|| {
        AppError::Validation("RequestedDate must be a valid date-time".to_string())
    })?;

    let service = {
        let db = state.db.lock().unwrap();
        queries::get_service_by_name(&db, form.service_name.trim())
            .map_err(AppError::store)?
            .filter(|s| s.active)
            .ok_or_else(|| AppError::NotFound(format!("service {}", form.service_name.trim())))?
    };

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        service_id: service.id.clone(),
        customer_name: form
            .customer_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| from.clone()),
        customer_email: None,
        customer_phone: Some(from.clone()),
        address: None,
        scheduled_date,
        status: BookingStatus::Pending,
        notes: form.notes,
        budget: None,
        total_amount_cents: service.price_cents,
        deposit_amount_cents: service.deposit_cents(),
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, &booking).map_err(AppError::store)?;
    }

    tracing::info!(booking_id = %booking.id, from = %from, "voice booking created");

    Ok(Json(serde_json::json!({
        "received": true,
        "bookingId": booking.id,
    }))
    .into_response())
}
