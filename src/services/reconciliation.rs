//! Payment reconciliation: intent creation, client-initiated confirmation and
//! gateway webhook events all converge on the same payment row.
//!
//! The confirmation path and the webhook path race for the same transition,
//! and the gateway delivers webhooks at least once. Every state change is a
//! conditional update in the store (`queries::mark_payment_*`), so applying a
//! transition twice is a harmless no-op and terminal states never regress.
//! The booking-confirmation side effect fires only when the payment update
//! actually changed the row, which makes it exactly-once.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Payment, PaymentStatus, PaymentType};
use crate::services::gateway::IntentMetadata;
use crate::state::AppState;

pub struct IntentCreated {
    pub payment_id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub payment_type: PaymentType,
}

pub async fn create_intent(
    state: &AppState,
    booking_id: &str,
    amount_cents: i64,
    payment_type: PaymentType,
) -> Result<IntentCreated, AppError> {
    if booking_id.is_empty() {
        return Err(AppError::Validation("bookingId is required".to_string()));
    }
    if amount_cents <= 0 {
        return Err(AppError::Validation(
            "amount must be a positive value".to_string(),
        ));
    }

    let (booking, service) = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking_by_id(&db, booking_id)
            .map_err(AppError::store)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        let service = queries::get_service_by_id(&db, &booking.service_id)
            .map_err(AppError::store)?
            .ok_or_else(|| AppError::NotFound(format!("service {}", booking.service_id)))?;
        (booking, service)
    };

    // The caller-supplied amount is what gets charged; a mismatch with the
    // booking snapshot is suspicious enough to log.
    let snapshot = match payment_type {
        PaymentType::Full => booking.total_amount_cents,
        PaymentType::Deposit => booking.deposit_amount_cents,
    };
    if amount_cents != snapshot {
        tracing::warn!(
            booking_id,
            amount_cents,
            snapshot,
            payment_type = payment_type.as_str(),
            "intent amount differs from booking snapshot"
        );
    }

    let metadata = IntentMetadata {
        booking_id: booking.id.clone(),
        customer_email: booking.customer_email.clone().unwrap_or_default(),
        description: format!("{} - {}", service.name, service.description),
    };

    let intent = state
        .gateway
        .create_intent(amount_cents, &state.config.currency, &metadata)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, booking_id, "gateway intent creation failed");
            AppError::Gateway(e.to_string())
        })?;

    let client_secret = intent
        .client_secret
        .clone()
        .ok_or_else(|| AppError::Gateway("gateway returned no client secret".to_string()))?;

    let now = Utc::now().naive_utc();
    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        booking_id: booking.id.clone(),
        amount_cents,
        currency: state.config.currency.clone(),
        status: PaymentStatus::Pending,
        payment_type,
        intent_id: intent.intent_id.clone(),
        charge_id: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };

    let persisted = {
        let db = state.db.lock().unwrap();
        queries::create_payment(&db, &payment)
    };

    if let Err(e) = persisted {
        // The intent exists gateway-side but we have no record of it. Cancel
        // it so the customer cannot complete a charge we would never see.
        tracing::error!(
            error = %e,
            intent_id = %intent.intent_id,
            "failed to persist payment, cancelling gateway intent"
        );
        if let Err(cancel_err) = state.gateway.cancel_intent(&intent.intent_id).await {
            tracing::error!(
                error = %cancel_err,
                intent_id = %intent.intent_id,
                "orphaned gateway intent: cancellation failed, manual cleanup needed"
            );
        }
        return Err(AppError::store(e));
    }

    tracing::info!(
        booking_id,
        payment_id = %payment.id,
        intent_id = %intent.intent_id,
        amount_cents,
        payment_type = payment_type.as_str(),
        "payment intent created"
    );

    Ok(IntentCreated {
        payment_id: payment.id,
        client_secret,
        amount_cents,
        payment_type,
    })
}

pub enum ConfirmOutcome {
    Succeeded(Payment),
    /// The gateway has not settled the intent yet; nothing was mutated.
    Processing,
    /// A terminal non-success gateway status. Nothing was mutated; the
    /// customer can retry with a fresh intent.
    NotCompleted(String),
}

pub async fn confirm_intent(
    state: &AppState,
    intent_id: &str,
    payment_id: &str,
) -> Result<ConfirmOutcome, AppError> {
    if intent_id.is_empty() || payment_id.is_empty() {
        return Err(AppError::Validation(
            "paymentIntentId and paymentId are required".to_string(),
        ));
    }

    {
        let db = state.db.lock().unwrap();
        let payment = queries::get_payment_by_id(&db, payment_id)
            .map_err(AppError::store)?
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id}")))?;
        if payment.intent_id != intent_id {
            tracing::warn!(
                payment_id,
                intent_id,
                recorded_intent = %payment.intent_id,
                "confirmation intent id does not match payment record"
            );
        }
    }

    let intent = state.gateway.retrieve_intent(intent_id).await.map_err(|e| {
        tracing::error!(error = %e, intent_id, "gateway intent retrieval failed");
        AppError::Gateway(e.to_string())
    })?;

    match intent.status.as_str() {
        "succeeded" => {
            let payment = apply_success(state, &intent.intent_id, intent.latest_charge.as_deref())?
                .ok_or_else(|| AppError::NotFound(format!("payment for intent {intent_id}")))?;
            Ok(ConfirmOutcome::Succeeded(payment))
        }
        "processing" => Ok(ConfirmOutcome::Processing),
        other => Ok(ConfirmOutcome::NotCompleted(other.to_string())),
    }
}

/// Idempotent success transition shared by the confirmation and webhook
/// paths. Returns the fresh payment row, or `None` when no payment exists for
/// the intent (the webhook path treats that as ignorable).
fn apply_success(
    state: &AppState,
    intent_id: &str,
    charge_id: Option<&str>,
) -> Result<Option<Payment>, AppError> {
    let db = state.db.lock().unwrap();

    let Some(payment) = queries::get_payment_by_intent(&db, intent_id).map_err(AppError::store)?
    else {
        return Ok(None);
    };

    let transitioned =
        queries::mark_payment_succeeded(&db, intent_id, charge_id).map_err(AppError::store)?;

    if transitioned {
        tracing::info!(
            payment_id = %payment.id,
            intent_id,
            "payment succeeded"
        );
        if payment.payment_type == PaymentType::Full {
            let confirmed =
                queries::confirm_booking(&db, &payment.booking_id).map_err(AppError::store)?;
            if confirmed {
                tracing::info!(booking_id = %payment.booking_id, "booking confirmed by full payment");
            }
        }
    } else if payment.status == PaymentStatus::Succeeded {
        tracing::debug!(intent_id, "success already applied, no-op");
    } else {
        // Terminal non-success state; success cannot resurrect it.
        tracing::warn!(
            intent_id,
            status = payment.status.as_str(),
            "ignoring success event for payment in terminal state"
        );
    }

    let fresh = queries::get_payment_by_intent(&db, intent_id).map_err(AppError::store)?;
    Ok(fresh)
}

#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    pub object: serde_json::Value,
}

impl GatewayEvent {
    fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }

    fn latest_charge(&self) -> Option<&str> {
        self.data.object.get("latest_charge").and_then(|v| v.as_str())
    }
}

/// Apply a verified gateway event. Store failures propagate (the provider
/// retries on 5xx); permanently inapplicable events are logged and swallowed
/// so the provider stops redelivering them.
pub fn handle_event(state: &AppState, event: &GatewayEvent) -> Result<(), AppError> {
    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let Some(intent_id) = event.object_id() else {
                tracing::warn!("succeeded event without an intent id, acknowledging");
                return Ok(());
            };
            if apply_success(state, intent_id, event.latest_charge())?.is_none() {
                tracing::info!(intent_id, "succeeded event for unknown intent, ignoring");
            }
        }
        "payment_intent.payment_failed" => {
            let Some(intent_id) = event.object_id() else {
                tracing::warn!("payment_failed event without an intent id, acknowledging");
                return Ok(());
            };
            let db = state.db.lock().unwrap();
            match queries::get_payment_by_intent(&db, intent_id).map_err(AppError::store)? {
                None => {
                    tracing::info!(intent_id, "failed event for unknown intent, ignoring");
                }
                Some(payment) => {
                    let changed =
                        queries::mark_payment_failed(&db, intent_id).map_err(AppError::store)?;
                    if changed {
                        tracing::info!(payment_id = %payment.id, intent_id, "payment failed");
                    } else {
                        tracing::debug!(
                            intent_id,
                            status = payment.status.as_str(),
                            "failed event had no effect on non-pending payment"
                        );
                    }
                }
            }
        }
        "charge.refunded" => {
            let Some(charge_id) = event.object_id() else {
                tracing::warn!("refunded event without a charge id, acknowledging");
                return Ok(());
            };
            let db = state.db.lock().unwrap();
            match queries::get_payment_by_charge(&db, charge_id).map_err(AppError::store)? {
                None => {
                    tracing::info!(charge_id, "refund event for unknown charge, ignoring");
                }
                Some(payment) => {
                    let changed =
                        queries::mark_payment_refunded(&db, charge_id).map_err(AppError::store)?;
                    if changed {
                        tracing::info!(payment_id = %payment.id, charge_id, "payment refunded");
                    } else {
                        tracing::debug!(
                            charge_id,
                            status = payment.status.as_str(),
                            "refund event had no effect"
                        );
                    }
                }
            }
        }
        other => {
            // The provider adds event types over time; acknowledge anything
            // this service does not consume.
            tracing::debug!(event_type = other, "ignoring unhandled gateway event");
        }
    }

    Ok(())
}
