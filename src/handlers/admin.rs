use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::bookings::{BookingResponse, BookingsQuery};
use crate::handlers::services::ServiceResponse;
use crate::models::{dollars_to_cents, PaymentStatus, Service};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/bookings — triage list for staff
pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50);
    let status_filter = query.status.as_deref();

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_all_bookings(&db, status_filter, limit).map_err(AppError::store)?
    };

    Ok(Json(
        bookings
            .into_iter()
            .map(BookingResponse::from_booking)
            .collect(),
    ))
}

// POST /api/admin/services
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price: Option<f64>,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("name is required".to_string()))?;
    let price = req
        .price
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| AppError::Validation("price must be a positive value".to_string()))?;

    let db = state.db.lock().unwrap();

    if queries::get_service_by_name(&db, &name)
        .map_err(AppError::store)?
        .is_some()
    {
        return Err(AppError::Validation(format!(
            "service name already exists: {name}"
        )));
    }

    let service = Service {
        id: Uuid::new_v4().to_string(),
        name,
        description: req.description.unwrap_or_default(),
        duration_minutes: req.duration_minutes.unwrap_or(60),
        price_cents: dollars_to_cents(price),
        active: true,
        created_at: Utc::now().naive_utc(),
    };

    queries::create_service(&db, &service).map_err(AppError::store)?;
    tracing::info!(service_id = %service.id, name = %service.name, "service created");

    Ok(Json(ServiceResponse::from_service(service)))
}

// POST /api/admin/services/:id/deactivate — services are never hard-deleted
// while bookings reference them; this hides them from the public list.
pub async fn deactivate_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let deactivated = {
        let db = state.db.lock().unwrap();
        queries::set_service_active(&db, &id, false).map_err(AppError::store)?
    };
    if !deactivated {
        return Err(AppError::NotFound(format!("service {id}")));
    }

    tracing::info!(service_id = %id, "service deactivated");
    Ok(Json(serde_json::json!({ "deactivated": true })))
}

// POST /api/admin/payments/:id/refund
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund_id: String,
    pub payment_id: String,
    pub status: String,
}

pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<RefundResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let payment = {
        let db = state.db.lock().unwrap();
        queries::get_payment_by_id(&db, &id)
            .map_err(AppError::store)?
            .ok_or_else(|| AppError::NotFound(format!("payment {id}")))?
    };

    if payment.status != PaymentStatus::Succeeded {
        return Err(AppError::Validation(format!(
            "only succeeded payments can be refunded (status: {})",
            payment.status.as_str()
        )));
    }

    let refund_id = state
        .gateway
        .create_refund(&payment.intent_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, payment_id = %id, "gateway refund failed");
            AppError::Gateway(e.to_string())
        })?;

    // The payment row flips to refunded when the charge.refunded webhook
    // arrives; until then it stays succeeded.
    tracing::info!(payment_id = %id, refund_id = %refund_id, "refund requested");

    Ok(Json(RefundResponse {
        refund_id,
        payment_id: id,
        status: "pending".to_string(),
    }))
}
