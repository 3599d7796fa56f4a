use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::services::ServiceResponse;
use crate::models::{cents_to_dollars, Booking, BookingStatus, Payment, Service};
use crate::state::AppState;

const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Accept the formats the booking form and the voice assistant send.
pub fn parse_client_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATE_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub payment_type: String,
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl PaymentResponse {
    pub fn from_payment(p: Payment) -> Self {
        Self {
            id: p.id,
            booking_id: p.booking_id,
            amount: cents_to_dollars(p.amount_cents),
            currency: p.currency,
            status: p.status.as_str().to_string(),
            payment_type: p.payment_type.as_str().to_string(),
            paid_at: p.paid_at.map(|t| t.format(DATE_FMT).to_string()),
            created_at: p.created_at.format(DATE_FMT).to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub service_id: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub scheduled_date: String,
    pub status: String,
    pub notes: Option<String>,
    pub budget: Option<String>,
    pub total_amount: f64,
    pub deposit_amount: f64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<PaymentResponse>>,
}

impl BookingResponse {
    pub fn from_booking(b: Booking) -> Self {
        Self {
            id: b.id,
            service_id: b.service_id,
            customer_name: b.customer_name,
            customer_email: b.customer_email,
            customer_phone: b.customer_phone,
            address: b.address,
            scheduled_date: b.scheduled_date.format(DATE_FMT).to_string(),
            status: b.status.as_str().to_string(),
            notes: b.notes,
            budget: b.budget,
            total_amount: cents_to_dollars(b.total_amount_cents),
            deposit_amount: cents_to_dollars(b.deposit_amount_cents),
            created_at: b.created_at.format(DATE_FMT).to_string(),
            updated_at: b.updated_at.format(DATE_FMT).to_string(),
            service: None,
            payments: None,
        }
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.service = Some(ServiceResponse::from_service(service));
        self
    }

    pub fn with_payments(mut self, payments: Vec<Payment>) -> Self {
        self.payments = Some(
            payments
                .into_iter()
                .map(PaymentResponse::from_payment)
                .collect(),
        );
        self
    }
}

// POST /api/bookings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub service_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub scheduled_date: Option<String>,
    pub notes: Option<String>,
    pub budget: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let service_id = req
        .service_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("serviceId is required".to_string()))?;
    let customer_name = req
        .customer_name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("customerName is required".to_string()))?;
    let scheduled_date = req
        .scheduled_date
        .as_deref()
        .and_then(parse_client_date)
        .ok_or_else(|| {
            AppError::Validation("scheduledDate must be a valid date-time".to_string())
        })?;

    let service = {
        let db = state.db.lock().unwrap();
        queries::get_service_by_id(&db, &service_id)
            .map_err(AppError::store)?
            .filter(|s| s.active)
            .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))?
    };

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        service_id: service.id.clone(),
        customer_name: customer_name.trim().to_string(),
        customer_email: req.customer_email,
        customer_phone: req.customer_phone,
        address: req.address,
        scheduled_date,
        status: BookingStatus::Pending,
        notes: req.notes,
        budget: req.budget,
        // Price snapshot at creation time; later service price changes do
        // not touch this booking.
        total_amount_cents: service.price_cents,
        deposit_amount_cents: service.deposit_cents(),
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, &booking).map_err(AppError::store)?;
    }

    tracing::info!(booking_id = %booking.id, service = %service.name, "booking created");

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from_booking(booking).with_service(service)),
    ))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
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

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();

    let booking = queries::get_booking_by_id(&db, &id)
        .map_err(AppError::store)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    let payments = queries::get_payments_for_booking(&db, &id).map_err(AppError::store)?;
    let service = queries::get_service_by_id(&db, &booking.service_id).map_err(AppError::store)?;

    let mut response = BookingResponse::from_booking(booking).with_payments(payments);
    if let Some(service) = service {
        response = response.with_service(service);
    }

    Ok(Json(response))
}

// PATCH /api/bookings/:id — only the allow-listed fields below are
// updatable; anything else in the body is dropped by deserialization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBookingRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub scheduled_date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub budget: Option<String>,
}

pub async fn patch_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PatchBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let scheduled_date = match req.scheduled_date.as_deref() {
        Some(raw) => Some(parse_client_date(raw).ok_or_else(|| {
            AppError::Validation("scheduledDate must be a valid date-time".to_string())
        })?),
        None => None,
    };
    let status = match req.status.as_deref() {
        Some(raw) => Some(BookingStatus::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("unknown booking status: {raw}"))
        })?),
        None => None,
    };

    let update = queries::BookingUpdate {
        customer_name: req.customer_name,
        customer_email: req.customer_email,
        customer_phone: req.customer_phone,
        address: req.address,
        scheduled_date,
        status,
        notes: req.notes,
        budget: req.budget,
    };

    let db = state.db.lock().unwrap();
    let updated = queries::update_booking(&db, &id, &update).map_err(AppError::store)?;
    if !updated {
        return Err(AppError::NotFound(format!("booking {id}")));
    }

    let booking = queries::get_booking_by_id(&db, &id)
        .map_err(AppError::store)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    Ok(Json(BookingResponse::from_booking(booking)))
}
