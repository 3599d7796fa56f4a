use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{cents_to_dollars, Service};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i32,
    pub price: f64,
}

impl ServiceResponse {
    pub fn from_service(s: Service) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            duration_minutes: s.duration_minutes,
            price: cents_to_dollars(s.price_cents),
        }
    }
}

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let services = {
        let db = state.db.lock().unwrap();
        queries::list_active_services(&db).map_err(AppError::store)?
    };

    Ok(Json(
        services
            .into_iter()
            .map(ServiceResponse::from_service)
            .collect(),
    ))
}
