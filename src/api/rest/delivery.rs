use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::engine::lifecycle;
use crate::error::AppError;
use crate::models::delivery::{DeliveryPerson, DeliveryStats, Earnings, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery", post(register_delivery_person).get(list_delivery_persons))
        .route("/delivery/:id/status", patch(update_status))
        .route("/delivery/:id/location", patch(update_location))
        // OTP helpers take the order id, not the delivery person id
        .route("/delivery/:id/generate-otp", post(generate_otp))
        .route("/delivery/:id/resend-otp", post(resend_otp))
        .route("/delivery/:id/verify-otp", post(verify_otp))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub location: GeoPoint,
    pub commission_rate: f64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStatusRequest {
    pub is_active: Option<bool>,
    pub is_available: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub otp: String,
}

async fn register_delivery_person(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<DeliveryPerson>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    if !(0.0..=100.0).contains(&payload.commission_rate) {
        return Err(AppError::Validation(
            "commission rate must be between 0 and 100".to_string(),
        ));
    }

    let person = DeliveryPerson {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        is_active: true,
        is_available: true,
        location: payload.location,
        commission_rate: payload.commission_rate,
        earnings: Earnings::default(),
        stats: DeliveryStats::default(),
        updated_at: Utc::now(),
    };

    state.delivery_persons.insert(person.id, person.clone());
    Ok((StatusCode::CREATED, Json(person)))
}

async fn list_delivery_persons(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryPerson>> {
    let persons = state
        .delivery_persons
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(persons)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<DeliveryPerson>, AppError> {
    let mut person = state
        .delivery_persons
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery person {id} not found")))?;

    if let Some(is_active) = payload.is_active {
        person.is_active = is_active;
    }
    if let Some(is_available) = payload.is_available {
        person.is_available = is_available;
    }
    person.updated_at = Utc::now();

    Ok(Json(person.clone()))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<DeliveryPerson>, AppError> {
    let mut person = state
        .delivery_persons
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery person {id} not found")))?;

    person.location = payload.location;
    person.updated_at = Utc::now();

    Ok(Json(person.clone()))
}

async fn generate_otp(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let otp = lifecycle::issue_otp(&state, &order_id)?;

    Ok(Json(json!({
        "orderId": order_id,
        "otp": otp.code,
        "expiresAt": otp.expires_at,
    })))
}

async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let otp = lifecycle::resend_otp(&state, &order_id)?;

    Ok(Json(json!({
        "orderId": order_id,
        "otp": otp.code,
        "expiresAt": otp.expires_at,
    })))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let order = lifecycle::confirm_delivery(&state, &order_id, &payload.otp)?;

    Ok(Json(json!({
        "orderId": order.order_id,
        "status": order.status,
        "actualDeliveryTime": order.actual_delivery_time,
    })))
}
