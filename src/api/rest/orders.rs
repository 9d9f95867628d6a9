use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::auth::Actor;
use crate::engine::lifecycle::{self, NewOrder};
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", patch(update_status))
        .route("/orders/:id/verify-otp", post(verify_otp))
        .route("/orders/:id/cancel", patch(cancel_order))
        .route("/orders/:id/rate", post(rate_order))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub otp: String,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: u8,
    pub review: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewOrder>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let order = lifecycle::place_order(&state, payload)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "orderId": order.order_id,
            "totalAmount": order.total_amount,
            "estimatedDeliveryTime": order.estimated_delivery_time,
            "otp": order.otp.as_ref().map(|otp| otp.code.clone()),
        })),
    ))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Option<Actor>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let order = if payload.status == OrderStatus::Cancelled {
        // cancellation keeps its authorization gate no matter which endpoint
        // carries it
        let actor = actor.ok_or_else(|| {
            AppError::Forbidden("cancellation requires an authenticated actor".to_string())
        })?;
        lifecycle::cancel(&state, &id, &actor, None)?
    } else {
        lifecycle::advance(&state, &id, payload.status, None)?
    };

    Ok(Json(json!({
        "orderId": order.order_id,
        "status": order.status,
        "estimatedDeliveryTime": order.estimated_delivery_time,
    })))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let order = lifecycle::confirm_delivery(&state, &id, &payload.otp)?;

    Ok(Json(json!({
        "orderId": order.order_id,
        "status": order.status,
        "actualDeliveryTime": order.actual_delivery_time,
    })))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Value>, AppError> {
    let order = lifecycle::cancel(&state, &id, &actor, payload.reason)?;

    Ok(Json(json!({
        "orderId": order.order_id,
        "status": order.status,
        "cancellationReason": order.cancellation_reason,
    })))
}

async fn rate_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<Value>, AppError> {
    let order = lifecycle::rate(&state, &id, payload.rating, payload.review)?;

    Ok(Json(json!({
        "orderId": order.order_id,
        "rating": order.rating,
        "review": order.review,
    })))
}
