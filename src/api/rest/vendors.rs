use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::vendors::{self, LiveStatus};
use crate::error::AppError;
use crate::models::delivery::GeoPoint;
use crate::models::restaurant::{Restaurant, Vendor};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vendors", post(register_vendor))
        .route("/vendors/:id/go-live", patch(go_live))
        .route("/vendors/:id/go-offline", patch(go_offline))
        .route("/vendors/:id/toggle-live", patch(toggle_live))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVendorRequest {
    pub name: String,
    pub email: String,
    pub restaurant: RestaurantPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantPayload {
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub min_order: f64,
    pub delivery_fee: f64,
}

#[derive(Serialize)]
pub struct VendorRegistered {
    pub vendor: Vendor,
    pub restaurant: Restaurant,
}

/// Registers the vendor together with its single owned restaurant; the pair
/// starts live/open.
async fn register_vendor(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterVendorRequest>,
) -> Result<(StatusCode, Json<VendorRegistered>), AppError> {
    if payload.name.trim().is_empty() || payload.restaurant.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    if payload.restaurant.min_order < 0.0 || payload.restaurant.delivery_fee < 0.0 {
        return Err(AppError::Validation(
            "minimum order and delivery fee cannot be negative".to_string(),
        ));
    }

    let vendor_id = Uuid::new_v4();
    let restaurant_id = Uuid::new_v4();

    let vendor = Vendor {
        id: vendor_id,
        name: payload.name,
        email: payload.email,
        is_live: true,
        restaurant_id,
    };
    let restaurant = Restaurant {
        id: restaurant_id,
        vendor_id,
        name: payload.restaurant.name,
        address: payload.restaurant.address,
        location: payload.restaurant.location,
        is_open: true,
        min_order: payload.restaurant.min_order,
        delivery_fee: payload.restaurant.delivery_fee,
    };

    state.vendors.insert(vendor_id, vendor.clone());
    state.restaurants.insert(restaurant_id, restaurant.clone());

    Ok((
        StatusCode::CREATED,
        Json(VendorRegistered { vendor, restaurant }),
    ))
}

async fn go_live(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LiveStatus>, AppError> {
    Ok(Json(vendors::set_live(&state, id, true)?))
}

async fn go_offline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LiveStatus>, AppError> {
    Ok(Json(vendors::set_live(&state, id, false)?))
}

async fn toggle_live(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LiveStatus>, AppError> {
    Ok(Json(vendors::toggle_live(&state, id)?))
}
