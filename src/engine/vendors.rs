use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub vendor_id: Uuid,
    pub is_live: bool,
    pub restaurant_id: Uuid,
    pub is_open: bool,
}

/// `Vendor.is_live` and `Restaurant.is_open` always move together; this is
/// the only write path for either flag.
pub fn set_live(state: &AppState, vendor_id: Uuid, live: bool) -> Result<LiveStatus, AppError> {
    let mut vendor = state
        .vendors
        .get_mut(&vendor_id)
        .ok_or_else(|| AppError::NotFound(format!("vendor {vendor_id} not found")))?;

    vendor.is_live = live;
    let restaurant_id = vendor.restaurant_id;

    match state.restaurants.get_mut(&restaurant_id) {
        Some(mut restaurant) => restaurant.is_open = live,
        // registration creates the pair together, so this indicates a corrupt store
        None => warn!(vendor_id = %vendor_id, restaurant_id = %restaurant_id,
            "vendor has no restaurant to mirror live status onto"),
    }

    info!(vendor_id = %vendor_id, live, "vendor live status changed");

    Ok(LiveStatus {
        vendor_id,
        is_live: live,
        restaurant_id,
        is_open: live,
    })
}

pub fn toggle_live(state: &AppState, vendor_id: Uuid) -> Result<LiveStatus, AppError> {
    let current = state
        .vendors
        .get(&vendor_id)
        .map(|vendor| vendor.is_live)
        .ok_or_else(|| AppError::NotFound(format!("vendor {vendor_id} not found")))?;

    set_live(state, vendor_id, !current)
}
