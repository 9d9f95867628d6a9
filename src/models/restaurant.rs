use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::GeoPoint;

/// A vendor owns exactly one restaurant. `is_live` mirrors the restaurant's
/// `is_open` flag; both are written together by the go-live toggle, never
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_live: bool,
    pub restaurant_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub is_open: bool,
    pub min_order: f64,
    pub delivery_fee: f64,
}
