use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::{format_distance, haversine_km};
use crate::state::AppState;

/// First-match policy: pick any delivery person who is active and available.
/// No proximity or load balancing. The claim flips `is_available` to false
/// under the same entry lock, so two concurrent orders cannot grab the same
/// person.
pub fn claim_first_available(state: &AppState) -> Option<Uuid> {
    let candidates: Vec<Uuid> = state
        .delivery_persons
        .iter()
        .filter(|entry| entry.value().is_active && entry.value().is_available)
        .map(|entry| *entry.key())
        .collect();

    for id in candidates {
        if let Some(mut person) = state.delivery_persons.get_mut(&id) {
            // re-check under the lock: another order may have claimed them
            // between the scan and now
            if person.is_active && person.is_available {
                person.is_available = false;
                person.updated_at = Utc::now();
                return Some(id);
            }
        }
    }

    None
}

/// Frees the person for new assignments once their order reaches a terminal
/// state.
pub fn release(state: &AppState, id: Uuid) {
    match state.delivery_persons.get_mut(&id) {
        Some(mut person) => {
            person.is_available = true;
            person.updated_at = Utc::now();
        }
        None => warn!(delivery_person_id = %id, "cannot release unknown delivery person"),
    }
}

pub fn log_pickup_distance(state: &AppState, person_id: Uuid, restaurant_id: Uuid) {
    let Some(person) = state.delivery_persons.get(&person_id) else {
        return;
    };
    let Some(restaurant) = state.restaurants.get(&restaurant_id) else {
        return;
    };

    let km = haversine_km(&person.location, &restaurant.location);
    info!(
        delivery_person_id = %person_id,
        restaurant_id = %restaurant_id,
        pickup_distance = %format_distance(km),
        "delivery person assigned"
    );
}
