use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::api::auth::{Actor, Role};
use crate::engine::{assignment, otp};
use crate::error::AppError;
use crate::models::order::{CustomerInfo, Order, OrderItem, OrderStatus, Otp, PaymentMethod};
use crate::notify::{self, OrderEvent};
use crate::state::AppState;

/// Monetary amounts are compared to the paisa.
const AMOUNT_EPSILON: f64 = 0.01;

const ETA_MIN_MINUTES: i64 = 30;
const ETA_MAX_MINUTES: i64 = 45;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub restaurant_id: Uuid,
    pub customer_info: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
}

fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() < AMOUNT_EPSILON
}

fn new_order_id() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD-{}{suffix:04}", Utc::now().timestamp_millis())
}

/// Creates an order in `Placed` state, or rejects it when the restaurant is
/// closed, the vendor is offline, the minimum order is not met, or the
/// amounts are inconsistent.
pub fn place_order(state: &AppState, req: NewOrder) -> Result<Order, AppError> {
    if req.items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }

    for item in &req.items {
        if item.quantity == 0 {
            return Err(AppError::Validation(format!(
                "quantity for '{}' must be at least 1",
                item.name
            )));
        }
        if !amounts_match(item.line_total, item.unit_price * item.quantity as f64) {
            return Err(AppError::Validation(format!(
                "line total mismatch for '{}'",
                item.name
            )));
        }
    }

    let items_total: f64 = req.items.iter().map(|item| item.line_total).sum();
    if !amounts_match(req.subtotal, items_total) {
        return Err(AppError::Validation(
            "subtotal does not match item totals".to_string(),
        ));
    }

    let restaurant = state
        .restaurants
        .get(&req.restaurant_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("restaurant {} not found", req.restaurant_id)))?;

    let vendor_live = state
        .vendors
        .get(&restaurant.vendor_id)
        .map(|entry| entry.value().is_live)
        .ok_or_else(|| {
            AppError::NotFound(format!("vendor for restaurant {} not found", restaurant.id))
        })?;

    if !restaurant.is_open {
        return Err(AppError::Validation(
            "restaurant is currently closed".to_string(),
        ));
    }

    if !vendor_live {
        return Err(AppError::Validation(
            "restaurant is not accepting orders right now".to_string(),
        ));
    }

    if req.subtotal + AMOUNT_EPSILON < restaurant.min_order {
        return Err(AppError::MinOrderNotMet {
            min_order: restaurant.min_order,
            subtotal: req.subtotal,
        });
    }

    if !amounts_match(req.total_amount, req.subtotal + restaurant.delivery_fee) {
        return Err(AppError::Validation(
            "total amount must equal subtotal plus delivery fee".to_string(),
        ));
    }

    let now = Utc::now();
    let order = Order {
        order_id: new_order_id(),
        restaurant_id: restaurant.id,
        customer: req.customer_info,
        items: req.items,
        subtotal: req.subtotal,
        delivery_fee: restaurant.delivery_fee,
        total_amount: req.total_amount,
        payment_method: req.payment_method,
        status: OrderStatus::Placed,
        delivery_person_id: None,
        otp: Some(otp::generate()),
        estimated_delivery_time: None,
        actual_delivery_time: None,
        rating: None,
        review: None,
        cancellation_reason: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(order.order_id.clone(), order.clone());
    state.metrics.orders_placed_total.inc();
    notify::dispatch(state, OrderEvent::status_changed(&order));

    Ok(order)
}

/// Moves an order to `target` and runs the entry side effects. Terminal
/// orders reject every further transition; beyond that the graph is
/// deliberately permissive and intermediate steps may be skipped.
///
/// The whole transition runs under the order's map entry lock, so a
/// concurrent request observes either the old or the new state, never a
/// half-applied one.
pub fn advance(
    state: &AppState,
    order_id: &str,
    target: OrderStatus,
    rating: Option<f64>,
) -> Result<Order, AppError> {
    apply_transition(state, order_id, target, rating, None)
}

fn apply_transition(
    state: &AppState,
    order_id: &str,
    target: OrderStatus,
    rating: Option<f64>,
    cancellation_reason: Option<String>,
) -> Result<Order, AppError> {
    let updated = {
        let mut entry = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        let order = entry.value_mut();

        if order.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "order {} is already {}",
                order.order_id, order.status
            )));
        }

        let now = Utc::now();

        match target {
            OrderStatus::OutForDelivery => {
                if order.delivery_person_id.is_none() {
                    match assignment::claim_first_available(state) {
                        Some(person_id) => {
                            order.delivery_person_id = Some(person_id);
                            state
                                .metrics
                                .assignments_total
                                .with_label_values(&["assigned"])
                                .inc();
                            assignment::log_pickup_distance(state, person_id, order.restaurant_id);
                        }
                        None => {
                            state
                                .metrics
                                .assignments_total
                                .with_label_values(&["unassigned"])
                                .inc();
                            warn!(
                                order_id = %order.order_id,
                                "no delivery person available; order goes out unassigned"
                            );
                        }
                    }
                }

                if order.estimated_delivery_time.is_none() {
                    let eta = rand::thread_rng().gen_range(ETA_MIN_MINUTES..=ETA_MAX_MINUTES);
                    order.estimated_delivery_time = Some(now + Duration::minutes(eta));
                }
            }
            OrderStatus::Delivered => {
                order.actual_delivery_time = Some(now);
                // the OTP only exists while hand-off confirmation is pending
                order.otp = None;

                if let Some(person_id) = order.delivery_person_id {
                    if let Some(mut person) = state.delivery_persons.get_mut(&person_id) {
                        person.credit_delivery(order.total_amount);
                        if let Some(rating) = rating {
                            person.record_rating(rating);
                        }
                        person.is_available = true;
                        person.updated_at = now;
                    }
                }
            }
            OrderStatus::Cancelled => {
                order.cancellation_reason = cancellation_reason;
                order.is_active = false;

                // earnings already credited stay credited; only the stats and
                // availability change
                if let Some(person_id) = order.delivery_person_id {
                    if let Some(mut person) = state.delivery_persons.get_mut(&person_id) {
                        person.record_cancellation();
                    }
                    assignment::release(state, person_id);
                }
            }
            _ => {}
        }

        order.status = target;
        order.updated_at = now;

        state
            .metrics
            .status_transitions_total
            .with_label_values(&[&target.to_string()])
            .inc();

        order.clone()
    };

    notify::dispatch(state, OrderEvent::status_changed(&updated));
    Ok(updated)
}

/// Cancellation is the one gated transition: only the customer who placed the
/// order (matched by email) or the vendor owning its restaurant may cancel.
pub fn cancel(
    state: &AppState,
    order_id: &str,
    actor: &Actor,
    reason: Option<String>,
) -> Result<Order, AppError> {
    let (customer_email, restaurant_id) = {
        let order = state
            .orders
            .get(order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        (order.customer.email.clone(), order.restaurant_id)
    };

    let authorized = match actor.role {
        Role::Customer => actor.email.as_deref() == Some(customer_email.as_str()),
        Role::Vendor => state
            .restaurants
            .get(&restaurant_id)
            .is_some_and(|restaurant| actor.id == Some(restaurant.vendor_id)),
        Role::Delivery | Role::Admin => false,
    };

    if !authorized {
        return Err(AppError::Forbidden(
            "you are not allowed to cancel this order".to_string(),
        ));
    }

    let reason = reason.unwrap_or_else(|| format!("Cancelled by {}", actor.role));
    apply_transition(state, order_id, OrderStatus::Cancelled, None, Some(reason))
}

/// Verifies the hand-off code and, on success, completes the order. The OTP
/// check itself never mutates the code; the `Delivered` transition clears it.
pub fn confirm_delivery(state: &AppState, order_id: &str, candidate: &str) -> Result<Order, AppError> {
    let valid = {
        let order = state
            .orders
            .get(order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        otp::verify(order.otp.as_ref(), candidate)
    };

    if !valid {
        state
            .metrics
            .otp_verifications_total
            .with_label_values(&["invalid"])
            .inc();
        return Err(AppError::OtpInvalidOrExpired);
    }

    state
        .metrics
        .otp_verifications_total
        .with_label_values(&["valid"])
        .inc();

    advance(state, order_id, OrderStatus::Delivered, None)
}

/// Overwrites any existing code. Used by the delivery-person helper endpoint.
pub fn issue_otp(state: &AppState, order_id: &str) -> Result<Otp, AppError> {
    set_otp(state, order_id, |_| Ok(otp::generate()))
}

/// Re-issues only when the previous code is missing or expired.
pub fn resend_otp(state: &AppState, order_id: &str) -> Result<Otp, AppError> {
    set_otp(state, order_id, |existing| otp::resend(existing))
}

fn set_otp(
    state: &AppState,
    order_id: &str,
    make: impl FnOnce(Option<&Otp>) -> Result<Otp, AppError>,
) -> Result<Otp, AppError> {
    let mut entry = state
        .orders
        .get_mut(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if order.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "order {} is already {}",
            order.order_id, order.status
        )));
    }

    let fresh = make(order.otp.as_ref())?;
    order.otp = Some(fresh.clone());
    order.updated_at = Utc::now();
    Ok(fresh)
}

/// One rating per order, only after delivery. Feeds the delivery person's
/// rating accumulator.
pub fn rate(
    state: &AppState,
    order_id: &str,
    rating: u8,
    review: Option<String>,
) -> Result<Order, AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let mut entry = state
        .orders
        .get_mut(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if order.status != OrderStatus::Delivered {
        return Err(AppError::InvalidTransition(
            "only delivered orders can be rated".to_string(),
        ));
    }

    if order.rating.is_some() {
        return Err(AppError::InvalidTransition(
            "order has already been rated".to_string(),
        ));
    }

    order.rating = Some(rating);
    order.review = review;
    order.updated_at = Utc::now();

    if let Some(person_id) = order.delivery_person_id {
        if let Some(mut person) = state.delivery_persons.get_mut(&person_id) {
            person.record_rating(rating as f64);
        }
    }

    Ok(order.clone())
}
