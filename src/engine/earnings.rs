use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// Platform revenue share per order, applied to the order total.
pub const COMMISSION_RATE_PERCENT: f64 = 10.0;
/// Flat platform fee collected per order, separate from commission.
pub const DELIVERY_CHARGE: f64 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl Period {
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::All => None,
            Period::Today => Some(
                now.date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is a valid time")
                    .and_utc(),
            ),
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(now - Duration::days(30)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantEarnings {
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub vendor_name: String,
    pub order_count: u64,
    pub revenue: f64,
    pub commission: f64,
    pub delivery_charges: f64,
    pub total_earnings: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub total_commission: f64,
    pub total_delivery_charges: f64,
    pub total_earnings: f64,
    pub average_order_value: f64,
    pub average_earnings_per_order: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    pub period: Period,
    pub restaurants: Vec<RestaurantEarnings>,
    pub summary: EarningsSummary,
}

/// Pure read-side aggregation over the order store; nothing here is
/// persisted. Cancelled (soft-deleted) orders fall out via `is_active`;
/// orders whose restaurant has no resolvable vendor are skipped, not fatal.
pub fn aggregate(state: &AppState, period: Period) -> EarningsReport {
    let window_start = period.window_start(Utc::now());
    let mut per_restaurant: HashMap<Uuid, RestaurantEarnings> = HashMap::new();

    for entry in state.orders.iter() {
        let order = entry.value();

        if !order.is_active {
            continue;
        }
        if let Some(start) = window_start {
            if order.created_at < start {
                continue;
            }
        }

        let Some(restaurant) = state
            .restaurants
            .get(&order.restaurant_id)
            .map(|r| r.value().clone())
        else {
            warn!(order_id = %order.order_id, restaurant_id = %order.restaurant_id,
                "skipping order: restaurant not found");
            continue;
        };

        let Some(vendor_name) = state
            .vendors
            .get(&restaurant.vendor_id)
            .map(|v| v.value().name.clone())
        else {
            warn!(order_id = %order.order_id, vendor_id = %restaurant.vendor_id,
                "skipping order: owning vendor not found");
            continue;
        };

        let row = per_restaurant
            .entry(restaurant.id)
            .or_insert_with(|| RestaurantEarnings {
                restaurant_id: restaurant.id,
                restaurant_name: restaurant.name.clone(),
                vendor_name,
                order_count: 0,
                revenue: 0.0,
                commission: 0.0,
                delivery_charges: 0.0,
                total_earnings: 0.0,
            });

        let commission = order.total_amount * COMMISSION_RATE_PERCENT / 100.0;
        row.order_count += 1;
        row.revenue += order.total_amount;
        row.commission += commission;
        row.delivery_charges += DELIVERY_CHARGE;
        row.total_earnings += commission + DELIVERY_CHARGE;
    }

    let mut restaurants: Vec<RestaurantEarnings> = per_restaurant.into_values().collect();
    restaurants.sort_by(|a, b| b.total_earnings.total_cmp(&a.total_earnings));

    let total_orders: u64 = restaurants.iter().map(|r| r.order_count).sum();
    let total_revenue: f64 = restaurants.iter().map(|r| r.revenue).sum();
    let total_commission: f64 = restaurants.iter().map(|r| r.commission).sum();
    let total_delivery_charges: f64 = restaurants.iter().map(|r| r.delivery_charges).sum();
    let total_earnings: f64 = restaurants.iter().map(|r| r.total_earnings).sum();

    let summary = EarningsSummary {
        total_orders,
        total_revenue,
        total_commission,
        total_delivery_charges,
        total_earnings,
        average_order_value: safe_div(total_revenue, total_orders),
        average_earnings_per_order: safe_div(total_earnings, total_orders),
    };

    EarningsReport {
        period,
        restaurants,
        summary,
    }
}

fn safe_div(numerator: f64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}
