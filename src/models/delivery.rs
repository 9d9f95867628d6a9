use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Append-only earnings accumulators, credited on delivery completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Earnings {
    pub total: f64,
    pub month: f64,
    pub week: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub total_deliveries: u32,
    pub completed_deliveries: u32,
    pub cancelled_deliveries: u32,
    pub average_rating: f64,
    pub total_ratings: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPerson {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    pub is_available: bool,
    pub location: GeoPoint,
    /// Percentage of the order total credited to this person per completed delivery.
    pub commission_rate: f64,
    pub earnings: Earnings,
    pub stats: DeliveryStats,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryPerson {
    pub fn credit_delivery(&mut self, order_total: f64) {
        let commission = order_total * self.commission_rate / 100.0;
        self.earnings.total += commission;
        self.earnings.month += commission;
        self.earnings.week += commission;
        self.stats.total_deliveries += 1;
        self.stats.completed_deliveries += 1;
    }

    pub fn record_cancellation(&mut self) {
        self.stats.total_deliveries += 1;
        self.stats.cancelled_deliveries += 1;
    }

    pub fn record_rating(&mut self, rating: f64) {
        let accumulated = self.stats.average_rating * self.stats.total_ratings as f64 + rating;
        self.stats.total_ratings += 1;
        self.stats.average_rating = accumulated / self.stats.total_ratings as f64;
    }
}
