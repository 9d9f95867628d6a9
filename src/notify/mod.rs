use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Outbound event for the external notification service. Published after a
/// successful order mutation; delivery is best-effort and at-most-once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: String,
    pub status: OrderStatus,
    pub customer_email: String,
    pub message: String,
}

impl OrderEvent {
    pub fn status_changed(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            status: order.status,
            customer_email: order.customer.email.clone(),
            message: status_message(order.status).to_string(),
        }
    }
}

fn status_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Placed => "Your order has been placed",
        OrderStatus::Accepted => "The restaurant has accepted your order",
        OrderStatus::Preparing => "Your order is being prepared",
        OrderStatus::ReadyForDelivery => "Your order is ready for pickup",
        OrderStatus::OutForDelivery => "Your order is out for delivery",
        OrderStatus::Delivered => "Your order has been delivered",
        OrderStatus::Cancelled => "Your order has been cancelled",
    }
}

/// Never blocks and never fails the calling mutation. A full queue drops the
/// event with a warning.
pub fn dispatch(state: &AppState, event: OrderEvent) {
    match state.notify_tx.try_send(event) {
        Ok(()) => state.metrics.notifications_pending.inc(),
        Err(err) => warn!(error = %err, "notification dropped"),
    }
}

pub async fn run_notification_worker(
    state: Arc<AppState>,
    mut notify_rx: mpsc::Receiver<OrderEvent>,
    webhook_url: Option<String>,
) {
    info!("notification worker started");
    let client = reqwest::Client::new();

    while let Some(event) = notify_rx.recv().await {
        state.metrics.notifications_pending.dec();

        let Some(url) = webhook_url.as_deref() else {
            debug!(order_id = %event.order_id, status = %event.status, "no webhook configured; notification skipped");
            continue;
        };

        match client.post(url).json(&event).send().await {
            Ok(response) => {
                if let Err(err) = response.error_for_status() {
                    warn!(order_id = %event.order_id, error = %err, "notification service rejected event");
                }
            }
            Err(err) => {
                warn!(order_id = %event.order_id, error = %err, "notification dispatch failed");
            }
        }
    }

    warn!("notification worker stopped: queue channel closed");
}
