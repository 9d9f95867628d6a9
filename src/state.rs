use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::delivery::DeliveryPerson;
use crate::models::order::Order;
use crate::models::restaurant::{Restaurant, Vendor};
use crate::notify::OrderEvent;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub vendors: DashMap<Uuid, Vendor>,
    pub restaurants: DashMap<Uuid, Restaurant>,
    pub delivery_persons: DashMap<Uuid, DeliveryPerson>,
    pub orders: DashMap<String, Order>,
    pub notify_tx: mpsc::Sender<OrderEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(notify_queue_size: usize) -> (Self, mpsc::Receiver<OrderEvent>) {
        let (notify_tx, notify_rx) = mpsc::channel(notify_queue_size);

        (
            Self {
                vendors: DashMap::new(),
                restaurants: DashMap::new(),
                delivery_persons: DashMap::new(),
                orders: DashMap::new(),
                notify_tx,
                metrics: Metrics::new(),
            },
            notify_rx,
        )
    }
}
