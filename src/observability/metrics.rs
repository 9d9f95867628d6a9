use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_placed_total: IntCounter,
    pub status_transitions_total: IntCounterVec,
    pub otp_verifications_total: IntCounterVec,
    pub assignments_total: IntCounterVec,
    pub notifications_pending: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_placed_total =
            IntCounter::new("orders_placed_total", "Total orders accepted at placement")
                .expect("valid orders_placed_total metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Successful order status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid status_transitions_total metric");

        let otp_verifications_total = IntCounterVec::new(
            Opts::new(
                "otp_verifications_total",
                "Delivery OTP verification attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("valid otp_verifications_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new(
                "assignments_total",
                "Delivery assignment attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let notifications_pending = IntGauge::new(
            "notifications_pending",
            "Notifications queued for dispatch",
        )
        .expect("valid notifications_pending metric");

        registry
            .register(Box::new(orders_placed_total.clone()))
            .expect("register orders_placed_total");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(otp_verifications_total.clone()))
            .expect("register otp_verifications_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(notifications_pending.clone()))
            .expect("register notifications_pending");

        Self {
            registry,
            orders_placed_total,
            status_transitions_total,
            otp_verifications_total,
            assignments_total,
            notifications_pending,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
