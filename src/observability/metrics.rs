use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub delivery_transitions_total: IntCounterVec,
    pub active_deliveries: IntGauge,
    pub rider_success_rate: GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of assignment processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let delivery_transitions_total = IntCounterVec::new(
            Opts::new(
                "delivery_transitions_total",
                "Successful delivery state transitions by target state",
            ),
            &["transition"],
        )
        .expect("valid delivery_transitions_total metric");

        let active_deliveries = IntGauge::new(
            "active_deliveries",
            "Deliveries currently between assignment and a terminal state",
        )
        .expect("valid active_deliveries metric");

        let rider_success_rate = GaugeVec::new(
            Opts::new("rider_success_rate", "Rider success rate [0..1]"),
            &["rider_id"],
        )
        .expect("valid rider_success_rate metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(delivery_transitions_total.clone()))
            .expect("register delivery_transitions_total");
        registry
            .register(Box::new(active_deliveries.clone()))
            .expect("register active_deliveries");
        registry
            .register(Box::new(rider_success_rate.clone()))
            .expect("register rider_success_rate");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            delivery_transitions_total,
            active_deliveries,
            rider_success_rate,
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
