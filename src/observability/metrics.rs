use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub claims_total: IntCounterVec,
    pub claim_latency_seconds: HistogramVec,
    pub offers_prepared_total: IntCounter,
    pub location_updates_total: IntCounter,
    pub location_events_total: IntCounterVec,
    pub ghost_entries_filtered_total: IntCounter,
    pub store_errors_total: IntCounterVec,
    pub expired_entries_purged_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let claim_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "claim_latency_seconds",
                "Latency of atomic claim round-trips in seconds",
            ),
            &["outcome"],
        )
        .expect("valid claim_latency_seconds metric");

        let offers_prepared_total =
            IntCounter::new("offers_prepared_total", "Offer windows prepared")
                .expect("valid offers_prepared_total metric");

        let location_updates_total =
            IntCounter::new("location_updates_total", "Accepted driver location reports")
                .expect("valid location_updates_total metric");

        let location_events_total = IntCounterVec::new(
            Opts::new(
                "location_events_total",
                "Downstream location events by delivery outcome",
            ),
            &["outcome"],
        )
        .expect("valid location_events_total metric");

        let ghost_entries_filtered_total = IntCounter::new(
            "ghost_entries_filtered_total",
            "Proximity hits discarded for lacking a live ONLINE presence lease",
        )
        .expect("valid ghost_entries_filtered_total metric");

        let store_errors_total = IntCounterVec::new(
            Opts::new("store_errors_total", "Store failures by operation"),
            &["operation"],
        )
        .expect("valid store_errors_total metric");

        let expired_entries_purged_total = IntCounter::new(
            "expired_entries_purged_total",
            "Expired presence and assignment entries reclaimed by the sweeper",
        )
        .expect("valid expired_entries_purged_total metric");

        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(claim_latency_seconds.clone()))
            .expect("register claim_latency_seconds");
        registry
            .register(Box::new(offers_prepared_total.clone()))
            .expect("register offers_prepared_total");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(location_events_total.clone()))
            .expect("register location_events_total");
        registry
            .register(Box::new(ghost_entries_filtered_total.clone()))
            .expect("register ghost_entries_filtered_total");
        registry
            .register(Box::new(store_errors_total.clone()))
            .expect("register store_errors_total");
        registry
            .register(Box::new(expired_entries_purged_total.clone()))
            .expect("register expired_entries_purged_total");

        Self {
            registry,
            claims_total,
            claim_latency_seconds,
            offers_prepared_total,
            location_updates_total,
            location_events_total,
            ghost_entries_filtered_total,
            store_errors_total,
            expired_entries_purged_total,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
