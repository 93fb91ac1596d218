use std::sync::LazyLock;

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry,
};
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Registry as PrometheusRegistry, TextEncoder,
};
use tracing::error;

pub static METRICS_PROVIDER: LazyLock<MetricsProvider> = LazyLock::new(|| {
    MetricsProvider::new()
        .unwrap_or_else(|error| panic!("Unable to create metrics provider: {error}"))
});

pub struct MetricsProvider {
    registry: PrometheusRegistry,
    /// Outcome of every login, labelled by strategy and result kind.
    pub login_attempts: IntCounterVec,
    /// Outcome of every realm consulted, labelled by realm and result kind.
    pub realm_attempts: IntCounterVec,
    pub realm_query_duration: HistogramVec,
    pub logins_in_flight: IntGauge,
}

impl MetricsProvider {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = PrometheusRegistry::new();

        let login_attempts = register_int_counter_vec_with_registry!(
            "login_attempts_total",
            "Total number of login attempts.",
            &["strategy", "result"],
            &registry
        )
        .inspect_err(|error| error!("Unable to create login_attempts_total metric: {error}"))?;

        let realm_attempts = register_int_counter_vec_with_registry!(
            "realm_attempts_total",
            "Total number of realm consultations.",
            &["realm", "result"],
            &registry
        )
        .inspect_err(|error| error!("Unable to create realm_attempts_total metric: {error}"))?;

        let realm_query_duration = register_histogram_vec_with_registry!(
            "realm_query_duration_seconds",
            "Latency of realm account lookups in seconds.",
            &["realm"],
            &registry
        )
        .inspect_err(|error| {
            error!("Unable to create realm_query_duration_seconds metric: {error}");
        })?;

        let logins_in_flight = register_int_gauge_with_registry!(
            "logins_in_flight",
            "The current number of in-flight login attempts.",
            &registry
        )
        .inspect_err(|error| error!("Unable to create logins_in_flight metric: {error}"))?;

        Ok(Self {
            registry,
            login_attempts,
            realm_attempts,
            realm_query_duration,
            logins_in_flight,
        })
    }

    /// Renders every registered metric in the prometheus text format.
    pub fn gather(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let mut buffer = vec![];
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
