//! Prometheus metrics registry. Grounded on the teacher's
//! `metrics::registry::Metrics`: same `PrometheusBuilder` + `describe_*`
//! install pattern, metric names swapped for this proxy's domain. The
//! spec's Non-goals exclude caching/DNSSEC/rate-limiting/coordination —
//! they do not exclude observability, so this ambient concern is carried
//! regardless (SPEC_FULL.md §4.10).

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const LATENCY_BUCKETS_MS: &[f64] = &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 3000.0];
const DURATION_BUCKETS_SECS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 3.0];

#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric
    /// descriptions. Must be called once at startup before any
    /// `counter!`/`gauge!`/`histogram!` call.
    pub fn install() -> Self {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full("doh_dispatch_winner_latency_ms".to_string()),
                LATENCY_BUCKETS_MS,
            )
            .expect("valid matcher")
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full("doh_request_duration_seconds".to_string()),
                DURATION_BUCKETS_SECS,
            )
            .expect("valid matcher")
            .install_recorder()
            .expect("failed to install metrics recorder");

        describe_counter!("doh_requests_total", Unit::Count, "Total DoH requests processed");
        describe_histogram!(
            "doh_request_duration_seconds",
            Unit::Seconds,
            "Total request duration from client perspective"
        );
        describe_histogram!(
            "doh_dispatch_winner_latency_ms",
            Unit::Milliseconds,
            "Elapsed time of the winning upstream launch, per region"
        );
        describe_counter!(
            "doh_dispatch_timeouts_total",
            Unit::Count,
            "Safety-timeout firings with no acceptable response"
        );
        describe_counter!(
            "doh_upstream_launches_total",
            Unit::Count,
            "Settled upstream launches, by outcome"
        );
        describe_gauge!(
            "doh_latency_table_entries",
            Unit::Count,
            "Total (region, upstream) pairs with at least one latency observation"
        );

        Self { handle }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}
