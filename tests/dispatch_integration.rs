//! End-to-end tests for the racing dispatcher (spec §8's "end-to-end
//! scenarios"). No external services required. Dispatch always dials its
//! upstreams over HTTPS with a webpki root store, so a same-process mock
//! server can't stand in for a real upstream here — these tests instead
//! drive `dispatch()` against upstream lists with no live listener and
//! check that it settles correctly rather than hanging, plus the ordering
//! contract the Latency Table feeds into dispatch.

use doh_race_proxy::client::build_https_client;
use doh_race_proxy::dispatch::{dispatch, Payload};
use doh_race_proxy::latency::LatencyTable;
use hyper::StatusCode;

#[tokio::test]
async fn latency_table_orders_dispatch_candidates_by_observed_speed() {
    let table = LatencyTable::new();
    table.observe("GLOBAL", "fast.example/dns-query", 5.0);
    table.observe("GLOBAL", "slow.example/dns-query", 150.0);

    let upstreams = vec!["slow.example/dns-query".to_string(), "fast.example/dns-query".to_string()];
    let ordered = table.order("GLOBAL", &upstreams);

    assert_eq!(ordered[0], "fast.example/dns-query");
    assert_eq!(ordered[1], "slow.example/dns-query");
}

#[tokio::test]
async fn zero_upstreams_returns_gateway_timeout() {
    let client = build_https_client();
    let table = LatencyTable::new();
    let response = dispatch(&client, &[], Payload::Get("abc".to_string()), "GLOBAL", &table).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn unreachable_upstreams_settle_to_bad_gateway() {
    let client = build_https_client();
    let table = LatencyTable::new();
    // These hostnames don't resolve; the dispatcher should still settle
    // (not hang) once every launch reports a transport failure.
    let upstreams = vec![
        "https://doh-race-proxy-test-does-not-exist.invalid/dns-query".to_string(),
        "https://doh-race-proxy-test-also-missing.invalid/dns-query".to_string(),
    ];
    let response = dispatch(&client, &upstreams, Payload::Get("abc".to_string()), "GLOBAL", &table).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
