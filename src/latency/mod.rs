//! Latency Table (spec §4.2): a per-region EMA of observed round-trip
//! latency per upstream, used to bias the dispatcher's launch order.
//!
//! The EMA bit-packing trick — store `f64::to_bits()` in an `AtomicU64` so
//! reads/writes are lock-free and a single atomic op each — is lifted
//! directly from the teacher's `upstream::loadbalance::peak_ewma::
//! InstanceWithLatency`. Here it is generalized from a single flat
//! `Vec<InstanceWithLatency>` to a two-level `DashMap<Region,
//! DashMap<Upstream, AtomicU64>>`, with per-region maps created lazily on
//! first observation (spec §9 design note).

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed EMA smoothing factor (spec §3): `next = prev + α·(obs − prev)`.
pub const EMA_ALPHA: f64 = 0.3;

#[derive(Default)]
pub struct LatencyTable {
    regions: DashMap<String, DashMap<String, AtomicU64>>,
}

impl LatencyTable {
    pub fn new() -> Self {
        Self {
            regions: DashMap::new(),
        }
    }

    /// Record an observed round-trip latency (ms) for (region, upstream).
    /// Non-finite or negative observations are silently ignored.
    pub fn observe(&self, region: &str, upstream: &str, ms: f64) {
        if !ms.is_finite() || ms < 0.0 {
            return;
        }

        let region_map = self
            .regions
            .entry(region.to_string())
            .or_insert_with(DashMap::new);

        // `entry()` holds the shard lock for `upstream` across the whole
        // and_modify/or_insert_with call, so a concurrent `observe` for the
        // same (region, upstream) can't be lost between the "does it exist"
        // check and the write (spec §5: "each individual update must be
        // atomic, no torn reads of the prior value").
        region_map
            .entry(upstream.to_string())
            .and_modify(|cell| {
                let prev = f64::from_bits(cell.load(Ordering::Relaxed));
                let next = prev + EMA_ALPHA * (ms - prev);
                cell.store(next.to_bits(), Ordering::Relaxed);
            })
            .or_insert_with(|| AtomicU64::new(ms.to_bits()));
    }

    /// Return the known latency (ms) for (region, upstream), or `None` if no
    /// observation has been made yet — treated as +∞ when sorting.
    pub fn get(&self, region: &str, upstream: &str) -> Option<f64> {
        let region_map = self.regions.get(region)?;
        let cell = region_map.get(upstream)?;
        Some(f64::from_bits(cell.load(Ordering::Relaxed)))
    }

    /// Return a copy of `upstreams`, stably sorted by ascending known
    /// latency for `region`. Upstreams with no observation sort after all
    /// observed ones, preserving their relative input order among
    /// themselves (spec §4.2).
    pub fn order(&self, region: &str, upstreams: &[String]) -> Vec<String> {
        let mut indexed: Vec<(usize, &String)> = upstreams.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            let la = self.get(region, a).unwrap_or(f64::INFINITY);
            let lb = self.get(region, b).unwrap_or(f64::INFINITY);
            la.partial_cmp(&lb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });
        indexed.into_iter().map(|(_, u)| u.clone()).collect()
    }

    /// Total number of (region, upstream) pairs with at least one
    /// observation, for the `doh_latency_table_entries` gauge.
    pub fn entry_count(&self) -> usize {
        self.regions.iter().map(|r| r.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unobserved_upstream_sorts_after_observed() {
        let table = LatencyTable::new();
        table.observe("GLOBAL", "u", 10.0);
        let ordered = table.order(
            "GLOBAL",
            &["u".to_string(), "v".to_string()],
        );
        assert_eq!(ordered, vec!["u".to_string(), "v".to_string()]);
    }

    #[test]
    fn unobserved_upstreams_preserve_relative_order() {
        let table = LatencyTable::new();
        let ordered = table.order(
            "GLOBAL",
            &["a".to_string(), "b".to_string(), "c".to_string()],
        );
        assert_eq!(ordered, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn first_observation_seeds_value_directly() {
        let table = LatencyTable::new();
        table.observe("GLOBAL", "u", 42.0);
        assert_eq!(table.get("GLOBAL", "u"), Some(42.0));
    }

    #[test]
    fn ema_law_holds_within_tolerance() {
        let table = LatencyTable::new();
        table.observe("GLOBAL", "u", 100.0);
        table.observe("GLOBAL", "u", 50.0);
        let expected = 100.0 + EMA_ALPHA * (50.0 - 100.0);
        let actual = table.get("GLOBAL", "u").unwrap();
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn negative_or_non_finite_observation_is_a_no_op() {
        let table = LatencyTable::new();
        table.observe("GLOBAL", "u", -1.0);
        assert_eq!(table.get("GLOBAL", "u"), None);
        table.observe("GLOBAL", "u", f64::NAN);
        assert_eq!(table.get("GLOBAL", "u"), None);
        table.observe("GLOBAL", "u", f64::INFINITY);
        assert_eq!(table.get("GLOBAL", "u"), None);
    }

    #[test]
    fn regions_are_independent() {
        let table = LatencyTable::new();
        table.observe("DE", "u", 5.0);
        assert_eq!(table.get("US", "u"), None);
        assert_eq!(table.get("DE", "u"), Some(5.0));
    }

    #[test]
    fn order_returns_a_copy_not_a_mutation() {
        let table = LatencyTable::new();
        let input = vec!["a".to_string(), "b".to_string()];
        table.observe("GLOBAL", "b", 1.0);
        let ordered = table.order("GLOBAL", &input);
        assert_eq!(input, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ordered, vec!["b".to_string(), "a".to_string()]);
    }
}
