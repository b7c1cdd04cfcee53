use crate::backend::Backend;
use crate::balance::{Algorithm, Balancer};
use std::collections::HashMap;
use std::sync::Arc;

/// ---------------------------
/// Helpers
/// ---------------------------

fn backend(url: &str, weight: u32) -> Arc<Backend> {
    Arc::new(Backend::new(url, weight).expect("valid url"))
}

fn balancer(algorithm: Algorithm, specs: &[(&str, u32)]) -> Balancer {
    Balancer::new(
        algorithm,
        specs.iter().map(|(url, weight)| backend(url, *weight)).collect(),
    )
}

fn pick_urls(balancer: &Balancer, key: Option<&str>, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            balancer
                .select(key)
                .expect("live pool must yield a backend")
                .url()
                .to_string()
        })
        .collect()
}

fn counts(picks: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for url in picks {
        *counts.entry(url.as_str()).or_insert(0) += 1;
    }
    counts
}

/// ---------------------------
/// Round robin
/// ---------------------------

#[test]
fn round_robin_cycles_in_insertion_order() {
    // Arrange
    let lb = balancer(
        Algorithm::RoundRobin,
        &[("a:1", 1), ("b:1", 1), ("c:1", 1)],
    );

    // Act
    let picks = pick_urls(&lb, None, 6);

    // Assert
    assert_eq!(picks, ["a:1", "b:1", "c:1", "a:1", "b:1", "c:1"]);
}

#[test]
fn round_robin_is_fair_over_stable_membership() {
    let lb = balancer(
        Algorithm::RoundRobin,
        &[("a:1", 1), ("b:1", 1), ("c:1", 1)],
    );

    let picks = pick_urls(&lb, None, 100);
    let counts = counts(&picks);

    let max = counts.values().max().expect("non-empty");
    let min = counts.values().min().expect("non-empty");
    assert!(max - min <= 1, "counts spread too far: {counts:?}");
}

#[test]
fn round_robin_restarts_at_front_after_pool_drains() {
    let lb = balancer(Algorithm::RoundRobin, &[("a:1", 1), ("b:1", 1)]);
    lb.select(None);

    lb.pool().demote("a:1");
    lb.pool().demote("b:1");
    assert!(lb.select(None).is_none());

    lb.pool().promote("b:1");
    assert_eq!(lb.select(None).expect("one live backend").url(), "b:1");
}

#[test]
fn set_live_resets_the_rotation() {
    let lb = balancer(Algorithm::RoundRobin, &[("a:1", 1), ("b:1", 1)]);
    lb.select(None);

    // Same membership again: the cursor starts over regardless.
    lb.set_live(vec![backend("a:1", 1), backend("b:1", 1)]);

    assert_eq!(lb.select(None).expect("live pool").url(), "a:1");
}

#[test]
fn round_robin_skips_demoted_backend() {
    let lb = balancer(
        Algorithm::RoundRobin,
        &[("a:1", 1), ("b:1", 1), ("c:1", 1)],
    );

    lb.pool().demote("b:1");

    let picks = pick_urls(&lb, None, 4);
    assert_eq!(picks, ["a:1", "c:1", "a:1", "c:1"]);
}

/// ---------------------------
/// Weighted round robin
/// ---------------------------

#[test]
fn weighted_round_robin_honours_weights_consecutively() {
    // Arrange: weights 2, 1, 3.
    let lb = balancer(
        Algorithm::WeightedRoundRobin,
        &[("a:1", 2), ("b:1", 1), ("c:1", 3)],
    );

    // Act
    let picks = pick_urls(&lb, None, 12);

    // Assert: the weighted cycle repeats verbatim.
    let cycle = ["a:1", "a:1", "b:1", "c:1", "c:1", "c:1"];
    assert_eq!(picks[..6], cycle);
    assert_eq!(picks[6..], cycle);
}

#[test]
fn weighted_round_robin_frequency_matches_weight_share() {
    let lb = balancer(
        Algorithm::WeightedRoundRobin,
        &[("a:1", 2), ("b:1", 1), ("c:1", 3)],
    );

    // 600 selections = 100 full cycles of total weight 6.
    let picks = pick_urls(&lb, None, 600);
    let counts = counts(&picks);

    assert_eq!(counts["a:1"], 200);
    assert_eq!(counts["b:1"], 100);
    assert_eq!(counts["c:1"], 300);
}

#[test]
fn weighted_round_robin_defaults_to_plain_rotation_for_unit_weights() {
    let lb = balancer(
        Algorithm::WeightedRoundRobin,
        &[("a:1", 1), ("b:1", 1)],
    );

    assert_eq!(pick_urls(&lb, None, 4), ["a:1", "b:1", "a:1", "b:1"]);
}

/// ---------------------------
/// Least connections
/// ---------------------------

#[test]
fn least_connections_breaks_ties_by_position() {
    let lb = balancer(
        Algorithm::LeastConnections,
        &[("a:1", 1), ("b:1", 1), ("c:1", 1)],
    );

    // All counters at zero: first position wins.
    let first = lb.select(None).expect("live pool");
    assert_eq!(first.url(), "a:1");

    // One connection on a: the scan moves on to b.
    first.increment_connections();
    assert_eq!(lb.select(None).expect("live pool").url(), "b:1");
}

#[test]
fn least_connections_follows_the_counters() {
    let lb = balancer(Algorithm::LeastConnections, &[("a:1", 1), ("b:1", 1)]);
    let live = lb.pool().snapshot_live();

    live[0].increment_connections();
    live[0].increment_connections();
    live[1].increment_connections();

    assert_eq!(lb.select(None).expect("live pool").url(), "b:1");

    live[0].decrement_connections();
    live[0].decrement_connections();
    assert_eq!(lb.select(None).expect("live pool").url(), "a:1");
}

/// ---------------------------
/// Hash
/// ---------------------------

#[test]
fn hash_is_deterministic_for_a_fixed_membership() {
    let lb = balancer(Algorithm::Hash, &[("a:1", 1), ("b:1", 1), ("c:1", 1)]);

    let key = "10.0.0.1:5555";
    let expected_index = crc32fast::hash(key.as_bytes()) as usize % 3;
    let expected = lb.pool().snapshot_live()[expected_index].url().to_string();

    for _ in 0..10 {
        assert_eq!(lb.select(Some(key)).expect("live pool").url(), expected);
    }
}

#[test]
fn hash_remaps_when_the_target_is_demoted() {
    let lb = balancer(Algorithm::Hash, &[("a:1", 1), ("b:1", 1), ("c:1", 1)]);

    let key = "10.0.0.1:5555";
    let target = lb.select(Some(key)).expect("live pool").url().to_string();

    lb.pool().demote(&target);

    // No promise about which backend takes over, only that the dead one is gone.
    let after = lb.select(Some(key)).expect("two backends remain live");
    assert_ne!(after.url(), target);
}

#[test]
fn hash_requires_a_key() {
    let lb = balancer(Algorithm::Hash, &[("a:1", 1), ("b:1", 1)]);

    assert!(lb.select(None).is_none());
    assert!(lb.select(Some("")).is_none());
}

#[test]
fn hash_spreads_distinct_keys_across_the_pool() {
    let lb = balancer(Algorithm::Hash, &[("a:1", 1), ("b:1", 1), ("c:1", 1)]);

    let mut hit = std::collections::HashSet::new();
    for i in 0..300 {
        let key = format!("10.0.{}.{}:5555", i / 250, i % 250);
        hit.insert(lb.select(Some(&key)).expect("live pool").url().to_string());
    }

    assert_eq!(hit.len(), 3, "300 distinct keys should reach every backend");
}

/// ---------------------------
/// Random
/// ---------------------------

#[test]
fn random_only_returns_live_backends() {
    let lb = balancer(Algorithm::Random, &[("a:1", 1), ("b:1", 1), ("c:1", 1)]);
    lb.pool().demote("b:1");

    for _ in 0..100 {
        let picked = lb.select(None).expect("live pool");
        assert_ne!(picked.url(), "b:1");
    }
}

/// ---------------------------
/// Empty pool
/// ---------------------------

#[test]
fn every_policy_yields_none_on_an_empty_pool() {
    for algorithm in [
        Algorithm::RoundRobin,
        Algorithm::WeightedRoundRobin,
        Algorithm::LeastConnections,
        Algorithm::Hash,
        Algorithm::Random,
    ] {
        let lb = Balancer::new(algorithm, Vec::new());
        assert!(
            lb.select(Some("10.0.0.1:5555")).is_none(),
            "{algorithm} must yield None on an empty pool"
        );
    }
}
