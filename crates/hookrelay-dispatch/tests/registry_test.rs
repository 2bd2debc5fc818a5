//! Integration tests for the target registry.
//!
//! Covers the authentication gate, URL and TTL validation, capacity
//! eviction priorities, renewal semantics, and expiry sweeping, all on a
//! controllable test clock.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use hookrelay_core::{Clock, RelayError, TestClock};
use hookrelay_dispatch::{ForwarderConfig, TargetRegistry};

const SECRET: &str = "forwarding-secret-0123456789";

fn test_config() -> ForwarderConfig {
    ForwarderConfig {
        shared_secret: SECRET.to_string(),
        default_ttl_seconds: 1800,
        max_ttl_seconds: 14400,
        circuit_breaker_threshold: 3,
        circuit_reset_seconds: 60,
        max_targets: 5,
        ..ForwarderConfig::default()
    }
}

fn test_clock() -> TestClock {
    TestClock::starting_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
}

fn registry_with_clock(config: &ForwarderConfig, clock: &TestClock) -> TargetRegistry {
    TargetRegistry::new(config, Arc::new(clock.clone()))
}

#[tokio::test]
async fn register_returns_id_and_expiry() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let registration = registry
        .register(SECRET, "https://dev.example.com/hook", Some(600), Some("dev box".into()))
        .await
        .expect("registration should succeed");

    assert_eq!(registration.expires_at, clock.now() + Duration::seconds(600));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn wrong_secret_rejected_and_state_unchanged() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let result =
        registry.register("wrong-secret-0123456789", "https://x.example/h", None, None).await;
    assert!(matches!(result, Err(RelayError::Auth)));
    assert!(registry.is_empty().await);

    let fake_id = hookrelay_core::TargetId::new();
    assert!(matches!(registry.renew("nope", fake_id, None).await, Err(RelayError::Auth)));
    assert!(matches!(registry.deregister("nope", fake_id).await, Err(RelayError::Auth)));
}

#[tokio::test]
async fn short_configured_secret_disables_all_mutations() {
    let clock = test_clock();
    let mut config = test_config();
    config.shared_secret = "too-short".to_string();
    let registry = registry_with_clock(&config, &clock);

    assert!(!registry.is_enabled());

    // Even the exact configured value is rejected while disabled.
    let result = registry.register("too-short", "https://x.example/h", None, None).await;
    assert!(matches!(result, Err(RelayError::Auth)));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn non_http_url_rejected() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let result = registry.register(SECRET, "ftp://x", None, None).await;
    assert!(matches!(result, Err(RelayError::Validation { .. })));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn zero_ttl_rejected() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let result = registry.register(SECRET, "https://x.example/h", Some(0), None).await;
    assert!(matches!(result, Err(RelayError::Validation { .. })));
}

#[tokio::test]
async fn omitted_ttl_uses_default_and_requested_ttl_is_capped() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let defaulted = registry.register(SECRET, "https://a.example/h", None, None).await.unwrap();
    assert_eq!(defaulted.expires_at, clock.now() + Duration::seconds(1800));

    let capped =
        registry.register(SECRET, "https://b.example/h", Some(999_999), None).await.unwrap();
    assert_eq!(capped.expires_at, clock.now() + Duration::seconds(14400));
}

#[tokio::test]
async fn extreme_ttl_request_is_capped_not_rejected() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let registered =
        registry.register(SECRET, "https://a.example/h", Some(u64::MAX), None).await.unwrap();
    assert_eq!(registered.expires_at, clock.now() + Duration::seconds(14400));

    clock.advance(Duration::seconds(30));
    let renewed = registry.renew(SECRET, registered.id, Some(u64::MAX)).await.unwrap();
    assert_eq!(renewed.expires_at, clock.now() + Duration::seconds(14400));
}

#[tokio::test]
async fn capacity_evicts_oldest_registered_when_all_live_and_closed() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let mut ids = Vec::new();
    for i in 0..5 {
        let url = format!("https://t{i}.example/h");
        ids.push(registry.register(SECRET, &url, Some(7200), None).await.unwrap().id);
        clock.advance(Duration::seconds(10));
    }

    let sixth = registry.register(SECRET, "https://t5.example/h", Some(7200), None).await.unwrap();

    assert_eq!(registry.len().await, 5);
    let active: Vec<_> = registry.list_active().await.iter().map(|t| t.id).collect();
    assert!(!active.contains(&ids[0]), "oldest registration should be evicted");
    assert!(active.contains(&sixth.id));
    for id in &ids[1..] {
        assert!(active.contains(id));
    }
}

#[tokio::test]
async fn capacity_evicts_expired_before_any_live_target() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    // Oldest live target, registered first with a long TTL.
    let oldest_live =
        registry.register(SECRET, "https://live0.example/h", Some(7200), None).await.unwrap().id;
    clock.advance(Duration::seconds(10));

    // Newer than oldest_live, but with a TTL that will lapse below.
    let expiring =
        registry.register(SECRET, "https://exp.example/h", Some(30), None).await.unwrap().id;
    clock.advance(Duration::seconds(10));

    for i in 1..4 {
        let url = format!("https://live{i}.example/h");
        registry.register(SECRET, &url, Some(7200), None).await.unwrap();
    }
    assert_eq!(registry.len().await, 5);

    // Lapse only the short-TTL target.
    clock.advance(Duration::seconds(60));

    let new = registry.register(SECRET, "https://new.example/h", Some(7200), None).await.unwrap();

    assert_eq!(registry.len().await, 5);
    let remaining: Vec<_> = registry.list_active().await.iter().map(|t| t.id).collect();
    assert!(!remaining.contains(&expiring), "expired target should be evicted first");
    assert!(remaining.contains(&oldest_live), "live targets survive while an expired one exists");
    assert!(remaining.contains(&new.id));
}

#[tokio::test]
async fn renew_recomputes_expiry_from_now_with_cap() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let id = registry.register(SECRET, "https://a.example/h", Some(100), None).await.unwrap().id;

    clock.advance(Duration::seconds(50));
    let renewed = registry.renew(SECRET, id, Some(999_999)).await.unwrap();

    // Capped at max_ttl from *now*, not cumulative from the old expiry.
    assert_eq!(renewed.expires_at, clock.now() + Duration::seconds(14400));
}

#[tokio::test]
async fn renew_unknown_id_is_not_found() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let result = registry.renew(SECRET, hookrelay_core::TargetId::new(), None).await;
    assert!(matches!(result, Err(RelayError::NotFound { .. })));
}

#[tokio::test]
async fn deregister_reports_whether_entry_existed() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let id = registry.register(SECRET, "https://a.example/h", None, None).await.unwrap().id;

    assert!(registry.deregister(SECRET, id).await.unwrap());
    assert!(!registry.deregister(SECRET, id).await.unwrap());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn expired_targets_are_not_listed_or_snapshotted() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    registry.register(SECRET, "https://a.example/h", Some(60), None).await.unwrap();
    registry.register(SECRET, "https://b.example/h", Some(600), None).await.unwrap();

    clock.advance(Duration::seconds(120));

    let active = registry.list_active().await;
    assert_eq!(active.len(), 1);

    let eligible = registry.snapshot_eligible().await;
    assert_eq!(eligible.len(), 1);
}

#[tokio::test]
async fn snapshot_grants_half_open_probe_and_rewinds_counter() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let id = registry.register(SECRET, "https://a.example/h", Some(600), None).await.unwrap().id;

    // Threshold is 3 in the test config.
    for _ in 0..3 {
        registry.record_failure(id).await;
    }
    assert!(registry.snapshot_eligible().await.is_empty());

    clock.advance(Duration::seconds(60));
    let eligible = registry.snapshot_eligible().await;
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].id, id);

    // The snapshot itself flips the circuit closed one failure shy of the
    // threshold, so a single failed probe re-opens it immediately.
    let target = &registry.list_active().await[0];
    assert!(!target.circuit_open);
    assert_eq!(target.failure_count, 2);

    registry.record_failure(id).await;
    assert!(registry.snapshot_eligible().await.is_empty());
}

#[tokio::test]
async fn sweep_removes_all_and_only_expired() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    registry.register(SECRET, "https://a.example/h", Some(30), None).await.unwrap();
    registry.register(SECRET, "https://b.example/h", Some(60), None).await.unwrap();
    let survivor =
        registry.register(SECRET, "https://c.example/h", Some(600), None).await.unwrap().id;

    clock.advance(Duration::seconds(90));

    assert_eq!(registry.sweep_expired().await, 2);
    assert_eq!(registry.len().await, 1);
    assert_eq!(registry.list_active().await[0].id, survivor);

    // Sweeping again, and sweeping an empty registry, are both no-ops.
    assert_eq!(registry.sweep_expired().await, 0);
    registry.deregister(SECRET, survivor).await.unwrap();
    assert_eq!(registry.sweep_expired().await, 0);
}

#[tokio::test]
async fn sweep_respects_exact_expiry_boundary() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    registry.register(SECRET, "https://a.example/h", Some(60), None).await.unwrap();

    clock.advance(Duration::seconds(59));
    assert_eq!(registry.sweep_expired().await, 0);

    // expires_at <= now removes the target.
    clock.advance(Duration::seconds(1));
    assert_eq!(registry.sweep_expired().await, 1);
}

#[tokio::test]
async fn outcome_for_removed_target_is_dropped() {
    let clock = test_clock();
    let registry = registry_with_clock(&test_config(), &clock);

    let id = registry.register(SECRET, "https://a.example/h", None, None).await.unwrap().id;
    registry.deregister(SECRET, id).await.unwrap();

    // Simulates a delivery completing after its target was evicted.
    registry.record_failure(id).await;
    registry.record_success(id).await;
    assert!(registry.is_empty().await);
}
