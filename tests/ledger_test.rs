//! Usage ledger integration tests against the in-memory store

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

use content_validator::db::MemoryStore;
use content_validator::ledger::{
    ActionKind, ClientId, LedgerError, QuotaPolicy, Tier, UsageLedger, UsageRecord, UsageStore,
};
use content_validator::waitlist::Waitlist;

fn setup() -> (Arc<MemoryStore>, UsageLedger) {
    let store = Arc::new(MemoryStore::new());
    let ledger = UsageLedger::new(store.clone(), QuotaPolicy::default());
    (store, ledger)
}

async fn seed(store: &MemoryStore, client: &ClientId, n: usize, age: Duration) {
    for _ in 0..n {
        let mut record = UsageRecord::new(client.clone(), ActionKind::Validation);
        record.timestamp = Utc::now() - age;
        store.append(&record).await.unwrap();
    }
}

async fn in_window(store: &MemoryStore, client: &ClientId) -> u64 {
    store
        .count_since(client, ActionKind::Validation, Utc::now() - Duration::days(30))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_new_client_has_full_quota() {
    let (_, ledger) = setup();
    let status = ledger
        .check_quota(&ClientId::supplied("fresh").unwrap())
        .await;

    assert_eq!(status.used, 0);
    assert_eq!(status.limit, 3);
    assert_eq!(status.remaining, 3);
    assert_eq!(status.tier, Tier::Standard);
}

#[tokio::test]
async fn test_exhausted_client_rejected_without_append() {
    let (store, ledger) = setup();
    let client = ClientId::supplied("exhausted").unwrap();
    seed(&store, &client, 3, Duration::hours(1)).await;

    let err = ledger.record_usage(&client).await.unwrap_err();
    match err {
        LedgerError::QuotaExceeded { used, limit, tier } => {
            assert_eq!(used, 3);
            assert_eq!(limit, 3);
            assert_eq!(tier, Tier::Standard);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
    assert_eq!(in_window(&store, &client).await, 3);
}

#[tokio::test]
async fn test_early_adopter_ceiling() {
    let (store, ledger) = setup();
    let client = ClientId::supplied("early").unwrap();
    seed(&store, &client, 5, Duration::days(2)).await;

    let waitlist = Waitlist::new(store.clone());
    waitlist
        .join("early@example.com", client.clone(), json!({ "role": "creator" }))
        .await
        .unwrap();

    let status = ledger.check_quota(&client).await;
    assert_eq!(status.used, 5);
    assert_eq!(status.limit, 8);
    assert_eq!(status.remaining, 3);
    assert!(status.is_early_adopter());
}

#[tokio::test]
async fn test_joining_waitlist_reopens_quota() {
    let (store, ledger) = setup();
    let client = ClientId::supplied("promoted").unwrap();

    for _ in 0..3 {
        ledger.record_usage(&client).await.unwrap();
    }
    assert!(ledger.record_usage(&client).await.is_err());

    Waitlist::new(store.clone())
        .join("promoted@example.com", client.clone(), json!(null))
        .await
        .unwrap();

    let status = ledger.record_usage(&client).await.unwrap();
    assert_eq!(status.used, 4);
    assert_eq!(status.limit, 8);
}

#[tokio::test]
async fn test_check_is_idempotent() {
    let (store, ledger) = setup();
    let client = ClientId::supplied("reader").unwrap();
    seed(&store, &client, 2, Duration::days(1)).await;

    let first = ledger.check_quota(&client).await;
    for _ in 0..10 {
        assert_eq!(ledger.check_quota(&client).await, first);
    }
    assert_eq!(in_window(&store, &client).await, 2);
}

#[tokio::test]
async fn test_records_outside_window_not_counted() {
    let (store, ledger) = setup();
    let client = ClientId::supplied("veteran").unwrap();
    seed(&store, &client, 3, Duration::days(31)).await;
    seed(&store, &client, 1, Duration::days(29)).await;

    let status = ledger.check_quota(&client).await;
    assert_eq!(status.used, 1);
    assert_eq!(status.remaining, 2);
}

#[tokio::test]
async fn test_window_slides_with_time() {
    let (store, ledger) = setup();
    let client = ClientId::supplied("slider").unwrap();
    seed(&store, &client, 3, Duration::days(10)).await;

    assert!(ledger.check_quota(&client).await.is_exhausted());

    let later = Utc::now() + Duration::days(21);
    let status = ledger.check_quota_at(&client, later).await;
    assert_eq!(status.used, 0);
    assert_eq!(status.remaining, 3);
}

#[tokio::test]
async fn test_supplied_and_ip_ids_do_not_collide() {
    let (_, ledger) = setup();
    let ip: std::net::IpAddr = "203.0.113.5".parse().unwrap();
    let by_ip = ClientId::from_ip(ip);
    let by_text = ClientId::supplied(&ip.to_string()).unwrap();
    assert_ne!(by_ip, by_text);

    ledger.record_usage(&by_ip).await.unwrap();
    assert_eq!(ledger.check_quota(&by_text).await.used, 0);
}
