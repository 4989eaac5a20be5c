//! Integration tests for health tracking and roster publication.
//!
//! These tests verify that:
//! - Endpoints whose probe times out, fails or lags are left out of the roster
//! - The roster keeps configuration order as endpoints come and go
//! - A failed call demotes a dead endpoint before the next refresh cycle
//! - A slow probe finishing late never overwrites a newer result
//! - Concurrent readers only ever observe complete roster snapshots

use crate::mock_infrastructure::{connect_scripted, finality_json, scripted_nodes, wait_until};
use concord_core::{
    node::Capability,
    types::SyncState,
    upstream::{CallContext, Liveness, MultiClient},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;

#[tokio::test]
async fn test_timed_out_endpoint_is_excluded() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    nodes[1].set_probe_hang(true);
    nodes[0].respond(Capability::Finality, finality_json(10));
    nodes[2].respond(Capability::Finality, finality_json(20));

    let client = connect_scripted(&nodes).await;
    assert_eq!(client.roster().names(), vec!["a", "c"]);

    let ctx = CallContext::new();
    assert_eq!(client.finality(&ctx, "head").await.unwrap().finalized.epoch, 10);

    nodes[0].fail(Capability::Finality, "unavailable");
    assert_eq!(client.finality(&ctx, "head").await.unwrap().finalized.epoch, 20);

    // The excluded endpoint is never asked.
    assert_eq!(nodes[1].calls(Capability::Finality), 0);
}

#[tokio::test]
async fn test_lagging_endpoint_rejoins_in_configuration_order() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    nodes[1].set_sync_state(SyncState::lagging(1000, 8));

    let client = connect_scripted(&nodes).await;
    assert_eq!(client.roster().names(), vec!["a", "c"]);

    nodes[1].set_sync_state(SyncState::synced(1008));
    let roster = client.refresh().await.unwrap();
    assert_eq!(roster.names(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_refresh_bumps_generation() {
    let nodes = scripted_nodes(&["a", "b"]);
    let client = connect_scripted(&nodes).await;

    let before = client.roster().generation();
    client.refresh().await.unwrap();
    assert!(client.roster().generation() > before);
}

#[tokio::test]
async fn test_failed_call_demotes_before_next_cycle() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[1].respond(Capability::Finality, finality_json(5));
    let client = connect_scripted(&nodes).await;
    assert_eq!(client.roster().len(), 2);

    // a dies between refresh cycles.
    nodes[0].set_probe_failure(true);
    nodes[0].fail(Capability::Finality, "connection reset");

    let ctx = CallContext::new();
    assert_eq!(client.finality(&ctx, "head").await.unwrap().finalized.epoch, 5);

    let demoted = wait_until(|| !client.roster().contains("a"), Duration::from_secs(2)).await;
    assert!(demoted, "a should leave the roster without waiting for the refresh interval");

    // Later calls go straight to b.
    client.finality(&ctx, "head").await.unwrap();
    assert_eq!(nodes[0].calls(Capability::Finality), 1);
}

#[tokio::test]
async fn test_stale_probe_does_not_overwrite_newer_result() {
    let nodes = scripted_nodes(&["a"]);
    let client = connect_scripted(&nodes).await;
    let endpoint = Arc::clone(&client.health().endpoints()[0]);

    // Start a refresh whose probe of a will time out.
    nodes[0].set_probe_hang(true);
    let health = Arc::clone(client.health());
    let slow = tokio::spawn(async move { health.refresh().await });
    assert!(wait_until(|| nodes[0].in_flight() == 1, Duration::from_secs(1)).await);

    // A later probe completes first and finds the endpoint healthy.
    nodes[0].set_probe_hang(false);
    assert_eq!(client.health().reprobe(&endpoint).await, Liveness::Active);

    // The earlier probe's timeout arrives last and is discarded.
    let roster = slow.await.unwrap().unwrap();
    assert_eq!(roster.names(), vec!["a"]);
    assert_eq!(endpoint.liveness(), Liveness::Active);
}

#[tokio::test]
async fn test_statuses_record_probe_history() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[1].set_probe_failure(true);
    let client = connect_scripted(&nodes).await;
    client.refresh().await.unwrap();

    let statuses = client.endpoint_statuses();
    assert_eq!(statuses.len(), 2);

    assert_eq!(statuses[0].liveness, Liveness::Active);
    assert_eq!(statuses[0].head_slot, Some(1000));
    assert_eq!(statuses[0].history.len(), 2);

    assert_eq!(statuses[1].liveness, Liveness::Inactive);
    assert!(statuses[1].last_error.is_some());
    assert_eq!(statuses[1].history.len(), 2);
}

#[tokio::test]
async fn test_background_loop_populates_roster() {
    let nodes = scripted_nodes(&["a", "b"]);
    let client = MultiClient::builder()
        .nodes(crate::mock_infrastructure::as_beacon_nodes(&nodes))
        .health_config(crate::mock_infrastructure::fast_health())
        .build()
        .unwrap();
    assert!(client.roster().is_empty());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = client.start_with_shutdown(shutdown_rx);

    assert!(wait_until(|| client.roster().len() == 2, Duration::from_secs(2)).await);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_torn_roster() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    let client = Arc::new(connect_scripted(&nodes).await);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let mut last_generation = 0;
                for _ in 0..500 {
                    let roster = client.roster();
                    let names = roster.names();
                    assert!(
                        names == ["a", "b", "c"] || names == ["a", "c"],
                        "unexpected roster {names:?}"
                    );
                    assert!(roster.generation() >= last_generation);
                    last_generation = roster.generation();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for round in 0..50 {
        nodes[1].set_probe_failure(round % 2 == 0);
        client.refresh().await.unwrap();
    }

    for reader in readers {
        reader.await.unwrap();
    }
}
