//! Integration tests for per-call cancellation and deadlines.
//!
//! These tests verify that:
//! - Cancelling a context stops a fan-out and leaves no endpoint call running
//! - A passed deadline ends the call without trying further endpoints
//! - Per-endpoint timeouts fall over to the next endpoint
//! - Giving up on a call is not held against the endpoints

use crate::mock_infrastructure::{
    as_beacon_nodes, connect, connect_scripted, fast_routing, finality_json, scripted_nodes,
    wait_until,
};
use concord_core::{
    node::Capability,
    testclients::ScriptedNode,
    upstream::{
        CallContext, ClusterError, CorroborationConfig, CorroborationMode, FanOut, RoutingConfig,
    },
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

fn patient(fan_out: FanOut) -> RoutingConfig {
    RoutingConfig { call_timeout_ms: 30_000, fan_out, ..Default::default() }
}

fn total_in_flight(nodes: &[Arc<ScriptedNode>]) -> usize {
    nodes.iter().map(|n| n.in_flight()).sum()
}

#[tokio::test]
async fn test_cancel_mid_fan_out_releases_every_call() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    for node in &nodes {
        node.hang(Capability::Finality);
    }
    let client = Arc::new(connect(as_beacon_nodes(&nodes), patient(FanOut::Parallel)).await);

    let ctx = CallContext::new();
    let call = tokio::spawn({
        let client = Arc::clone(&client);
        let ctx = ctx.clone();
        async move { client.finality(&ctx, "head").await }
    });

    assert!(wait_until(|| total_in_flight(&nodes) == 3, Duration::from_secs(2)).await);
    ctx.cancel();

    let result = call.await.unwrap();
    assert!(matches!(result, Err(ClusterError::Cancelled)));
    assert_eq!(total_in_flight(&nodes), 0);
}

#[tokio::test]
async fn test_cancel_mid_corroboration_releases_every_call() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    nodes[0].respond(Capability::Finality, finality_json(1));
    nodes[1].hang(Capability::Finality);
    nodes[2].hang(Capability::Finality);
    let routing = RoutingConfig {
        corroboration: CorroborationConfig {
            mode: CorroborationMode::Majority,
            ..Default::default()
        },
        ..patient(FanOut::Sequential)
    };
    let client = Arc::new(connect(as_beacon_nodes(&nodes), routing).await);

    let token = CancellationToken::new();
    let call = tokio::spawn({
        let client = Arc::clone(&client);
        let ctx = CallContext::with_token(token.child_token());
        async move { client.finality(&ctx, "head").await }
    });

    assert!(wait_until(|| total_in_flight(&nodes[1..]) == 2, Duration::from_secs(2)).await);
    token.cancel();

    assert!(matches!(call.await.unwrap(), Err(ClusterError::Cancelled)));
    assert_eq!(total_in_flight(&nodes), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_skips_remaining_endpoints() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].hang(Capability::AttestationData);
    let client = connect(as_beacon_nodes(&nodes), patient(FanOut::Sequential)).await;

    let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
    let result = client.attestation_data(&ctx, 3200, 0).await;

    assert!(matches!(result, Err(ClusterError::DeadlineExceeded)));
    assert_eq!(nodes[1].calls(Capability::AttestationData), 0);
    assert_eq!(nodes[0].in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_endpoint_timeout_falls_over() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].hang(Capability::ProposerDuties);
    let client = connect_scripted(&nodes).await;

    let duties = client.proposer_duties(&CallContext::new(), 100, &[]).await.unwrap();
    assert!(duties.is_empty());
    assert_eq!(nodes[1].calls(Capability::ProposerDuties), 1);
}

#[tokio::test]
async fn test_cancellation_does_not_demote() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].hang(Capability::BeaconBlockHeader);
    let client = Arc::new(connect(as_beacon_nodes(&nodes), patient(FanOut::Sequential)).await);

    let ctx = CallContext::new();
    let call = tokio::spawn({
        let client = Arc::clone(&client);
        let ctx = ctx.clone();
        async move { client.beacon_block_header(&ctx, "head").await }
    });
    assert!(wait_until(|| nodes[0].in_flight() == 1, Duration::from_secs(2)).await);
    ctx.cancel();
    assert!(call.await.unwrap().unwrap_err().is_cancellation());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.roster().len(), 2);
    assert_eq!(nodes[0].calls(Capability::NodeSyncing), 1);
}

#[tokio::test]
async fn test_done_context_fails_before_routing() {
    let nodes = scripted_nodes(&["a"]);
    let client = connect(as_beacon_nodes(&nodes), fast_routing()).await;

    let ctx = CallContext::new();
    ctx.cancel();
    assert!(matches!(client.spec(&ctx).await, Err(ClusterError::Cancelled)));
    assert_eq!(nodes[0].calls(Capability::Spec), 0);
}
