//! Clusters built from fault-injecting test clients.
//!
//! These tests verify that:
//! - An always-failing wrapper keeps its endpoint out of the roster
//! - A wrapper slower than the probe timeout marks its endpoint inactive
//! - Randomly failing endpoints never surface as errors while a healthy one remains

use crate::mock_infrastructure::{connect, fast_routing, scripted_nodes};
use concord_core::{
    node::{BeaconNode, Capability},
    testclients::{Erroring, ScriptedNode, Sleepy},
    upstream::{CallContext, FanOut, RoutingConfig},
};
use std::{sync::Arc, time::Duration};

fn plain(node: &Arc<ScriptedNode>) -> Arc<dyn BeaconNode> {
    Arc::clone(node) as Arc<dyn BeaconNode>
}

fn wrap_erroring(rate: f64, node: &Arc<ScriptedNode>, seed: u64) -> Arc<dyn BeaconNode> {
    Arc::new(Erroring::seeded(rate, plain(node), seed).unwrap())
}

#[tokio::test]
async fn test_always_erroring_endpoint_is_inactive() {
    let nodes = scripted_nodes(&["a", "b"]);
    let cluster = vec![wrap_erroring(1.0, &nodes[0], 1), plain(&nodes[1])];
    let client = connect(cluster, fast_routing()).await;

    assert_eq!(client.roster().names(), vec!["b"]);
    // The wrapper failed the probe before it reached the wrapped node.
    assert_eq!(nodes[0].calls(Capability::NodeSyncing), 0);
}

#[tokio::test]
async fn test_sleepy_endpoint_beyond_probe_timeout_is_inactive() {
    let nodes = scripted_nodes(&["a", "b"]);
    let slow = Sleepy::seeded(
        Duration::from_millis(400),
        Duration::from_millis(400),
        plain(&nodes[0]),
        3,
    )
    .unwrap();
    let cluster: Vec<Arc<dyn BeaconNode>> = vec![Arc::new(slow), plain(&nodes[1])];
    let client = connect(cluster, fast_routing()).await;

    assert_eq!(client.roster().names(), vec!["b"]);
}

#[tokio::test]
async fn test_sleepy_endpoint_within_timeouts_serves() {
    let nodes = scripted_nodes(&["a"]);
    let sleepy = Sleepy::seeded(
        Duration::from_millis(5),
        Duration::from_millis(20),
        plain(&nodes[0]),
        11,
    )
    .unwrap();
    let client = connect(vec![Arc::new(sleepy) as Arc<dyn BeaconNode>], fast_routing()).await;

    assert_eq!(client.roster().len(), 1);
    let version = client.node_version(&CallContext::new()).await.unwrap();
    assert_eq!(version, "scripted/v1.0.0");
}

#[tokio::test]
async fn test_flaky_endpoints_are_masked() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    let cluster = vec![
        wrap_erroring(0.5, &nodes[0], 7),
        wrap_erroring(0.5, &nodes[1], 8),
        plain(&nodes[2]),
    ];
    let client = connect(cluster, fast_routing()).await;

    let ctx = CallContext::new();
    for slot in 0..20 {
        client.attestation_data(&ctx, slot, 0).await.unwrap();
    }
    for _ in 0..5 {
        client.refresh().await.unwrap();
        client.fork(&ctx, "head").await.unwrap();
    }
}

#[tokio::test]
async fn test_flaky_endpoints_are_masked_in_parallel() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    let cluster = vec![
        wrap_erroring(0.5, &nodes[0], 21),
        wrap_erroring(0.5, &nodes[1], 22),
        plain(&nodes[2]),
    ];
    let routing = RoutingConfig { fan_out: FanOut::Parallel, ..fast_routing() };
    let client = connect(cluster, routing).await;

    let ctx = CallContext::new();
    for epoch in 0..20 {
        client.attester_duties(&ctx, epoch, &[1]).await.unwrap();
    }
}

#[tokio::test]
async fn test_wrapped_capability_gaps_are_preserved() {
    let partial = Arc::new(ScriptedNode::new("a").without(Capability::Validators));
    let full = Arc::new(ScriptedNode::new("b"));
    let client = connect(vec![wrap_erroring(0.0, &partial, 5), plain(&full)], fast_routing()).await;
    assert_eq!(client.roster().len(), 2);

    client.validators(&CallContext::new(), "head", &[]).await.unwrap();
    assert_eq!(partial.calls(Capability::Validators), 0);
}
