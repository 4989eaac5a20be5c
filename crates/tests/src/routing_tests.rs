//! Integration tests for policy-driven call routing through the client.
//!
//! These tests verify that:
//! - Static values are answered by a single endpoint, with failover on error
//! - Capability gaps and empty rosters surface as distinct errors
//! - Parallel fan-out still prefers the lowest roster position
//! - Client-side rejections do not demote an endpoint
//! - The first healthy endpoint in roster order serves best-effort reads

use crate::mock_infrastructure::{
    as_beacon_nodes, connect, connect_scripted, fast_routing, finality_json, head_event,
    scripted_nodes,
};
use concord_core::{
    node::{BeaconNode, CallPolicy, Capability, NodeError},
    testclients::ScriptedNode,
    upstream::{CallContext, ClusterError, FanOut, OperationOverride, RoutingConfig},
};
use futures::StreamExt;
use proptest::prelude::*;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc, time::Duration};

fn parallel_finality() -> RoutingConfig {
    let overrides = BTreeMap::from([(
        Capability::Finality,
        OperationOverride { fan_out: Some(FanOut::Parallel), ..Default::default() },
    )]);
    RoutingConfig { overrides, ..fast_routing() }
}

#[tokio::test]
async fn test_static_value_asks_one_endpoint() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    let client = connect_scripted(&nodes).await;

    let genesis = client.genesis(&CallContext::new()).await.unwrap();
    assert_eq!(genesis.genesis_time, 1_606_824_023);

    assert_eq!(nodes[0].calls(Capability::Genesis), 1);
    assert_eq!(nodes[1].calls(Capability::Genesis), 0);
    assert_eq!(nodes[2].calls(Capability::Genesis), 0);
}

#[tokio::test]
async fn test_static_value_fails_over_in_order() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    nodes[0].fail(Capability::SlotsPerEpoch, "boom");
    nodes[1].respond(Capability::SlotsPerEpoch, json!(16));
    let client = connect_scripted(&nodes).await;

    assert_eq!(client.slots_per_epoch(&CallContext::new()).await.unwrap(), 16);
    assert_eq!(nodes[2].calls(Capability::SlotsPerEpoch), 0);
}

#[tokio::test]
async fn test_capability_gap_is_unsupported() {
    let nodes: Vec<Arc<ScriptedNode>> = vec![
        Arc::new(ScriptedNode::new("a").without(Capability::AttesterDuties)),
        Arc::new(ScriptedNode::new("b").without(Capability::AttesterDuties)),
        Arc::new(ScriptedNode::new("c")),
    ];
    // The only capable endpoint is down.
    nodes[2].set_probe_failure(true);
    let client = connect_scripted(&nodes).await;
    assert_eq!(client.roster().names(), vec!["a", "b"]);

    let result = client.attester_duties(&CallContext::new(), 10, &[1, 2]).await;
    assert!(matches!(result, Err(ClusterError::Unsupported(Capability::AttesterDuties))));

    // Nothing was attempted.
    for node in &nodes {
        assert_eq!(node.calls(Capability::AttesterDuties), 0);
    }

    // The client still advertises the operation: some configured endpoint has it.
    assert!(client.capabilities().contains(Capability::AttesterDuties));
}

#[tokio::test]
async fn test_empty_roster_is_no_active_clients() {
    let nodes = scripted_nodes(&["a", "b"]);
    for node in &nodes {
        node.set_probe_failure(true);
    }
    let client = connect_scripted(&nodes).await;

    let result = client.node_version(&CallContext::new()).await;
    assert!(matches!(result, Err(ClusterError::NoActiveClients)));
}

#[tokio::test]
async fn test_exhausted_reports_every_endpoint_in_order() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    for node in &nodes {
        node.fail(Capability::Finality, "unavailable");
    }
    let client = connect_scripted(&nodes).await;

    let err = client.finality(&CallContext::new(), "head").await.unwrap_err();
    let names: Vec<&str> = err.failures().iter().map(|f| &*f.endpoint).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(err.to_string().starts_with("All endpoints failed for finality"));
}

#[tokio::test]
async fn test_parallel_prefers_lowest_index_over_fastest() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    nodes[0].delay(Capability::Finality, Duration::from_millis(100), finality_json(1));
    nodes[1].respond(Capability::Finality, finality_json(2));
    nodes[2].respond(Capability::Finality, finality_json(3));
    let client = connect(as_beacon_nodes(&nodes), parallel_finality()).await;

    let finality = client.finality(&CallContext::new(), "head").await.unwrap();
    assert_eq!(finality.finalized.epoch, 1);

    // Every endpoint was queried at once.
    for node in &nodes {
        assert_eq!(node.calls(Capability::Finality), 1);
    }
}

#[tokio::test]
async fn test_parallel_skips_failed_lower_index() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    nodes[0].fail(Capability::Finality, "boom");
    nodes[1].delay(Capability::Finality, Duration::from_millis(50), finality_json(2));
    nodes[2].respond(Capability::Finality, finality_json(3));
    let client = connect(as_beacon_nodes(&nodes), parallel_finality()).await;

    let finality = client.finality(&CallContext::new(), "head").await.unwrap();
    assert_eq!(finality.finalized.epoch, 2);
}

#[tokio::test]
async fn test_client_error_does_not_demote() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].fail_with(Capability::Validators, || NodeError::Http(404, "state not found".into()));
    let client = connect_scripted(&nodes).await;

    client.validators(&CallContext::new(), "head", &[]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.roster().contains("a"));
    // Only the initial refresh probed a.
    assert_eq!(nodes[0].calls(Capability::NodeSyncing), 1);
}

#[tokio::test]
async fn test_operation_override_changes_policy() {
    let nodes = scripted_nodes(&["a", "b"]);
    let overrides = BTreeMap::from([(
        Capability::NodeVersion,
        OperationOverride { policy: Some(CallPolicy::StaticValue), ..Default::default() },
    )]);
    let routing = RoutingConfig { fan_out: FanOut::Parallel, overrides, ..fast_routing() };
    let client = connect(as_beacon_nodes(&nodes), routing).await;

    let resolved = client.routing_config().resolve(Capability::NodeVersion);
    assert_eq!(resolved.policy, CallPolicy::StaticValue);

    // Static values ignore the global parallel fan-out.
    assert_eq!(client.node_version(&CallContext::new()).await.unwrap(), "scripted/v1.0.0");
    assert_eq!(nodes[1].calls(Capability::NodeVersion), 0);

    // Other reads keep the global fan-out.
    assert_eq!(client.routing_config().resolve(Capability::Fork).fan_out, FanOut::Parallel);
}

#[tokio::test]
async fn test_events_open_on_first_capable_endpoint() {
    let nodes: Vec<Arc<ScriptedNode>> = vec![
        Arc::new(ScriptedNode::new("a").without(Capability::Events)),
        Arc::new(ScriptedNode::new("b")),
    ];
    nodes[1].respond(Capability::Events, json!([head_event(1), head_event(2)]));
    let client = connect_scripted(&nodes).await;

    let stream = client.events(&CallContext::new(), &["head".to_string()]).await.unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].as_ref().unwrap().data["slot"], "2");
    assert_eq!(nodes[0].calls(Capability::Events), 0);
}

#[tokio::test]
async fn test_client_serves_as_a_single_node() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].fail(Capability::Fork, "boom");
    let client = connect_scripted(&nodes).await;
    let node: Arc<dyn BeaconNode> = Arc::new(client);

    assert_eq!(node.name(), "multi");
    assert_eq!(node.fork("head").await.unwrap().epoch, 74_240);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_first_healthy_endpoint_serves(failing in proptest::collection::vec(any::<bool>(), 1..6)) {
        prop_assume!(failing.iter().any(|f| !f));
        let expected = failing.iter().position(|f| !f).unwrap() as u64;

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let served = runtime.block_on(async {
            let names: Vec<String> = (0..failing.len()).map(|i| format!("n{i}")).collect();
            let nodes: Vec<Arc<ScriptedNode>> =
                names.iter().map(|n| Arc::new(ScriptedNode::new(n.as_str()))).collect();
            for (i, node) in nodes.iter().enumerate() {
                if failing[i] {
                    node.fail(Capability::Finality, "down");
                } else {
                    node.respond(Capability::Finality, finality_json(i as u64));
                }
            }

            let client = connect_scripted(&nodes).await;
            client.finality(&CallContext::new(), "head").await.unwrap().finalized.epoch
        });

        prop_assert_eq!(served, expected);
    }
}
