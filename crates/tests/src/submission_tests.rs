//! Integration tests for broadcast submissions.
//!
//! These tests verify that:
//! - Submissions reach every capable active endpoint concurrently
//! - One acceptance is enough; every rejection is still reported
//! - Endpoints lacking the capability are skipped
//! - The single-node surface hides partial failure

use crate::mock_infrastructure::{connect_scripted, sample_attestation, sample_exit, scripted_nodes};
use concord_core::{
    node::{BeaconNode, Capability},
    testclients::ScriptedNode,
    upstream::{CallContext, ClusterError},
};
use serde_json::json;
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn test_partial_acceptance_is_success_with_report() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[1].fail(Capability::SubmitVoluntaryExit, "exit rejected");
    let client = connect_scripted(&nodes).await;

    let report = client.submit_voluntary_exit(&CallContext::new(), &sample_exit(42)).await.unwrap();

    assert_eq!(report.capability, Capability::SubmitVoluntaryExit);
    assert_eq!(report.accepted.iter().map(|n| &**n).collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(&*report.failures[0].endpoint, "b");
    assert!(report.failures[0].error.to_string().contains("exit rejected"));
    assert!(!report.is_complete());

    let submissions = nodes[0].submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].1["message"]["validator_index"], "42");
}

#[tokio::test]
async fn test_every_rejection_is_exhausted() {
    let nodes = scripted_nodes(&["a", "b"]);
    for node in &nodes {
        node.fail(Capability::SubmitAttestations, "invalid signature");
    }
    let client = connect_scripted(&nodes).await;

    let result = client.submit_attestations(&CallContext::new(), &[sample_attestation(3200)]).await;
    match result {
        Err(ClusterError::Exhausted { capability, failures }) => {
            assert_eq!(capability, Capability::SubmitAttestations);
            assert_eq!(failures.len(), 2);
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_incapable_endpoints_are_skipped() {
    let nodes: Vec<Arc<ScriptedNode>> = vec![
        Arc::new(ScriptedNode::new("a")),
        Arc::new(ScriptedNode::new("b").without(Capability::SubmitAttestations)),
        Arc::new(ScriptedNode::new("c")),
    ];
    let client = connect_scripted(&nodes).await;

    let attestations = [sample_attestation(3200), sample_attestation(3201)];
    let report = client.submit_attestations(&CallContext::new(), &attestations).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.accepted.iter().map(|n| &**n).collect::<Vec<_>>(), vec!["a", "c"]);
    assert_eq!(nodes[1].calls(Capability::SubmitAttestations), 0);
    assert_eq!(nodes[2].submissions()[0].1.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_inactive_endpoints_are_skipped() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].set_probe_failure(true);
    let client = connect_scripted(&nodes).await;

    let report = client.submit_voluntary_exit(&CallContext::new(), &sample_exit(1)).await.unwrap();
    assert_eq!(report.accepted.len(), 1);
    assert!(nodes[0].submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submissions_run_concurrently() {
    let nodes = scripted_nodes(&["a", "b", "c"]);
    for node in &nodes {
        node.delay(Capability::SubmitVoluntaryExit, Duration::from_millis(300), json!(null));
    }
    let client = connect_scripted(&nodes).await;

    let started = tokio::time::Instant::now();
    let report = client.submit_voluntary_exit(&CallContext::new(), &sample_exit(7)).await.unwrap();

    assert_eq!(report.accepted.len(), 3);
    assert!(started.elapsed() < Duration::from_millis(600));
}

#[tokio::test]
async fn test_single_node_surface_hides_partial_failure() {
    let nodes = scripted_nodes(&["a", "b"]);
    nodes[0].fail(Capability::SubmitVoluntaryExit, "busy");
    let client = connect_scripted(&nodes).await;
    let node: Arc<dyn BeaconNode> = Arc::new(client);

    node.submit_voluntary_exit(&sample_exit(3)).await.unwrap();
    assert_eq!(nodes[1].submissions().len(), 1);
}

#[tokio::test]
async fn test_cancelled_submission_sends_nothing() {
    let nodes = scripted_nodes(&["a", "b"]);
    let client = connect_scripted(&nodes).await;

    let ctx = CallContext::new();
    ctx.cancel();
    let result = client.submit_voluntary_exit(&ctx, &sample_exit(9)).await;

    assert!(matches!(result, Err(ClusterError::Cancelled)));
    for node in &nodes {
        assert_eq!(node.calls(Capability::SubmitVoluntaryExit), 0);
    }
}
