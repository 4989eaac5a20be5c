//! Test Helper Functions and Utilities
//!
//! Cluster fixtures over scripted nodes, plus sample chain objects.

use concord_core::{
    node::BeaconNode,
    testclients::ScriptedNode,
    types::{Attestation, AttestationData, Checkpoint, SignedVoluntaryExit, VoluntaryExit},
    upstream::{HealthConfig, MultiClient, RoutingConfig},
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

/// Health settings short enough for tests: probes give up after 200ms and the
/// background loop never ticks on its own within a test.
#[must_use]
pub fn fast_health() -> HealthConfig {
    HealthConfig {
        interval: Duration::from_secs(3600),
        probe_timeout: Duration::from_millis(200),
        max_sync_lag_slots: 1,
    }
}

/// Routing settings with a short per-endpoint call timeout.
#[must_use]
pub fn fast_routing() -> RoutingConfig {
    RoutingConfig { call_timeout_ms: 500, ..Default::default() }
}

/// Creates one fully capable, synced scripted node per name.
#[must_use]
pub fn scripted_nodes(names: &[&str]) -> Vec<Arc<ScriptedNode>> {
    names.iter().map(|name| Arc::new(ScriptedNode::new(*name))).collect()
}

/// Upcasts scripted nodes for the client builder.
#[must_use]
pub fn as_beacon_nodes(nodes: &[Arc<ScriptedNode>]) -> Vec<Arc<dyn BeaconNode>> {
    nodes.iter().map(|node| Arc::clone(node) as Arc<dyn BeaconNode>).collect()
}

/// Builds a client over `nodes` and runs the first refresh.
///
/// # Panics
///
/// Panics if the client cannot be built.
pub async fn connect(nodes: Vec<Arc<dyn BeaconNode>>, routing: RoutingConfig) -> MultiClient {
    MultiClient::builder()
        .nodes(nodes)
        .health_config(fast_health())
        .routing_config(routing)
        .connect()
        .await
        .expect("client should build")
}

/// Builds a client over scripted nodes with default fast settings.
pub async fn connect_scripted(nodes: &[Arc<ScriptedNode>]) -> MultiClient {
    connect(as_beacon_nodes(nodes), fast_routing()).await
}

/// Finality checkpoints JSON with all three checkpoints at `epoch`.
#[must_use]
pub fn finality_json(epoch: u64) -> Value {
    crate::mock_infrastructure::beacon_mock::finality_data(epoch)
}

/// Yields until `condition` holds, for at most `limit`.
///
/// Returns whether the condition was met.
pub async fn wait_until<F: Fn() -> bool>(condition: F, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}

#[must_use]
pub fn sample_checkpoint(epoch: u64) -> Checkpoint {
    Checkpoint { epoch, root: format!("0x{epoch:064x}") }
}

#[must_use]
pub fn sample_attestation(slot: u64) -> Attestation {
    Attestation {
        aggregation_bits: "0x01".to_string(),
        data: AttestationData {
            slot,
            index: 0,
            beacon_block_root: format!("0x{slot:064x}"),
            source: sample_checkpoint((slot / 32).saturating_sub(1)),
            target: sample_checkpoint(slot / 32),
        },
        signature: "0x00".to_string(),
    }
}

#[must_use]
pub fn sample_exit(validator_index: u64) -> SignedVoluntaryExit {
    SignedVoluntaryExit {
        message: VoluntaryExit { epoch: 100, validator_index },
        signature: "0x00".to_string(),
    }
}

/// A single head event as the scripted node's event script expects it.
#[must_use]
pub fn head_event(slot: u64) -> Value {
    json!({ "topic": "head", "data": { "slot": slot.to_string() } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finality_json_decodes() {
        let finality: concord_core::types::Finality =
            serde_json::from_value(finality_json(7)).unwrap();
        assert_eq!(finality.finalized.epoch, 7);
    }

    #[test]
    fn test_sample_attestation_targets_slot_epoch() {
        let attestation = sample_attestation(3200);
        assert_eq!(attestation.data.target.epoch, 100);
        assert_eq!(attestation.data.source.epoch, 99);
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        assert!(!wait_until(|| false, Duration::from_millis(20)).await);
        assert!(wait_until(|| true, Duration::from_millis(20)).await);
    }
}
