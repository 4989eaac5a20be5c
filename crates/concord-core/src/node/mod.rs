//! The single-endpoint client abstraction.
//!
//! A [`BeaconNode`] is one beacon node API endpoint. It declares which operations it
//! serves through [`BeaconNode::capabilities`]; every operation has a default
//! implementation returning [`NodeError::Unsupported`], so an implementation only
//! writes the calls it actually supports.
//!
//! - [`capability`]: operation tags and the per-endpoint capability set
//! - [`errors`]: per-endpoint error type
//! - [`http`]: REST client for the standard beacon node API

pub mod capability;
pub mod errors;
pub mod http;

pub use capability::{CallPolicy, Capability, CapabilitySet};
pub use errors::{NodeError, NodeResult};
pub use http::HttpBeaconNode;

use crate::types::{
    Attestation, AttestationData, AttesterDuty, BeaconBlock, BeaconBlockHeader,
    BeaconCommitteeSubscription, BlsSignature, CommitteeIndex, DepositContract, Epoch, Event,
    Finality, Fork, Genesis, GenesisTime, ProposerDuty, Root, SignedAggregateAndProof,
    SignedBeaconBlock, SignedVoluntaryExit, Slot, Spec, SyncState, ValidatorBalances,
    ValidatorIndex, Validators,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Stream of events delivered by [`BeaconNode::events`].
pub type EventStream = BoxStream<'static, NodeResult<Event>>;

/// One beacon node API endpoint.
///
/// Implementations must be cheap to share (`Arc<dyn BeaconNode>`) and safe to call
/// concurrently. The declared capability set must not change over the lifetime of
/// the object.
#[async_trait]
pub trait BeaconNode: Send + Sync {
    /// Human-readable name of the client implementation.
    fn name(&self) -> &str;

    /// Network address of the endpoint.
    fn address(&self) -> &str;

    /// Operations this endpoint serves.
    fn capabilities(&self) -> CapabilitySet;

    /// Sync status, used as the liveness probe.
    async fn node_syncing(&self) -> NodeResult<SyncState> {
        Err(NodeError::Unsupported(Capability::NodeSyncing))
    }

    async fn node_version(&self) -> NodeResult<String> {
        Err(NodeError::Unsupported(Capability::NodeVersion))
    }

    async fn slot_duration(&self) -> NodeResult<Duration> {
        Err(NodeError::Unsupported(Capability::SlotDuration))
    }

    async fn slots_per_epoch(&self) -> NodeResult<u64> {
        Err(NodeError::Unsupported(Capability::SlotsPerEpoch))
    }

    async fn far_future_epoch(&self) -> NodeResult<Epoch> {
        Err(NodeError::Unsupported(Capability::FarFutureEpoch))
    }

    async fn genesis(&self) -> NodeResult<Genesis> {
        Err(NodeError::Unsupported(Capability::Genesis))
    }

    async fn genesis_time(&self) -> NodeResult<GenesisTime> {
        Err(NodeError::Unsupported(Capability::GenesisTime))
    }

    async fn spec(&self) -> NodeResult<Spec> {
        Err(NodeError::Unsupported(Capability::Spec))
    }

    async fn deposit_contract(&self) -> NodeResult<DepositContract> {
        Err(NodeError::Unsupported(Capability::DepositContract))
    }

    async fn fork_schedule(&self) -> NodeResult<Vec<Fork>> {
        Err(NodeError::Unsupported(Capability::ForkSchedule))
    }

    /// Fork at the given state (slot, root, or `head`/`finalized`/...).
    async fn fork(&self, _state_id: &str) -> NodeResult<Fork> {
        Err(NodeError::Unsupported(Capability::Fork))
    }

    async fn finality(&self, _state_id: &str) -> NodeResult<Finality> {
        Err(NodeError::Unsupported(Capability::Finality))
    }

    async fn attester_duties(
        &self,
        _epoch: Epoch,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<AttesterDuty>> {
        Err(NodeError::Unsupported(Capability::AttesterDuties))
    }

    async fn proposer_duties(
        &self,
        _epoch: Epoch,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<ProposerDuty>> {
        Err(NodeError::Unsupported(Capability::ProposerDuties))
    }

    async fn beacon_block_proposal(
        &self,
        _slot: Slot,
        _randao_reveal: &BlsSignature,
        _graffiti: &str,
    ) -> NodeResult<BeaconBlock> {
        Err(NodeError::Unsupported(Capability::BeaconBlockProposal))
    }

    async fn attestation_data(
        &self,
        _slot: Slot,
        _committee_index: CommitteeIndex,
    ) -> NodeResult<AttestationData> {
        Err(NodeError::Unsupported(Capability::AttestationData))
    }

    async fn aggregate_attestation(
        &self,
        _slot: Slot,
        _attestation_data_root: &Root,
    ) -> NodeResult<Attestation> {
        Err(NodeError::Unsupported(Capability::AggregateAttestation))
    }

    async fn beacon_block_header(&self, _block_id: &str) -> NodeResult<BeaconBlockHeader> {
        Err(NodeError::Unsupported(Capability::BeaconBlockHeader))
    }

    /// Balances at the given state. An empty index list means "all validators".
    async fn validator_balances(
        &self,
        _state_id: &str,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<ValidatorBalances> {
        Err(NodeError::Unsupported(Capability::ValidatorBalances))
    }

    /// Validator records at the given state. An empty index list means "all validators".
    async fn validators(
        &self,
        _state_id: &str,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Validators> {
        Err(NodeError::Unsupported(Capability::Validators))
    }

    /// Subscribes to the given event topics.
    async fn events(&self, _topics: &[String]) -> NodeResult<EventStream> {
        Err(NodeError::Unsupported(Capability::Events))
    }

    async fn submit_attestations(&self, _attestations: &[Attestation]) -> NodeResult<()> {
        Err(NodeError::Unsupported(Capability::SubmitAttestations))
    }

    async fn submit_aggregate_attestations(
        &self,
        _aggregates: &[SignedAggregateAndProof],
    ) -> NodeResult<()> {
        Err(NodeError::Unsupported(Capability::SubmitAggregateAttestations))
    }

    async fn submit_beacon_block(&self, _block: &SignedBeaconBlock) -> NodeResult<()> {
        Err(NodeError::Unsupported(Capability::SubmitBeaconBlock))
    }

    async fn submit_beacon_committee_subscriptions(
        &self,
        _subscriptions: &[BeaconCommitteeSubscription],
    ) -> NodeResult<()> {
        Err(NodeError::Unsupported(Capability::SubmitBeaconCommitteeSubscriptions))
    }

    async fn submit_voluntary_exit(&self, _exit: &SignedVoluntaryExit) -> NodeResult<()> {
        Err(NodeError::Unsupported(Capability::SubmitVoluntaryExit))
    }
}
