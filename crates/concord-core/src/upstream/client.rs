use super::{
    builder::MultiClientBuilder,
    context::CallContext,
    endpoint::EndpointStatus,
    errors::{ClusterError, SubmissionReport},
    health::HealthTracker,
    policy::RoutingConfig,
    roster::Roster,
    router::CallRouter,
};
use crate::{
    node::{BeaconNode, Capability, CapabilitySet, EventStream, NodeResult},
    types::{
        Attestation, AttestationData, AttesterDuty, BeaconBlock, BeaconBlockHeader,
        BeaconCommitteeSubscription, BlsSignature, CommitteeIndex, DepositContract, Epoch,
        Finality, Fork, Genesis, GenesisTime, ProposerDuty, Root, SignedAggregateAndProof,
        SignedBeaconBlock, SignedVoluntaryExit, Slot, Spec, SyncState, ValidatorBalances,
        ValidatorIndex, Validators,
    },
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast, task::JoinHandle};

/// Several beacon nodes presented as one.
///
/// Every operation takes a [`CallContext`] and is routed by the policy of its
/// [`Capability`]. `MultiClient` also implements [`BeaconNode`] itself, running each
/// operation under a fresh context, so it can stand in wherever a single node is
/// expected.
pub struct MultiClient {
    health: Arc<HealthTracker>,
    router: CallRouter,
    capabilities: CapabilitySet,
    address: String,
}

impl MultiClient {
    #[must_use]
    pub fn builder() -> MultiClientBuilder {
        MultiClientBuilder::new()
    }

    pub(super) fn new(health: Arc<HealthTracker>, router: CallRouter) -> Self {
        let capabilities =
            health.endpoints().iter().fold(CapabilitySet::empty(), |set, e| set.union(e.capabilities()));
        let address =
            health.endpoints().iter().map(|e| e.address()).collect::<Vec<_>>().join(",");
        Self { health, router, capabilities, address }
    }

    #[must_use]
    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    #[must_use]
    pub fn routing_config(&self) -> &RoutingConfig {
        self.router.config()
    }

    /// Current active roster.
    #[must_use]
    pub fn roster(&self) -> Arc<Roster> {
        self.health.roster()
    }

    /// Health of every configured endpoint, in configuration order.
    #[must_use]
    pub fn endpoint_statuses(&self) -> Vec<EndpointStatus> {
        self.health.endpoints().iter().map(|e| e.status()).collect()
    }

    /// Probes every endpoint now and publishes the resulting roster.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Configuration`] if no endpoints are configured.
    pub async fn refresh(&self) -> Result<Arc<Roster>, ClusterError> {
        self.health.refresh().await
    }

    /// Starts periodic health refreshes until `shutdown_rx` fires.
    #[must_use]
    pub fn start_with_shutdown(&self, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        self.health.start_with_shutdown(shutdown_rx)
    }

    pub async fn node_syncing(&self, ctx: &CallContext) -> Result<SyncState, ClusterError> {
        self.router.call(ctx, Capability::NodeSyncing, |node| async move { node.node_syncing().await }).await
    }

    pub async fn node_version(&self, ctx: &CallContext) -> Result<String, ClusterError> {
        self.router.call(ctx, Capability::NodeVersion, |node| async move { node.node_version().await }).await
    }

    pub async fn slot_duration(&self, ctx: &CallContext) -> Result<Duration, ClusterError> {
        self.router
            .call(ctx, Capability::SlotDuration, |node| async move { node.slot_duration().await })
            .await
    }

    pub async fn slots_per_epoch(&self, ctx: &CallContext) -> Result<u64, ClusterError> {
        self.router
            .call(ctx, Capability::SlotsPerEpoch, |node| async move { node.slots_per_epoch().await })
            .await
    }

    pub async fn far_future_epoch(&self, ctx: &CallContext) -> Result<Epoch, ClusterError> {
        self.router
            .call(ctx, Capability::FarFutureEpoch, |node| async move { node.far_future_epoch().await })
            .await
    }

    pub async fn genesis(&self, ctx: &CallContext) -> Result<Genesis, ClusterError> {
        self.router.call(ctx, Capability::Genesis, |node| async move { node.genesis().await }).await
    }

    pub async fn genesis_time(&self, ctx: &CallContext) -> Result<GenesisTime, ClusterError> {
        self.router.call(ctx, Capability::GenesisTime, |node| async move { node.genesis_time().await }).await
    }

    pub async fn spec(&self, ctx: &CallContext) -> Result<Spec, ClusterError> {
        self.router.call(ctx, Capability::Spec, |node| async move { node.spec().await }).await
    }

    pub async fn deposit_contract(&self, ctx: &CallContext) -> Result<DepositContract, ClusterError> {
        self.router
            .call(ctx, Capability::DepositContract, |node| async move { node.deposit_contract().await })
            .await
    }

    pub async fn fork_schedule(&self, ctx: &CallContext) -> Result<Vec<Fork>, ClusterError> {
        self.router
            .call(ctx, Capability::ForkSchedule, |node| async move { node.fork_schedule().await })
            .await
    }

    pub async fn fork(&self, ctx: &CallContext, state_id: &str) -> Result<Fork, ClusterError> {
        let state_id: Arc<str> = state_id.into();
        self.router
            .call(ctx, Capability::Fork, move |node| {
                let state_id = Arc::clone(&state_id);
                async move { node.fork(&state_id).await }
            })
            .await
    }

    pub async fn finality(&self, ctx: &CallContext, state_id: &str) -> Result<Finality, ClusterError> {
        let state_id: Arc<str> = state_id.into();
        self.router
            .call(ctx, Capability::Finality, move |node| {
                let state_id = Arc::clone(&state_id);
                async move { node.finality(&state_id).await }
            })
            .await
    }

    pub async fn attester_duties(
        &self,
        ctx: &CallContext,
        epoch: Epoch,
        validator_indices: &[ValidatorIndex],
    ) -> Result<Vec<AttesterDuty>, ClusterError> {
        let indices: Arc<[ValidatorIndex]> = validator_indices.into();
        self.router
            .call(ctx, Capability::AttesterDuties, move |node| {
                let indices = Arc::clone(&indices);
                async move { node.attester_duties(epoch, &indices).await }
            })
            .await
    }

    pub async fn proposer_duties(
        &self,
        ctx: &CallContext,
        epoch: Epoch,
        validator_indices: &[ValidatorIndex],
    ) -> Result<Vec<ProposerDuty>, ClusterError> {
        let indices: Arc<[ValidatorIndex]> = validator_indices.into();
        self.router
            .call(ctx, Capability::ProposerDuties, move |node| {
                let indices = Arc::clone(&indices);
                async move { node.proposer_duties(epoch, &indices).await }
            })
            .await
    }

    pub async fn beacon_block_proposal(
        &self,
        ctx: &CallContext,
        slot: Slot,
        randao_reveal: &BlsSignature,
        graffiti: &str,
    ) -> Result<BeaconBlock, ClusterError> {
        let randao_reveal = Arc::new(randao_reveal.clone());
        let graffiti: Arc<str> = graffiti.into();
        self.router
            .call(ctx, Capability::BeaconBlockProposal, move |node| {
                let randao_reveal = Arc::clone(&randao_reveal);
                let graffiti = Arc::clone(&graffiti);
                async move { node.beacon_block_proposal(slot, &randao_reveal, &graffiti).await }
            })
            .await
    }

    pub async fn attestation_data(
        &self,
        ctx: &CallContext,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Result<AttestationData, ClusterError> {
        self.router
            .call(ctx, Capability::AttestationData, move |node| async move {
                node.attestation_data(slot, committee_index).await
            })
            .await
    }

    pub async fn aggregate_attestation(
        &self,
        ctx: &CallContext,
        slot: Slot,
        attestation_data_root: &Root,
    ) -> Result<Attestation, ClusterError> {
        let root = Arc::new(attestation_data_root.clone());
        self.router
            .call(ctx, Capability::AggregateAttestation, move |node| {
                let root = Arc::clone(&root);
                async move { node.aggregate_attestation(slot, &root).await }
            })
            .await
    }

    pub async fn beacon_block_header(
        &self,
        ctx: &CallContext,
        block_id: &str,
    ) -> Result<BeaconBlockHeader, ClusterError> {
        let block_id: Arc<str> = block_id.into();
        self.router
            .call(ctx, Capability::BeaconBlockHeader, move |node| {
                let block_id = Arc::clone(&block_id);
                async move { node.beacon_block_header(&block_id).await }
            })
            .await
    }

    pub async fn validator_balances(
        &self,
        ctx: &CallContext,
        state_id: &str,
        validator_indices: &[ValidatorIndex],
    ) -> Result<ValidatorBalances, ClusterError> {
        let state_id: Arc<str> = state_id.into();
        let indices: Arc<[ValidatorIndex]> = validator_indices.into();
        self.router
            .call(ctx, Capability::ValidatorBalances, move |node| {
                let state_id = Arc::clone(&state_id);
                let indices = Arc::clone(&indices);
                async move { node.validator_balances(&state_id, &indices).await }
            })
            .await
    }

    pub async fn validators(
        &self,
        ctx: &CallContext,
        state_id: &str,
        validator_indices: &[ValidatorIndex],
    ) -> Result<Validators, ClusterError> {
        let state_id: Arc<str> = state_id.into();
        let indices: Arc<[ValidatorIndex]> = validator_indices.into();
        self.router
            .call(ctx, Capability::Validators, move |node| {
                let state_id = Arc::clone(&state_id);
                let indices = Arc::clone(&indices);
                async move { node.validators(&state_id, &indices).await }
            })
            .await
    }

    /// Opens the event stream on the first capable endpoint that accepts it.
    ///
    /// The stream stays bound to that endpoint; it is not moved if the endpoint
    /// later drops out of the roster.
    pub async fn events(
        &self,
        ctx: &CallContext,
        topics: &[String],
    ) -> Result<EventStream, ClusterError> {
        let topics: Arc<[String]> = topics.into();
        self.router
            .first_available(ctx, Capability::Events, move |node| {
                let topics = Arc::clone(&topics);
                async move { node.events(&topics).await }
            })
            .await
    }

    pub async fn submit_attestations(
        &self,
        ctx: &CallContext,
        attestations: &[Attestation],
    ) -> Result<SubmissionReport, ClusterError> {
        let attestations: Arc<[Attestation]> = attestations.into();
        self.router
            .submit(ctx, Capability::SubmitAttestations, move |node| {
                let attestations = Arc::clone(&attestations);
                async move { node.submit_attestations(&attestations).await }
            })
            .await
    }

    pub async fn submit_aggregate_attestations(
        &self,
        ctx: &CallContext,
        aggregates: &[SignedAggregateAndProof],
    ) -> Result<SubmissionReport, ClusterError> {
        let aggregates: Arc<[SignedAggregateAndProof]> = aggregates.into();
        self.router
            .submit(ctx, Capability::SubmitAggregateAttestations, move |node| {
                let aggregates = Arc::clone(&aggregates);
                async move { node.submit_aggregate_attestations(&aggregates).await }
            })
            .await
    }

    pub async fn submit_beacon_block(
        &self,
        ctx: &CallContext,
        block: &SignedBeaconBlock,
    ) -> Result<SubmissionReport, ClusterError> {
        let block = Arc::new(block.clone());
        self.router
            .submit(ctx, Capability::SubmitBeaconBlock, move |node| {
                let block = Arc::clone(&block);
                async move { node.submit_beacon_block(&block).await }
            })
            .await
    }

    pub async fn submit_beacon_committee_subscriptions(
        &self,
        ctx: &CallContext,
        subscriptions: &[BeaconCommitteeSubscription],
    ) -> Result<SubmissionReport, ClusterError> {
        let subscriptions: Arc<[BeaconCommitteeSubscription]> = subscriptions.into();
        self.router
            .submit(ctx, Capability::SubmitBeaconCommitteeSubscriptions, move |node| {
                let subscriptions = Arc::clone(&subscriptions);
                async move { node.submit_beacon_committee_subscriptions(&subscriptions).await }
            })
            .await
    }

    pub async fn submit_voluntary_exit(
        &self,
        ctx: &CallContext,
        exit: &SignedVoluntaryExit,
    ) -> Result<SubmissionReport, ClusterError> {
        let exit = Arc::new(exit.clone());
        self.router
            .submit(ctx, Capability::SubmitVoluntaryExit, move |node| {
                let exit = Arc::clone(&exit);
                async move { node.submit_voluntary_exit(&exit).await }
            })
            .await
    }
}

#[async_trait]
impl BeaconNode for MultiClient {
    fn name(&self) -> &str {
        "multi"
    }

    /// Member addresses joined with `,`.
    fn address(&self) -> &str {
        &self.address
    }

    /// Union of the members' capabilities.
    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn node_syncing(&self) -> NodeResult<SyncState> {
        Ok(MultiClient::node_syncing(self, &CallContext::new()).await?)
    }

    async fn node_version(&self) -> NodeResult<String> {
        Ok(MultiClient::node_version(self, &CallContext::new()).await?)
    }

    async fn slot_duration(&self) -> NodeResult<Duration> {
        Ok(MultiClient::slot_duration(self, &CallContext::new()).await?)
    }

    async fn slots_per_epoch(&self) -> NodeResult<u64> {
        Ok(MultiClient::slots_per_epoch(self, &CallContext::new()).await?)
    }

    async fn far_future_epoch(&self) -> NodeResult<Epoch> {
        Ok(MultiClient::far_future_epoch(self, &CallContext::new()).await?)
    }

    async fn genesis(&self) -> NodeResult<Genesis> {
        Ok(MultiClient::genesis(self, &CallContext::new()).await?)
    }

    async fn genesis_time(&self) -> NodeResult<GenesisTime> {
        Ok(MultiClient::genesis_time(self, &CallContext::new()).await?)
    }

    async fn spec(&self) -> NodeResult<Spec> {
        Ok(MultiClient::spec(self, &CallContext::new()).await?)
    }

    async fn deposit_contract(&self) -> NodeResult<DepositContract> {
        Ok(MultiClient::deposit_contract(self, &CallContext::new()).await?)
    }

    async fn fork_schedule(&self) -> NodeResult<Vec<Fork>> {
        Ok(MultiClient::fork_schedule(self, &CallContext::new()).await?)
    }

    async fn fork(&self, state_id: &str) -> NodeResult<Fork> {
        Ok(MultiClient::fork(self, &CallContext::new(), state_id).await?)
    }

    async fn finality(&self, state_id: &str) -> NodeResult<Finality> {
        Ok(MultiClient::finality(self, &CallContext::new(), state_id).await?)
    }

    async fn attester_duties(
        &self,
        epoch: Epoch,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<AttesterDuty>> {
        Ok(MultiClient::attester_duties(self, &CallContext::new(), epoch, validator_indices).await?)
    }

    async fn proposer_duties(
        &self,
        epoch: Epoch,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<ProposerDuty>> {
        Ok(MultiClient::proposer_duties(self, &CallContext::new(), epoch, validator_indices).await?)
    }

    async fn beacon_block_proposal(
        &self,
        slot: Slot,
        randao_reveal: &BlsSignature,
        graffiti: &str,
    ) -> NodeResult<BeaconBlock> {
        Ok(MultiClient::beacon_block_proposal(self, &CallContext::new(), slot, randao_reveal, graffiti)
            .await?)
    }

    async fn attestation_data(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> NodeResult<AttestationData> {
        Ok(MultiClient::attestation_data(self, &CallContext::new(), slot, committee_index).await?)
    }

    async fn aggregate_attestation(
        &self,
        slot: Slot,
        attestation_data_root: &Root,
    ) -> NodeResult<Attestation> {
        Ok(MultiClient::aggregate_attestation(self, &CallContext::new(), slot, attestation_data_root)
            .await?)
    }

    async fn beacon_block_header(&self, block_id: &str) -> NodeResult<BeaconBlockHeader> {
        Ok(MultiClient::beacon_block_header(self, &CallContext::new(), block_id).await?)
    }

    async fn validator_balances(
        &self,
        state_id: &str,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<ValidatorBalances> {
        Ok(MultiClient::validator_balances(self, &CallContext::new(), state_id, validator_indices)
            .await?)
    }

    async fn validators(
        &self,
        state_id: &str,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Validators> {
        Ok(MultiClient::validators(self, &CallContext::new(), state_id, validator_indices).await?)
    }

    async fn events(&self, topics: &[String]) -> NodeResult<EventStream> {
        Ok(MultiClient::events(self, &CallContext::new(), topics).await?)
    }

    async fn submit_attestations(&self, attestations: &[Attestation]) -> NodeResult<()> {
        MultiClient::submit_attestations(self, &CallContext::new(), attestations).await?;
        Ok(())
    }

    async fn submit_aggregate_attestations(
        &self,
        aggregates: &[SignedAggregateAndProof],
    ) -> NodeResult<()> {
        MultiClient::submit_aggregate_attestations(self, &CallContext::new(), aggregates).await?;
        Ok(())
    }

    async fn submit_beacon_block(&self, block: &SignedBeaconBlock) -> NodeResult<()> {
        MultiClient::submit_beacon_block(self, &CallContext::new(), block).await?;
        Ok(())
    }

    async fn submit_beacon_committee_subscriptions(
        &self,
        subscriptions: &[BeaconCommitteeSubscription],
    ) -> NodeResult<()> {
        MultiClient::submit_beacon_committee_subscriptions(self, &CallContext::new(), subscriptions)
            .await?;
        Ok(())
    }

    async fn submit_voluntary_exit(&self, exit: &SignedVoluntaryExit) -> NodeResult<()> {
        MultiClient::submit_voluntary_exit(self, &CallContext::new(), exit).await?;
        Ok(())
    }
}
