//! Beacon node implementations for testing failover behavior.
//!
//! - [`ScriptedNode`]: in-memory node with programmable responses
//! - [`Erroring`]: wraps a node and fails calls at a configured rate
//! - [`Sleepy`]: wraps a node and delays calls by a random duration
//!
//! The wrappers take their random source as a seedable [`rand::rngs::StdRng`] so
//! runs can be reproduced.

/// Implements [`BeaconNode`](crate::node::BeaconNode) for a wrapper with `name`,
/// `address` and `next` fields by awaiting `self.intercept(capability)` before
/// forwarding each operation to `next`.
macro_rules! forward_to_next {
    ($wrapper:ty) => {
        #[async_trait::async_trait]
        impl $crate::node::BeaconNode for $wrapper {
            fn name(&self) -> &str {
                &self.name
            }

            fn address(&self) -> &str {
                &self.address
            }

            fn capabilities(&self) -> $crate::node::CapabilitySet {
                self.next.capabilities()
            }

            async fn node_syncing(&self) -> NodeResult<SyncState> {
                self.intercept(Capability::NodeSyncing).await?;
                self.next.node_syncing().await
            }

            async fn node_version(&self) -> NodeResult<String> {
                self.intercept(Capability::NodeVersion).await?;
                self.next.node_version().await
            }

            async fn slot_duration(&self) -> NodeResult<std::time::Duration> {
                self.intercept(Capability::SlotDuration).await?;
                self.next.slot_duration().await
            }

            async fn slots_per_epoch(&self) -> NodeResult<u64> {
                self.intercept(Capability::SlotsPerEpoch).await?;
                self.next.slots_per_epoch().await
            }

            async fn far_future_epoch(&self) -> NodeResult<Epoch> {
                self.intercept(Capability::FarFutureEpoch).await?;
                self.next.far_future_epoch().await
            }

            async fn genesis(&self) -> NodeResult<Genesis> {
                self.intercept(Capability::Genesis).await?;
                self.next.genesis().await
            }

            async fn genesis_time(&self) -> NodeResult<GenesisTime> {
                self.intercept(Capability::GenesisTime).await?;
                self.next.genesis_time().await
            }

            async fn spec(&self) -> NodeResult<Spec> {
                self.intercept(Capability::Spec).await?;
                self.next.spec().await
            }

            async fn deposit_contract(&self) -> NodeResult<DepositContract> {
                self.intercept(Capability::DepositContract).await?;
                self.next.deposit_contract().await
            }

            async fn fork_schedule(&self) -> NodeResult<Vec<Fork>> {
                self.intercept(Capability::ForkSchedule).await?;
                self.next.fork_schedule().await
            }

            async fn fork(&self, state_id: &str) -> NodeResult<Fork> {
                self.intercept(Capability::Fork).await?;
                self.next.fork(state_id).await
            }

            async fn finality(&self, state_id: &str) -> NodeResult<Finality> {
                self.intercept(Capability::Finality).await?;
                self.next.finality(state_id).await
            }

            async fn attester_duties(
                &self,
                epoch: Epoch,
                validator_indices: &[ValidatorIndex],
            ) -> NodeResult<Vec<AttesterDuty>> {
                self.intercept(Capability::AttesterDuties).await?;
                self.next.attester_duties(epoch, validator_indices).await
            }

            async fn proposer_duties(
                &self,
                epoch: Epoch,
                validator_indices: &[ValidatorIndex],
            ) -> NodeResult<Vec<ProposerDuty>> {
                self.intercept(Capability::ProposerDuties).await?;
                self.next.proposer_duties(epoch, validator_indices).await
            }

            async fn beacon_block_proposal(
                &self,
                slot: Slot,
                randao_reveal: &BlsSignature,
                graffiti: &str,
            ) -> NodeResult<BeaconBlock> {
                self.intercept(Capability::BeaconBlockProposal).await?;
                self.next.beacon_block_proposal(slot, randao_reveal, graffiti).await
            }

            async fn attestation_data(
                &self,
                slot: Slot,
                committee_index: CommitteeIndex,
            ) -> NodeResult<AttestationData> {
                self.intercept(Capability::AttestationData).await?;
                self.next.attestation_data(slot, committee_index).await
            }

            async fn aggregate_attestation(
                &self,
                slot: Slot,
                attestation_data_root: &Root,
            ) -> NodeResult<Attestation> {
                self.intercept(Capability::AggregateAttestation).await?;
                self.next.aggregate_attestation(slot, attestation_data_root).await
            }

            async fn beacon_block_header(&self, block_id: &str) -> NodeResult<BeaconBlockHeader> {
                self.intercept(Capability::BeaconBlockHeader).await?;
                self.next.beacon_block_header(block_id).await
            }

            async fn validator_balances(
                &self,
                state_id: &str,
                validator_indices: &[ValidatorIndex],
            ) -> NodeResult<ValidatorBalances> {
                self.intercept(Capability::ValidatorBalances).await?;
                self.next.validator_balances(state_id, validator_indices).await
            }

            async fn validators(
                &self,
                state_id: &str,
                validator_indices: &[ValidatorIndex],
            ) -> NodeResult<Validators> {
                self.intercept(Capability::Validators).await?;
                self.next.validators(state_id, validator_indices).await
            }

            async fn events(&self, topics: &[String]) -> NodeResult<EventStream> {
                self.intercept(Capability::Events).await?;
                self.next.events(topics).await
            }

            async fn submit_attestations(&self, attestations: &[Attestation]) -> NodeResult<()> {
                self.intercept(Capability::SubmitAttestations).await?;
                self.next.submit_attestations(attestations).await
            }

            async fn submit_aggregate_attestations(
                &self,
                aggregates: &[SignedAggregateAndProof],
            ) -> NodeResult<()> {
                self.intercept(Capability::SubmitAggregateAttestations).await?;
                self.next.submit_aggregate_attestations(aggregates).await
            }

            async fn submit_beacon_block(&self, block: &SignedBeaconBlock) -> NodeResult<()> {
                self.intercept(Capability::SubmitBeaconBlock).await?;
                self.next.submit_beacon_block(block).await
            }

            async fn submit_beacon_committee_subscriptions(
                &self,
                subscriptions: &[BeaconCommitteeSubscription],
            ) -> NodeResult<()> {
                self.intercept(Capability::SubmitBeaconCommitteeSubscriptions).await?;
                self.next.submit_beacon_committee_subscriptions(subscriptions).await
            }

            async fn submit_voluntary_exit(&self, exit: &SignedVoluntaryExit) -> NodeResult<()> {
                self.intercept(Capability::SubmitVoluntaryExit).await?;
                self.next.submit_voluntary_exit(exit).await
            }
        }
    };
}

mod erroring;
mod scripted;
mod sleepy;

pub use erroring::Erroring;
pub use scripted::ScriptedNode;
pub use sleepy::Sleepy;
