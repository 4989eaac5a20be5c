use crate::{
    node::{BeaconNode, Capability, CapabilitySet, EventStream, NodeError, NodeResult},
    types::{
        Attestation, AttestationData, AttesterDuty, BeaconBlock, BeaconBlockHeader,
        BeaconCommitteeSubscription, BlsSignature, CommitteeIndex, DepositContract, Epoch, Event,
        Finality, Fork, Genesis, GenesisTime, ProposerDuty, Root, SignedAggregateAndProof,
        SignedBeaconBlock, SignedVoluntaryExit, Slot, Spec, SyncState, ValidatorBalances,
        ValidatorIndex, Validators,
    },
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

type ErrorFactory = Arc<dyn Fn() -> NodeError + Send + Sync>;

#[derive(Clone)]
enum Script {
    Respond(Value),
    Fail(ErrorFactory),
    Hang,
    Delay(Duration, Value),
}

/// Decrements the in-flight gauge when a call finishes or is dropped mid-flight.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Programmable in-memory beacon node.
///
/// Each capability answers with a canned default unless scripted otherwise. Scripted
/// responses are JSON values decoded into the operation's return type, so the
/// same fixture format works for every operation. Arguments are ignored.
///
/// The sync-status probe is controlled separately through
/// [`set_sync_state`](Self::set_sync_state), [`set_probe_failure`](Self::set_probe_failure)
/// and [`set_probe_hang`](Self::set_probe_hang).
pub struct ScriptedNode {
    name: String,
    address: String,
    capabilities: CapabilitySet,
    scripts: DashMap<Capability, Script>,
    calls: DashMap<Capability, usize>,
    in_flight: AtomicUsize,
    sync_state: Mutex<SyncState>,
    probe_failure: AtomicBool,
    probe_hang: AtomicBool,
    submissions: Mutex<Vec<(Capability, Value)>>,
}

impl ScriptedNode {
    /// A fully synced node supporting every capability.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: format!("scripted://{name}"),
            name,
            capabilities: CapabilitySet::all(),
            scripts: DashMap::new(),
            calls: DashMap::new(),
            in_flight: AtomicUsize::new(0),
            sync_state: Mutex::new(SyncState::synced(1000)),
            probe_failure: AtomicBool::new(false),
            probe_hang: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn without(mut self, capability: Capability) -> Self {
        self.capabilities = self.capabilities.without(capability);
        self
    }

    /// Answers `capability` with `value`.
    pub fn respond(&self, capability: Capability, value: Value) {
        self.scripts.insert(capability, Script::Respond(value));
    }

    /// Fails `capability` with an HTTP 500 carrying `message`.
    pub fn fail(&self, capability: Capability, message: &str) {
        let message = message.to_string();
        self.fail_with(capability, move || NodeError::Http(500, message.clone()));
    }

    pub fn fail_with<E>(&self, capability: Capability, error: E)
    where
        E: Fn() -> NodeError + Send + Sync + 'static,
    {
        self.scripts.insert(capability, Script::Fail(Arc::new(error)));
    }

    /// Never answers `capability`.
    pub fn hang(&self, capability: Capability) {
        self.scripts.insert(capability, Script::Hang);
    }

    /// Answers `capability` with `value` after `delay`.
    pub fn delay(&self, capability: Capability, delay: Duration, value: Value) {
        self.scripts.insert(capability, Script::Delay(delay, value));
    }

    /// Restores the default answer for `capability`.
    pub fn reset(&self, capability: Capability) {
        self.scripts.remove(&capability);
    }

    pub fn set_sync_state(&self, state: SyncState) {
        *self.sync_state.lock() = state;
    }

    pub fn set_probe_failure(&self, fail: bool) {
        self.probe_failure.store(fail, Ordering::Release);
    }

    pub fn set_probe_hang(&self, hang: bool) {
        self.probe_hang.store(hang, Ordering::Release);
    }

    /// Number of calls made for `capability`, including unsupported ones.
    #[must_use]
    pub fn calls(&self, capability: Capability) -> usize {
        self.calls.get(&capability).map_or(0, |c| *c)
    }

    /// Calls currently executing, across all capabilities.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Accepted submissions, in arrival order.
    #[must_use]
    pub fn submissions(&self) -> Vec<(Capability, Value)> {
        self.submissions.lock().clone()
    }

    fn enter(&self, capability: Capability) -> InFlightGuard<'_> {
        *self.calls.entry(capability).or_insert(0) += 1;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard(&self.in_flight)
    }

    async fn play(&self, capability: Capability) -> NodeResult<Value> {
        if !self.capabilities.contains(capability) {
            return Err(NodeError::Unsupported(capability));
        }

        let script = self.scripts.get(&capability).map(|s| s.value().clone());
        match script {
            None => Ok(default_response(capability)),
            Some(Script::Respond(value)) => Ok(value),
            Some(Script::Fail(error)) => Err(error()),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Delay(delay, value)) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
        }
    }

    async fn invoke<T: DeserializeOwned>(&self, capability: Capability) -> NodeResult<T> {
        let _guard = self.enter(capability);
        let value = self.play(capability).await?;
        serde_json::from_value(value).map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    async fn submit<P: Serialize + ?Sized + Sync>(
        &self,
        capability: Capability,
        payload: &P,
    ) -> NodeResult<()> {
        let _guard = self.enter(capability);
        self.play(capability).await?;
        let payload =
            serde_json::to_value(payload).map_err(|e| NodeError::InvalidResponse(e.to_string()))?;
        self.submissions.lock().push((capability, payload));
        Ok(())
    }
}

fn checkpoint() -> Value {
    json!({ "epoch": "100", "root": "0x0000000000000000000000000000000000000000000000000000000000000000" })
}

fn attestation_data() -> Value {
    json!({
        "slot": "3200",
        "index": "0",
        "beacon_block_root": "0x0000000000000000000000000000000000000000000000000000000000000001",
        "source": checkpoint(),
        "target": checkpoint(),
    })
}

fn default_response(capability: Capability) -> Value {
    match capability {
        Capability::NodeSyncing => json!({ "head_slot": "1000", "sync_distance": "0", "is_syncing": false }),
        Capability::NodeVersion => json!("scripted/v1.0.0"),
        Capability::SlotDuration => json!(12),
        Capability::SlotsPerEpoch => json!(32),
        Capability::FarFutureEpoch => json!(u64::MAX),
        Capability::Genesis => json!({
            "genesis_time": "1606824023",
            "genesis_validators_root": "0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95",
            "genesis_fork_version": "0x00000000",
        }),
        Capability::GenesisTime => json!("2020-12-01T12:00:23Z"),
        Capability::Spec => json!({ "SECONDS_PER_SLOT": "12", "SLOTS_PER_EPOCH": "32" }),
        Capability::DepositContract => json!({
            "chain_id": "1",
            "address": "0x00000000219ab540356cbb839cbe05303d7705fa",
        }),
        Capability::Fork => json!({
            "previous_version": "0x00000000",
            "current_version": "0x01000000",
            "epoch": "74240",
        }),
        Capability::ForkSchedule => json!([default_response(Capability::Fork)]),
        Capability::Finality => json!({
            "previous_justified": checkpoint(),
            "current_justified": checkpoint(),
            "finalized": checkpoint(),
        }),
        Capability::BeaconBlockProposal => json!({
            "slot": "3200",
            "proposer_index": "1",
            "parent_root": "0x00",
            "state_root": "0x00",
            "body": {},
        }),
        Capability::AttestationData => attestation_data(),
        Capability::AggregateAttestation => json!({
            "aggregation_bits": "0x01",
            "data": attestation_data(),
            "signature": "0x00",
        }),
        Capability::BeaconBlockHeader => json!({
            "root": "0x00",
            "canonical": true,
            "header": {
                "message": {
                    "slot": "3200",
                    "proposer_index": "1",
                    "parent_root": "0x00",
                    "state_root": "0x00",
                    "body_root": "0x00",
                },
                "signature": "0x00",
            },
        }),
        Capability::ValidatorBalances | Capability::Validators => json!({}),
        Capability::AttesterDuties | Capability::ProposerDuties | Capability::Events => json!([]),
        Capability::SubmitAttestations |
        Capability::SubmitAggregateAttestations |
        Capability::SubmitBeaconBlock |
        Capability::SubmitBeaconCommitteeSubscriptions |
        Capability::SubmitVoluntaryExit => Value::Null,
    }
}

#[async_trait]
impl BeaconNode for ScriptedNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn node_syncing(&self) -> NodeResult<SyncState> {
        let _guard = self.enter(Capability::NodeSyncing);
        if self.probe_hang.load(Ordering::Acquire) {
            std::future::pending::<()>().await;
        }
        if self.probe_failure.load(Ordering::Acquire) {
            return Err(NodeError::Connection("probe refused".to_string()));
        }
        if !self.capabilities.contains(Capability::NodeSyncing) {
            return Err(NodeError::Unsupported(Capability::NodeSyncing));
        }
        let state = self.sync_state.lock().clone();
        Ok(state)
    }

    async fn node_version(&self) -> NodeResult<String> {
        self.invoke(Capability::NodeVersion).await
    }

    async fn slot_duration(&self) -> NodeResult<Duration> {
        let seconds: u64 = self.invoke(Capability::SlotDuration).await?;
        Ok(Duration::from_secs(seconds))
    }

    async fn slots_per_epoch(&self) -> NodeResult<u64> {
        self.invoke(Capability::SlotsPerEpoch).await
    }

    async fn far_future_epoch(&self) -> NodeResult<Epoch> {
        self.invoke(Capability::FarFutureEpoch).await
    }

    async fn genesis(&self) -> NodeResult<Genesis> {
        self.invoke(Capability::Genesis).await
    }

    async fn genesis_time(&self) -> NodeResult<GenesisTime> {
        self.invoke(Capability::GenesisTime).await
    }

    async fn spec(&self) -> NodeResult<Spec> {
        self.invoke(Capability::Spec).await
    }

    async fn deposit_contract(&self) -> NodeResult<DepositContract> {
        self.invoke(Capability::DepositContract).await
    }

    async fn fork_schedule(&self) -> NodeResult<Vec<Fork>> {
        self.invoke(Capability::ForkSchedule).await
    }

    async fn fork(&self, _state_id: &str) -> NodeResult<Fork> {
        self.invoke(Capability::Fork).await
    }

    async fn finality(&self, _state_id: &str) -> NodeResult<Finality> {
        self.invoke(Capability::Finality).await
    }

    async fn attester_duties(
        &self,
        _epoch: Epoch,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<AttesterDuty>> {
        self.invoke(Capability::AttesterDuties).await
    }

    async fn proposer_duties(
        &self,
        _epoch: Epoch,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<ProposerDuty>> {
        self.invoke(Capability::ProposerDuties).await
    }

    async fn beacon_block_proposal(
        &self,
        _slot: Slot,
        _randao_reveal: &BlsSignature,
        _graffiti: &str,
    ) -> NodeResult<BeaconBlock> {
        self.invoke(Capability::BeaconBlockProposal).await
    }

    async fn attestation_data(
        &self,
        _slot: Slot,
        _committee_index: CommitteeIndex,
    ) -> NodeResult<AttestationData> {
        self.invoke(Capability::AttestationData).await
    }

    async fn aggregate_attestation(
        &self,
        _slot: Slot,
        _attestation_data_root: &Root,
    ) -> NodeResult<Attestation> {
        self.invoke(Capability::AggregateAttestation).await
    }

    async fn beacon_block_header(&self, _block_id: &str) -> NodeResult<BeaconBlockHeader> {
        self.invoke(Capability::BeaconBlockHeader).await
    }

    async fn validator_balances(
        &self,
        _state_id: &str,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<ValidatorBalances> {
        self.invoke(Capability::ValidatorBalances).await
    }

    async fn validators(
        &self,
        _state_id: &str,
        _validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Validators> {
        self.invoke(Capability::Validators).await
    }

    async fn events(&self, _topics: &[String]) -> NodeResult<EventStream> {
        let events: Vec<Event> = self.invoke(Capability::Events).await?;
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }

    async fn submit_attestations(&self, attestations: &[Attestation]) -> NodeResult<()> {
        self.submit(Capability::SubmitAttestations, attestations).await
    }

    async fn submit_aggregate_attestations(
        &self,
        aggregates: &[SignedAggregateAndProof],
    ) -> NodeResult<()> {
        self.submit(Capability::SubmitAggregateAttestations, aggregates).await
    }

    async fn submit_beacon_block(&self, block: &SignedBeaconBlock) -> NodeResult<()> {
        self.submit(Capability::SubmitBeaconBlock, block).await
    }

    async fn submit_beacon_committee_subscriptions(
        &self,
        subscriptions: &[BeaconCommitteeSubscription],
    ) -> NodeResult<()> {
        self.submit(Capability::SubmitBeaconCommitteeSubscriptions, subscriptions).await
    }

    async fn submit_voluntary_exit(&self, exit: &SignedVoluntaryExit) -> NodeResult<()> {
        self.submit(Capability::SubmitVoluntaryExit, exit).await
    }
}
