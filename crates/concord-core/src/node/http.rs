use super::{BeaconNode, Capability, CapabilitySet, NodeError, NodeResult};
use crate::types::{
    Attestation, AttestationData, AttesterDuty, BeaconBlock, BeaconBlockHeader,
    BeaconCommitteeSubscription, BlsSignature, CommitteeIndex, DepositContract, Epoch, Finality,
    Fork, Genesis, GenesisTime, Gwei, ProposerDuty, Root, SignedAggregateAndProof,
    SignedBeaconBlock, SignedVoluntaryExit, Slot, Spec, SyncState, Validator, ValidatorBalances,
    ValidatorIndex, Validators,
};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, ClientBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Longest error body kept in [`NodeError::Http`].
const MAX_ERROR_BODY_LEN: usize = 512;

/// Every field of the standard API response is wrapped in `{"data": ...}`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct VersionData {
    version: String,
}

#[derive(Deserialize)]
struct BalanceEntry {
    #[serde(with = "crate::types::quoted_u64")]
    index: ValidatorIndex,
    #[serde(with = "crate::types::quoted_u64")]
    balance: Gwei,
}

/// REST client for a single beacon node.
///
/// Implements every operation of the standard beacon node API except the event
/// stream, and declares exactly that capability set.
pub struct HttpBeaconNode {
    name: String,
    address: String,
    client: Client,
    capabilities: CapabilitySet,
}

impl HttpBeaconNode {
    /// Creates a client for the node at `address` (e.g. `http://localhost:5052`).
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Configuration`] if the address is not an HTTP(S) URL or
    /// the underlying reqwest client fails to build.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        timeout: Duration,
    ) -> NodeResult<Self> {
        let address = address.into().trim_end_matches('/').to_string();
        if !address.starts_with("http://") && !address.starts_with("https://") {
            return Err(NodeError::Configuration(format!("not an HTTP address: {address}")));
        }

        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("concord/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                NodeError::Configuration(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            name: name.into(),
            address,
            client,
            capabilities: CapabilitySet::all().without(Capability::Events),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> NodeResult<T> {
        tracing::trace!(endpoint = %self.name, path, "GET");
        let response =
            self.client.get(self.url(path)).query(query).send().await.map_err(map_send_error)?;
        decode(check_status(response).await?).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> NodeResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::trace!(endpoint = %self.name, path, "POST");
        let response =
            self.client.post(self.url(path)).json(body).send().await.map_err(map_send_error)?;
        decode(check_status(response).await?).await
    }

    /// POST whose success response carries no data.
    async fn submit<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> NodeResult<()> {
        tracing::trace!(endpoint = %self.name, path, "POST");
        let response =
            self.client.post(self.url(path)).json(body).send().await.map_err(map_send_error)?;
        check_status(response).await.map(drop)
    }

    async fn spec_u64(&self, key: &str) -> NodeResult<Option<u64>> {
        let spec = self.spec().await?;
        spec.get(key).map(value_as_u64).transpose()
    }
}

fn value_as_u64(value: &serde_json::Value) -> NodeResult<u64> {
    match value {
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|e| NodeError::InvalidResponse(format!("not an integer: {s:?}: {e}"))),
        serde_json::Value::Number(n) => {
            n.as_u64().ok_or_else(|| NodeError::InvalidResponse(format!("not a u64: {n}")))
        }
        other => Err(NodeError::InvalidResponse(format!("unexpected value: {other}"))),
    }
}

fn map_send_error(error: reqwest::Error) -> NodeError {
    if error.is_timeout() {
        NodeError::Timeout
    } else if error.is_connect() {
        NodeError::Connection("connection refused or unreachable".to_string())
    } else {
        NodeError::Network(error)
    }
}

async fn check_status(response: Response) -> NodeResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(NodeError::Http(status.as_u16(), body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> NodeResult<T> {
    let bytes = response.bytes().await.map_err(map_send_error)?;
    let envelope: Envelope<T> = serde_json::from_slice(&bytes)
        .map_err(|e| NodeError::InvalidResponse(format!("Invalid JSON: {e}")))?;
    Ok(envelope.data)
}

fn id_query(validator_indices: &[ValidatorIndex]) -> Vec<(&'static str, String)> {
    if validator_indices.is_empty() {
        return Vec::new();
    }
    let ids = validator_indices.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    vec![("id", ids)]
}

#[async_trait]
impl BeaconNode for HttpBeaconNode {
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
        self.get("/eth/v1/node/syncing", &[]).await
    }

    async fn node_version(&self) -> NodeResult<String> {
        let data: VersionData = self.get("/eth/v1/node/version", &[]).await?;
        Ok(data.version)
    }

    async fn slot_duration(&self) -> NodeResult<Duration> {
        let seconds = self.spec_u64("SECONDS_PER_SLOT").await?.ok_or_else(|| {
            NodeError::InvalidResponse("SECONDS_PER_SLOT missing from spec".to_string())
        })?;
        Ok(Duration::from_secs(seconds))
    }

    async fn slots_per_epoch(&self) -> NodeResult<u64> {
        self.spec_u64("SLOTS_PER_EPOCH").await?.ok_or_else(|| {
            NodeError::InvalidResponse("SLOTS_PER_EPOCH missing from spec".to_string())
        })
    }

    async fn far_future_epoch(&self) -> NodeResult<Epoch> {
        // Most nodes leave this constant out of the spec response.
        Ok(self.spec_u64("FAR_FUTURE_EPOCH").await?.unwrap_or(u64::MAX))
    }

    async fn genesis(&self) -> NodeResult<Genesis> {
        self.get("/eth/v1/beacon/genesis", &[]).await
    }

    async fn genesis_time(&self) -> NodeResult<GenesisTime> {
        let genesis = self.genesis().await?;
        i64::try_from(genesis.genesis_time)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| {
                NodeError::InvalidResponse(format!(
                    "genesis time out of range: {}",
                    genesis.genesis_time
                ))
            })
    }

    async fn spec(&self) -> NodeResult<Spec> {
        self.get("/eth/v1/config/spec", &[]).await
    }

    async fn deposit_contract(&self) -> NodeResult<DepositContract> {
        self.get("/eth/v1/config/deposit_contract", &[]).await
    }

    async fn fork_schedule(&self) -> NodeResult<Vec<Fork>> {
        self.get("/eth/v1/config/fork_schedule", &[]).await
    }

    async fn fork(&self, state_id: &str) -> NodeResult<Fork> {
        self.get(&format!("/eth/v1/beacon/states/{state_id}/fork"), &[]).await
    }

    async fn finality(&self, state_id: &str) -> NodeResult<Finality> {
        self.get(&format!("/eth/v1/beacon/states/{state_id}/finality_checkpoints"), &[]).await
    }

    async fn attester_duties(
        &self,
        epoch: Epoch,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<AttesterDuty>> {
        let body: Vec<String> = validator_indices.iter().map(ToString::to_string).collect();
        self.post(&format!("/eth/v1/validator/duties/attester/{epoch}"), &body).await
    }

    async fn proposer_duties(
        &self,
        epoch: Epoch,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Vec<ProposerDuty>> {
        let duties: Vec<ProposerDuty> =
            self.get(&format!("/eth/v1/validator/duties/proposer/{epoch}"), &[]).await?;
        if validator_indices.is_empty() {
            return Ok(duties);
        }
        Ok(duties.into_iter().filter(|d| validator_indices.contains(&d.validator_index)).collect())
    }

    async fn beacon_block_proposal(
        &self,
        slot: Slot,
        randao_reveal: &BlsSignature,
        graffiti: &str,
    ) -> NodeResult<BeaconBlock> {
        let mut query = vec![("randao_reveal", randao_reveal.clone())];
        if !graffiti.is_empty() {
            query.push(("graffiti", graffiti.to_string()));
        }
        self.get(&format!("/eth/v2/validator/blocks/{slot}"), &query).await
    }

    async fn attestation_data(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> NodeResult<AttestationData> {
        let query = [("slot", slot.to_string()), ("committee_index", committee_index.to_string())];
        self.get("/eth/v1/validator/attestation_data", &query).await
    }

    async fn aggregate_attestation(
        &self,
        slot: Slot,
        attestation_data_root: &Root,
    ) -> NodeResult<Attestation> {
        let query =
            [("attestation_data_root", attestation_data_root.clone()), ("slot", slot.to_string())];
        self.get("/eth/v1/validator/aggregate_attestation", &query).await
    }

    async fn beacon_block_header(&self, block_id: &str) -> NodeResult<BeaconBlockHeader> {
        self.get(&format!("/eth/v1/beacon/headers/{block_id}"), &[]).await
    }

    async fn validator_balances(
        &self,
        state_id: &str,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<ValidatorBalances> {
        let entries: Vec<BalanceEntry> = self
            .get(
                &format!("/eth/v1/beacon/states/{state_id}/validator_balances"),
                &id_query(validator_indices),
            )
            .await?;
        Ok(entries.into_iter().map(|e| (e.index, e.balance)).collect())
    }

    async fn validators(
        &self,
        state_id: &str,
        validator_indices: &[ValidatorIndex],
    ) -> NodeResult<Validators> {
        let entries: Vec<Validator> = self
            .get(
                &format!("/eth/v1/beacon/states/{state_id}/validators"),
                &id_query(validator_indices),
            )
            .await?;
        Ok(entries.into_iter().map(|v| (v.index, v)).collect())
    }

    async fn submit_attestations(&self, attestations: &[Attestation]) -> NodeResult<()> {
        self.submit("/eth/v1/beacon/pool/attestations", attestations).await
    }

    async fn submit_aggregate_attestations(
        &self,
        aggregates: &[SignedAggregateAndProof],
    ) -> NodeResult<()> {
        self.submit("/eth/v1/validator/aggregate_and_proofs", aggregates).await
    }

    async fn submit_beacon_block(&self, block: &SignedBeaconBlock) -> NodeResult<()> {
        self.submit("/eth/v1/beacon/blocks", block).await
    }

    async fn submit_beacon_committee_subscriptions(
        &self,
        subscriptions: &[BeaconCommitteeSubscription],
    ) -> NodeResult<()> {
        self.submit("/eth/v1/validator/beacon_committee_subscriptions", subscriptions).await
    }

    async fn submit_voluntary_exit(&self, exit: &SignedVoluntaryExit) -> NodeResult<()> {
        self.submit("/eth/v1/beacon/pool/voluntary_exits", exit).await
    }
}
