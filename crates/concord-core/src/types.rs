//! Chain data shapes exchanged with beacon nodes.
//!
//! These mirror the JSON objects of the standard beacon node API closely enough
//! for the REST client to decode them directly. Integers are quoted decimal strings
//! on the wire; the [`quoted_u64`] helpers handle that. Roots, keys and signatures are
//! kept as `0x`-prefixed hex strings since nothing here verifies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Slot = u64;
pub type Epoch = u64;
pub type ValidatorIndex = u64;
pub type CommitteeIndex = u64;
pub type Gwei = u64;
pub type Root = String;
pub type BlsPubKey = String;
pub type BlsSignature = String;

/// Chain configuration as returned by `/eth/v1/config/spec`.
pub type Spec = BTreeMap<String, serde_json::Value>;

/// Validator balances keyed by index.
pub type ValidatorBalances = BTreeMap<ValidatorIndex, Gwei>;

/// Validator records keyed by index.
pub type Validators = BTreeMap<ValidatorIndex, Validator>;

/// Genesis timestamp of the chain.
pub type GenesisTime = DateTime<Utc>;

/// Sync status reported by a node; drives the liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(with = "quoted_u64")]
    pub head_slot: Slot,
    #[serde(with = "quoted_u64")]
    pub sync_distance: Slot,
    pub is_syncing: bool,
    #[serde(default)]
    pub is_optimistic: bool,
}

impl SyncState {
    /// A fully synced state at the given head.
    #[must_use]
    pub fn synced(head_slot: Slot) -> Self {
        Self { head_slot, sync_distance: 0, is_syncing: false, is_optimistic: false }
    }

    /// A syncing state lagging the head by `sync_distance` slots.
    #[must_use]
    pub fn lagging(head_slot: Slot, sync_distance: Slot) -> Self {
        Self { head_slot, sync_distance, is_syncing: true, is_optimistic: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    #[serde(with = "quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: Root,
    pub genesis_fork_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    pub previous_version: String,
    pub current_version: String,
    #[serde(with = "quoted_u64")]
    pub epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositContract {
    #[serde(with = "quoted_u64")]
    pub chain_id: u64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(with = "quoted_u64")]
    pub epoch: Epoch,
    pub root: Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finality {
    pub previous_justified: Checkpoint,
    pub current_justified: Checkpoint,
    pub finalized: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttesterDuty {
    pub pubkey: BlsPubKey,
    #[serde(with = "quoted_u64")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "quoted_u64")]
    pub committee_index: CommitteeIndex,
    #[serde(with = "quoted_u64")]
    pub committee_length: u64,
    #[serde(with = "quoted_u64")]
    pub committees_at_slot: u64,
    #[serde(with = "quoted_u64")]
    pub validator_committee_index: u64,
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposerDuty {
    pub pubkey: BlsPubKey,
    #[serde(with = "quoted_u64")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
}

/// An unsigned block. The body is carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlock {
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
    #[serde(with = "quoted_u64")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeaderMessage {
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
    #[serde(with = "quoted_u64")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body_root: Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeaderMessage,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    pub root: Root,
    pub canonical: bool,
    pub header: SignedBeaconBlockHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationData {
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
    #[serde(with = "quoted_u64")]
    pub index: CommitteeIndex,
    pub beacon_block_root: Root,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: String,
    pub data: AttestationData,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateAndProof {
    #[serde(with = "quoted_u64")]
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    pub selection_proof: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconCommitteeSubscription {
    #[serde(with = "quoted_u64")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "quoted_u64")]
    pub committee_index: CommitteeIndex,
    #[serde(with = "quoted_u64")]
    pub committees_at_slot: u64,
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
    pub is_aggregator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoluntaryExit {
    #[serde(with = "quoted_u64")]
    pub epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub validator_index: ValidatorIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub pubkey: BlsPubKey,
    pub withdrawal_credentials: Root,
    #[serde(with = "quoted_u64")]
    pub effective_balance: Gwei,
    pub slashed: bool,
    #[serde(with = "quoted_u64")]
    pub activation_eligibility_epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub activation_epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub exit_epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub withdrawable_epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(with = "quoted_u64")]
    pub index: ValidatorIndex,
    #[serde(with = "quoted_u64")]
    pub balance: Gwei,
    pub status: String,
    pub validator: ValidatorRecord,
}

/// A single event from the node's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub data: serde_json::Value,
}

/// Serde helpers for the API's quoted-decimal integers.
///
/// Serialization always emits strings; deserialization also accepts bare numbers,
/// which some clients return.
pub mod quoted_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Quoted {
            Text(String),
            Number(u64),
        }

        match Quoted::deserialize(deserializer)? {
            Quoted::Text(s) => s.parse().map_err(de::Error::custom),
            Quoted::Number(n) => Ok(n),
        }
    }
}
