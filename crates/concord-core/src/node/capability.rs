//! Capability tags for beacon node operations.
//!
//! Every operation a [`BeaconNode`](super::BeaconNode) can serve is identified by a
//! [`Capability`]. A node declares the set it supports once, at registration, as a
//! [`CapabilitySet`]; the resolver answers "who can serve this?" with a bit test
//! instead of calling the node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the router treats an operation by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPolicy {
    /// Chain constants: ask one endpoint, fail over in roster order on error.
    StaticValue,
    /// Chain state: first success in roster order, optionally corroborated.
    BestEffort,
    /// Side-effecting calls: broadcast to every capable active endpoint.
    Submission,
}

/// A named operation an endpoint may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Capability {
    NodeSyncing,
    NodeVersion,
    SlotDuration,
    SlotsPerEpoch,
    FarFutureEpoch,
    Genesis,
    GenesisTime,
    Spec,
    DepositContract,
    ForkSchedule,
    Fork,
    Finality,
    AttesterDuties,
    ProposerDuties,
    BeaconBlockProposal,
    AttestationData,
    AggregateAttestation,
    BeaconBlockHeader,
    ValidatorBalances,
    Validators,
    Events,
    SubmitAttestations,
    SubmitAggregateAttestations,
    SubmitBeaconBlock,
    SubmitBeaconCommitteeSubscriptions,
    SubmitVoluntaryExit,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 26] = [
        Self::NodeSyncing,
        Self::NodeVersion,
        Self::SlotDuration,
        Self::SlotsPerEpoch,
        Self::FarFutureEpoch,
        Self::Genesis,
        Self::GenesisTime,
        Self::Spec,
        Self::DepositContract,
        Self::ForkSchedule,
        Self::Fork,
        Self::Finality,
        Self::AttesterDuties,
        Self::ProposerDuties,
        Self::BeaconBlockProposal,
        Self::AttestationData,
        Self::AggregateAttestation,
        Self::BeaconBlockHeader,
        Self::ValidatorBalances,
        Self::Validators,
        Self::Events,
        Self::SubmitAttestations,
        Self::SubmitAggregateAttestations,
        Self::SubmitBeaconBlock,
        Self::SubmitBeaconCommitteeSubscriptions,
        Self::SubmitVoluntaryExit,
    ];

    /// Returns the default routing policy for this operation.
    #[must_use]
    pub fn default_policy(self) -> CallPolicy {
        match self {
            Self::SlotDuration |
            Self::SlotsPerEpoch |
            Self::FarFutureEpoch |
            Self::Genesis |
            Self::GenesisTime |
            Self::Spec |
            Self::DepositContract |
            Self::ForkSchedule => CallPolicy::StaticValue,
            Self::SubmitAttestations |
            Self::SubmitAggregateAttestations |
            Self::SubmitBeaconBlock |
            Self::SubmitBeaconCommitteeSubscriptions |
            Self::SubmitVoluntaryExit => CallPolicy::Submission,
            _ => CallPolicy::BestEffort,
        }
    }

    /// Returns `true` for operations with side effects on the network.
    #[must_use]
    pub fn is_submission(self) -> bool {
        self.default_policy() == CallPolicy::Submission
    }

    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeSyncing => "node_syncing",
            Self::NodeVersion => "node_version",
            Self::SlotDuration => "slot_duration",
            Self::SlotsPerEpoch => "slots_per_epoch",
            Self::FarFutureEpoch => "far_future_epoch",
            Self::Genesis => "genesis",
            Self::GenesisTime => "genesis_time",
            Self::Spec => "spec",
            Self::DepositContract => "deposit_contract",
            Self::ForkSchedule => "fork_schedule",
            Self::Fork => "fork",
            Self::Finality => "finality",
            Self::AttesterDuties => "attester_duties",
            Self::ProposerDuties => "proposer_duties",
            Self::BeaconBlockProposal => "beacon_block_proposal",
            Self::AttestationData => "attestation_data",
            Self::AggregateAttestation => "aggregate_attestation",
            Self::BeaconBlockHeader => "beacon_block_header",
            Self::ValidatorBalances => "validator_balances",
            Self::Validators => "validators",
            Self::Events => "events",
            Self::SubmitAttestations => "submit_attestations",
            Self::SubmitAggregateAttestations => "submit_aggregate_attestations",
            Self::SubmitBeaconBlock => "submit_beacon_block",
            Self::SubmitBeaconCommitteeSubscriptions => "submit_beacon_committee_subscriptions",
            Self::SubmitVoluntaryExit => "submit_voluntary_exit",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable set of capabilities declared by an endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A set containing every capability.
    #[must_use]
    pub fn all() -> Self {
        Self::from_iter(Capability::ALL)
    }

    /// Every read capability (everything except submissions).
    #[must_use]
    pub fn read_only() -> Self {
        Capability::ALL.into_iter().filter(|c| !c.is_submission()).collect()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0 |= capability.bit();
        self
    }

    #[must_use]
    pub fn without(mut self, capability: Capability) -> Self {
        self.0 &= !capability.bit();
        self
    }

    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
