use crate::{
    node::{BeaconNode, Capability, EventStream, NodeError, NodeResult},
    types::{
        Attestation, AttestationData, AttesterDuty, BeaconBlock, BeaconBlockHeader,
        BeaconCommitteeSubscription, BlsSignature, CommitteeIndex, DepositContract, Epoch,
        Finality, Fork, Genesis, GenesisTime, ProposerDuty, Root, SignedAggregateAndProof,
        SignedBeaconBlock, SignedVoluntaryExit, Slot, Spec, SyncState, ValidatorBalances,
        ValidatorIndex, Validators,
    },
};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use tracing::debug;

/// Wraps a node and fails each call with probability `error_rate`.
///
/// Failures are [`NodeError::Injected`], which the router treats like any other
/// transient endpoint failure.
pub struct Erroring {
    name: String,
    address: String,
    error_rate: f64,
    next: Arc<dyn BeaconNode>,
    rng: Mutex<StdRng>,
}

impl Erroring {
    /// # Errors
    ///
    /// Returns [`NodeError::Configuration`] if `error_rate` is outside `0..=1`.
    pub fn new(error_rate: f64, next: Arc<dyn BeaconNode>, rng: StdRng) -> NodeResult<Self> {
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(NodeError::Configuration(format!(
                "error rate must be between 0 and 1, got {error_rate}"
            )));
        }

        Ok(Self {
            name: format!("erroring({error_rate},{})", next.name()),
            address: format!("erroring:{error_rate},{}", next.address()),
            error_rate,
            next,
            rng: Mutex::new(rng),
        })
    }

    /// Same as [`new`](Self::new) with an RNG seeded from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Configuration`] if `error_rate` is outside `0..=1`.
    pub fn seeded(error_rate: f64, next: Arc<dyn BeaconNode>, seed: u64) -> NodeResult<Self> {
        Self::new(error_rate, next, StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    #[allow(clippy::unused_async)]
    async fn intercept(&self, capability: Capability) -> NodeResult<()> {
        let roll: f64 = self.rng.lock().random();
        if roll < self.error_rate {
            debug!(node = %self.name, capability = %capability, "injecting failure");
            return Err(NodeError::Injected);
        }
        if !self.next.capabilities().contains(capability) {
            return Err(NodeError::Unsupported(capability));
        }
        Ok(())
    }
}

forward_to_next!(Erroring);
