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
use std::{sync::Arc, time::Duration};

/// Wraps a node and delays each call by a random duration in `[min, max]`.
pub struct Sleepy {
    name: String,
    address: String,
    min: Duration,
    max: Duration,
    next: Arc<dyn BeaconNode>,
    rng: Mutex<StdRng>,
}

impl Sleepy {
    /// # Errors
    ///
    /// Returns [`NodeError::Configuration`] if `min` is greater than `max`.
    pub fn new(
        min: Duration,
        max: Duration,
        next: Arc<dyn BeaconNode>,
        rng: StdRng,
    ) -> NodeResult<Self> {
        if min > max {
            return Err(NodeError::Configuration(format!(
                "minimum sleep {min:?} exceeds maximum {max:?}"
            )));
        }

        Ok(Self {
            name: format!("sleepy({},{})", next.name(), max.as_millis()),
            address: format!("sleepy:{},{}", max.as_millis(), next.address()),
            min,
            max,
            next,
            rng: Mutex::new(rng),
        })
    }

    /// Same as [`new`](Self::new) with an RNG seeded from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Configuration`] if `min` is greater than `max`.
    pub fn seeded(
        min: Duration,
        max: Duration,
        next: Arc<dyn BeaconNode>,
        seed: u64,
    ) -> NodeResult<Self> {
        Self::new(min, max, next, StdRng::seed_from_u64(seed))
    }

    fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        self.rng.lock().random_range(self.min..=self.max)
    }

    async fn intercept(&self, capability: Capability) -> NodeResult<()> {
        tokio::time::sleep(self.next_delay()).await;
        if !self.next.capabilities().contains(capability) {
            return Err(NodeError::Unsupported(capability));
        }
        Ok(())
    }
}

forward_to_next!(Sleepy);
