//! Call routing across the active roster.
//!
//! The [`CallRouter`] executes one logical operation per the policy resolved for
//! its capability:
//!
//! ```text
//! call(capability, op)
//!   │
//!   ├─ StaticValue ─────────────────────────→ sequential failover
//!   │
//!   ├─ BestEffort ─ [corroboration on?]
//!   │                 ├─ Yes → parallel query + quorum verdict
//!   │                 └─ No ─ [fan_out]
//!   │                          ├─ sequential → sequential failover
//!   │                          └─ parallel   → concurrent, lowest index wins
//!   │
//!   └─ Submission ──────────────────────────→ submit(): broadcast to all
//! ```
//!
//! Every endpoint failure that says something about the endpoint's health, and
//! every corroboration dissenter, sends a fast-path re-probe hint to the health
//! tracker.

mod fanout;

use self::fanout::FirstSuccess;
use super::{
    context::CallContext,
    corroboration::{self, CorroborationConfig, LowParticipantsBehavior, Verdict},
    endpoint::Endpoint,
    errors::{ClusterError, EndpointFailure, SubmissionReport},
    health::HealthTracker,
    policy::{FanOut, ResolvedPolicy, RoutingConfig},
    resolver::CapabilityResolver,
};
use crate::node::{BeaconNode, CallPolicy, Capability, NodeError, NodeResult};
use std::{future::Future, sync::Arc};
use tracing::{debug, warn};

/// Routes operations to endpoints of the current roster.
///
/// Stateless apart from its configuration: every call loads a fresh roster snapshot
/// from the health tracker and holds it for the duration of the call.
pub struct CallRouter {
    health: Arc<HealthTracker>,
    config: RoutingConfig,
}

impl CallRouter {
    #[must_use]
    pub fn new(health: Arc<HealthTracker>, config: RoutingConfig) -> Self {
        Self { health, config }
    }

    #[must_use]
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    #[must_use]
    pub fn policy_for(&self, capability: Capability) -> ResolvedPolicy {
        self.config.resolve(capability)
    }

    /// Executes a read operation.
    ///
    /// `op` builds the call for one endpoint; it may be invoked once per candidate.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::NoActiveClients`] / [`ClusterError::Unsupported`] if nothing can serve it
    /// - [`ClusterError::Exhausted`] if every candidate failed
    /// - [`ClusterError::Inconsistent`] / [`ClusterError::QuorumUnavailable`] from corroboration
    /// - [`ClusterError::Cancelled`] / [`ClusterError::DeadlineExceeded`] from `ctx`
    /// - [`ClusterError::Configuration`] if `capability` is a submission
    pub async fn call<T, F, Fut>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        op: F,
    ) -> Result<T, ClusterError>
    where
        T: PartialEq + Send + 'static,
        F: Fn(Arc<dyn BeaconNode>) -> Fut,
        Fut: Future<Output = NodeResult<T>> + Send + 'static,
    {
        ctx.check()?;
        let policy = self.config.resolve(capability);
        if policy.policy == CallPolicy::Submission {
            return Err(ClusterError::Configuration(format!(
                "{capability} is a submission and must be broadcast"
            )));
        }

        let roster = self.health.roster();
        let candidates = CapabilityResolver::resolve(capability, &roster)?;
        debug!(
            capability = %capability,
            policy = ?policy.policy,
            candidates = candidates.len(),
            generation = roster.generation(),
            "routing call"
        );

        match policy.policy {
            CallPolicy::BestEffort if policy.corroboration.is_enabled() => {
                self.corroborate(ctx, capability, &candidates, &op, policy.corroboration).await
            }
            CallPolicy::BestEffort if policy.fan_out == FanOut::Parallel => {
                self.parallel(ctx, capability, &candidates, &op).await
            }
            _ => self.sequential(ctx, capability, &candidates, &op).await,
        }
    }

    /// Executes a read that can only be failed over, never corroborated (streams).
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call), minus the corroboration outcomes.
    pub async fn first_available<T, F, Fut>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        op: F,
    ) -> Result<T, ClusterError>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn BeaconNode>) -> Fut,
        Fut: Future<Output = NodeResult<T>> + Send + 'static,
    {
        ctx.check()?;
        let roster = self.health.roster();
        let candidates = CapabilityResolver::resolve(capability, &roster)?;
        self.sequential(ctx, capability, &candidates, &op).await
    }

    /// Broadcasts a submission to every capable active endpoint.
    ///
    /// Succeeds if at least one endpoint accepts; the report keeps every failure.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::Exhausted`] if every endpoint failed
    /// - [`ClusterError::Configuration`] if `capability` is not a submission
    /// - routing and cancellation errors as in [`call`](Self::call)
    pub async fn submit<F, Fut>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        op: F,
    ) -> Result<SubmissionReport, ClusterError>
    where
        F: Fn(Arc<dyn BeaconNode>) -> Fut,
        Fut: Future<Output = NodeResult<()>> + Send + 'static,
    {
        ctx.check()?;
        if self.config.resolve(capability).policy != CallPolicy::Submission {
            return Err(ClusterError::Configuration(format!("{capability} is not a submission")));
        }

        let roster = self.health.roster();
        let candidates = CapabilityResolver::resolve(capability, &roster)?;
        debug!(capability = %capability, candidates = candidates.len(), "broadcasting submission");

        let set = fanout::spawn_all(&candidates, &op, ctx.bounded(self.config.call_timeout()));
        let outcomes = fanout::collect_all(ctx, set, candidates.len()).await?;

        let mut accepted = Vec::new();
        let mut failures = Vec::new();
        for (endpoint, outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Some(Ok(())) => accepted.push(endpoint.name_arc()),
                Some(Err(error)) => failures.push(self.record_failure(endpoint, capability, error)),
                None => failures.push(lost_task(endpoint)),
            }
        }

        if accepted.is_empty() {
            return Err(ClusterError::Exhausted { capability, failures });
        }
        if !failures.is_empty() {
            warn!(
                capability = %capability,
                accepted = accepted.len(),
                failed = failures.len(),
                "submission partially failed"
            );
        }

        Ok(SubmissionReport { capability, accepted, failures })
    }

    async fn sequential<T, F, Fut>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        candidates: &[Arc<Endpoint>],
        op: &F,
    ) -> Result<T, ClusterError>
    where
        F: Fn(Arc<dyn BeaconNode>) -> Fut,
        Fut: Future<Output = NodeResult<T>> + Send + 'static,
    {
        let mut failures = Vec::new();

        for endpoint in candidates {
            let call = op(endpoint.node());
            let timeout = ctx.bounded(self.config.call_timeout());
            match ctx.run(fanout::call_one(call, timeout)).await? {
                Ok(value) => {
                    debug!(endpoint = %endpoint.name(), capability = %capability, "call served");
                    return Ok(value);
                }
                Err(error) => failures.push(self.record_failure(endpoint, capability, error)),
            }
        }

        Err(ClusterError::Exhausted { capability, failures })
    }

    async fn parallel<T, F, Fut>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        candidates: &[Arc<Endpoint>],
        op: &F,
    ) -> Result<T, ClusterError>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn BeaconNode>) -> Fut,
        Fut: Future<Output = NodeResult<T>> + Send + 'static,
    {
        let set = fanout::spawn_all(candidates, op, ctx.bounded(self.config.call_timeout()));

        match fanout::first_success(ctx, set, candidates.len()).await? {
            FirstSuccess::Won { index, value, failures } => {
                for (i, error) in failures {
                    self.record_failure(&candidates[i], capability, error);
                }
                debug!(
                    endpoint = %candidates[index].name(),
                    capability = %capability,
                    "call served"
                );
                Ok(value)
            }
            FirstSuccess::AllFailed(failures) => {
                let failures = failures
                    .into_iter()
                    .map(|(i, error)| self.record_failure(&candidates[i], capability, error))
                    .collect();
                Err(ClusterError::Exhausted { capability, failures })
            }
        }
    }

    async fn corroborate<T, F, Fut>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        candidates: &[Arc<Endpoint>],
        op: &F,
        config: CorroborationConfig,
    ) -> Result<T, ClusterError>
    where
        T: PartialEq + Send + 'static,
        F: Fn(Arc<dyn BeaconNode>) -> Fut,
        Fut: Future<Output = NodeResult<T>> + Send + 'static,
    {
        let required = if candidates.len() >= config.min_participants {
            config.min_participants
        } else {
            match config.low_participants_behavior {
                LowParticipantsBehavior::AcceptAvailable => candidates.len(),
                LowParticipantsBehavior::ReturnError => {
                    return Err(ClusterError::QuorumUnavailable {
                        capability,
                        responded: 0,
                        required: config.min_participants,
                        failures: Vec::new(),
                    });
                }
            }
        };

        let participants = &candidates[..candidates.len().min(config.max_participants)];
        let set = fanout::spawn_all(participants, op, ctx.bounded(self.config.call_timeout()));
        let outcomes = fanout::collect_all(ctx, set, participants.len()).await?;

        let mut responses = Vec::new();
        let mut failures = Vec::new();
        for (endpoint, outcome) in participants.iter().zip(outcomes) {
            match outcome {
                Some(Ok(value)) => responses.push((endpoint.name_arc(), value)),
                Some(Err(error)) => failures.push(self.record_failure(endpoint, capability, error)),
                None => failures.push(lost_task(endpoint)),
            }
        }

        if responses.is_empty() {
            return Err(ClusterError::Exhausted { capability, failures });
        }

        match corroboration::evaluate(config.mode, responses, participants.len(), required) {
            Verdict::Accepted { value, agreeing, dissenters } => {
                for name in &dissenters {
                    if let Some(endpoint) = participants.iter().find(|e| e.name() == &**name) {
                        warn!(
                            endpoint = %name,
                            capability = %capability,
                            "endpoint disagreed with corroborated value"
                        );
                        self.health.hint_failure(endpoint);
                    }
                }
                debug!(
                    capability = %capability,
                    agreeing,
                    queried = participants.len(),
                    "corroborated value accepted"
                );
                Ok(value)
            }
            Verdict::Inconsistent { groups } => {
                warn!(capability = %capability, groups = groups.len(), "endpoints disagree");
                Err(ClusterError::Inconsistent { capability, groups })
            }
            Verdict::QuorumUnavailable { responded, required } => {
                warn!(capability = %capability, responded, required, "too few corroborating responses");
                Err(ClusterError::QuorumUnavailable { capability, responded, required, failures })
            }
        }
    }

    /// Logs a failed endpoint call and hints the health tracker if the failure
    /// reflects on the endpoint.
    fn record_failure(
        &self,
        endpoint: &Arc<Endpoint>,
        capability: Capability,
        error: NodeError,
    ) -> EndpointFailure {
        if error.should_demote() {
            warn!(
                endpoint = %endpoint.name(),
                capability = %capability,
                error = %error,
                "endpoint call failed"
            );
            self.health.hint_failure(endpoint);
        } else {
            debug!(
                endpoint = %endpoint.name(),
                capability = %capability,
                error = %error,
                "endpoint declined call"
            );
        }
        EndpointFailure::new(endpoint.name_arc(), error)
    }
}

fn lost_task(endpoint: &Endpoint) -> EndpointFailure {
    EndpointFailure::new(
        endpoint.name_arc(),
        NodeError::InvalidResponse("endpoint call task failed".to_string()),
    )
}
