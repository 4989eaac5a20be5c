use crate::node::{Capability, NodeError};
use std::{fmt, sync::Arc};
use thiserror::Error;

/// One endpoint's failure during a routed call.
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: Arc<str>,
    pub error: NodeError,
}

impl EndpointFailure {
    #[must_use]
    pub fn new(endpoint: Arc<str>, error: NodeError) -> Self {
        Self { endpoint, error }
    }
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

fn join_groups(groups: &[Vec<Arc<str>>]) -> String {
    groups.iter().map(|g| format!("[{}]", g.join(", "))).collect::<Vec<_>>().join(" vs ")
}

/// Errors returned by the multi-endpoint client.
///
/// Per-endpoint failures never surface on their own while another capable endpoint
/// can still be tried; they are collected into [`ClusterError::Exhausted`] or
/// [`ClusterError::QuorumUnavailable`] once fallback runs out.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClusterError {
    /// Invalid endpoint list or routing settings.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The roster is non-empty but no active endpoint supports the operation.
    #[error("No active endpoint supports {0}")]
    Unsupported(Capability),

    /// The roster is empty.
    #[error("No active endpoints")]
    NoActiveClients,

    /// Every candidate endpoint failed.
    #[error("All endpoints failed for {capability}: {}", join_failures(.failures))]
    Exhausted { capability: Capability, failures: Vec<EndpointFailure> },

    /// Corroborating endpoints returned different values without the required agreement.
    /// Each group lists the endpoints that returned the same value.
    #[error("Inconsistent responses for {capability}: {}", join_groups(.groups))]
    Inconsistent { capability: Capability, groups: Vec<Vec<Arc<str>>> },

    /// Too few endpoints responded to corroborate, and none of them disagreed.
    #[error("Quorum unavailable for {capability}: {responded} responded, {required} required")]
    QuorumUnavailable {
        capability: Capability,
        responded: usize,
        required: usize,
        failures: Vec<EndpointFailure>,
    },

    #[error("Call cancelled")]
    Cancelled,

    #[error("Call deadline exceeded")]
    DeadlineExceeded,
}

impl ClusterError {
    /// Returns `true` if the caller gave up on the call, as opposed to the cluster failing it.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Per-endpoint failures carried by this error, if any.
    #[must_use]
    pub fn failures(&self) -> &[EndpointFailure] {
        match self {
            Self::Exhausted { failures, .. } | Self::QuorumUnavailable { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl From<ClusterError> for NodeError {
    fn from(error: ClusterError) -> Self {
        match error {
            ClusterError::Unsupported(capability) => NodeError::Unsupported(capability),
            ClusterError::DeadlineExceeded => NodeError::Timeout,
            ClusterError::Configuration(msg) => NodeError::Configuration(msg),
            other => NodeError::Cluster(other.to_string()),
        }
    }
}

/// Outcome of a broadcast submission that at least one endpoint accepted.
#[derive(Debug)]
pub struct SubmissionReport {
    pub capability: Capability,
    /// Endpoints that accepted, in roster order.
    pub accepted: Vec<Arc<str>>,
    /// Endpoints that rejected or failed, in roster order.
    pub failures: Vec<EndpointFailure>,
}

impl SubmissionReport {
    /// Returns `true` if every endpoint the submission was sent to accepted it.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
