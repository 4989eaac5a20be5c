//! Multi-endpoint orchestration over several beacon nodes.
//!
//! This module turns a list of independently unreliable beacon nodes into one
//! logical client:
//! - Health tracking with periodic probes and an atomically published active roster
//! - Capability resolution against each endpoint's declared operation set
//! - Policy-driven call routing with failover, optional parallel fan-out and
//!   optional corroboration of best-effort reads
//! - Broadcast of submissions to every capable endpoint
//! - Per-call cancellation and deadlines
//!
//! # Routing Policies
//!
//! Each operation is tagged with a [`Capability`](crate::node::Capability) whose
//! [`CallPolicy`](crate::node::CallPolicy) decides how the [`CallRouter`] runs it:
//!
//! 1. **Static value** - chain constants. One endpoint is asked; on error the next
//!    in roster order is tried.
//!
//! 2. **Best effort** - chain state. The first success in roster order wins, either
//!    sequentially or with all candidates queried at once. With corroboration
//!    enabled ([`CorroborationConfig`]), several endpoints are queried and must agree.
//!
//! 3. **Submission** - side effects. Sent to every capable endpoint; one acceptance
//!    is enough.
//!
//! ## Example Flow
//!
//! ```text
//! MultiClient::attester_duties(ctx, ..)
//!     │
//!     ├─ HealthTracker::roster()          ← lock-free snapshot
//!     │
//!     ├─ CapabilityResolver::resolve()    → NoActiveClients / Unsupported
//!     │
//!     └─ CallRouter::call()
//!           │
//!           ├─ endpoint fails  → record failure → HealthTracker::hint_failure()
//!           │                                       (single-flight re-probe)
//!           └─ endpoint serves → value
//! ```
//!
//! See [`CallRouter`] for the full policy dispatch.

pub mod builder;
pub mod client;
pub mod context;
pub mod corroboration;
pub mod endpoint;
pub mod errors;
pub mod health;
pub mod policy;
pub mod resolver;
pub mod roster;
pub mod router;

pub use builder::MultiClientBuilder;
pub use client::MultiClient;
pub use context::CallContext;
pub use corroboration::{CorroborationConfig, CorroborationMode, LowParticipantsBehavior};
pub use endpoint::{Endpoint, EndpointStatus, Liveness, ProbeRecord};
pub use errors::{ClusterError, EndpointFailure, SubmissionReport};
pub use health::{HealthConfig, HealthTracker};
pub use policy::{FanOut, OperationOverride, ResolvedPolicy, RoutingConfig};
pub use resolver::CapabilityResolver;
pub use roster::Roster;
pub use router::CallRouter;
