//! # Corroboration
//!
//! Optional cross-checking of best-effort reads across several endpoints, to stop a
//! single lagging or misbehaving node from silently supplying stale data.
//!
//! ## Algorithm
//!
//! 1. **Participant selection**: the first `max_participants` capable active
//!    endpoints in roster order
//! 2. **Parallel query**: every participant concurrently, each under its own timeout
//! 3. **Grouping**: successful responses grouped by value equality
//! 4. **Agreement check** per [`CorroborationMode`]:
//!    - `strict`: one group only, with at least `min_participants` members
//!    - `majority`: the largest group holds more than half of the queried participants
//!
//! ## Failure Modes
//!
//! - **Disagreement** without the required agreement: `Inconsistent`
//! - **Too few responses**, no disagreement: `QuorumUnavailable`
//! - **No responses at all**: `Exhausted`
//! - **Fewer capable endpoints than `min_participants`**: per
//!   [`LowParticipantsBehavior`]
//!
//! Endpoints outside the winning group are reported as dissenters and get a
//! fast-path re-probe.

pub mod config;
pub mod quorum;

pub use config::{CorroborationConfig, CorroborationMode, LowParticipantsBehavior};
pub use quorum::{evaluate, group_values, ValueGroup, Verdict};
