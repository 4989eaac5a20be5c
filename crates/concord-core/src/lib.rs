//! # Concord Core
//!
//! Failover layer presenting several Ethereum beacon node API endpoints as one
//! logical client.
//!
//! This crate provides:
//!
//! - **[`node`]**: The single-endpoint [`BeaconNode`](node::BeaconNode) abstraction,
//!   capability tags, and a REST implementation of the standard beacon node API.
//!
//! - **[`upstream`]**: Health tracking, capability resolution, policy-driven call
//!   routing with optional corroboration, and the [`MultiClient`](upstream::MultiClient)
//!   facade.
//!
//! - **[`testclients`]**: Scripted and fault-injecting nodes for exercising failover.
//!
//! - **[`config`]** and **[`logging`]**: Layered configuration and subscriber setup.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                      MultiClient                       │
//! │  ┌───────────────┐  ┌────────────────┐  ┌───────────┐  │
//! │  │ HealthTracker │─►│ Roster (swap)  │◄─│CallRouter │  │
//! │  └───────┬───────┘  └────────────────┘  └─────┬─────┘  │
//! │          │ probe                     resolve  │ call   │
//! │  ┌───────▼────────────────────────────────────▼─────┐  │
//! │  │      Endpoint ─► Arc<dyn BeaconNode> (× N)       │  │
//! │  └──────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Call Flow
//!
//! ```text
//! Caller
//!   │
//!   ▼
//! MultiClient ── roster snapshot ──► CapabilityResolver
//!   │                                   │ empty roster → NoActiveClients
//!   │                                   │ no capable   → Unsupported
//!   ▼                                   ▼
//! CallRouter ── static / best effort / submission ──► endpoint(s)
//!   │
//!   ├─ failure → fast-path re-probe hint
//!   ▼
//! Result
//! ```

pub mod config;
pub mod logging;
pub mod node;
pub mod testclients;
pub mod types;
pub mod upstream;
