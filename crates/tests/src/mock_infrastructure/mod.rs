//! Mock Infrastructure for Testing the Multi-Endpoint Client
//!
//! Reusable fixtures for exercising failover without real beacon nodes.
//!
//! ## Components
//!
//! - `BeaconMockBuilder`: Wraps mockito to serve beacon node REST endpoints
//! - Scripted cluster fixtures and sample chain objects
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{connect_scripted, scripted_nodes};
//!
//! let nodes = scripted_nodes(&["a", "b", "c"]);
//! let client = connect_scripted(&nodes).await;
//! nodes[0].fail(Capability::Finality, "down");
//! ```

pub mod test_helpers;

pub use beacon_mock::BeaconMockBuilder;
pub use test_helpers::*;
