//! Integration Tests for the Multi-Endpoint Beacon Client
//!
//! This crate contains various test modules:
//!
//! - `health_tests`: Probe classification, roster publication and fast-path demotion
//! - `routing_tests`: Static, best-effort and parallel routing with failover
//! - `corroboration_tests`: Strict and majority agreement across endpoints
//! - `submission_tests`: Broadcast submissions and partial acceptance
//! - `cancellation_tests`: Call contexts, deadlines and in-flight cleanup
//! - `fault_injection_tests`: Clusters built from erroring and sleepy nodes
//! - `http_node_tests`: REST nodes against mock beacon servers
//! - `mock_infrastructure`: Reusable fixtures (scripted clusters, mock REST servers)
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! Nothing here needs a live beacon node; REST tests run against local mockito
//! servers.

#[cfg(test)]
mod health_tests;

#[cfg(test)]
mod routing_tests;


#[cfg(test)]
mod submission_tests;

#[cfg(test)]
mod cancellation_tests;

#[cfg(test)]
mod fault_injection_tests;


pub mod mock_infrastructure;
