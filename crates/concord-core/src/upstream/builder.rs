//! Builder for constructing a [`MultiClient`] from nodes or configuration.

use super::{
    client::MultiClient,
    endpoint::Endpoint,
    errors::ClusterError,
    health::{HealthConfig, HealthTracker},
    policy::RoutingConfig,
    router::CallRouter,
};
use crate::{
    config::AppConfig,
    node::{BeaconNode, HttpBeaconNode},
};
use std::{collections::HashSet, sync::Arc};
use tracing::info;

/// Builder for a [`MultiClient`].
///
/// Nodes are kept in the order they are added; that order is the roster order
/// used for failover.
///
/// # Examples
///
/// ```no_run
/// # use concord_core::upstream::{CallContext, MultiClientBuilder};
/// # use concord_core::node::HttpBeaconNode;
/// # use std::{sync::Arc, time::Duration};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MultiClientBuilder::new()
///     .node(Arc::new(HttpBeaconNode::new("a", "http://localhost:5052", Duration::from_secs(10))?))
///     .node(Arc::new(HttpBeaconNode::new("b", "http://localhost:3500", Duration::from_secs(10))?))
///     .connect()
///     .await?;
///
/// let duties = client.proposer_duties(&CallContext::new(), 100, &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct MultiClientBuilder {
    nodes: Vec<Arc<dyn BeaconNode>>,
    health: HealthConfig,
    routing: RoutingConfig,
}

impl MultiClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new(), health: HealthConfig::default(), routing: RoutingConfig::default() }
    }

    /// Creates a builder with one REST node per configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Configuration`] if the configuration is invalid or a
    /// REST client cannot be created.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClusterError> {
        config.validate().map_err(ClusterError::Configuration)?;

        let mut builder = Self::new()
            .health_config(config.health_check.to_health_config())
            .routing_config(config.routing.clone());

        for endpoint in &config.endpoints {
            let node =
                HttpBeaconNode::new(endpoint.display_name(), endpoint.address.as_str(), endpoint.timeout())
                    .map_err(|e| ClusterError::Configuration(e.to_string()))?;
            builder = builder.node(Arc::new(node));
        }

        Ok(builder)
    }

    #[must_use]
    pub fn node(mut self, node: Arc<dyn BeaconNode>) -> Self {
        self.nodes.push(node);
        self
    }

    #[must_use]
    pub fn nodes<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn BeaconNode>>,
    {
        self.nodes.extend(nodes);
        self
    }

    #[must_use]
    pub fn health_config(mut self, config: HealthConfig) -> Self {
        self.health = config;
        self
    }

    #[must_use]
    pub fn routing_config(mut self, config: RoutingConfig) -> Self {
        self.routing = config;
        self
    }

    /// Builds the client without probing. The roster stays empty, and every call
    /// fails with [`ClusterError::NoActiveClients`], until the first refresh.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Configuration`] if no nodes were added, two nodes
    /// share a name, or the health or routing settings are invalid.
    pub fn build(self) -> Result<MultiClient, ClusterError> {
        if self.nodes.is_empty() {
            return Err(ClusterError::Configuration("no endpoints configured".to_string()));
        }
        if self.health.interval.is_zero() || self.health.probe_timeout.is_zero() {
            return Err(ClusterError::Configuration(
                "health interval and probe timeout must be greater than 0".to_string(),
            ));
        }
        self.routing.validate().map_err(ClusterError::Configuration)?;

        let mut names = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name()) {
                return Err(ClusterError::Configuration(format!(
                    "duplicate endpoint name: {}",
                    node.name()
                )));
            }
        }

        let endpoints: Vec<Arc<Endpoint>> = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(index, node)| Arc::new(Endpoint::new(index, node.name().to_string(), node)))
            .collect();

        info!(endpoints = endpoints.len(), "multi client initialized");

        let health = Arc::new(HealthTracker::new(endpoints, self.health));
        let router = CallRouter::new(Arc::clone(&health), self.routing);
        Ok(MultiClient::new(health, router))
    }

    /// Builds the client and runs the first refresh, so the roster reflects the
    /// endpoints' current state before the first call.
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build).
    pub async fn connect(self) -> Result<MultiClient, ClusterError> {
        let client = self.build()?;
        let roster = client.refresh().await?;
        info!(active = roster.len(), "initial health refresh complete");
        Ok(client)
    }
}

impl Default for MultiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
