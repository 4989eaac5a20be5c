use super::endpoint::Endpoint;
use std::sync::Arc;

/// Immutable snapshot of the active endpoints, in configuration order.
///
/// Published whole by the health tracker; readers hold an `Arc<Roster>` for the
/// duration of a call and never see a partially rebuilt list.
#[derive(Debug, Default)]
pub struct Roster {
    endpoints: Vec<Arc<Endpoint>>,
    generation: u64,
}

impl Roster {
    /// Builds a snapshot. `endpoints` must already be in configuration order.
    #[must_use]
    pub fn new(endpoints: Vec<Arc<Endpoint>>, generation: u64) -> Self {
        debug_assert!(endpoints.windows(2).all(|w| w[0].index() < w[1].index()));
        Self { endpoints, generation }
    }

    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Publication counter; increases by one with every swap.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.name()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.iter().any(|e| e.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Endpoint>> {
        self.endpoints.iter()
    }
}
