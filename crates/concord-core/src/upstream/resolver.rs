use super::{endpoint::Endpoint, errors::ClusterError, roster::Roster};
use crate::node::Capability;
use std::sync::Arc;

/// Answers "which active endpoints can serve this operation?".
///
/// A pure lookup against each endpoint's declared capability set; never calls a node.
pub struct CapabilityResolver;

impl CapabilityResolver {
    /// The roster entries supporting `capability`, in roster order.
    #[must_use]
    pub fn capable(capability: Capability, roster: &Roster) -> Vec<Arc<Endpoint>> {
        roster.iter().filter(|e| e.supports(capability)).cloned().collect()
    }

    /// Like [`capable`](Self::capable), but distinguishes the two empty cases.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::NoActiveClients`] if the roster is empty
    /// - [`ClusterError::Unsupported`] if no active endpoint declares `capability`
    pub fn resolve(
        capability: Capability,
        roster: &Roster,
    ) -> Result<Vec<Arc<Endpoint>>, ClusterError> {
        if roster.is_empty() {
            return Err(ClusterError::NoActiveClients);
        }

        let capable = Self::capable(capability, roster);
        if capable.is_empty() {
            return Err(ClusterError::Unsupported(capability));
        }
        Ok(capable)
    }
}
