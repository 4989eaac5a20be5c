//! Routing policy: per-operation call policy, fan-out mode and corroboration.

use super::corroboration::{CorroborationConfig, CorroborationMode};
use crate::node::{CallPolicy, Capability};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// How best-effort reads are issued when corroboration is off.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// One endpoint at a time, in roster order.
    #[default]
    Sequential,
    /// All capable endpoints at once. The lowest-roster-index success still wins.
    Parallel,
}

/// Per-operation override of the routing defaults.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOverride {
    #[serde(default)]
    pub policy: Option<CallPolicy>,
    #[serde(default)]
    pub fan_out: Option<FanOut>,
    #[serde(default)]
    pub corroboration: Option<CorroborationMode>,
}

/// Effective routing for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub policy: CallPolicy,
    pub fan_out: FanOut,
    pub corroboration: CorroborationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Timeout for a single endpoint call in milliseconds (default: 5000)
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default)]
    pub fan_out: FanOut,

    #[serde(default)]
    pub corroboration: CorroborationConfig,

    /// Keyed by operation name, e.g. `attester_duties`.
    #[serde(default)]
    pub overrides: BTreeMap<Capability, OperationOverride>,
}

fn default_call_timeout_ms() -> u64 {
    5000
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            fan_out: FanOut::default(),
            corroboration: CorroborationConfig::default(),
            overrides: BTreeMap::new(),
        }
    }
}

impl RoutingConfig {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Resolves defaults and overrides for `capability`.
    ///
    /// Corroboration only applies to best-effort reads, and never to the event
    /// stream; other policies resolve with corroboration disabled.
    #[must_use]
    pub fn resolve(&self, capability: Capability) -> ResolvedPolicy {
        let overrides = self.overrides.get(&capability).copied().unwrap_or_default();
        let policy = overrides.policy.unwrap_or_else(|| capability.default_policy());

        let mut corroboration = self.corroboration;
        if let Some(mode) = overrides.corroboration {
            corroboration.mode = mode;
        }
        if policy != CallPolicy::BestEffort || capability == Capability::Events {
            corroboration.mode = CorroborationMode::Disabled;
        }

        ResolvedPolicy { policy, fan_out: overrides.fan_out.unwrap_or(self.fan_out), corroboration }
    }

    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_ms == 0 {
            return Err("Call timeout must be greater than 0".to_string());
        }
        self.corroboration.validate()?;

        for (capability, overrides) in &self.overrides {
            if let Some(policy) = overrides.policy {
                let is_submission = policy == CallPolicy::Submission;
                if is_submission != capability.is_submission() {
                    return Err(format!(
                        "Operation {capability} cannot be routed with policy {policy:?}"
                    ));
                }
            }
            if overrides.corroboration.is_some_and(|m| m != CorroborationMode::Disabled) &&
                (capability.is_submission() || *capability == Capability::Events)
            {
                return Err(format!("Operation {capability} cannot be corroborated"));
            }
        }

        Ok(())
    }
}
