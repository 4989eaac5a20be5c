//! Corroboration settings.

use serde::{Deserialize, Serialize};

/// How best-effort reads are cross-checked across endpoints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorroborationMode {
    /// First success in roster order wins.
    #[default]
    Disabled,
    /// Every responding participant must return the same value.
    Strict,
    /// A value returned by more than half of the queried participants wins.
    Majority,
}

/// What to do when fewer capable endpoints are active than `min_participants`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowParticipantsBehavior {
    /// Corroborate among whoever is available.
    #[default]
    AcceptAvailable,
    /// Fail with `QuorumUnavailable` without querying.
    ReturnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorroborationConfig {
    #[serde(default)]
    pub mode: CorroborationMode,

    /// Maximum endpoints queried per call (default: 3)
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,

    /// Minimum responses required in strict mode (default: 2)
    #[serde(default = "default_min_participants")]
    pub min_participants: usize,

    #[serde(default)]
    pub low_participants_behavior: LowParticipantsBehavior,
}

fn default_max_participants() -> usize {
    3
}

fn default_min_participants() -> usize {
    2
}

impl Default for CorroborationConfig {
    fn default() -> Self {
        Self {
            mode: CorroborationMode::default(),
            max_participants: default_max_participants(),
            min_participants: default_min_participants(),
            low_participants_behavior: LowParticipantsBehavior::default(),
        }
    }
}

impl CorroborationConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.mode != CorroborationMode::Disabled
    }

    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_participants == 0 {
            return Err("corroboration min_participants must be greater than 0".to_string());
        }
        if self.min_participants > self.max_participants {
            return Err(format!(
                "corroboration min_participants ({}) exceeds max_participants ({})",
                self.min_participants, self.max_participants
            ));
        }
        Ok(())
    }
}
