use crate::{
    node::{BeaconNode, Capability, CapabilitySet},
    types::Slot,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
};

const PROBE_HISTORY_SIZE: usize = 100;

/// Liveness verdict of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Liveness {
    /// Not probed yet.
    Unknown = 0,
    Active = 1,
    Inactive = 2,
}

impl Liveness {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Active,
            2 => Self::Inactive,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRecord {
    pub timestamp: DateTime<Utc>,
    pub liveness: Liveness,
    pub head_slot: Option<Slot>,
    pub sync_distance: Option<Slot>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Snapshot of an endpoint's health for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub address: String,
    pub liveness: Liveness,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub head_slot: Option<Slot>,
    pub sync_distance: Option<Slot>,
    pub last_error: Option<String>,
    /// Most recent probes, oldest first.
    pub history: Vec<ProbeRecord>,
}

/// A configured beacon node together with its health state.
///
/// Created once at construction and shared by reference from roster snapshots.
/// Identity and capabilities are fixed; only liveness and probe history change,
/// and only through the health tracker.
pub struct Endpoint {
    index: usize,
    name: Arc<str>,
    address: String,
    node: Arc<dyn BeaconNode>,
    capabilities: CapabilitySet,
    liveness: AtomicU8,
    next_ticket: AtomicU64,
    applied_ticket: AtomicU64,
    reprobe_in_flight: AtomicBool,
    history: RwLock<VecDeque<ProbeRecord>>,
}

impl Endpoint {
    /// Wraps a node as the endpoint at position `index` of the configured list.
    ///
    /// The node's capability set is captured here and never queried again.
    #[must_use]
    pub fn new(index: usize, name: impl Into<Arc<str>>, node: Arc<dyn BeaconNode>) -> Self {
        Self {
            index,
            name: name.into(),
            address: node.address().to_string(),
            capabilities: node.capabilities(),
            node,
            liveness: AtomicU8::new(Liveness::Unknown as u8),
            next_ticket: AtomicU64::new(0),
            applied_ticket: AtomicU64::new(0),
            reprobe_in_flight: AtomicBool::new(false),
            history: RwLock::new(VecDeque::with_capacity(PROBE_HISTORY_SIZE)),
        }
    }

    /// Position in the configured endpoint list; roster order follows it.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the name, for error and log payloads.
    #[must_use]
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn node(&self) -> Arc<dyn BeaconNode> {
        Arc::clone(&self.node)
    }

    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    #[must_use]
    pub fn liveness(&self) -> Liveness {
        Liveness::from_u8(self.liveness.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.liveness() == Liveness::Active
    }

    /// Takes a ticket for a probe about to start. Tickets increase monotonically.
    pub(crate) fn issue_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Applies a finished probe unless a probe with a newer ticket has already been
    /// applied. Returns the previous liveness if the record was applied.
    pub(crate) fn apply_probe(&self, ticket: u64, record: ProbeRecord) -> Option<Liveness> {
        let newest = self.applied_ticket.fetch_max(ticket, Ordering::AcqRel);
        if newest >= ticket {
            return None;
        }

        let previous =
            Liveness::from_u8(self.liveness.swap(record.liveness as u8, Ordering::AcqRel));

        let mut history = self.history.write();
        if history.len() >= PROBE_HISTORY_SIZE {
            history.pop_front();
        }
        history.push_back(record);

        Some(previous)
    }

    /// Claims the single re-probe slot. Returns `false` if one is already running.
    pub(crate) fn try_begin_reprobe(&self) -> bool {
        self.reprobe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_reprobe(&self) {
        self.reprobe_in_flight.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn last_probe(&self) -> Option<ProbeRecord> {
        self.history.read().back().cloned()
    }

    #[must_use]
    pub fn status(&self) -> EndpointStatus {
        let history: Vec<ProbeRecord> = self.history.read().iter().cloned().collect();
        let last = history.last();

        EndpointStatus {
            name: self.name.to_string(),
            address: self.address.clone(),
            liveness: self.liveness(),
            last_probe_at: last.map(|r| r.timestamp),
            head_slot: last.and_then(|r| r.head_slot),
            sync_distance: last.and_then(|r| r.sync_distance),
            last_error: last.and_then(|r| r.error.clone()),
            history,
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("address", &self.address)
            .field("liveness", &self.liveness())
            .finish_non_exhaustive()
    }
}
