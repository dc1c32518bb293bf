//! The selector façade: snapshot, operational filter, strategy delegation,
//! and the post-selection load-accounting update.

use std::sync::Arc;

use bridge_common::{BridgeAddress, BridgeSelectionConfig, ConferenceId};
use bridge_registry::{BridgeRecord, BridgeRegistry};
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument};

use crate::conference::ConferenceBridges;
use crate::stats::StatisticsSnapshot;
use crate::strategy::SelectionStrategy;

/// Picks a bridge for a joining participant. Holds the configured strategy
/// for the lifetime of the selector — rebuilding it means constructing a new
/// `Selector`.
pub struct Selector {
    registry: Arc<BridgeRegistry>,
    config: Arc<BridgeSelectionConfig>,
    strategy: Box<dyn SelectionStrategy>,
    /// Lazily created, never removed: bounded by the number of conferences
    /// the embedding application tracks over the process lifetime, and
    /// serialises `select_bridge` per conference without coupling unrelated
    /// conferences to each other.
    conference_locks: DashMap<ConferenceId, Arc<AsyncMutex<()>>>,
}

impl Selector {
    pub fn new(registry: Arc<BridgeRegistry>, config: Arc<BridgeSelectionConfig>, strategy: Box<dyn SelectionStrategy>) -> Self {
        Self {
            registry,
            config,
            strategy,
            conference_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, conference: &ConferenceId) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.conference_locks
                .entry(conference.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .value(),
        )
    }

    /// Resolves each `(address, participant_count)` pair against the
    /// current registry. An address no longer present in the registry is
    /// dropped silently — it can no longer be a valid pick anyway.
    fn resolve_conference(&self, conference_bridges: &[(BridgeAddress, u32)]) -> ConferenceBridges {
        let mut resolved = ConferenceBridges::new();
        for (address, count) in conference_bridges {
            if let Some(record) = self.registry.get(address) {
                resolved.push(record, *count);
            }
        }
        resolved
    }

    /// `selectBridge(conference, participantRegion)`: returns `None` when no
    /// operational bridge is available, which callers must surface as
    /// "no bridge available" rather than treat as an internal error.
    #[instrument(level = "debug", skip(self, conference_bridges), fields(%conference, region = ?participant_region))]
    pub async fn select_bridge(
        &self,
        conference: ConferenceId,
        participant_region: Option<&str>,
        conference_bridges: &[(BridgeAddress, u32)],
    ) -> Option<Arc<BridgeRecord>> {
        let lock = self.lock_for(&conference);
        let _guard = lock.lock().await;

        let sorted = self.registry.snapshot_sorted();
        let mut candidates: Vec<Arc<BridgeRecord>> = sorted
            .iter()
            .filter(|record| record.is_operational() && !record.is_in_graceful_shutdown())
            .cloned()
            .collect();
        if candidates.is_empty() {
            debug!("no non-shutdown operational bridges, re-filtering to include graceful-shutdown bridges");
            candidates = sorted.into_iter().filter(|record| record.is_operational()).collect();
        }

        let resolved_conference = self.resolve_conference(conference_bridges);
        let picked = self.strategy.select(&candidates, &resolved_conference, participant_region, self.config.octo_enabled);

        if let Some(bridge) = &picked {
            bridge.endpoint_added();
        }
        picked
    }

    /// Rule-firing counters plus bridge-population gauges, as the external
    /// statistics interface.
    pub fn statistics_snapshot(&self) -> StatisticsSnapshot {
        let mut snapshot = StatisticsSnapshot::new();
        for (name, value) in self.strategy.counters_snapshot() {
            snapshot.set_counter(name, value);
        }
        snapshot.set_gauge("bridges_total", self.registry.count_total() as f64);
        snapshot.set_gauge("bridges_operational", self.registry.count_operational() as f64);
        snapshot.set_gauge("bridges_in_shutdown", self.registry.count_in_shutdown() as f64);
        snapshot
    }
}
