//! The concurrently-updated bridge registry.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_common::{BridgeAddress, BridgeSelectionConfig};
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::record::BridgeRecord;

/// Emitted when a bridge is added to or removed from the registry. For a
/// given address, `Added` is always seen before any `Removed`, and the pair
/// is balanced across churn.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    Added(Arc<BridgeRecord>),
    Removed(Arc<BridgeRecord>),
}

/// Callbacks the registry drives into the health-check scheduler on bridge
/// lifecycle transitions. Kept as a trait (rather than a direct dependency
/// on `bridge-health`) so the registry never needs to know the scheduler's
/// concrete type.
pub trait HealthSchedulerHandle: Send + Sync {
    fn on_bridge_added(&self, record: Arc<BridgeRecord>);
    fn on_bridge_removed(&self, address: &BridgeAddress);
}

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Thread-safe address -> record map, with add/remove event delivery and a
/// priority-ordered snapshot.
pub struct BridgeRegistry {
    config: Arc<BridgeSelectionConfig>,
    records: DashMap<BridgeAddress, Arc<BridgeRecord>>,
    /// Guards the create-vs-refresh decision and event-emission ordering so
    /// concurrent `add_or_update` calls for the same address collapse to a
    /// single record and a single `Added` event, even though reads against
    /// `records` above are lock-free.
    mutation_lock: SyncMutex<()>,
    events_tx: broadcast::Sender<BridgeEvent>,
    health_scheduler: SyncMutex<Option<Arc<dyn HealthSchedulerHandle>>>,
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRegistry")
            .field("count_total", &self.count_total())
            .finish()
    }
}

impl BridgeRegistry {
    pub fn new(config: Arc<BridgeSelectionConfig>) -> Arc<Self> {
        let (events_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            config,
            records: DashMap::new(),
            mutation_lock: SyncMutex::new(()),
            events_tx,
            health_scheduler: SyncMutex::new(None),
        })
    }

    /// Wires the health-check scheduler this registry notifies on bridge
    /// add/remove. Set once, typically right after construction.
    pub fn set_health_scheduler(&self, scheduler: Arc<dyn HealthSchedulerHandle>) {
        *self.health_scheduler.lock() = Some(scheduler);
    }

    /// Subscribe to bridge add/remove events. Delivery happens on the
    /// broadcast channel's own task-local ordering, which preserves a
    /// single-FIFO-worker ordering guarantee because every emission funnels
    /// through this one `broadcast::Sender`.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events_tx.subscribe()
    }

    /// Atomically refreshes an existing record or creates a new one. On
    /// create: emits `Added` and hands the address to the health scheduler.
    /// Concurrent calls for the same address collapse to a single record.
    #[instrument(level = "debug", skip(self, snapshot), fields(%address))]
    pub fn add_or_update(
        &self,
        address: BridgeAddress,
        snapshot: Option<&HashMap<String, String>>,
    ) -> Arc<BridgeRecord> {
        let _guard = self.mutation_lock.lock();

        if let Some(existing) = self.records.get(&address) {
            let record = Arc::clone(existing.value());
            drop(existing);
            if let Some(snapshot) = snapshot {
                record.set_stats(snapshot);
            }
            debug!("refreshed existing bridge record");
            return record;
        }

        let record = Arc::new(BridgeRecord::new(address.clone(), Arc::clone(&self.config)));
        if let Some(snapshot) = snapshot {
            record.set_stats(snapshot);
        }
        self.records.insert(address.clone(), Arc::clone(&record));
        info!("bridge added to registry");

        if let Some(scheduler) = self.health_scheduler.lock().clone() {
            scheduler.on_bridge_added(Arc::clone(&record));
        }
        let _ = self.events_tx.send(BridgeEvent::Added(Arc::clone(&record)));

        record
    }

    /// Removes a bridge; emits `Removed` if the record existed. Idempotent:
    /// a second call for an already-removed address is a no-op.
    #[instrument(level = "debug", skip(self), fields(%address))]
    pub fn remove(&self, address: &BridgeAddress) {
        match self.evict(address) {
            Some(_) => info!("bridge removed from registry"),
            None => debug!("remove on unknown bridge address, ignoring"),
        }
    }

    /// Evicts `address` from the map under the mutation lock, notifies the
    /// health scheduler, and emits `Removed` if a record existed. Shared by
    /// `remove()` and `on_health_failed()` so both paths keep the same
    /// `Added`/`Removed` balance and the same "never resurrected" guarantee
    /// for an address once `Removed` has been delivered.
    fn evict(&self, address: &BridgeAddress) -> Option<Arc<BridgeRecord>> {
        let _guard = self.mutation_lock.lock();

        let removed = self.records.remove(address).map(|(_, record)| record);
        if let Some(record) = &removed {
            if let Some(scheduler) = self.health_scheduler.lock().clone() {
                scheduler.on_bridge_removed(address);
            }
            let _ = self.events_tx.send(BridgeEvent::Removed(Arc::clone(record)));
        }
        removed
    }

    pub fn get(&self, address: &BridgeAddress) -> Option<Arc<BridgeRecord>> {
        self.records.get(address).map(|entry| Arc::clone(entry.value()))
    }

    /// Stable, sorted copy of the registry, ordered by the tiered bridge
    /// comparator.
    pub fn snapshot_sorted(&self) -> Vec<Arc<BridgeRecord>> {
        let mut records: Vec<Arc<BridgeRecord>> =
            self.records.iter().map(|entry| Arc::clone(entry.value())).collect();
        records.sort_by(|a, b| a.compare_to(b));
        records
    }

    pub fn count_total(&self) -> usize {
        self.records.len()
    }

    pub fn count_operational(&self) -> usize {
        self.records.iter().filter(|entry| entry.value().is_operational()).count()
    }

    pub fn count_in_shutdown(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().is_in_graceful_shutdown())
            .count()
    }

    /// Health scheduler callback: the probe passed. The failure-reset
    /// lockout may still mask this from `is_operational()` callers for a
    /// while.
    pub fn on_health_passed(&self, address: &BridgeAddress) {
        if let Some(record) = self.get(address) {
            record.set_is_operational(true);
        }
    }

    /// Health scheduler callback: the probe failed with a bridge-side error.
    /// Evicts the bridge from the registry — the same `Removed` event that
    /// signals upstream conferences to drain off it also means the address
    /// is gone from `records`, so a later `on_health_passed` for the same
    /// address (a probe already in flight when this ran) cannot resurrect it,
    /// and a subsequent real `remove()` call becomes a no-op rather than a
    /// second `Removed` for the same `Added`.
    pub fn on_health_failed(&self, address: &BridgeAddress) {
        if let Some(record) = self.get(address) {
            record.set_is_operational(false);
        }
        if self.evict(address).is_some() {
            warn!(%address, "health check failed, evicting and signalling conference drain");
        }
    }

    /// Health scheduler callback: the probe timed out. Sets non-operational
    /// but does NOT trigger a conference drain: transient network faults
    /// should not cause a relocation stampede.
    pub fn on_health_timed_out(&self, address: &BridgeAddress) {
        if let Some(record) = self.get(address) {
            record.set_is_operational(false);
            warn!(%address, "health check timed out, quarantining without drain");
        }
    }
}
