//! Per-bridge state: the attributes, derived stress computation, and
//! operational-state invariants.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_common::stats::{keys, parse_bool, parse_f64, parse_u64};
use bridge_common::{BridgeAddress, BridgeSelectionConfig};
use parking_lot::Mutex;

use crate::rate_tracker::NewEndpointsRateTracker;

/// The mutable, rarely-changing string-ish fields, grouped behind one lock
/// since they're always updated together from a single incoming snapshot.
#[derive(Debug, Default, Clone)]
struct StringFields {
    region: Option<String>,
    relay_id: Option<String>,
    version: Option<String>,
    octo_version: Option<String>,
}

/// A plain, unshared snapshot of a [`BridgeRecord`] for logging or display
/// without holding any of its internal locks open.
#[derive(Debug, Clone)]
pub struct BridgeRecordSnapshot {
    pub address: BridgeAddress,
    pub region: Option<String>,
    pub relay_id: Option<String>,
    pub version: Option<String>,
    pub stress: f64,
    pub is_overloaded: bool,
    pub is_operational: bool,
    pub is_in_graceful_shutdown: bool,
}

/// Per-bridge state: address, region, version, last stats snapshot, derived
/// stress score, operational flag, failure timestamp, and the
/// unreported-endpoint rate tracker.
///
/// All operations here are infallible field transformations: nothing here
/// returns a `Result`.
#[derive(Debug)]
pub struct BridgeRecord {
    address: BridgeAddress,
    config: Arc<BridgeSelectionConfig>,

    string_fields: Mutex<StringFields>,
    last_stats: dashmap::DashMap<String, String>,

    last_reported_stress: Mutex<Option<f64>>,
    use_packet_rate_for_stress: AtomicBool,
    last_reported_packet_rate_pps: AtomicU64,
    average_participant_stress_override: Mutex<Option<f64>>,

    new_endpoints_rate: NewEndpointsRateTracker,

    is_operational: AtomicBool,
    shutdown_in_progress: AtomicBool,
    failure_timestamp: Mutex<Option<Instant>>,
}

impl BridgeRecord {
    pub fn new(address: BridgeAddress, config: Arc<BridgeSelectionConfig>) -> Self {
        let rampup = config.participant_rampup_interval;
        Self {
            address,
            config,
            string_fields: Mutex::new(StringFields::default()),
            last_stats: dashmap::DashMap::new(),
            last_reported_stress: Mutex::new(None),
            use_packet_rate_for_stress: AtomicBool::new(true),
            last_reported_packet_rate_pps: AtomicU64::new(0),
            average_participant_stress_override: Mutex::new(None),
            new_endpoints_rate: NewEndpointsRateTracker::new(rampup),
            is_operational: AtomicBool::new(true),
            shutdown_in_progress: AtomicBool::new(false),
            failure_timestamp: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &BridgeAddress {
        &self.address
    }

    pub fn region(&self) -> Option<String> {
        self.string_fields.lock().region.clone()
    }

    pub fn relay_id(&self) -> Option<String> {
        self.string_fields.lock().relay_id.clone()
    }

    pub fn version(&self) -> Option<String> {
        self.string_fields.lock().version.clone()
    }

    /// Absence forbids multi-bridge placement.
    pub fn has_relay(&self) -> bool {
        self.relay_id().is_some()
    }

    /// Merges a new status snapshot. Missing stats do not clear previously
    /// recorded fields; a numeric-parse failure on any single field is
    /// ignored rather than aborting the whole update.
    #[tracing::instrument(level = "debug", skip(self, snapshot), fields(address = %self.address))]
    pub fn set_stats(&self, snapshot: &HashMap<String, String>) {
        for (key, value) in snapshot {
            self.last_stats.insert(key.clone(), value.clone());
        }

        {
            let mut fields = self.string_fields.lock();
            if let Some(region) = snapshot.get(keys::REGION) {
                fields.region = Some(region.clone());
            }
            if let Some(relay_id) = snapshot.get(keys::RELAY_ID) {
                fields.relay_id = Some(relay_id.clone());
            }
            if let Some(version) = snapshot.get(keys::VERSION) {
                fields.version = Some(version.clone());
            }
            if let Some(octo_version) = snapshot.get(keys::OCTO_VERSION) {
                fields.octo_version = Some(octo_version.clone());
            }
        }

        if let Some(raw) = snapshot.get(keys::STRESS_LEVEL) {
            if let Some(value) = parse_f64(keys::STRESS_LEVEL, raw) {
                *self.last_reported_stress.lock() = Some(value);
                // Permanent, one-way latch: once a bridge reports its own
                // stress level, we never fall back to the packet-rate
                // estimate again for this record.
                self.use_packet_rate_for_stress.store(false, AtomicOrdering::Relaxed);
            }
        }

        if let Some(raw) = snapshot.get(keys::AVERAGE_PARTICIPANT_STRESS) {
            if let Some(value) = parse_f64(keys::AVERAGE_PARTICIPANT_STRESS, raw) {
                *self.average_participant_stress_override.lock() = Some(value);
            }
        }

        let download = snapshot
            .get(keys::PACKET_RATE_DOWNLOAD)
            .and_then(|raw| parse_u64(keys::PACKET_RATE_DOWNLOAD, raw));
        let upload = snapshot
            .get(keys::PACKET_RATE_UPLOAD)
            .and_then(|raw| parse_u64(keys::PACKET_RATE_UPLOAD, raw));
        if download.is_some() || upload.is_some() {
            let total = download.unwrap_or(0) + upload.unwrap_or(0);
            self.last_reported_packet_rate_pps.store(total, AtomicOrdering::Relaxed);
        }

        if let Some(raw) = snapshot.get(keys::SHUTDOWN_IN_PROGRESS) {
            if let Some(value) = parse_bool(keys::SHUTDOWN_IN_PROGRESS, raw) {
                // A later "false" rescinds a previously announced graceful
                // shutdown.
                self.shutdown_in_progress.store(value, AtomicOrdering::Relaxed);
            }
        }
    }

    /// Writes the operational flag; if transitioning to false, records
    /// `failure_timestamp = now`.
    pub fn set_is_operational(&self, flag: bool) {
        let was_operational = self.is_operational.swap(flag, AtomicOrdering::SeqCst);
        if was_operational && !flag {
            *self.failure_timestamp.lock() = Some(Instant::now());
        }
    }

    /// Increments the unreported-load rate tracker by one, right now.
    pub fn endpoint_added(&self) {
        self.new_endpoints_rate.record();
    }

    fn recent_endpoint_count(&self) -> u32 {
        self.new_endpoints_rate.recent_count()
    }

    fn average_participant_stress(&self) -> f64 {
        self.average_participant_stress_override
            .lock()
            .unwrap_or(self.config.average_participant_stress)
    }

    /// Pure computation over current fields; monotonic in the recent
    /// endpoint count.
    pub fn get_stress(&self) -> f64 {
        let recent = self.recent_endpoint_count() as f64;
        if self.use_packet_rate_for_stress.load(AtomicOrdering::Relaxed) {
            let pps = self.last_reported_packet_rate_pps.load(AtomicOrdering::Relaxed) as f64;
            let estimated = pps + recent * self.config.average_participant_packet_rate_pps as f64;
            estimated / self.config.max_bridge_packet_rate_pps as f64
        } else {
            let reported = self.last_reported_stress.lock().unwrap_or(0.0);
            reported + recent * self.average_participant_stress()
        }
    }

    pub fn is_overloaded(&self) -> bool {
        self.get_stress() >= self.config.stress_threshold
    }

    /// Combines the raw flag with the failure-reset lockout: returns false
    /// while `now - failure_timestamp < failure_reset_threshold`, regardless
    /// of the stored flag.
    pub fn is_operational(&self) -> bool {
        if !self.is_operational.load(AtomicOrdering::SeqCst) {
            return false;
        }
        match *self.failure_timestamp.lock() {
            Some(failed_at) => {
                Instant::now().saturating_duration_since(failed_at) >= self.config.failure_reset_threshold
            }
            None => true,
        }
    }

    pub fn is_in_graceful_shutdown(&self) -> bool {
        self.shutdown_in_progress.load(AtomicOrdering::Relaxed)
    }

    /// Priority tier used by [`Self::compare_to`]: lower sorts first.
    fn priority_tier(&self) -> u8 {
        if !self.is_operational() {
            3
        } else if self.is_in_graceful_shutdown() {
            2
        } else {
            1
        }
    }

    /// Tiered comparator: operational-and-not-shutdown <
    /// operational-and-shutdown < non-operational, then ascending stress,
    /// then a deterministic address-string tie-break.
    pub fn compare_to(&self, other: &BridgeRecord) -> Ordering {
        self.priority_tier()
            .cmp(&other.priority_tier())
            .then_with(|| {
                self.get_stress()
                    .partial_cmp(&other.get_stress())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.address.as_str().cmp(other.address.as_str()))
    }

    pub fn snapshot(&self) -> BridgeRecordSnapshot {
        BridgeRecordSnapshot {
            address: self.address.clone(),
            region: self.region(),
            relay_id: self.relay_id(),
            version: self.version(),
            stress: self.get_stress(),
            is_overloaded: self.is_overloaded(),
            is_operational: self.is_operational(),
            is_in_graceful_shutdown: self.is_in_graceful_shutdown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Arc<BridgeSelectionConfig> {
        Arc::new(BridgeSelectionConfig::default())
    }

    fn stats(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_stats_do_not_clear_previous_fields() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        record.set_stats(&stats(&[("region", "us-east"), ("version", "1.0")]));
        record.set_stats(&stats(&[])); // empty update
        assert_eq!(record.region(), Some("us-east".to_string()));
        assert_eq!(record.version(), Some("1.0".to_string()));
    }

    #[test]
    fn malformed_single_field_is_ignored_not_fatal() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        record.set_stats(&stats(&[
            ("stress_level", "not-a-number"),
            ("region", "us-east"),
        ]));
        assert_eq!(record.region(), Some("us-east".to_string()));
    }

    #[test]
    fn stress_level_latches_packet_rate_mode_off_permanently() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        record.set_stats(&stats(&[("stress_level", "0.5")]));
        assert!((record.get_stress() - 0.5).abs() < f64::EPSILON);

        // A later snapshot without stress_level must not flip back to the
        // packet-rate estimate.
        record.set_stats(&stats(&[("packet_rate_upload", "100000")]));
        assert!((record.get_stress() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn stress_is_monotonic_in_recent_endpoint_count() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        record.set_stats(&stats(&[("stress_level", "0.1")]));
        let before = record.get_stress();
        record.endpoint_added();
        let after = record.get_stress();
        assert!(after > before);
    }

    #[test]
    fn overloaded_boundary_is_inclusive() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        record.set_stats(&stats(&[("stress_level", "0.8")]));
        assert!(record.is_overloaded());
    }

    #[test]
    fn failure_reset_threshold_masks_recovery() {
        let mut cfg = BridgeSelectionConfig::default();
        cfg.failure_reset_threshold = Duration::from_secs(60);
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), Arc::new(cfg));

        record.set_is_operational(false);
        assert!(!record.is_operational());
        record.set_is_operational(true);
        // Still inside the lockout window.
        assert!(!record.is_operational());
    }

    #[test]
    fn zero_failure_reset_threshold_disables_lockout() {
        let mut cfg = BridgeSelectionConfig::default();
        cfg.failure_reset_threshold = Duration::from_secs(0);
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), Arc::new(cfg));

        record.set_is_operational(false);
        record.set_is_operational(true);
        assert!(record.is_operational());
    }

    #[test]
    fn shutdown_bridge_stays_operational_but_ranks_after_healthy() {
        let a = BridgeRecord::new(BridgeAddress::new("a"), config());
        let b = BridgeRecord::new(BridgeAddress::new("b"), config());
        b.set_stats(&stats(&[("shutdown_in_progress", "true")]));

        assert!(b.is_operational());
        assert!(b.is_in_graceful_shutdown());
        assert_eq!(a.compare_to(&b), Ordering::Less);
    }

    #[test]
    fn shutdown_flag_can_be_rescinded_by_a_later_snapshot() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        record.set_stats(&stats(&[("shutdown_in_progress", "true")]));
        assert!(record.is_in_graceful_shutdown());
        record.set_stats(&stats(&[("shutdown_in_progress", "false")]));
        assert!(!record.is_in_graceful_shutdown());
    }

    #[test]
    fn tie_break_falls_back_to_address_string() {
        let a = BridgeRecord::new(BridgeAddress::new("a"), config());
        let b = BridgeRecord::new(BridgeAddress::new("b"), config());
        assert_eq!(a.compare_to(&b), Ordering::Less);
        assert_eq!(b.compare_to(&a), Ordering::Greater);
    }

    #[test]
    fn no_relay_id_means_single_bridge_only() {
        let record = BridgeRecord::new(BridgeAddress::new("jvb1"), config());
        assert!(!record.has_relay());
        record.set_stats(&stats(&[("relay_id", "octo-1")]));
        assert!(record.has_relay());
    }
}
