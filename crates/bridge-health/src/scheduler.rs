//! Per-bridge periodic health checks: one cooperative task per bridge,
//! running the interval/probe/second-chance-retry/classify procedure against
//! the wired [`MessageTransport`] and reporting outcomes back into the
//! registry.

use std::sync::Arc;
use std::time::Duration;

use bridge_common::{BridgeAddress, BridgeSelectionConfig};
use bridge_registry::{BridgeRegistry, HealthSchedulerHandle};
use bridge_transport::{ErrorCondition, MessageTransport, ProbeReply};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::error::HealthError;

struct ScheduledProbe {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Owns one background task per registered bridge, each independently
/// cancellable. Registered with a [`BridgeRegistry`] via
/// [`BridgeRegistry::set_health_scheduler`] so bridge add/remove drives task
/// lifecycle automatically.
pub struct HealthScheduler<T: MessageTransport + 'static> {
    config: Arc<BridgeSelectionConfig>,
    transport: Arc<T>,
    registry: Arc<BridgeRegistry>,
    tasks: DashMap<BridgeAddress, ScheduledProbe>,
}

impl<T: MessageTransport + 'static> HealthScheduler<T> {
    pub fn new(config: Arc<BridgeSelectionConfig>, transport: Arc<T>, registry: Arc<BridgeRegistry>) -> Arc<Self> {
        Arc::new(Self {
            config,
            transport,
            registry,
            tasks: DashMap::new(),
        })
    }

    pub fn scheduled_count(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels and aborts every running probe task, then clears the table.
    /// Intended for orderly process shutdown.
    pub fn shutdown(&self) {
        for entry in self.tasks.iter() {
            entry.value().cancel.cancel();
            entry.value().handle.abort();
        }
        self.tasks.clear();
    }
}

impl<T: MessageTransport + 'static> HealthSchedulerHandle for HealthScheduler<T> {
    #[instrument(level = "debug", skip(self, record), fields(address = %record.address()))]
    fn on_bridge_added(&self, record: Arc<bridge_registry::BridgeRecord>) {
        let address = record.address().clone();
        if self.tasks.contains_key(&address) {
            let error = HealthError::DuplicateSchedule(address.clone());
            warn!(%address, %error, "ignoring duplicate schedule request");
            return;
        }

        let cancel = CancelToken::new();
        let handle = tokio::spawn(probe_loop(
            address.clone(),
            cancel.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.transport),
            Arc::clone(&self.registry),
        ));
        self.tasks.insert(address, ScheduledProbe { cancel, handle });
    }

    #[instrument(level = "debug", skip(self), fields(%address))]
    fn on_bridge_removed(&self, address: &BridgeAddress) {
        if let Some((_, scheduled)) = self.tasks.remove(address) {
            scheduled.cancel.cancel();
            scheduled.handle.abort();
            debug!("health-check task cancelled");
        }
    }
}

/// Runs the interval/probe/retry/classify cycle for a single bridge address
/// until cancelled.
async fn probe_loop<T: MessageTransport + 'static>(
    address: BridgeAddress,
    cancel: CancelToken,
    config: Arc<BridgeSelectionConfig>,
    transport: Arc<T>,
    registry: Arc<BridgeRegistry>,
) {
    loop {
        if cancel.sleep_or_cancelled(config.health_checks_interval).await {
            return;
        }
        if registry.get(&address).is_none() {
            return;
        }
        if !transport.is_connected() {
            debug!(%address, "transport not connected, skipping health probe this cycle");
            continue;
        }

        let mut reply = match transport.send_health_probe(&address).await {
            Ok(reply) => reply,
            Err(source) => {
                let error = HealthError::Transport { address: address.clone(), source };
                warn!(%address, %error, "health probe send failed at the transport layer");
                continue;
            }
        };

        if matches!(reply, ProbeReply::Timeout) && config.health_checks_retry_delay > Duration::ZERO {
            if cancel.sleep_or_cancelled(config.health_checks_retry_delay).await {
                return;
            }
            reply = match transport.send_health_probe(&address).await {
                Ok(reply) => reply,
                Err(source) => {
                    let error = HealthError::Transport { address: address.clone(), source };
                    warn!(%address, %error, "second-chance health probe send failed at the transport layer");
                    continue;
                }
            };
        }

        // A remove-then-re-add of this address could have happened while the
        // reply above was in flight; `abort()` from `on_bridge_removed` only
        // takes effect at this task's next suspension point, so it cannot
        // have preempted the synchronous continuation after the `.await`
        // just above. Re-check before classifying against whatever is in the
        // registry right now rather than risking a stale classification
        // landing on a resurrected record for the same address.
        if cancel.is_cancelled() || registry.get(&address).is_none() {
            return;
        }

        match reply {
            ProbeReply::Success => {
                info!(%address, "health probe passed");
                registry.on_health_passed(&address);
            }
            ProbeReply::Timeout => {
                registry.on_health_timed_out(&address);
            }
            ProbeReply::Error(ErrorCondition::InternalServerError) | ProbeReply::Error(ErrorCondition::ServiceUnavailable) => {
                registry.on_health_failed(&address);
            }
            ProbeReply::Error(ErrorCondition::Other(condition)) => {
                let error = HealthError::UnexpectedCondition { address: address.clone(), condition };
                warn!(%address, %error, "leaving operational state unchanged");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_registry::BridgeEvent;
    use bridge_transport::MockTransport;
    use std::time::Duration as StdDuration;

    fn fast_config() -> Arc<BridgeSelectionConfig> {
        Arc::new(BridgeSelectionConfig {
            health_checks_interval: StdDuration::from_millis(5),
            health_checks_retry_delay: StdDuration::from_millis(5),
            ..BridgeSelectionConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn successful_probe_keeps_bridge_operational() {
        let config = fast_config();
        let registry = BridgeRegistry::new(Arc::clone(&config));
        let transport = Arc::new(MockTransport::new());
        let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
        registry.set_health_scheduler(scheduler.clone());

        let addr = BridgeAddress::new("jvb1");
        transport.always(addr.clone(), Ok(ProbeReply::Success));
        registry.add_or_update(addr.clone(), None);

        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert!(registry.get(&addr).unwrap().is_operational());
        assert!(transport.call_count(&addr) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_consecutive_timeouts_quarantine_without_removal_event() {
        let config = fast_config();
        let registry = BridgeRegistry::new(Arc::clone(&config));
        let transport = Arc::new(MockTransport::new());
        let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
        registry.set_health_scheduler(scheduler.clone());

        let addr = BridgeAddress::new("jvb1");
        transport.always(addr.clone(), Ok(ProbeReply::Timeout));
        let mut events = registry.subscribe();
        registry.add_or_update(addr.clone(), None);
        let _ = events.recv().await.unwrap(); // Added

        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert!(!registry.get(&addr).unwrap().is_operational());
        assert!(events.try_recv().is_err(), "a timeout must never emit a Removed event");
    }

    #[tokio::test(start_paused = true)]
    async fn bridge_side_error_quarantines_and_signals_drain() {
        let config = fast_config();
        let registry = BridgeRegistry::new(Arc::clone(&config));
        let transport = Arc::new(MockTransport::new());
        let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
        registry.set_health_scheduler(scheduler.clone());

        let addr = BridgeAddress::new("jvb1");
        transport.always(addr.clone(), Ok(ProbeReply::Error(ErrorCondition::ServiceUnavailable)));
        let mut events = registry.subscribe();
        registry.add_or_update(addr.clone(), None);
        let _ = events.recv().await.unwrap(); // Added

        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert!(registry.get(&addr).is_none(), "a bridge-side error must evict the record, not just flip its flag");
        let event = events.recv().await.unwrap();
        assert!(matches!(event, BridgeEvent::Removed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognised_error_condition_leaves_state_untouched() {
        let config = fast_config();
        let registry = BridgeRegistry::new(Arc::clone(&config));
        let transport = Arc::new(MockTransport::new());
        let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
        registry.set_health_scheduler(scheduler.clone());

        let addr = BridgeAddress::new("jvb1");
        transport.always(addr.clone(), Ok(ProbeReply::Error(ErrorCondition::Other("redirect".to_string()))));
        registry.add_or_update(addr.clone(), None);

        tokio::time::advance(StdDuration::from_millis(20)).await;
        tokio::task::yield_now().await;

        assert!(registry.get(&addr).unwrap().is_operational());
    }

    #[tokio::test(start_paused = true)]
    async fn removing_a_bridge_cancels_its_probe_task() {
        let config = fast_config();
        let registry = BridgeRegistry::new(Arc::clone(&config));
        let transport = Arc::new(MockTransport::new());
        let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
        registry.set_health_scheduler(scheduler.clone());

        let addr = BridgeAddress::new("jvb1");
        transport.always(addr.clone(), Ok(ProbeReply::Success));
        registry.add_or_update(addr.clone(), None);
        assert_eq!(scheduler.scheduled_count(), 1);

        registry.remove(&addr);
        tokio::task::yield_now().await;

        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[tokio::test]
    async fn re_adding_an_already_scheduled_bridge_does_not_spawn_a_second_task() {
        let config = fast_config();
        let registry = BridgeRegistry::new(Arc::clone(&config));
        let transport = Arc::new(MockTransport::new());
        let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
        registry.set_health_scheduler(scheduler.clone());

        let addr = BridgeAddress::new("jvb1");
        registry.add_or_update(addr.clone(), None);
        registry.add_or_update(addr.clone(), None); // refresh, not a re-add

        assert_eq!(scheduler.scheduled_count(), 1);
    }
}
