//! End-to-end health-scheduler behaviour against a real `BridgeRegistry`,
//! driven entirely through the scripted transport — no sockets, no real time.

use std::sync::Arc;
use std::time::Duration;

use bridge_common::{BridgeAddress, BridgeSelectionConfig};
use bridge_health::HealthScheduler;
use bridge_registry::BridgeRegistry;
use bridge_transport::{ErrorCondition, MockTransport, ProbeReply};

fn fast_config() -> Arc<BridgeSelectionConfig> {
    Arc::new(BridgeSelectionConfig {
        health_checks_interval: Duration::from_millis(5),
        health_checks_retry_delay: Duration::from_millis(5),
        ..BridgeSelectionConfig::default()
    })
}

#[tokio::test(start_paused = true)]
async fn independent_bridges_are_probed_on_independent_schedules() {
    let config = fast_config();
    let registry = BridgeRegistry::new(Arc::clone(&config));
    let transport = Arc::new(MockTransport::new());
    let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
    registry.set_health_scheduler(scheduler.clone());

    let healthy = BridgeAddress::new("jvb-healthy");
    let failing = BridgeAddress::new("jvb-failing");
    transport.always(healthy.clone(), Ok(ProbeReply::Success));
    transport.always(failing.clone(), Ok(ProbeReply::Error(ErrorCondition::InternalServerError)));

    registry.add_or_update(healthy.clone(), None);
    registry.add_or_update(failing.clone(), None);

    tokio::time::advance(Duration::from_millis(20)).await;
    tokio::task::yield_now().await;

    assert!(registry.get(&healthy).unwrap().is_operational());
    assert!(registry.get(&failing).is_none(), "a bridge-side error must evict the record, not just flip its flag");
}

#[tokio::test(start_paused = true)]
async fn a_bridge_that_goes_disconnected_is_skipped_not_failed() {
    let config = fast_config();
    let registry = BridgeRegistry::new(Arc::clone(&config));
    let transport = Arc::new(MockTransport::new());
    transport.set_connected(false);
    let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
    registry.set_health_scheduler(scheduler.clone());

    let addr = BridgeAddress::new("jvb1");
    registry.add_or_update(addr.clone(), None);

    tokio::time::advance(Duration::from_millis(20)).await;
    tokio::task::yield_now().await;

    assert!(registry.get(&addr).unwrap().is_operational());
    assert_eq!(transport.call_count(&addr), 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_then_recovery_on_the_second_chance_attempt_stays_operational() {
    let config = fast_config();
    let registry = BridgeRegistry::new(Arc::clone(&config));
    let transport = Arc::new(MockTransport::new());
    let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
    registry.set_health_scheduler(scheduler.clone());

    let addr = BridgeAddress::new("jvb1");
    transport.script(
        addr.clone(),
        vec![Ok(ProbeReply::Timeout), Ok(ProbeReply::Success)],
        Ok(ProbeReply::Success),
    );
    registry.add_or_update(addr.clone(), None);

    tokio::time::advance(Duration::from_millis(15)).await;
    tokio::task::yield_now().await;

    assert!(registry.get(&addr).unwrap().is_operational());
    assert_eq!(transport.call_count(&addr), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_every_scheduled_probe() {
    let config = fast_config();
    let registry = BridgeRegistry::new(Arc::clone(&config));
    let transport = Arc::new(MockTransport::new());
    let scheduler = HealthScheduler::new(Arc::clone(&config), Arc::clone(&transport), Arc::clone(&registry));
    registry.set_health_scheduler(scheduler.clone());

    registry.add_or_update(BridgeAddress::new("jvb1"), None);
    registry.add_or_update(BridgeAddress::new("jvb2"), None);
    assert_eq!(scheduler.scheduled_count(), 2);

    scheduler.shutdown();
    assert_eq!(scheduler.scheduled_count(), 0);
}
