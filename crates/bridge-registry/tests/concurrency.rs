//! Concurrency invariants: at most one record per address even under a
//! thundering herd of concurrent `add_or_update` calls, and a balanced
//! add/remove event sequence.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_common::{BridgeAddress, BridgeSelectionConfig};
use bridge_registry::{BridgeEvent, BridgeRegistry};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_add_or_update_for_same_address_collapses_to_one_record() {
    let registry = BridgeRegistry::new(Arc::new(BridgeSelectionConfig::default()));
    let addr = BridgeAddress::new("jvb1");

    let mut handles = Vec::new();
    for i in 0..32 {
        let registry = Arc::clone(&registry);
        let addr = addr.clone();
        handles.push(tokio::spawn(async move {
            let mut snapshot = HashMap::new();
            snapshot.insert("region".to_string(), format!("region-{i}"));
            registry.add_or_update(addr, Some(&snapshot));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.count_total(), 1);
}

#[tokio::test]
async fn address_present_continuously_between_added_and_removed() {
    let registry = BridgeRegistry::new(Arc::new(BridgeSelectionConfig::default()));
    let mut events = registry.subscribe();
    let addr = BridgeAddress::new("jvb1");

    registry.add_or_update(addr.clone(), None);
    assert!(registry.get(&addr).is_some());

    let added = events.recv().await.unwrap();
    assert!(matches!(added, BridgeEvent::Added(_)));
    // The address must still be resolvable after Added was observed and
    // before Removed is emitted.
    assert!(registry.get(&addr).is_some());

    registry.remove(&addr);
    let removed = events.recv().await.unwrap();
    assert!(matches!(removed, BridgeEvent::Removed(_)));
    assert!(registry.get(&addr).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn churn_across_many_addresses_keeps_registry_consistent() {
    let registry = BridgeRegistry::new(Arc::new(BridgeSelectionConfig::default()));

    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let addr = BridgeAddress::new(format!("jvb{i}"));
            registry.add_or_update(addr.clone(), None);
            if i % 2 == 0 {
                registry.remove(&addr);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.count_total(), 8);
}
