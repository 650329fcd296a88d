use std::sync::Arc;

use bytes::Bytes;
use service_watch::CoordinationWriter;
use service_watch::InstanceCollection;
use service_watch::Listener;
use service_watch::ServiceDirectory;
use service_watch::ServiceInstance;
use service_watch::WatchConfig;
use service_watch::WatchDriver;
use service_watch::WatcherState;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::common::assert_no_delivery;
use crate::common::next_delivery;
use crate::common::setup;
use crate::common::ChannelListener;
use crate::common::WAIT;

#[tokio::test]
async fn test_registrations_reach_listeners_through_driver() {
    let cluster = setup(&["billing", "search"]);
    let (billing_listener, mut billing_rx) = ChannelListener::new();
    let (search_listener, mut search_rx) = ChannelListener::new();
    cluster
        .registry
        .find_by_name("billing")
        .unwrap()
        .add_listener(billing_listener);
    cluster
        .registry
        .find_by_name("search")
        .unwrap()
        .add_listener(search_listener);

    cluster.registry.initialize_all(cluster.store.clone()).await.unwrap();

    // Initial state is delivered before initialize_all returns.
    assert_eq!(billing_rx.try_recv().unwrap(), ("billing".to_string(), vec![]));
    assert_eq!(search_rx.try_recv().unwrap(), ("search".to_string(), vec![]));
    assert!(cluster.store.has_child_watch("/services/billing"));
    assert!(cluster.store.has_child_watch("/services/search"));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let driver = WatchDriver::spawn(
        cluster.registry.clone(),
        cluster.events,
        &WatchConfig::default(),
        shutdown_rx,
    );

    let first = cluster
        .directory
        .new_instance(&ServiceInstance::new("billing", "10.0.0.1", 8080));
    cluster.directory.register(&first).await.unwrap();
    assert_eq!(
        next_delivery(&mut billing_rx).await,
        ("billing".to_string(), vec![first.id.clone()])
    );

    let second = cluster
        .directory
        .new_instance(&ServiceInstance::new("billing", "10.0.0.2", 8080));
    cluster.directory.register(&second).await.unwrap();
    let (_, mut ids) = next_delivery(&mut billing_rx).await;
    ids.sort();
    let mut expected = vec![first.id.clone(), second.id.clone()];
    expected.sort();
    assert_eq!(ids, expected);

    cluster.directory.unregister(&first).await.unwrap();
    assert_eq!(
        next_delivery(&mut billing_rx).await,
        ("billing".to_string(), vec![second.id.clone()])
    );

    // The other service never heard about billing changes.
    assert_no_delivery(&mut search_rx).await;
    assert!(cluster.store.has_child_watch("/services/billing"));

    shutdown_tx.send(()).unwrap();
    timeout(WAIT, driver.join())
        .await
        .expect("driver should stop")
        .unwrap();
}

#[tokio::test]
async fn test_foreign_payload_is_skipped_in_delivery() {
    let cluster = setup(&["billing"]);
    let (listener, mut rx) = ChannelListener::new();
    let watcher = cluster.registry.find_by_name("billing").unwrap().clone();
    watcher.add_listener(listener);
    cluster.registry.initialize_all(cluster.store.clone()).await.unwrap();
    next_delivery(&mut rx).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let driver = WatchDriver::spawn(
        cluster.registry.clone(),
        cluster.events,
        &WatchConfig::default(),
        shutdown_rx,
    );

    cluster
        .store
        .create_node("/services/billing/legacy", Bytes::from_static(b"\x00\x01binary"))
        .await
        .unwrap();
    assert_eq!(next_delivery(&mut rx).await, ("billing".to_string(), vec![]));

    let instance = cluster
        .directory
        .new_instance(&ServiceInstance::new("billing", "10.0.0.1", 8080));
    cluster.directory.register(&instance).await.unwrap();
    assert_eq!(
        next_delivery(&mut rx).await,
        ("billing".to_string(), vec![instance.id.clone()])
    );

    shutdown_tx.send(()).unwrap();
    timeout(WAIT, driver.join())
        .await
        .expect("driver should stop")
        .unwrap();
}

#[tokio::test]
async fn test_listener_added_after_initialize_hears_next_change_only() {
    let cluster = setup(&["billing"]);
    let existing = cluster
        .directory
        .new_instance(&ServiceInstance::new("billing", "10.0.0.1", 8080));
    cluster.directory.register(&existing).await.unwrap();

    cluster.registry.initialize_all(cluster.store.clone()).await.unwrap();
    let watcher = cluster.registry.find_by_name("billing").unwrap().clone();
    assert_eq!(watcher.state(), WatcherState::Watching);

    let (listener, mut rx) = ChannelListener::new();
    watcher.add_listener(listener);
    assert_no_delivery(&mut rx).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let driver = WatchDriver::spawn(
        cluster.registry.clone(),
        cluster.events,
        &WatchConfig::default(),
        shutdown_rx,
    );

    let added = cluster
        .directory
        .new_instance(&ServiceInstance::new("billing", "10.0.0.2", 8080));
    cluster.directory.register(&added).await.unwrap();

    let (_, ids) = next_delivery(&mut rx).await;
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&existing.id));
    assert!(ids.contains(&added.id));

    shutdown_tx.send(()).unwrap();
    timeout(WAIT, driver.join())
        .await
        .expect("driver should stop")
        .unwrap();
}

#[tokio::test]
async fn test_removed_listener_stops_receiving() {
    let cluster = setup(&["billing"]);
    let (kept, mut kept_rx) = ChannelListener::new();
    let (removed, mut removed_rx) = ChannelListener::new();
    let removed: Arc<dyn Listener> = removed;
    let watcher = cluster.registry.find_by_name("billing").unwrap().clone();
    watcher.add_listener(kept);
    watcher.add_listener(removed.clone());
    cluster.registry.initialize_all(cluster.store.clone()).await.unwrap();
    next_delivery(&mut kept_rx).await;
    next_delivery(&mut removed_rx).await;

    assert!(watcher.remove_listener(&removed));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let driver = WatchDriver::spawn(
        cluster.registry.clone(),
        cluster.events,
        &WatchConfig::default(),
        shutdown_rx,
    );
    let instance = cluster
        .directory
        .new_instance(&ServiceInstance::new("billing", "10.0.0.1", 8080));
    cluster.directory.register(&instance).await.unwrap();

    next_delivery(&mut kept_rx).await;
    assert_no_delivery(&mut removed_rx).await;

    shutdown_tx.send(()).unwrap();
    timeout(WAIT, driver.join())
        .await
        .expect("driver should stop")
        .unwrap();
}

#[tokio::test]
async fn test_register_all_is_observed_by_watcher() {
    let cluster = setup(&["billing"]);
    let (listener, mut rx) = ChannelListener::new();
    cluster
        .registry
        .find_by_name("billing")
        .unwrap()
        .add_listener(listener);
    cluster.registry.initialize_all(cluster.store.clone()).await.unwrap();
    next_delivery(&mut rx).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let driver = WatchDriver::spawn(
        cluster.registry.clone(),
        cluster.events,
        &WatchConfig::default(),
        shutdown_rx,
    );

    let instances: InstanceCollection = (0..3)
        .map(|i| ServiceInstance::new("billing", format!("10.0.0.{i}"), 8080))
        .collect();
    instances.register_all(&cluster.directory).await.unwrap();

    // Registrations may coalesce into fewer deliveries; the last one sees all.
    let mut seen = 0;
    while seen < 3 {
        let (_, ids) = next_delivery(&mut rx).await;
        seen = ids.len();
    }
    assert_eq!(seen, 3);

    shutdown_tx.send(()).unwrap();
    timeout(WAIT, driver.join())
        .await
        .expect("driver should stop")
        .unwrap();
}
