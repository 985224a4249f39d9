//! Connectivity transitions and push-then-pull reconciliation, against a mocked server

mod scenarii;

use std::sync::Arc;
use std::time::Duration;

use pet_reminders::mock_behaviour::MockBehaviour;
use pet_reminders::synchronizer::sync_progress::{feedback_channel, SyncEvent};
use pet_reminders::utils::same_contents_ignoring_ids;
use pet_reminders::{Connectivity, ReminderPatch, Status};

use scenarii::{assert_cache_mirrors_memory, draft};


#[tokio::test]
async fn test_reconnect_pushes_offline_changes() {
    let (synchronizer, remote, folder) = scenarii::offline_synchronizer("reconnect").await;

    let starters = synchronizer.list().await;
    let walk = synchronizer.add(&draft("Walk", "09:00")).await.unwrap();
    synchronizer.mark_done(starters[0].id()).await.unwrap();
    let local_before = synchronizer.list().await;

    remote.set_reachable(true);
    assert_eq!(synchronizer.set_connectivity(Connectivity::Online).await, Ok(true));
    assert!(synchronizer.is_online());

    // The server content has been replaced by the local one...
    let on_server = remote.reminders();
    assert!(same_contents_ignoring_ids(&on_server, &local_before));
    // ...and the local collection now uses the server ids
    let reminders = synchronizer.list().await;
    assert_eq!(reminders, on_server);
    assert!(reminders.iter().all(|r| r.id() != walk.id()));
    assert_eq!(reminders.iter().filter(|r| r.title() == "Walk").count(), 1);
    assert_eq!(reminders.iter().find(|r| r.title() == starters[0].title()).unwrap().status(), Status::Completed);
    assert_cache_mirrors_memory(&synchronizer, &folder).await;
}

#[tokio::test]
async fn test_only_transitions_trigger_reconciliation() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("transitions").await;
    remote.set_reachable(true);

    assert_eq!(synchronizer.set_connectivity(Connectivity::Online).await, Ok(true));
    let calls = remote.calls();
    assert_eq!(calls.list, 1 + 2);

    // Already online: nothing happens
    assert_eq!(synchronizer.set_connectivity(Connectivity::Online).await, Ok(false));
    assert_eq!(remote.calls(), calls);

    // Going offline is passive
    assert_eq!(synchronizer.set_connectivity(Connectivity::Offline).await, Ok(false));
    assert_eq!(remote.calls(), calls);
    synchronizer.update(synchronizer.list().await[0].id(), &ReminderPatch::new().title("Changed offline")).await.unwrap();
    assert_eq!(remote.calls(), calls);

    assert_eq!(synchronizer.set_connectivity(Connectivity::Online).await, Ok(true));
    assert!(remote.reminders().iter().any(|r| r.title() == "Changed offline"));
}

#[tokio::test]
async fn test_concurrent_reconnections_reconcile_once() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("concurrent-reconnect").await;
    remote.set_reachable(true);
    remote.set_latency(Some(Duration::from_millis(5)));

    let (first, second) = tokio::join!(
        synchronizer.set_connectivity(Connectivity::Online),
        synchronizer.set_connectivity(Connectivity::Online),
    );
    let reconciliations = [first.unwrap(), second.unwrap()].iter().filter(|ran| **ran).count();
    assert_eq!(reconciliations, 1);

    assert_eq!(remote.reminders().len(), synchronizer.list().await.len());
}

#[tokio::test]
async fn test_concurrent_reconciliations_do_not_duplicate() {
    let (synchronizer, remote, folder) = scenarii::offline_synchronizer("concurrent-reconcile").await;
    synchronizer.add(&draft("Walk", "09:00")).await.unwrap();
    let local_before = synchronizer.list().await;
    remote.set_reachable(true);

    let (first, second) = tokio::join!(synchronizer.reconcile(), synchronizer.reconcile());
    first.unwrap();
    second.unwrap();

    let on_server = remote.reminders();
    assert_eq!(on_server.len(), local_before.len());
    assert!(same_contents_ignoring_ids(&on_server, &local_before));
    assert_eq!(synchronizer.list().await, on_server);
    assert_cache_mirrors_memory(&synchronizer, &folder).await;
}

#[tokio::test]
async fn test_failed_reconciliation_keeps_local_data() {
    let (synchronizer, remote, folder) = scenarii::offline_synchronizer("failed-reconcile").await;
    synchronizer.add(&draft("Walk", "09:00")).await.unwrap();
    let local_before = synchronizer.list().await;

    // The server goes down in the middle of the upload
    remote.set_behaviour(MockBehaviour { create_behaviour: (2, 1), ..MockBehaviour::default() });
    let result = synchronizer.reconcile().await;
    assert!(result.unwrap_err().is_remote_unavailable());
    assert_eq!(synchronizer.is_online(), false);
    assert_eq!(synchronizer.list().await, local_before);
    assert_cache_mirrors_memory(&synchronizer, &folder).await;

    // Simply run it again
    remote.set_reachable(true);
    synchronizer.reconcile().await.unwrap();
    assert!(synchronizer.is_online());
    assert!(same_contents_ignoring_ids(&remote.reminders(), &local_before));
    assert_eq!(synchronizer.list().await, remote.reminders());
}

#[tokio::test]
async fn test_failed_reconnection_is_not_announced_as_online() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("failed-reconnect").await;
    synchronizer.add(&draft("Walk", "09:00")).await.unwrap();
    let mut connectivity = synchronizer.subscribe_connectivity();

    // The server answers, but refuses the upload
    remote.set_behaviour(MockBehaviour { create_behaviour: (0, 1), ..MockBehaviour::default() });
    let result = synchronizer.set_connectivity(Connectivity::Online).await;
    assert!(result.unwrap_err().is_remote_unavailable());
    assert_eq!(synchronizer.is_online(), false);
    assert_eq!(connectivity.has_changed().unwrap(), false);

    remote.set_reachable(true);
    assert_eq!(synchronizer.set_connectivity(Connectivity::Online).await, Ok(true));
    assert!(connectivity.has_changed().unwrap());
    assert_eq!(*connectivity.borrow_and_update(), Connectivity::Online);
}

#[tokio::test]
async fn test_reads_are_not_blocked_by_a_reconciliation() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("read-during-reconcile").await;
    let local_before = synchronizer.list().await;
    remote.set_reachable(true);
    remote.set_latency(Some(Duration::from_millis(100)));

    let synchronizer = Arc::new(synchronizer);
    let reconciler = Arc::clone(&synchronizer);
    let handle = tokio::spawn(async move { reconciler.reconcile().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let seen = tokio::time::timeout(Duration::from_millis(200), synchronizer.list()).await.unwrap();
    assert_eq!(seen, local_before);

    handle.await.unwrap().unwrap();
    assert_eq!(synchronizer.list().await, remote.reminders());
}

#[tokio::test]
async fn test_reconciliation_result_is_discarded_after_shutdown() {
    let (synchronizer, remote, folder) = scenarii::offline_synchronizer("reconcile-shutdown").await;
    let local_before = synchronizer.list().await;
    remote.set_reachable(true);
    remote.set_latency(Some(Duration::from_millis(50)));

    let synchronizer = Arc::new(synchronizer);
    let reconciler = Arc::clone(&synchronizer);
    let handle = tokio::spawn(async move { reconciler.reconcile().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    synchronizer.shutdown();

    handle.await.unwrap().unwrap();
    // The server has been synced, but the local collection keeps its previous ids
    assert!(same_contents_ignoring_ids(&remote.reminders(), &local_before));
    assert_eq!(synchronizer.list().await, local_before);
    assert_cache_mirrors_memory(&synchronizer, &folder).await;
}

#[tokio::test]
async fn test_reconcile_feedback() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("feedback").await;
    remote.set_reachable(true);

    let (sender, receiver) = feedback_channel();
    assert_eq!(*receiver.borrow(), SyncEvent::NotStarted);
    synchronizer.reconcile_with_feedback(sender).await.unwrap();
    assert_eq!(*receiver.borrow(), SyncEvent::Finished{ success: true });
}

#[tokio::test]
async fn test_probe() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("probe").await;
    let local_before = synchronizer.list().await;

    assert_eq!(synchronizer.probe().await, Connectivity::Offline);

    remote.set_reachable(true);
    assert_eq!(synchronizer.probe().await, Connectivity::Online);
    assert!(same_contents_ignoring_ids(&remote.reminders(), &local_before));

    remote.set_reachable(false);
    assert_eq!(synchronizer.probe().await, Connectivity::Offline);
}

#[tokio::test]
async fn test_probe_loop_reconnects() {
    let (synchronizer, remote, _folder) = scenarii::offline_synchronizer("probe-loop").await;
    let synchronizer = Arc::new(synchronizer.with_probe_interval(Duration::from_millis(10)));
    let mut connectivity = synchronizer.subscribe_connectivity();
    let handle = synchronizer.spawn_probe_loop();

    remote.set_reachable(true);
    tokio::time::timeout(Duration::from_secs(5), async {
        while *connectivity.borrow_and_update() != Connectivity::Online {
            connectivity.changed().await.unwrap();
        }
    }).await.unwrap();
    assert!(synchronizer.is_online());

    synchronizer.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}
