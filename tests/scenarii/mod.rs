//! Shared fixtures for the synchronization tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use pet_reminders::cache::Cache;
use pet_reminders::mock_remote::MemoryRemote;
use pet_reminders::reminder::{Category, Frequency, Pet};
use pet_reminders::traits::LocalStore;
use pet_reminders::{Reminder, ReminderDraft, ReminderId, Synchronizer};

pub type TestSynchronizer = Synchronizer<Cache, MemoryRemote>;

/// An empty folder, unique to this test
pub fn test_folder(name: &str) -> PathBuf {
    let folder = std::env::temp_dir().join(format!("pet-reminders-test-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&folder);
    folder
}

pub fn draft(title: &str, time: &str) -> ReminderDraft {
    ReminderDraft::new(title, time, "2024-06-01")
}

/// What the server contains before each test
pub fn server_reminders() -> Vec<Reminder> {
    vec![
        Reminder::new(ReminderId::new(1), draft("Morning Walk", "07:00").with_notes("30 minutes").validate().unwrap()),
        Reminder::new(ReminderId::new(2), draft("Afternoon Play", "14:00").with_pet(Pet::Kitty).validate().unwrap()),
        Reminder::new(ReminderId::new(3), draft("Vet Visit", "16:00")
            .with_category(Category::Health)
            .with_frequency(Frequency::Weekly)
            .with_end_date("2024-06-08")
            .validate().unwrap()),
    ]
}

/// A synchronizer that started while the server was reachable
pub async fn online_synchronizer(name: &str) -> (TestSynchronizer, MemoryRemote, PathBuf) {
    let _ = env_logger::builder().is_test(true).try_init();

    let folder = test_folder(name);
    let remote = MemoryRemote::with_reminders(server_reminders());
    let synchronizer = Synchronizer::new(remote.clone(), Cache::new(&folder));
    synchronizer.start().await;
    assert!(synchronizer.is_online());

    (synchronizer, remote, folder)
}

/// A synchronizer that started while the server was unreachable (the server stays unreachable)
pub async fn offline_synchronizer(name: &str) -> (TestSynchronizer, MemoryRemote, PathBuf) {
    let _ = env_logger::builder().is_test(true).try_init();

    let folder = test_folder(name);
    let remote = MemoryRemote::with_reminders(server_reminders());
    remote.set_reachable(false);
    let synchronizer = Synchronizer::new(remote.clone(), Cache::new(&folder));
    synchronizer.start().await;
    assert_eq!(synchronizer.is_online(), false);

    (synchronizer, remote, folder)
}

/// Read back the snapshot of the local cache
pub fn reload(folder: &Path) -> Vec<Reminder> {
    Cache::new(folder).load().unwrap()
}

/// Check the local cache mirrors the in-memory collection
pub async fn assert_cache_mirrors_memory(synchronizer: &TestSynchronizer, folder: &Path) {
    assert_eq!(reload(folder), synchronizer.list().await);
}
