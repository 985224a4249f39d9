//! This modules holds the canonical collection of reminders, and keeps it in sync with a local cache and a remote source
//!
//! Every mutation is applied optimistically: first to memory and to the local cache, then (when online) to the remote
//! source. The remote reply then canonicalizes the local copy, or the local change is reverted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::cache::Cache;
use crate::client::Client;
use crate::config::{AddFailurePolicy, Settings, DEFAULT_PROBE_INTERVAL};
use crate::connectivity::{Connectivity, ConnectivityMonitor, ConnectivityReceiver};
use crate::error::ReminderError;
use crate::reminder::{Reminder, ReminderDraft, ReminderId, ReminderPatch};
use crate::traits::{LocalStore, RemoteSource};

pub mod sync_progress;
use sync_progress::{FeedbackSender, SyncEvent, SyncProgress, SyncStep};

/// A [`Synchronizer`] between a server and a local file cache
pub type ReminderSynchronizer = Synchronizer<Cache, Client>;

/// See [`Synchronizer::subscribe`]
pub type RemindersReceiver = watch::Receiver<Vec<Reminder>>;


/// Everything that must only be touched by one writer at a time
struct State<L> {
    reminders: Vec<Reminder>,
    local: L,
    last_provisional_id: i64,
}

impl<L: LocalStore> State<L> {
    fn position(&self, id: ReminderId) -> Option<usize> {
        self.reminders.iter().position(|r| r.id() == id)
    }

    /// A clock-based id, strictly increasing and not used by any other reminder
    fn next_provisional_id(&mut self) -> ReminderId {
        let mut candidate = Utc::now().timestamp_millis().max(self.last_provisional_id + 1);
        while self.reminders.iter().any(|r| r.id().value() == candidate) {
            candidate += 1;
        }
        self.last_provisional_id = candidate;
        ReminderId::new(candidate)
    }
}


/// Owns the reminders, and orchestrates reads and writes between a local store and a remote source.
///
/// Usually, you will only need a [`ReminderSynchronizer`], i.e. a `Synchronizer<Cache, Client>`. \
/// However, the remote can be mocked (e.g. by a [`MemoryRemote`](crate::mock_remote::MemoryRemote)) for tests.
///
/// Every operation takes `&self`, so that a synchronizer can be shared (e.g. in an `Arc`) with a presentation layer.
/// Mutations are serialized: each one holds the state for its whole mutate, persist, remote call, canonicalize sequence.
/// Reads never wait for them, and always see the latest optimistic state.
pub struct Synchronizer<L, R>
where
    L: LocalStore,
    R: RemoteSource,
{
    remote: R,
    state: Mutex<State<L>>,
    connectivity: ConnectivityMonitor,
    feed: watch::Sender<Vec<Reminder>>,
    loading: AtomicBool,
    alive: AtomicBool,
    add_failure_policy: AddFailurePolicy,
    probe_interval: Duration,
}

impl Synchronizer<Cache, Client> {
    /// Create a synchronizer between the server and the local cache described in `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self, ReminderError> {
        let client = Client::from_settings(settings)?;
        let cache = Cache::new(&settings.cache_folder);
        Ok(Self::new(client, cache)
            .with_add_failure_policy(settings.add_failure_policy)
            .with_probe_interval(settings.probe_interval))
    }
}

impl<L, R> Synchronizer<L, R>
where
    L: LocalStore,
    R: RemoteSource,
{
    /// Create a synchronizer. Nothing is loaded until [`Self::start`] is called.
    pub fn new(remote: R, local: L) -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            remote,
            state: Mutex::new(State {
                reminders: Vec::new(),
                local,
                last_provisional_id: 0,
            }),
            connectivity: ConnectivityMonitor::new(Connectivity::Offline),
            feed,
            loading: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            add_failure_policy: AddFailurePolicy::default(),
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    pub fn with_add_failure_policy(mut self, policy: AddFailurePolicy) -> Self {
        self.add_failure_policy = policy;
        self
    }

    /// Set how often [`Self::spawn_probe_loop`] checks the remote while offline
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    /// Returns the remote source.
    ///
    /// Apart from tests, there are very few (if any) reasons to access `remote` directly.
    pub fn remote(&self) -> &R { &self.remote }

    /// Whether the initial load is still in progress
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity.current()
    }

    /// Get a receiver of the current collection, updated after every change
    pub fn subscribe(&self) -> RemindersReceiver {
        self.feed.subscribe()
    }

    /// Get a receiver of the connectivity state
    pub fn subscribe_connectivity(&self) -> ConnectivityReceiver {
        self.connectivity.subscribe()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Tell this synchronizer its consumer is gone.
    ///
    /// Remote replies that arrive after this call are not applied, and the probe loop (if any) stops.
    pub fn shutdown(&self) {
        log::debug!("Shutting down the synchronizer");
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Persist the collection to the local store, and notify subscribers
    fn commit(&self, state: &mut State<L>) {
        if let Err(err) = state.local.save(&state.reminders) {
            log::warn!("Unable to save the local cache: {}", err);
        }
        self.feed.send_replace(state.reminders.clone());
    }

    /// Record a remote failure. The caller's operation goes on, and the app keeps working offline
    fn degrade(&self, err: &ReminderError) {
        log::warn!("Remote call failed ({}). Future changes will only be saved locally", err);
        self.connectivity.set(Connectivity::Offline);
    }

    /// Performs the initial load.
    ///
    /// This probes the remote source: if it replies, its collection is adopted and the synchronizer starts online.
    /// Otherwise, the local cache is loaded (or the starter reminders, on a first run) and the synchronizer starts offline.
    ///
    /// Local changes that never reached the server during a previous session are not pushed: when the server replies,
    /// its collection replaces the local cache. Call [`Self::reconcile`] before a restart to keep them.
    pub async fn start(&self) -> Connectivity {
        let mut state = self.state.lock().await;
        self.loading.store(true, Ordering::SeqCst);

        match self.remote.list().await {
            Ok(reminders) => {
                log::info!("Loaded {} reminders from the server", reminders.len());
                state.reminders = reminders;
                self.commit(&mut state);
                self.connectivity.set(Connectivity::Online);
            },
            Err(err) => {
                log::warn!("Server unavailable at startup ({}). Using the local cache", err);
                state.reminders = match state.local.load() {
                    Ok(reminders) => reminders,
                    Err(err) => {
                        log::error!("Unable to load the local cache: {}", err);
                        Vec::new()
                    },
                };
                self.feed.send_replace(state.reminders.clone());
                self.connectivity.set(Connectivity::Offline);
            },
        }

        self.loading.store(false, Ordering::SeqCst);
        self.connectivity.current()
    }

    /// Returns the current collection, in the order of the last load or reconciliation (newer additions last).
    ///
    /// Pending remote calls are not waited for: optimistic changes are visible as soon as they are applied.
    pub async fn list(&self) -> Vec<Reminder> {
        self.feed.borrow().clone()
    }

    pub async fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.feed.borrow().iter().find(|r| r.id() == id).cloned()
    }

    /// Create a reminder.
    ///
    /// It is immediately added with a provisional id. When online, it is then created on the remote, and replaced by
    /// the server's copy (that has the definitive id).
    /// In case the remote fails, the local reminder is kept or removed, depending on the [`AddFailurePolicy`].
    pub async fn add(&self, draft: &ReminderDraft) -> Result<Reminder, ReminderError> {
        let details = draft.validate()?;
        let mut state = self.state.lock().await;

        let provisional = Reminder::new(state.next_provisional_id(), details);
        state.reminders.push(provisional.clone());
        self.commit(&mut state);

        if self.is_online() == false {
            log::debug!("Offline: reminder {} has only been added locally", provisional.id());
            return Ok(provisional);
        }

        let result = self.remote.create(provisional.details()).await;
        if self.is_alive() == false {
            log::debug!("Discarding a late reply for the creation of {}", provisional.id());
            return result;
        }

        match result {
            Ok(created) => {
                log::debug!("Reminder {} is now known as {}", provisional.id(), created.id());
                if let Some(pos) = state.position(provisional.id()) {
                    state.reminders[pos] = created.clone();
                }
                self.commit(&mut state);
                Ok(created)
            },
            Err(err) => {
                self.degrade(&err);
                match self.add_failure_policy {
                    AddFailurePolicy::KeepLocal => Ok(provisional),
                    AddFailurePolicy::Rollback => {
                        state.reminders.retain(|r| r.id() != provisional.id());
                        self.commit(&mut state);
                        Err(err)
                    },
                }
            },
        }
    }

    /// Apply a partial update to a reminder.
    ///
    /// When online, the whole merged reminder is sent to the remote. If this fails, the local change is reverted.
    pub async fn update(&self, id: ReminderId, patch: &ReminderPatch) -> Result<Reminder, ReminderError> {
        let mut state = self.state.lock().await;
        let position = state.position(id).ok_or(ReminderError::NotFound(id))?;
        let previous = state.reminders[position].clone();
        let updated = previous.patched(patch)?;

        state.reminders[position] = updated.clone();
        self.commit(&mut state);

        if self.is_online() == false {
            log::debug!("Offline: reminder {} has only been updated locally", id);
            return Ok(updated);
        }

        let result = self.remote.replace(id, &updated).await;
        if self.is_alive() == false {
            log::debug!("Discarding a late reply for the update of {}", id);
            return result;
        }

        match result {
            Ok(stored) => {
                if let Some(pos) = state.position(id) {
                    state.reminders[pos] = stored.clone();
                }
                self.commit(&mut state);
                Ok(stored)
            },
            Err(err) => {
                self.degrade(&err);
                if let Some(pos) = state.position(id) {
                    state.reminders[pos] = previous;
                }
                self.commit(&mut state);
                Err(err)
            },
        }
    }

    /// Mark a reminder as completed
    pub async fn mark_done(&self, id: ReminderId) -> Result<Reminder, ReminderError> {
        self.update(id, &ReminderPatch::completed()).await
    }

    /// Delete a reminder.
    ///
    /// If the remote fails to delete it, it is put back (not necessarily at the same position).
    pub async fn remove(&self, id: ReminderId) -> Result<(), ReminderError> {
        let mut state = self.state.lock().await;
        let position = state.position(id).ok_or(ReminderError::NotFound(id))?;
        let removed = state.reminders.remove(position);
        self.commit(&mut state);

        if self.is_online() == false {
            log::debug!("Offline: reminder {} has only been deleted locally", id);
            return Ok(());
        }

        let result = self.remote.delete(id).await;
        if self.is_alive() == false {
            log::debug!("Discarding a late reply for the deletion of {}", id);
            return result;
        }

        if let Err(err) = result {
            self.degrade(&err);
            let position = position.min(state.reminders.len());
            state.reminders.insert(position, removed);
            self.commit(&mut state);
            return Err(err);
        }
        Ok(())
    }

    /// Set the connectivity state.
    ///
    /// Going from offline to online triggers a reconciliation, and this function returns whether it did.
    /// Subscribers are only told the synchronizer is online once this reconciliation has succeeded.
    /// Going offline is passive: subsequent changes will only be saved locally.
    pub async fn set_connectivity(&self, connectivity: Connectivity) -> Result<bool, ReminderError> {
        let mut state = self.state.lock().await;
        match connectivity {
            Connectivity::Online if self.is_online() == false => {
                let mut progress = SyncProgress::new();
                self.run_reconcile(&mut state, &mut progress).await?;
                Ok(true)
            },
            _ => {
                self.connectivity.set(connectivity);
                Ok(false)
            },
        }
    }

    /// Check whether the remote is reachable, and update the connectivity state accordingly
    /// (which may trigger a reconciliation, see [`Self::set_connectivity`]).
    pub async fn probe(&self) -> Connectivity {
        match self.remote.list().await {
            Err(err) => {
                log::debug!("Probe failed: {}", err);
                self.connectivity.set(Connectivity::Offline);
            },
            Ok(_) => {
                if let Err(err) = self.set_connectivity(Connectivity::Online).await {
                    log::warn!("Unable to reconcile after the server came back: {}", err);
                }
            },
        }
        self.connectivity.current()
    }

    /// Converge the local and remote collections.
    ///
    /// This uses a push-then-pull strategy: every remote reminder is deleted, every local reminder is re-created on the
    /// remote (which assigns fresh ids), then the remote collection is fetched and adopted as the new local collection.
    ///
    /// In case of error, the local collection is left untouched and the synchronizer goes offline.
    /// Simply run this function again, it will restart from scratch.
    pub async fn reconcile(&self) -> Result<(), ReminderError> {
        let mut progress = SyncProgress::new();
        let mut state = self.state.lock().await;
        self.run_reconcile(&mut state, &mut progress).await
    }

    /// Same as [`Self::reconcile`], and provide feedback to the user about the progress.
    pub async fn reconcile_with_feedback(&self, feedback_sender: FeedbackSender) -> Result<(), ReminderError> {
        let mut progress = SyncProgress::new_with_feedback_channel(feedback_sender);
        let mut state = self.state.lock().await;
        self.run_reconcile(&mut state, &mut progress).await
    }

    async fn run_reconcile(&self, state: &mut State<L>, progress: &mut SyncProgress) -> Result<(), ReminderError> {
        progress.info("Starting a reconciliation.");
        progress.feedback(SyncEvent::Started);

        let result = self.push_then_pull(&state.reminders, progress).await;
        match &result {
            Ok(synced) => {
                if self.is_alive() {
                    state.reminders = synced.clone();
                    self.commit(state);
                } else {
                    progress.warn("The synchronizer has been shut down, the synced collection is not applied");
                }
                self.connectivity.set(Connectivity::Online);
                progress.info(&format!("Reconciliation ended with {} reminders", synced.len()));
            },
            Err(err) => {
                progress.error(&format!("Reconciliation terminated because of an error: {}", err));
                self.degrade(err);
            },
        }

        progress.feedback(SyncEvent::Finished{ success: progress.is_success() });
        result.map(|_| ())
    }

    /// Stops at the first failure. The local collection is only read, so that it can be pushed again next time
    async fn push_then_pull(&self, local: &[Reminder], progress: &mut SyncProgress) -> Result<Vec<Reminder>, ReminderError> {
        progress.reset_counter();

        let remote_reminders = self.remote.list().await?;
        progress.debug(&format!("Replacing {} remote reminders with {} local ones", remote_reminders.len(), local.len()));
        progress.step(SyncStep::ClearRemote, format!("{} remote reminders", remote_reminders.len()));
        for reminder in &remote_reminders {
            progress.trace(&format!("> Deleting remote reminder {}", reminder.id()));
            self.remote.delete(reminder.id()).await?;
            progress.increment_counter(1);
        }

        progress.step(SyncStep::PushLocal, format!("{} local reminders", local.len()));
        for reminder in local {
            progress.trace(&format!("> Pushing local reminder {} ({})", reminder.id(), reminder.title()));
            let created = self.remote.create(reminder.details()).await?;
            progress.trace(&format!("  {} is now known as {}", reminder.id(), created.id()));
            progress.increment_counter(1);
            progress.step(SyncStep::PushLocal, reminder.title().to_string());
        }

        progress.step(SyncStep::PullRemote, "fetching the canonical collection".to_string());
        self.remote.list().await
    }

    /// Spawn a task that probes the remote every [`Self::probe_interval`] while offline.
    ///
    /// It stops when this synchronizer is shut down or dropped.
    pub fn spawn_probe_loop(self: &Arc<Self>) -> JoinHandle<()>
    where
        L: 'static,
        R: 'static,
    {
        let interval = self.probe_interval;
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let synchronizer = match weak.upgrade() {
                    None => break,
                    Some(s) => s,
                };
                if synchronizer.is_alive() == false {
                    break;
                }
                if synchronizer.is_online() == false {
                    let connectivity = synchronizer.probe().await;
                    log::debug!("Probe loop: {}", connectivity);
                }
            }
        })
    }
}
