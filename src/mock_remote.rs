//! An in-memory remote source.
//!
//! It behaves like the REST service (it assigns ids, and rejects updates of unknown ids) and is used to run the
//! [`Synchronizer`](crate::Synchronizer) against a mocked server, whose failures can be scripted with a [`MockBehaviour`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ReminderError;
use crate::mock_behaviour::MockBehaviour;
use crate::reminder::{Reminder, ReminderDetails, ReminderId};
use crate::traits::RemoteSource;

/// How many times each operation has been called (including the failed calls)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: u32,
    pub create: u32,
    pub replace: u32,
    pub delete: u32,
}

#[derive(Debug)]
struct ServerData {
    reminders: Vec<Reminder>,
    next_id: i64,
    behaviour: MockBehaviour,
    calls: CallCounts,
    latency: Option<Duration>,
}

/// A mocked server. Clones share the same data, so that a test can keep a handle on a remote it has given away.
#[derive(Clone, Debug)]
pub struct MemoryRemote {
    data: Arc<Mutex<ServerData>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_reminders(Vec::new())
    }

    /// A server that already contains some reminders
    pub fn with_reminders(reminders: Vec<Reminder>) -> Self {
        let next_id = reminders.iter().map(|r| r.id().value()).max().unwrap_or(0) + 1;
        Self {
            data: Arc::new(Mutex::new(ServerData {
                reminders,
                next_id,
                behaviour: MockBehaviour::new(),
                calls: CallCounts::default(),
                latency: None,
            })),
        }
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        self.data.lock().unwrap().behaviour = behaviour;
    }

    /// Simulate the server going down (every call fails) or coming back
    pub fn set_reachable(&self, reachable: bool) {
        let behaviour = if reachable { MockBehaviour::new() } else { MockBehaviour::unreachable() };
        self.set_behaviour(behaviour);
    }

    /// Make every call wait for `latency` before being processed
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.data.lock().unwrap().latency = latency;
    }

    /// The reminders currently stored on this server
    pub fn reminders(&self) -> Vec<Reminder> {
        self.data.lock().unwrap().reminders.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.data.lock().unwrap().calls
    }

    async fn simulate_latency(&self) {
        let latency = self.data.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSource for MemoryRemote {
    async fn list(&self) -> Result<Vec<Reminder>, ReminderError> {
        self.simulate_latency().await;
        let mut data = self.data.lock().unwrap();
        data.calls.list += 1;
        data.behaviour.can_list()?;
        Ok(data.reminders.clone())
    }

    async fn create(&self, details: &ReminderDetails) -> Result<Reminder, ReminderError> {
        self.simulate_latency().await;
        let mut data = self.data.lock().unwrap();
        data.calls.create += 1;
        data.behaviour.can_create()?;

        let id = ReminderId::new(data.next_id);
        data.next_id += 1;
        let created = Reminder::new(id, details.clone());
        data.reminders.push(created.clone());
        Ok(created)
    }

    async fn replace(&self, id: ReminderId, reminder: &Reminder) -> Result<Reminder, ReminderError> {
        self.simulate_latency().await;
        let mut data = self.data.lock().unwrap();
        data.calls.replace += 1;
        data.behaviour.can_replace()?;

        let stored = Reminder::new(id, reminder.details().clone());
        match data.reminders.iter_mut().find(|r| r.id() == id) {
            None => Err(ReminderError::RemoteUnavailable(format!("Unexpected HTTP status code 404 for reminder {}", id))),
            Some(existing) => {
                *existing = stored.clone();
                Ok(stored)
            },
        }
    }

    async fn delete(&self, id: ReminderId) -> Result<(), ReminderError> {
        self.simulate_latency().await;
        let mut data = self.data.lock().unwrap();
        data.calls.delete += 1;
        data.behaviour.can_delete()?;

        let len_before = data.reminders.len();
        data.reminders.retain(|r| r.id() != id);
        if data.reminders.len() == len_before {
            return Err(ReminderError::RemoteUnavailable(format!("Unexpected HTTP status code 404 for reminder {}", id)));
        }
        Ok(())
    }
}
