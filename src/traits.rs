//! Traits used by the [`Synchronizer`](crate::Synchronizer) to reach its data sources

use std::error::Error;

use async_trait::async_trait;

use crate::error::ReminderError;
use crate::reminder::{Reminder, ReminderDetails, ReminderId};

/// A source that holds the authoritative collection of reminders, usually a REST server.
///
/// Every failure (network error, timeout, non-success HTTP status...) must be reported as [`ReminderError::RemoteUnavailable`]
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Returns every reminder the source currently knows about
    async fn list(&self) -> Result<Vec<Reminder>, ReminderError>;
    /// Create a reminder. The source assigns its id, and returns the created reminder
    async fn create(&self, details: &ReminderDetails) -> Result<Reminder, ReminderError>;
    /// Overwrite the reminder `id` with `reminder`, and return what the source actually stored
    async fn replace(&self, id: ReminderId, reminder: &Reminder) -> Result<Reminder, ReminderError>;
    async fn delete(&self, id: ReminderId) -> Result<(), ReminderError>;
}

/// A local, best-effort mirror of the reminders, that survives across sessions.
///
/// It only knows about full snapshots: every `save` overwrites the previous one.
pub trait LocalStore: Send {
    /// Returns the last saved snapshot (or a default collection in case nothing has been saved yet)
    fn load(&self) -> Result<Vec<Reminder>, Box<dyn Error + Send + Sync>>;
    /// Replace the stored snapshot with `reminders`
    fn save(&mut self, reminders: &[Reminder]) -> Result<(), Box<dyn Error + Send + Sync>>;
}
