//! Errors that can be returned by this crate

use thiserror::Error;

use crate::reminder::ReminderId;

/// Every failure a caller of the [`Synchronizer`](crate::Synchronizer) can observe
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReminderError {
    /// The input was rejected before any state was touched
    #[error("invalid reminder: {0}")]
    Validation(String),

    /// The operation targets an id that is not in the collection
    #[error("no reminder with id {0}")]
    NotFound(ReminderId),

    /// The remote service could not be reached (network failure, timeout), or replied with a non-success status
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ReminderError {
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, ReminderError::RemoteUnavailable(_))
    }
}

impl From<reqwest::Error> for ReminderError {
    fn from(err: reqwest::Error) -> Self {
        ReminderError::RemoteUnavailable(err.to_string())
    }
}
