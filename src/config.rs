//! Support for library configuration options

use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::error::ReminderError;

/// The address of the development server, used when `PET_REMINDERS_API_BASE` is not set
pub const DEFAULT_API_BASE: &str = "http://localhost:4000";
/// The folder the local cache lives in, when `PET_REMINDERS_CACHE_DIR` is not set
pub const DEFAULT_CACHE_FOLDER: &str = ".pet-reminders";
/// How often an offline synchronizer checks whether the server is back
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// The base URL of the reminders service, read once from the environment
pub static API_BASE: Lazy<String> = Lazy::new(|| {
    std::env::var("PET_REMINDERS_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
});

/// The folder of the local cache, read once from the environment
pub static CACHE_FOLDER: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var_os("PET_REMINDERS_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FOLDER))
});


/// What happens to an optimistically added reminder when the server cannot be reached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddFailurePolicy {
    /// Keep the reminder locally, with its provisional id. It is pushed by the next reconciliation within this session.
    ///
    /// A restart that finds the server reachable adopts the server collection, and drops such reminders
    /// (see [`Synchronizer::start`](crate::Synchronizer::start)).
    KeepLocal,
    /// Remove the reminder, and report the failure to the caller
    Rollback,
}

impl Default for AddFailurePolicy {
    fn default() -> Self {
        AddFailurePolicy::KeepLocal
    }
}


#[derive(Clone, Debug)]
pub struct Settings {
    /// The base URL of the REST service. Reminders live at `<api_base>/reminders`
    pub api_base: Url,
    pub cache_folder: PathBuf,
    /// Any remote call that takes longer is considered a failure
    pub remote_timeout: Duration,
    /// How often the server is probed while offline
    pub probe_interval: Duration,
    pub add_failure_policy: AddFailurePolicy,
}

impl Settings {
    pub fn new<S: AsRef<str>>(api_base: S, cache_folder: PathBuf) -> Result<Self, ReminderError> {
        let api_base = Url::parse(api_base.as_ref())
            .map_err(|err| ReminderError::InvalidConfiguration(format!("invalid API base {:?}: {}", api_base.as_ref(), err)))?;

        Ok(Self {
            api_base,
            cache_folder,
            remote_timeout: Duration::from_secs(8),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            add_failure_policy: AddFailurePolicy::default(),
        })
    }

    /// Build the settings from the `PET_REMINDERS_API_BASE` and `PET_REMINDERS_CACHE_DIR` environment variables
    pub fn from_env() -> Result<Self, ReminderError> {
        Self::new(API_BASE.as_str(), CACHE_FOLDER.clone())
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_add_failure_policy(mut self, policy: AddFailurePolicy) -> Self {
        self.add_failure_policy = policy;
        self
    }
}
