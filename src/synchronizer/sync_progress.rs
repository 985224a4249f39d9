//! Utilities to track the progression of a reconciliation

use std::fmt::{Display, Error, Formatter};

/// An event that happens during a reconciliation
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// Reconciliation has not started
    NotStarted,
    /// Reconciliation has just started but nothing has been sent yet
    Started,
    /// Reconciliation is in progress.
    InProgress{ step: SyncStep, items_done_already: usize, details: String },
    /// Reconciliation is finished
    Finished{ success: bool },
}

/// The successive steps of a push-then-pull reconciliation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStep {
    /// Removing every remote reminder
    ClearRemote,
    /// Re-creating every local reminder on the remote
    PushLocal,
    /// Fetching the canonical collection back
    PullRemote,
}

impl Display for SyncStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncStep::ClearRemote => write!(f, "clearing remote"),
            SyncStep::PushLocal => write!(f, "pushing local reminders"),
            SyncStep::PullRemote => write!(f, "pulling remote reminders"),
        }
    }
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncEvent::NotStarted => write!(f, "Not started"),
            SyncEvent::Started => write!(f, "Reconciliation has started..."),
            SyncEvent::InProgress{step, items_done_already, details} => write!(f, "[{}, {} done] {}...", step, items_done_already, details),
            SyncEvent::Finished{success} => match success {
                true => write!(f, "Reconciliation successfully finished"),
                false => write!(f, "Reconciliation finished with errors"),
            }
        }
    }
}

impl Default for SyncEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}



/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<SyncEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<SyncEvent>;

/// Create a feeback channel, that can be used to retrieve the current progress of a reconciliation
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(SyncEvent::default())
}




/// A structure that tracks the progression and the errors that happen during a reconciliation
pub struct SyncProgress {
    n_errors: u32,
    feedback_channel: Option<FeedbackSender>,
    counter: usize,
}
impl SyncProgress {
    pub fn new() -> Self {
        Self { n_errors: 0, feedback_channel: None, counter: 0 }
    }
    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { n_errors: 0, feedback_channel: Some(channel), counter: 0 }
    }

    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }
    pub fn increment_counter(&mut self, increment: usize) {
        self.counter += increment;
    }

    pub fn is_success(&self) -> bool {
        self.n_errors == 0
    }

    /// Log an error
    pub fn error(&mut self, text: &str) {
        log::error!("{}", text);
        self.n_errors += 1;
    }
    /// Log a warning
    pub fn warn(&mut self, text: &str) {
        log::warn!("{}", text);
        self.n_errors += 1;
    }
    /// Log an info
    pub fn info(&mut self, text: &str) {
        log::info!("{}", text);
    }
    /// Log a debug message
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}", text);
    }
    /// Log a trace message
    pub fn trace(&mut self, text: &str) {
        log::trace!("{}", text);
    }
    /// Send an event as a feedback to the listener (if any).
    pub fn feedback(&mut self, event: SyncEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Nobody may be listening anymore, this is not an error
            let _ = sender.send(event);
        }
    }

    /// Send an [`SyncEvent::InProgress`] event for the current step
    pub fn step(&mut self, step: SyncStep, details: String) {
        let items_done_already = self.counter;
        self.feedback(SyncEvent::InProgress{ step, items_done_already, details });
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::new()
    }
}
