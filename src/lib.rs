//! This crate keeps a collection of pet-care reminders in sync with a REST service, and keeps working offline.
//!
//! It provides an HTTP client for the `/reminders` resource in the [`client`] module, that can be used as a stand-alone module.
//!
//! Because the service may be unreachable, and a user-friendly app must keep working anyway, this crate also provides
//! a local cache for reminders in the [`cache`] module.
//!
//! These two "data sources" (actual client and local cache) are used together by a [`Synchronizer`](synchronizer::Synchronizer). \
//! A `Synchronizer` owns the canonical collection of reminders, applies every change optimistically, and
//! reconciles both sources when the connectivity comes back.

pub mod traits;

pub mod reminder;
pub use reminder::{Reminder, ReminderDetails, ReminderDraft, ReminderId, ReminderPatch, Slot, Status};
pub mod error;
pub use error::ReminderError;
pub mod synchronizer;
pub use synchronizer::{ReminderSynchronizer, Synchronizer};
pub mod connectivity;
pub use connectivity::Connectivity;

pub mod client;
pub mod cache;
pub mod mock_behaviour;
pub mod mock_remote;

pub mod config;
pub mod utils;
