//! Pet-care reminders
//!
//! A [`Reminder`] is the only entity handled by this crate. Its `slot` is never set directly: it is always
//! derived from its `time` by [`slot_for_time`].

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ReminderError;

/// Maximum number of characters in a reminder title
pub const MAX_TITLE_LEN: usize = 100;
/// Maximum number of characters in the notes of a reminder
pub const MAX_NOTES_LEN: usize = 200;

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";


/// The identifier of a reminder.
///
/// It is assigned by the server, or is a provisional, clock-based value for reminders that have not been synced yet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(i64);

impl ReminderId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ReminderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for ReminderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// The time-of-day bucket a reminder is displayed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Morning,
    Afternoon,
    Evening,
}

impl Slot {
    /// Every slot, in display order
    pub const ALL: [Slot; 3] = [Slot::Morning, Slot::Afternoon, Slot::Evening];
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Morning => write!(f, "Morning"),
            Slot::Afternoon => write!(f, "Afternoon"),
            Slot::Evening => write!(f, "Evening"),
        }
    }
}

/// Compute the slot of a clock time: before noon is `Morning`, `12:00` to `16:59` is `Afternoon`, `17:00` onwards is `Evening`
pub fn slot_for_time(time: &NaiveTime) -> Slot {
    match time.hour() {
        0..=11 => Slot::Morning,
        12..=16 => Slot::Afternoon,
        _ => Slot::Evening,
    }
}

/// Format a clock time the way it is displayed to the user, e.g. `7:00 am` or `12:30 pm`
pub fn format_time(time: &NaiveTime) -> String {
    let hour = time.hour();
    let am_pm = if hour >= 12 { "pm" } else { "am" };
    let hour12 = if hour % 12 == 0 { 12 } else { hour % 12 };
    format!("{}:{:02} {}", hour12, time.minute(), am_pm)
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Completed,
}

impl Status {
    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Pending
    }
}


/// How often a reminder repeats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Everyday,
    Weekly,
    Monthly,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Everyday
    }
}


/// Generates a fixed enumeration that is serialized as its numeric key
macro_rules! keyed_enumeration {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $key:literal => $display:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u32", into = "u32")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The human-readable name
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }

            /// The numeric key, as used on the wire
            pub fn key(&self) -> u32 {
                match self {
                    $($name::$variant => $key),+
                }
            }
        }

        impl TryFrom<u32> for $name {
            type Error = String;

            fn try_from(key: u32) -> Result<Self, Self::Error> {
                match key {
                    $($key => Ok($name::$variant),)+
                    other => Err(format!("unknown {} key {}", stringify!($name), other)),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.key()
            }
        }
    };
}

keyed_enumeration!(
    /// The pets reminders can be about
    Pet {
        Browny = 1 => "Browny",
        Kitty = 2 => "Kitty",
    }
);

keyed_enumeration!(
    Category {
        General = 1 => "General",
        Health = 2 => "Health",
    }
);

impl Default for Pet {
    fn default() -> Self {
        Pet::Browny
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::General
    }
}


/// The content of a reminder, without its id.
///
/// This is what is sent to the server when a reminder is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReminder", into = "WireReminder")]
pub struct ReminderDetails {
    title: String,
    time: NaiveTime,
    slot: Slot,
    pet: Pet,
    category: Category,
    frequency: Frequency,
    status: Status,
    notes: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl ReminderDetails {
    pub fn title(&self) -> &str { &self.title }
    pub fn time(&self) -> NaiveTime { self.time }
    pub fn slot(&self) -> Slot { self.slot }
    pub fn pet(&self) -> Pet { self.pet }
    pub fn category(&self) -> Category { self.category }
    pub fn frequency(&self) -> Frequency { self.frequency }
    pub fn status(&self) -> Status { self.status }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn start_date(&self) -> Option<NaiveDate> { self.start_date }
    pub fn end_date(&self) -> Option<NaiveDate> { self.end_date }

    /// The time, formatted as `HH:MM`
    pub fn time_string(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }

    fn set_time(&mut self, time: NaiveTime) {
        self.time = time;
        self.slot = slot_for_time(&time);
    }
}


/// A reminder, as stored in the local cache and on the server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReminder", into = "WireReminder")]
pub struct Reminder {
    id: ReminderId,
    details: ReminderDetails,
}

/// Returns `self.details.$property_name()`
macro_rules! synthetise_details_getter {
    ($property_name:ident, $return_type:ty) => {
        pub fn $property_name(&self) -> $return_type {
            self.details.$property_name()
        }
    }
}

impl Reminder {
    pub fn new(id: ReminderId, details: ReminderDetails) -> Self {
        Self { id, details }
    }

    pub fn id(&self) -> ReminderId { self.id }
    pub fn details(&self) -> &ReminderDetails { &self.details }

    synthetise_details_getter!(title, &str);
    synthetise_details_getter!(time, NaiveTime);
    synthetise_details_getter!(time_string, String);
    synthetise_details_getter!(slot, Slot);
    synthetise_details_getter!(pet, Pet);
    synthetise_details_getter!(category, Category);
    synthetise_details_getter!(frequency, Frequency);
    synthetise_details_getter!(status, Status);
    synthetise_details_getter!(notes, Option<&str>);
    synthetise_details_getter!(start_date, Option<NaiveDate>);
    synthetise_details_getter!(end_date, Option<NaiveDate>);

    /// Returns a copy of this reminder with `patch` applied.
    ///
    /// The slot is recomputed when the time changes. The merged reminder is validated, and `self` is never modified
    pub fn patched(&self, patch: &ReminderPatch) -> Result<Reminder, ReminderError> {
        let mut details = self.details.clone();

        if let Some(title) = &patch.title {
            details.title = check_title(title)?;
        }
        if let Some(time) = &patch.time {
            details.set_time(parse_time(time)?);
        }
        if let Some(pet) = patch.pet {
            details.pet = pet;
        }
        if let Some(category) = patch.category {
            details.category = category;
        }
        if let Some(frequency) = patch.frequency {
            details.frequency = frequency;
        }
        if let Some(status) = patch.status {
            details.status = status;
        }
        if let Some(notes) = &patch.notes {
            details.notes = check_notes(notes.as_deref())?;
        }
        if let Some(start_date) = &patch.start_date {
            details.start_date = Some(parse_date(start_date, "start date")?);
        }
        if let Some(end_date) = &patch.end_date {
            details.end_date = match end_date {
                None => None,
                Some(date) => Some(parse_date(date, "end date")?),
            };
        }
        check_date_range(details.start_date, details.end_date)?;

        Ok(Reminder { id: self.id, details })
    }
}


/// A reminder that is about to be created, as typed by the user
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReminderDraft {
    pub title: String,
    /// `HH:MM`, 24-hour clock
    pub time: String,
    pub pet: Pet,
    pub category: Category,
    pub frequency: Frequency,
    pub status: Status,
    pub notes: Option<String>,
    /// ISO date (`YYYY-MM-DD`)
    pub start_date: Option<String>,
    /// ISO date (`YYYY-MM-DD`), not before the start date
    pub end_date: Option<String>,
}

impl ReminderDraft {
    pub fn new<S: ToString, T: ToString, U: ToString>(title: S, time: T, start_date: U) -> Self {
        Self {
            title: title.to_string(),
            time: time.to_string(),
            start_date: Some(start_date.to_string()),
            ..Self::default()
        }
    }

    pub fn with_pet(mut self, pet: Pet) -> Self {
        self.pet = pet;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_notes<S: ToString>(mut self, notes: S) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn with_end_date<S: ToString>(mut self, end_date: S) -> Self {
        self.end_date = Some(end_date.to_string());
        self
    }

    /// Check every constraint of a new reminder, and build its content
    pub fn validate(&self) -> Result<ReminderDetails, ReminderError> {
        let title = check_title(&self.title)?;
        let time = parse_time(&self.time)?;
        let start_date = match &self.start_date {
            None => return Err(ReminderError::Validation("a start date is required".to_string())),
            Some(date) => parse_date(date, "start date")?,
        };
        let end_date = match &self.end_date {
            None => None,
            Some(date) => Some(parse_date(date, "end date")?),
        };
        check_date_range(Some(start_date), end_date)?;
        let notes = check_notes(self.notes.as_deref())?;

        Ok(ReminderDetails {
            title,
            time,
            slot: slot_for_time(&time),
            pet: self.pet,
            category: self.category,
            frequency: self.frequency,
            status: self.status,
            notes,
            start_date: Some(start_date),
            end_date,
        })
    }
}


/// A partial update of a reminder. Fields left to `None` are not changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReminderPatch {
    pub title: Option<String>,
    /// `HH:MM`, 24-hour clock
    pub time: Option<String>,
    pub pet: Option<Pet>,
    pub category: Option<Category>,
    pub frequency: Option<Frequency>,
    pub status: Option<Status>,
    /// `Some(None)` clears the notes
    pub notes: Option<Option<String>>,
    pub start_date: Option<String>,
    /// `Some(None)` clears the end date
    pub end_date: Option<Option<String>>,
}

impl ReminderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The patch applied by "mark as done"
    pub fn completed() -> Self {
        Self::new().status(Status::Completed)
    }

    pub fn title<S: ToString>(mut self, title: S) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn time<S: ToString>(mut self, time: S) -> Self {
        self.time = Some(time.to_string());
        self
    }

    pub fn pet(mut self, pet: Pet) -> Self {
        self.pet = Some(pet);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn notes<S: ToString>(mut self, notes: S) -> Self {
        self.notes = Some(Some(notes.to_string()));
        self
    }

    pub fn clear_notes(mut self) -> Self {
        self.notes = Some(None);
        self
    }

    pub fn start_date<S: ToString>(mut self, start_date: S) -> Self {
        self.start_date = Some(start_date.to_string());
        self
    }

    pub fn end_date<S: ToString>(mut self, end_date: S) -> Self {
        self.end_date = Some(Some(end_date.to_string()));
        self
    }

    pub fn clear_end_date(mut self) -> Self {
        self.end_date = Some(None);
        self
    }
}


fn check_title(title: &str) -> Result<String, ReminderError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ReminderError::Validation("the title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ReminderError::Validation(format!("the title cannot exceed {} characters", MAX_TITLE_LEN)));
    }
    Ok(title.to_string())
}

fn check_notes(notes: Option<&str>) -> Result<Option<String>, ReminderError> {
    match notes {
        None => Ok(None),
        Some(n) if n.trim().is_empty() => Ok(None),
        Some(n) if n.chars().count() > MAX_NOTES_LEN => {
            Err(ReminderError::Validation(format!("notes cannot exceed {} characters", MAX_NOTES_LEN)))
        },
        Some(n) => Ok(Some(n.to_string())),
    }
}

/// Parse a strict `HH:MM` 24-hour time
fn parse_time(text: &str) -> Result<NaiveTime, ReminderError> {
    let bytes = text.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(ReminderError::Validation(format!("time {:?} is not in HH:MM format", text)));
    }
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .map_err(|err| ReminderError::Validation(format!("time {:?} is invalid: {}", text, err)))
}

fn parse_date(text: &str, descr: &str) -> Result<NaiveDate, ReminderError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|err| ReminderError::Validation(format!("{} {:?} is not a valid ISO date: {}", descr, text, err)))
}

fn check_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ReminderError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(ReminderError::Validation(format!("end date {} is before start date {}", end, start)))
        },
        _ => Ok(()),
    }
}


/// The JSON shape of a reminder, shared by the local cache and the REST service
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReminder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ReminderId>,
    title: String,
    time: String,
    /// Always written, but ignored when read: the slot is recomputed from `time`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot: Option<Slot>,
    pet: Pet,
    category: Category,
    frequency: Frequency,
    #[serde(default)]
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
}

impl WireReminder {
    fn from_details(id: Option<ReminderId>, details: ReminderDetails) -> Self {
        Self {
            id,
            time: details.time_string(),
            slot: Some(details.slot),
            title: details.title,
            pet: details.pet,
            category: details.category,
            frequency: details.frequency,
            status: details.status,
            notes: details.notes,
            start_date: details.start_date,
            end_date: details.end_date,
        }
    }
}

impl From<ReminderDetails> for WireReminder {
    fn from(details: ReminderDetails) -> Self {
        Self::from_details(None, details)
    }
}

impl From<Reminder> for WireReminder {
    fn from(reminder: Reminder) -> Self {
        Self::from_details(Some(reminder.id), reminder.details)
    }
}

impl TryFrom<WireReminder> for ReminderDetails {
    type Error = String;

    fn try_from(wire: WireReminder) -> Result<Self, Self::Error> {
        let time = parse_time(&wire.time).map_err(|err| err.to_string())?;
        if let Some(slot) = wire.slot {
            if slot != slot_for_time(&time) {
                log::debug!("Ignoring inconsistent slot {} for time {}", slot, wire.time);
            }
        }

        Ok(Self {
            title: wire.title,
            time,
            slot: slot_for_time(&time),
            pet: wire.pet,
            category: wire.category,
            frequency: wire.frequency,
            status: wire.status,
            notes: wire.notes,
            start_date: wire.start_date,
            end_date: wire.end_date,
        })
    }
}

impl TryFrom<WireReminder> for Reminder {
    type Error = String;

    fn try_from(wire: WireReminder) -> Result<Self, Self::Error> {
        let id = match wire.id {
            None => return Err("missing reminder id".to_string()),
            Some(id) => id,
        };
        let details = ReminderDetails::try_from(wire)?;
        Ok(Self { id, details })
    }
}
