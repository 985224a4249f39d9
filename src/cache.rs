//! This module provides a local cache for reminders

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, Utc};

use crate::reminder::{Category, Frequency, Pet, Reminder, ReminderDraft, ReminderId, Status};
use crate::traits::LocalStore;

/// The namespaced key the snapshot is stored under
pub const STORAGE_KEY: &str = "pet-reminders";


/// A local store that keeps its snapshot in a single JSON file
#[derive(Clone, Debug, PartialEq)]
pub struct Cache {
    backing_file: PathBuf,
}

impl Cache {
    /// Get the path to the cache file, inside a given folder
    pub fn cache_file(folder: &Path) -> PathBuf {
        folder.join(format!("{}.json", STORAGE_KEY))
    }

    /// Initialize a cache that lives in `folder`. Nothing is read nor written yet.
    pub fn new(folder: &Path) -> Self {
        Self {
            backing_file: Self::cache_file(folder),
        }
    }

    /// Whether a snapshot has ever been saved
    pub fn has_snapshot(&self) -> bool {
        self.backing_file.exists()
    }
}

impl LocalStore for Cache {
    fn load(&self) -> Result<Vec<Reminder>, Box<dyn Error + Send + Sync>> {
        let file = match File::open(&self.backing_file) {
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("No cache file at {:?}, using the starter reminders", self.backing_file);
                return Ok(starter_reminders());
            },
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", self.backing_file, err).into());
            },
            Ok(f) => f,
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(reminders) => Ok(reminders),
            Err(err) => {
                log::warn!("Invalid cache file {:?} ({}). Using the starter reminders", self.backing_file, err);
                Ok(starter_reminders())
            },
        }
    }

    fn save(&mut self, reminders: &[Reminder]) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(folder) = self.backing_file.parent() {
            std::fs::create_dir_all(folder)?;
        }

        // Readers must never see a truncated snapshot
        let tmp_file = self.backing_file.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_file)?);
            serde_json::to_writer(&mut writer, reminders)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp_file, &self.backing_file)?;
        log::debug!("Saved {} reminders to {:?}", reminders.len(), self.backing_file);
        Ok(())
    }
}


struct Starter {
    id: i64,
    title: &'static str,
    time: &'static str,
    pet: Pet,
    category: Category,
    frequency: Frequency,
    status: Status,
    notes: &'static str,
    /// `None` means "today"
    start_date: Option<&'static str>,
    /// Days after today
    ends_in: Option<i64>,
}

const STARTERS: &[Starter] = &[
    Starter { id: 1, title: "Morning Walk", time: "07:00", pet: Pet::Browny, category: Category::General, frequency: Frequency::Everyday,
              status: Status::Pending, notes: "Take Browny for a 30-minute walk", start_date: None, ends_in: None },
    Starter { id: 2, title: "Breakfast", time: "08:00", pet: Pet::Browny, category: Category::General, frequency: Frequency::Everyday,
              status: Status::Pending, notes: "1 cup of dry food", start_date: None, ends_in: None },
    Starter { id: 3, title: "Afternoon Play", time: "14:00", pet: Pet::Kitty, category: Category::General, frequency: Frequency::Everyday,
              status: Status::Pending, notes: "Play with Kitty for 20 minutes", start_date: None, ends_in: None },
    Starter { id: 4, title: "Vet Visit", time: "16:00", pet: Pet::Browny, category: Category::Health, frequency: Frequency::Weekly,
              status: Status::Pending, notes: "Annual checkup for Browny", start_date: None, ends_in: Some(7) },
    Starter { id: 5, title: "Evening Walk", time: "19:00", pet: Pet::Browny, category: Category::General, frequency: Frequency::Everyday,
              status: Status::Completed, notes: "Take Browny for a 30-minute walk", start_date: None, ends_in: None },
    Starter { id: 6, title: "Dinner", time: "20:00", pet: Pet::Kitty, category: Category::General, frequency: Frequency::Everyday,
              status: Status::Pending, notes: "Wet food for Kitty", start_date: None, ends_in: None },
    Starter { id: 7, title: "Grooming", time: "10:00", pet: Pet::Kitty, category: Category::Health, frequency: Frequency::Monthly,
              status: Status::Pending, notes: "Brush Kitty's fur", start_date: None, ends_in: Some(30) },
    Starter { id: 8, title: "Grooming", time: "10:00", pet: Pet::Kitty, category: Category::Health, frequency: Frequency::Monthly,
              status: Status::Completed, notes: "Brush Kitty's fur", start_date: Some("2025-05-29"), ends_in: Some(30) },
    Starter { id: 9, title: "Grooming", time: "10:00", pet: Pet::Kitty, category: Category::Health, frequency: Frequency::Monthly,
              status: Status::Pending, notes: "Brush Kitty's fur", start_date: Some("2025-05-28"), ends_in: Some(30) },
    Starter { id: 10, title: "Grooming", time: "10:00", pet: Pet::Kitty, category: Category::Health, frequency: Frequency::Monthly,
              status: Status::Completed, notes: "Brush Kitty's fur", start_date: Some("2025-05-27"), ends_in: Some(30) },
];

/// The demo reminders a first-time user starts with
pub fn starter_reminders() -> Vec<Reminder> {
    starter_reminders_from(Utc::now().date_naive())
}

fn starter_reminders_from(today: NaiveDate) -> Vec<Reminder> {
    let iso = |date: NaiveDate| date.format("%Y-%m-%d").to_string();

    STARTERS.iter()
        .filter_map(|starter| {
            let mut draft = ReminderDraft::new(starter.title, starter.time, starter.start_date.map(String::from).unwrap_or_else(|| iso(today)))
                .with_pet(starter.pet)
                .with_category(starter.category)
                .with_frequency(starter.frequency)
                .with_status(starter.status)
                .with_notes(starter.notes);
            if let Some(days) = starter.ends_in {
                draft = draft.with_end_date(iso(today + Duration::days(days)));
            }

            match draft.validate() {
                Ok(details) => Some(Reminder::new(ReminderId::new(starter.id), details)),
                Err(err) => {
                    log::error!("Invalid starter reminder {}: {}", starter.id, err);
                    None
                },
            }
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::reminder::Slot;

    fn test_folder(name: &str) -> PathBuf {
        let folder = std::env::temp_dir().join(format!("pet-reminders-cache-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&folder);
        folder
    }

    #[test]
    fn serde_cache() {
        let folder = test_folder("serde");
        let mut cache = Cache::new(&folder);
        assert_eq!(cache.has_snapshot(), false);

        let mut reminders = starter_reminders();
        reminders.truncate(3);
        cache.save(&reminders).unwrap();
        assert!(cache.has_snapshot());

        let retrieved_cache = Cache::new(&folder);
        assert_eq!(retrieved_cache.load().unwrap(), reminders);

        // Saving overwrites the whole snapshot
        cache.save(&reminders[..1]).unwrap();
        assert_eq!(retrieved_cache.load().unwrap(), reminders[..1].to_vec());

        cache.save(&[]).unwrap();
        assert!(retrieved_cache.load().unwrap().is_empty());
    }

    #[test]
    fn first_run_uses_starters() {
        let folder = test_folder("first-run");
        let cache = Cache::new(&folder);
        let reminders = cache.load().unwrap();
        assert_eq!(reminders.len(), STARTERS.len());
    }

    #[test]
    fn corrupted_cache_uses_starters() {
        let folder = test_folder("corrupted");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(Cache::cache_file(&folder), b"{ not json").unwrap();

        let reminders = Cache::new(&folder).load().unwrap();
        assert_eq!(reminders.len(), STARTERS.len());
    }

    #[test]
    fn starter_contents() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let reminders = starter_reminders_from(today);
        assert_eq!(reminders.len(), 10);

        let vet = reminders.iter().find(|r| r.title() == "Vet Visit").unwrap();
        assert_eq!(vet.slot(), Slot::Afternoon);
        assert_eq!(vet.start_date(), Some(today));
        assert_eq!(vet.end_date(), NaiveDate::from_ymd_opt(2025, 6, 8));

        let dinner = reminders.iter().find(|r| r.title() == "Dinner").unwrap();
        assert_eq!(dinner.slot(), Slot::Evening);
        assert_eq!(dinner.pet(), Pet::Kitty);

        let completed = reminders.iter().filter(|r| r.status().is_completed()).count();
        assert_eq!(completed, 3);
    }
}
