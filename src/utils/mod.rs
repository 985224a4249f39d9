//! Some utility functions

use crate::reminder::{format_time, Reminder, ReminderDetails, Slot};

/// Split reminders by slot (in display order), each slot being sorted by time
pub fn group_by_slot(reminders: &[Reminder]) -> Vec<(Slot, Vec<&Reminder>)> {
    Slot::ALL.iter()
        .map(|slot| {
            let mut in_slot: Vec<&Reminder> = reminders.iter()
                .filter(|r| r.slot() == *slot)
                .collect();
            in_slot.sort_by_key(|r| r.time());
            (*slot, in_slot)
        })
        .collect()
}

/// A debug utility that pretty-prints reminders, grouped by slot
pub fn print_reminder_list(reminders: &[Reminder]) {
    for (slot, in_slot) in group_by_slot(reminders) {
        println!("{} ({})", slot, in_slot.len());
        for reminder in in_slot {
            print_reminder(reminder);
        }
    }
}

pub fn print_reminder(reminder: &Reminder) {
    let completion = if reminder.status().is_completed() { "✓" } else { " " };
    println!("    {} {:>8}  {}\t[{}, {}]\t{}",
        completion,
        format_time(&reminder.time()),
        reminder.title(),
        reminder.pet().name(),
        reminder.category().name(),
        reminder.id(),
    );
}

/// Compare two collections, regardless of ids and order.
///
/// This is what a push-then-pull reconciliation preserves: the server assigns new ids to every reminder it receives.
pub fn same_contents_ignoring_ids(left: &[Reminder], right: &[Reminder]) -> bool {
    if left.len() != right.len() {
        log::debug!("Count of reminders mismatch: {} and {}", left.len(), right.len());
        return false;
    }

    let mut remaining: Vec<&ReminderDetails> = right.iter().map(|r| r.details()).collect();
    for reminder in left {
        match remaining.iter().position(|details| *details == reminder.details()) {
            None => {
                log::debug!("Reminder {} ({}) has no counterpart", reminder.id(), reminder.title());
                return false;
            },
            Some(pos) => {
                remaining.swap_remove(pos);
            },
        }
    }
    true
}
