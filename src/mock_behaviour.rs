//! This module provides ways to tweak mocked remote sources, so that they can return errors on some tests

use crate::error::ReminderError;

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    pub list_behaviour: (u32, u32),
    pub create_behaviour: (u32, u32),
    pub replace_behaviour: (u32, u32),
    pub delete_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            list_behaviour: (0, n_fails),
            create_behaviour: (0, n_fails),
            replace_behaviour: (0, n_fails),
            delete_behaviour: (0, n_fails),
        }
    }

    /// Every action fails, until this behaviour is replaced
    pub fn unreachable() -> Self {
        Self::fail_now(u32::MAX)
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_list(&mut self) -> Result<(), ReminderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_behaviour, "list")
    }
    pub fn can_create(&mut self) -> Result<(), ReminderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_behaviour, "create")
    }
    pub fn can_replace(&mut self) -> Result<(), ReminderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.replace_behaviour, "replace")
    }
    pub fn can_delete(&mut self) -> Result<(), ReminderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_behaviour, "delete")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), ReminderError> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(ReminderError::RemoteUnavailable(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}
