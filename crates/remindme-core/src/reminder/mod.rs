//! Reminder records as the activation engine sees them.

mod filter;
mod model;

pub use filter::{ReminderFilter, ReminderStats};
pub use model::{ActivationType, NewReminder, Reminder, TimeTrigger, DEFAULT_CATEGORY};
