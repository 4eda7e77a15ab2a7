use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ActivationType, Reminder};

/// Narrowing criteria for reminder listings. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderFilter {
    pub category: Option<String>,
    pub completed: Option<bool>,
    pub activation: Option<ActivationType>,
}

impl ReminderFilter {
    pub fn active() -> Self {
        Self {
            completed: Some(false),
            ..Self::default()
        }
    }

    pub fn matches(&self, reminder: &Reminder) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| reminder.category == c)
            && self.completed.map_or(true, |c| reminder.completed == c)
            && self.activation.map_or(true, |a| reminder.activation == a)
    }
}

/// Counts shown on the reminder overview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderStats {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    pub by_category: BTreeMap<String, u64>,
    pub by_activation: BTreeMap<String, u64>,
}

impl ReminderStats {
    pub fn from_reminders<'a>(reminders: impl IntoIterator<Item = &'a Reminder>) -> Self {
        let mut stats = Self::default();
        for reminder in reminders {
            stats.total += 1;
            if reminder.completed {
                stats.completed += 1;
            } else {
                stats.active += 1;
            }
            *stats
                .by_category
                .entry(reminder.category.clone())
                .or_default() += 1;
            *stats
                .by_activation
                .entry(reminder.activation.to_string())
                .or_default() += 1;
        }
        stats
    }
}
