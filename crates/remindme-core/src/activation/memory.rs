use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::traits::{SnapshotError, SnapshotProvider};
use crate::reminder::Reminder;

/// Snapshot provider backed by a plain vector.
///
/// Useful for embedding the engine without a database, and in tests.
#[derive(Default)]
pub struct InMemorySnapshot {
    reminders: Mutex<Vec<Reminder>>,
    notified: Mutex<Vec<String>>,
    time_activated: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    fail_fetches: AtomicBool,
}

impl InMemorySnapshot {
    pub fn new(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: Mutex::new(reminders),
            ..Self::default()
        }
    }

    pub fn insert(&self, reminder: Reminder) {
        self.lock_reminders().push(reminder);
    }

    pub fn remove(&self, id: &str) -> Option<Reminder> {
        let mut reminders = self.lock_reminders();
        let index = reminders.iter().position(|r| r.id == id)?;
        Some(reminders.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<Reminder> {
        self.lock_reminders().iter().find(|r| r.id == id).cloned()
    }

    /// Ids passed to `mark_notified`, in call order.
    pub fn notified_ids(&self) -> Vec<String> {
        lock(&self.notified).clone()
    }

    /// Ids passed to `mark_time_activated`, in call order.
    pub fn time_activated_ids(&self) -> Vec<String> {
        lock(&self.time_activated).clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Make every following fetch fail until switched off again.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    fn lock_reminders(&self) -> std::sync::MutexGuard<'_, Vec<Reminder>> {
        lock(&self.reminders)
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut Reminder)) -> Result<(), SnapshotError> {
        let mut reminders = self.lock_reminders();
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SnapshotError::NotFound(id.to_string()))?;
        apply(reminder);
        reminder.updated_at = Utc::now();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SnapshotProvider for InMemorySnapshot {
    async fn active_reminders(&self) -> Result<Vec<Reminder>, SnapshotError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(SnapshotError::FetchFailed("snapshot unavailable".into()));
        }
        Ok(self
            .lock_reminders()
            .iter()
            .filter(|r| !r.completed)
            .cloned()
            .collect())
    }

    async fn mark_notified(&self, id: &str) -> Result<(), SnapshotError> {
        lock(&self.notified).push(id.to_string());
        self.update(id, |r| r.notified = true)
    }

    async fn mark_time_activated(&self, id: &str) -> Result<(), SnapshotError> {
        lock(&self.time_activated).push(id.to_string());
        self.update(id, |r| r.time_activated = true)
    }
}
