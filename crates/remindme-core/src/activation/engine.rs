//! Reminder activation engine.
//!
//! The engine owns one monitoring session at a time and is driven from a
//! single task through `&mut self`, so the set of reminders fired this
//! session needs no locking.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Starting -> Monitoring -> Stopped
//!               |
//!               +-> Stopped (permission refused)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = ActivationEngine::new(EngineConfig::default(), collaborators);
//! engine.start().await?;
//! while let Some(events) = engine.next_events().await? {
//!     for event in events { /* ... */ }
//! }
//! ```

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{Input, MonitoringSession};
use super::traits::{Collaborators, Permission};
use super::{EngineConfig, EngineError};
use crate::events::{Event, FireTrigger, StopReason};
use crate::geo::distance_meters;
use crate::position::PositionSample;
use crate::reminder::Reminder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    /// Waiting for the notification permission answer.
    Starting,
    Monitoring,
}

/// Evaluates position samples and clock ticks against the active reminders
/// and fires each reminder at most once per session.
pub struct ActivationEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    state: EngineState,
    session: Option<MonitoringSession>,
    /// Reminders fired since the last clear.
    notified: HashSet<String>,
    /// Time reminders already reported as missed, to log them once.
    missed: HashSet<String>,
}

impl ActivationEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            state: EngineState::Stopped,
            session: None,
            notified: HashSet::new(),
            missed: HashSet::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_monitoring(&self) -> bool {
        self.state == EngineState::Monitoring
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether `id` has fired in the current session.
    pub fn has_fired(&self, id: &str) -> bool {
        self.notified.contains(id)
    }

    pub fn fired_count(&self) -> usize {
        self.notified.len()
    }

    /// When the current session began, if monitoring.
    pub fn monitoring_since(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.started_at)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Ask for notification permission and begin monitoring.
    ///
    /// Returns `Ok(None)` when already monitoring.
    pub async fn start(&mut self) -> Result<Option<Event>, EngineError> {
        if self.is_monitoring() {
            tracing::debug!("monitoring already active");
            return Ok(None);
        }

        self.state = EngineState::Starting;
        let permission = self
            .collaborators
            .permissions
            .request_notification_permission()
            .await;
        if permission != Permission::Granted {
            self.state = EngineState::Stopped;
            tracing::warn!(?permission, "notification permission not granted");
            return Err(EngineError::NotificationPermissionDenied(permission));
        }

        let subscription = self
            .collaborators
            .positions
            .watch_position(&self.config.position);
        self.session = Some(MonitoringSession::new(
            subscription,
            self.config.tick_period(),
        ));
        self.state = EngineState::Monitoring;

        let tick_interval_secs = self.config.tick_period().as_secs();
        let caps = self.collaborators.delivery.capabilities();
        tracing::info!(
            tick_interval_secs,
            sound = caps.sound,
            vibration = caps.vibration,
            persistent = caps.persistent,
            "monitoring started"
        );
        Ok(Some(Event::MonitoringStarted {
            tick_interval_secs,
            at: Utc::now(),
        }))
    }

    /// Release the position feed and the ticker. Idempotent.
    pub fn stop(&mut self) -> Option<Event> {
        self.shutdown(StopReason::Requested)
    }

    /// Forget which reminders fired, so still-eligible ones can fire again.
    pub fn clear_session_notifications(&mut self) {
        tracing::debug!(cleared = self.notified.len(), "session notifications cleared");
        self.notified.clear();
        self.missed.clear();
    }

    /// Wait for the next position sample or tick and evaluate it.
    ///
    /// Returns `Ok(None)` when not monitoring. A transient sensor error
    /// yields an empty batch. A terminal sensor error stops monitoring and is
    /// returned; the engine does not restart by itself.
    pub async fn next_events(&mut self) -> Result<Option<Vec<Event>>, EngineError> {
        let input = match self.session.as_mut() {
            Some(session) => session.next_input().await,
            None => return Ok(None),
        };
        self.handle_input(input).await
    }

    async fn handle_input(&mut self, input: Input) -> Result<Option<Vec<Event>>, EngineError> {
        match input {
            Input::Tick => Ok(Some(self.handle_tick(Utc::now()).await)),
            Input::Position(Some(Ok(sample))) => Ok(Some(self.handle_position(&sample).await)),
            Input::Position(Some(Err(error))) if error.is_transient() => {
                tracing::warn!(%error, "position sample failed, waiting for the next one");
                Ok(Some(Vec::new()))
            }
            Input::Position(Some(Err(error))) => {
                tracing::error!(%error, "position stream failed, stopping monitoring");
                self.shutdown(StopReason::SensorFailed);
                Err(EngineError::Sensor(error))
            }
            Input::Position(None) => {
                tracing::info!("position stream ended");
                Ok(Some(
                    self.shutdown(StopReason::StreamEnded).into_iter().collect(),
                ))
            }
        }
    }

    /// Drive [`next_events`](Self::next_events) until monitoring ends or
    /// `shutdown` completes, passing every event to `on_event`.
    ///
    /// `shutdown` is only raced against waiting for the next input. Once a
    /// sample or tick is taken it is evaluated to the end, so a fire is never
    /// cut off between delivery and persisting its flag.
    pub async fn run_until<F>(
        &mut self,
        shutdown: F,
        mut on_event: impl FnMut(&Event),
    ) -> Result<(), EngineError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let Some(session) = self.session.as_mut() else {
                return Ok(());
            };
            let input = tokio::select! {
                _ = &mut shutdown => None,
                input = session.next_input() => Some(input),
            };
            let Some(input) = input else {
                if let Some(event) = self.stop() {
                    on_event(&event);
                }
                return Ok(());
            };
            if let Some(events) = self.handle_input(input).await? {
                events.iter().for_each(&mut on_event);
            }
        }
    }

    /// Evaluate location reminders against one sample.
    ///
    /// Does nothing unless monitoring, so a sample that arrives after
    /// [`stop`](Self::stop) has no effect.
    pub async fn handle_position(&mut self, sample: &PositionSample) -> Vec<Event> {
        if !self.is_monitoring() {
            return Vec::new();
        }
        let Some(reminders) = self.fetch_snapshot().await else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for reminder in &reminders {
            if !reminder.activation.uses_location() || !self.is_candidate(reminder) {
                continue;
            }
            let Some((center, radius_m)) = reminder.geofence() else {
                continue;
            };
            let distance_m = distance_meters(center, &sample.location);
            if distance_m <= radius_m {
                events.push(self.fire(reminder, FireTrigger::Location { distance_m }).await);
            }
        }
        events
    }

    /// Evaluate time reminders against `now`.
    ///
    /// A reminder fires once `now >= scheduled_time`, as long as it is less
    /// than the firing margin overdue. Older ones are treated as missed.
    pub async fn handle_tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.is_monitoring() {
            return Vec::new();
        }
        let Some(reminders) = self.fetch_snapshot().await else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for reminder in &reminders {
            if !reminder.activation.uses_time()
                || reminder.time_activated
                || !self.is_candidate(reminder)
            {
                continue;
            }
            let Some(trigger) = reminder.time_trigger() else {
                continue;
            };
            if now < trigger.scheduled_time {
                continue;
            }
            let late_by = (now - trigger.scheduled_time).to_std().unwrap_or_default();
            if late_by >= self.config.firing_margin {
                if self.missed.insert(reminder.id.clone()) {
                    tracing::debug!(
                        reminder_id = %reminder.id,
                        late_by_secs = late_by.as_secs(),
                        "scheduled time passed outside the firing margin, not firing"
                    );
                }
                continue;
            }
            let trigger = FireTrigger::Time {
                scheduled_for: trigger.scheduled_time,
                late_by_ms: late_by.as_millis() as u64,
            };
            events.push(self.fire(reminder, trigger).await);
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_candidate(&self, reminder: &Reminder) -> bool {
        if reminder.completed || self.notified.contains(&reminder.id) {
            return false;
        }
        if let Err(e) = reminder.check_well_formed() {
            tracing::debug!(reminder_id = %reminder.id, error = %e, "skipping malformed reminder");
            return false;
        }
        true
    }

    async fn fetch_snapshot(&self) -> Option<Vec<Reminder>> {
        match self.collaborators.snapshots.active_reminders().await {
            Ok(reminders) => Some(reminders),
            Err(error) => {
                tracing::warn!(%error, "could not fetch reminders, skipping evaluation");
                None
            }
        }
    }

    async fn fire(&mut self, reminder: &Reminder, trigger: FireTrigger) -> Event {
        // Recorded before delivery so neither trigger can fire it again,
        // whatever delivery does.
        self.notified.insert(reminder.id.clone());
        tracing::info!(reminder_id = %reminder.id, title = %reminder.title, ?trigger, "reminder fired");

        if let Err(error) = self
            .collaborators
            .delivery
            .present(reminder, &trigger)
            .await
        {
            tracing::warn!(reminder_id = %reminder.id, %error, "delivery failed, reminder still counts as fired");
        }

        let snapshots = &self.collaborators.snapshots;
        let persisted = if trigger.is_time() {
            snapshots.mark_time_activated(&reminder.id).await
        } else {
            snapshots.mark_notified(&reminder.id).await
        };
        if let Err(error) = persisted {
            tracing::warn!(reminder_id = %reminder.id, %error, "could not persist fired flag");
        }

        Event::ReminderFired {
            reminder_id: reminder.id.clone(),
            title: reminder.title.clone(),
            trigger,
            at: Utc::now(),
        }
    }

    fn shutdown(&mut self, reason: StopReason) -> Option<Event> {
        self.state = EngineState::Stopped;
        // Dropping the session cancels the feed and the ticker.
        let session = self.session.take()?;
        drop(session);

        if self.config.clear_notified_on_stop {
            self.notified.clear();
            self.missed.clear();
        }
        tracing::info!(?reason, "monitoring stopped");
        Some(Event::MonitoringStopped {
            reason,
            at: Utc::now(),
        })
    }
}
