use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a reminder to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FireTrigger {
    /// A position sample landed inside the geofence.
    Location { distance_m: f64 },
    /// The scheduled time elapsed; `late_by_ms` is how far past it the tick ran.
    Time {
        scheduled_for: DateTime<Utc>,
        late_by_ms: u64,
    },
}

impl FireTrigger {
    pub fn is_time(&self) -> bool {
        matches!(self, FireTrigger::Time { .. })
    }
}

/// Why monitoring ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `stop()` was called.
    Requested,
    /// The position feed closed without an error.
    StreamEnded,
    /// The position feed failed with a non-transient error.
    SensorFailed,
}

/// Every state change of the activation engine produces an Event.
/// The caller decides whether to print, log, or forward them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    MonitoringStarted {
        tick_interval_secs: u64,
        at: DateTime<Utc>,
    },
    MonitoringStopped {
        reason: StopReason,
        at: DateTime<Utc>,
    },
    ReminderFired {
        reminder_id: String,
        title: String,
        trigger: FireTrigger,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Id of the fired reminder, for `ReminderFired` events.
    pub fn fired_id(&self) -> Option<&str> {
        match self {
            Event::ReminderFired { reminder_id, .. } => Some(reminder_id),
            _ => None,
        }
    }
}
