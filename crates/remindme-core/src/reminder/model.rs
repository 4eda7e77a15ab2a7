use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::Location;

pub const DEFAULT_CATEGORY: &str = "personal";

/// Which trigger(s) can fire a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    Location,
    Time,
    Both,
}

impl ActivationType {
    pub fn uses_location(self) -> bool {
        matches!(self, ActivationType::Location | ActivationType::Both)
    }

    pub fn uses_time(self) -> bool {
        matches!(self, ActivationType::Time | ActivationType::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivationType::Location => "location",
            ActivationType::Time => "time",
            ActivationType::Both => "both",
        }
    }
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "location" => Ok(ActivationType::Location),
            "time" => Ok(ActivationType::Time),
            "both" => Ok(ActivationType::Both),
            other => Err(ValidationError::InvalidValue {
                field: "activation".into(),
                message: format!("unknown activation type '{other}'"),
            }),
        }
    }
}

/// A stored reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub radius_m: f64,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    pub activation: ActivationType,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Fired by the location trigger at some point.
    #[serde(default)]
    pub notified: bool,
    /// Fired by the time trigger; never evaluated by time again.
    #[serde(default)]
    pub time_activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// The time half of a reminder's trigger.
#[derive(Debug, Clone, Copy)]
pub struct TimeTrigger {
    pub scheduled_time: DateTime<Utc>,
}

impl Reminder {
    /// Geofence center and radius, if this reminder is armed by location
    /// and carries a usable fence.
    pub fn geofence(&self) -> Option<(&Location, f64)> {
        if !self.activation.uses_location() {
            return None;
        }
        let location = self.location.as_ref()?;
        if location.validate().is_err() || !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return None;
        }
        Some((location, self.radius_m))
    }

    /// Scheduled time, if this reminder is armed by time.
    pub fn time_trigger(&self) -> Option<TimeTrigger> {
        if !self.activation.uses_time() {
            return None;
        }
        self.scheduled_time
            .map(|scheduled_time| TimeTrigger { scheduled_time })
    }

    /// Whether every field the activation type requires is present.
    ///
    /// Malformed reminders are never fired; this reports why.
    pub fn check_well_formed(&self) -> Result<(), ValidationError> {
        let missing = |missing: &'static str| ValidationError::MissingTrigger {
            activation: self.activation.to_string(),
            missing,
        };
        if self.activation.uses_location() && self.geofence().is_none() {
            return Err(missing("a valid location and positive radius"));
        }
        if self.activation.uses_time() && self.scheduled_time.is_none() {
            return Err(missing("scheduled_time"));
        }
        Ok(())
    }

    pub fn is_well_formed(&self) -> bool {
        self.check_well_formed().is_ok()
    }
}

/// Input for creating a reminder; storage assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub radius_m: f64,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    pub activation: ActivationType,
}

impl NewReminder {
    /// Reminder fired on entering `radius_m` around `location`.
    pub fn at_location(title: impl Into<String>, location: Location, radius_m: f64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: default_category(),
            location: Some(location),
            radius_m,
            scheduled_time: None,
            activation: ActivationType::Location,
        }
    }

    /// Reminder fired once `scheduled_time` elapses.
    pub fn at_time(title: impl Into<String>, scheduled_time: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: default_category(),
            location: None,
            radius_m: 0.0,
            scheduled_time: Some(scheduled_time),
            activation: ActivationType::Time,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Validate against `now`: activation fields present, coordinates sane,
    /// schedule strictly in the future.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(scheduled) = self.scheduled_time {
            if scheduled <= now {
                return Err(ValidationError::ScheduledInPast {
                    scheduled,
                    now,
                });
            }
        }
        self.clone().into_reminder(String::new(), now).check_well_formed()
    }

    /// Materialize with the given id and creation time.
    pub fn into_reminder(self, id: String, now: DateTime<Utc>) -> Reminder {
        Reminder {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            location: self.location,
            radius_m: self.radius_m,
            scheduled_time: self.scheduled_time,
            activation: self.activation,
            completed: false,
            completed_at: None,
            notified: false,
            time_activated: false,
            created_at: now,
            updated_at: now,
        }
    }
}
