use chrono::{DateTime, Utc};
use clap::Subcommand;
use remindme_core::{
    format_distance, ActivationType, Config, Location, NewReminder, Reminder, ReminderDb,
    ReminderFilter,
};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Create a new reminder
    Add {
        /// Reminder title
        title: String,
        /// Longer description
        #[arg(long, default_value = "")]
        description: String,
        /// Category slug (defaults to reminders.default_category)
        #[arg(long)]
        category: Option<String>,
        /// Geofence latitude
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        /// Geofence longitude
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
        /// Geofence radius in meters (defaults to reminders.default_radius_m)
        #[arg(long)]
        radius: Option<f64>,
        /// Place name shown instead of coordinates
        #[arg(long)]
        place: Option<String>,
        /// Street address of the place
        #[arg(long)]
        address: Option<String>,
        /// Scheduled time (RFC 3339, e.g. 2025-06-01T09:00:00Z)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// location, time or both (inferred from the other flags when omitted)
        #[arg(long)]
        activation: Option<ActivationType>,
        /// Print the created reminder as JSON
        #[arg(long)]
        json: bool,
    },
    /// List reminders
    List {
        /// Only this category
        #[arg(long)]
        category: Option<String>,
        /// Only completed reminders
        #[arg(long, conflicts_with = "active")]
        completed: bool,
        /// Only active reminders
        #[arg(long)]
        active: bool,
        /// Only this activation type
        #[arg(long)]
        activation: Option<ActivationType>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one reminder as JSON
    Show { id: String },
    /// Mark a reminder as done
    Complete { id: String },
    /// Mark a reminder as not done
    Uncomplete { id: String },
    /// Delete a reminder
    Delete { id: String },
    /// Counts by state, category and activation type
    Stats,
}

fn infer_activation(has_location: bool, has_time: bool) -> Result<ActivationType, String> {
    match (has_location, has_time) {
        (true, true) => Ok(ActivationType::Both),
        (true, false) => Ok(ActivationType::Location),
        (false, true) => Ok(ActivationType::Time),
        (false, false) => Err("a reminder needs --lat/--lon, --at, or both".into()),
    }
}

fn describe(r: &Reminder) -> String {
    let mark = if r.completed { "x" } else { " " };
    let mut line = format!("{}  [{mark}] {} ({}, {})", r.id, r.title, r.category, r.activation);
    if let Some(location) = &r.location {
        line.push_str(&format!(
            "\n      at {} within {}",
            location.label(),
            format_distance(r.radius_m)
        ));
    }
    if let Some(when) = r.scheduled_time {
        line.push_str(&format!("\n      on {}", when.format("%Y-%m-%d %H:%M UTC")));
    }
    line
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = ReminderDb::open()?;
    match action {
        ReminderAction::Add {
            title,
            description,
            category,
            lat,
            lon,
            radius,
            place,
            address,
            at,
            activation,
            json,
        } => {
            let config = Config::load()?;
            let location = match (lat, lon) {
                (Some(lat), Some(lon)) => {
                    let mut location = Location::new(lat, lon);
                    location.name = place;
                    location.address = address;
                    Some(location)
                }
                _ => None,
            };
            let activation = match activation {
                Some(activation) => activation,
                None => infer_activation(location.is_some(), at.is_some())?,
            };
            let new = NewReminder {
                title,
                description,
                category: category.unwrap_or(config.reminders.default_category),
                radius_m: if location.is_some() {
                    radius.unwrap_or(config.reminders.default_radius_m)
                } else {
                    0.0
                },
                location,
                scheduled_time: at,
                activation,
            };
            let reminder = db.create(new)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reminder)?);
            } else {
                println!("Reminder created: {}", reminder.id);
                println!("{}", describe(&reminder));
            }
        }
        ReminderAction::List {
            category,
            completed,
            active,
            activation,
            json,
        } => {
            let filter = ReminderFilter {
                category,
                completed: if completed {
                    Some(true)
                } else if active {
                    Some(false)
                } else {
                    None
                },
                activation,
            };
            let reminders = db.list(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            } else if reminders.is_empty() {
                println!("No reminders.");
            } else {
                for reminder in &reminders {
                    println!("{}", describe(reminder));
                }
            }
        }
        ReminderAction::Show { id } => match db.get(&id)? {
            Some(reminder) => println!("{}", serde_json::to_string_pretty(&reminder)?),
            None => return Err(format!("reminder not found: {id}").into()),
        },
        ReminderAction::Complete { id } => {
            let reminder = db.complete(&id)?;
            println!("Completed: {}", reminder.title);
        }
        ReminderAction::Uncomplete { id } => {
            let reminder = db.uncomplete(&id)?;
            println!("Reopened: {}", reminder.title);
        }
        ReminderAction::Delete { id } => {
            if !db.delete(&id)? {
                return Err(format!("reminder not found: {id}").into());
            }
            println!("Deleted: {id}");
        }
        ReminderAction::Stats => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_inferred_from_flags() {
        assert_eq!(infer_activation(true, true).unwrap(), ActivationType::Both);
        assert_eq!(infer_activation(true, false).unwrap(), ActivationType::Location);
        assert_eq!(infer_activation(false, true).unwrap(), ActivationType::Time);
        assert!(infer_activation(false, false).is_err());
    }

    #[test]
    fn describe_shows_place_and_radius() {
        let reminder = NewReminder::at_location(
            "Buy milk",
            Location::new(40.0, -74.0).with_name("Corner shop"),
            1500.0,
        )
        .into_reminder("r1".into(), Utc::now());
        let text = describe(&reminder);
        assert!(text.starts_with("r1  [ ] Buy milk (personal, location)"));
        assert!(text.contains("at Corner shop within 1.5km"));
    }
}
