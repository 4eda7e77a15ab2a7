//! SQLite-based reminder storage.
//!
//! Provides persistent storage for:
//! - Reminders and their fired flags
//! - Listing with filters and overview statistics
//! - The active-reminder snapshot the activation engine evaluates

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{data_dir, migrations};
use crate::activation::{SnapshotError, SnapshotProvider};
use crate::error::{CoreError, DatabaseError, Result};
use crate::geo::Location;
use crate::reminder::{ActivationType, NewReminder, Reminder, ReminderFilter, ReminderStats};

const COLUMNS: &str = "id, title, description, category, latitude, longitude, address,
    location_name, radius_m, scheduled_time, activation, completed, completed_at, notified,
    time_activated, created_at, updated_at";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// New reminder id: creation millis, a dash, nine random base36 characters.
fn generate_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{suffix}", now.timestamp_millis())
}

fn to_sql_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error(index: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_time(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn parse_optional_time(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(index)? {
        Some(_) => parse_time(row, index).map(Some),
        None => Ok(None),
    }
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let latitude: Option<f64> = row.get(4)?;
    let longitude: Option<f64> = row.get(5)?;
    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Location {
            latitude,
            longitude,
            address: row.get(6)?,
            name: row.get(7)?,
        }),
        _ => None,
    };
    let activation: String = row.get(10)?;
    let activation = activation
        .parse::<ActivationType>()
        .map_err(|e| conversion_error(10, e))?;

    Ok(Reminder {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location,
        radius_m: row.get(8)?,
        scheduled_time: parse_optional_time(row, 9)?,
        activation,
        completed: row.get(11)?,
        completed_at: parse_optional_time(row, 12)?,
        notified: row.get(13)?,
        time_activated: row.get(14)?,
        created_at: parse_time(row, 15)?,
        updated_at: parse_time(row, 16)?,
    })
}

/// SQLite database for reminders.
///
/// The connection sits behind a mutex so the store can be shared with the
/// activation engine as a [`SnapshotProvider`].
pub struct ReminderDb {
    conn: Mutex<Connection>,
}

impl ReminderDb {
    /// Open the database at `<data_dir>/remindme.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let dir = data_dir().map_err(|e| CoreError::Custom(e.to_string()))?;
        Self::open_at(&dir.join("remindme.db"))
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and throwaway sessions).
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::result::Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Locked)
    }

    /// Validate and store a new reminder.
    ///
    /// # Errors
    /// Returns a validation error for blank titles, bad coordinates, missing
    /// trigger fields or a schedule not strictly in the future.
    pub fn create(&self, new: NewReminder) -> Result<Reminder> {
        let now = Utc::now();
        new.validate(now)?;
        let reminder = new.into_reminder(generate_id(now), now);
        self.insert(&reminder)?;
        tracing::debug!(reminder_id = %reminder.id, activation = %reminder.activation, "reminder created");
        Ok(reminder)
    }

    fn insert(&self, r: &Reminder) -> Result<()> {
        let location = r.location.as_ref();
        self.conn()?.execute(
            &format!(
                "INSERT INTO reminders ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                r.id,
                r.title,
                r.description,
                r.category,
                location.map(|l| l.latitude),
                location.map(|l| l.longitude),
                location.and_then(|l| l.address.clone()),
                location.and_then(|l| l.name.clone()),
                r.radius_m,
                r.scheduled_time.map(to_sql_time),
                r.activation.as_str(),
                r.completed,
                r.completed_at.map(to_sql_time),
                r.notified,
                r.time_activated,
                to_sql_time(r.created_at),
                to_sql_time(r.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Reminder>> {
        let conn = self.conn()?;
        let reminder = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"),
                params![id],
                row_to_reminder,
            )
            .optional()?;
        Ok(reminder)
    }

    fn require(&self, id: &str) -> Result<Reminder> {
        self.get(id)?
            .ok_or_else(|| DatabaseError::NotFound(id.to_string()).into())
    }

    /// Reminders matching `filter`, oldest first.
    pub fn list(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(category) = &filter.category {
            values.push(Value::Text(category.clone()));
            clauses.push(format!("category = ?{}", values.len()));
        }
        if let Some(completed) = filter.completed {
            values.push(Value::Integer(completed as i64));
            clauses.push(format!("completed = ?{}", values.len()));
        }
        if let Some(activation) = filter.activation {
            values.push(Value::Text(activation.as_str().to_string()));
            clauses.push(format!("activation = ?{}", values.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM reminders {where_clause} ORDER BY created_at, rowid"
        ))?;
        let reminders = stmt
            .query_map(params_from_iter(values), row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reminders)
    }

    /// Replace the editable fields of a stored reminder.
    ///
    /// Flags and timestamps other than `updated_at` keep the values given in
    /// `reminder`. Returns the stored result.
    pub fn update(&self, reminder: &Reminder) -> Result<Reminder> {
        if let Some(location) = &reminder.location {
            location.validate()?;
        }
        reminder.check_well_formed()?;

        let location = reminder.location.as_ref();
        let changed = self.conn()?.execute(
            "UPDATE reminders SET
                title = ?2, description = ?3, category = ?4, latitude = ?5, longitude = ?6,
                address = ?7, location_name = ?8, radius_m = ?9, scheduled_time = ?10,
                activation = ?11, completed = ?12, completed_at = ?13, notified = ?14,
                time_activated = ?15, updated_at = ?16
             WHERE id = ?1",
            params![
                reminder.id,
                reminder.title,
                reminder.description,
                reminder.category,
                location.map(|l| l.latitude),
                location.map(|l| l.longitude),
                location.and_then(|l| l.address.clone()),
                location.and_then(|l| l.name.clone()),
                reminder.radius_m,
                reminder.scheduled_time.map(to_sql_time),
                reminder.activation.as_str(),
                reminder.completed,
                reminder.completed_at.map(to_sql_time),
                reminder.notified,
                reminder.time_activated,
                to_sql_time(Utc::now()),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(reminder.id.clone()).into());
        }
        self.require(&reminder.id)
    }

    fn set_completed(&self, id: &str, completed: bool) -> Result<Reminder> {
        let now = Utc::now();
        let completed_at = completed.then(|| to_sql_time(now));
        let changed = self.conn()?.execute(
            "UPDATE reminders SET completed = ?2, completed_at = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, completed, completed_at, to_sql_time(now)],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(id.to_string()).into());
        }
        self.require(id)
    }

    /// Mark done; completed reminders leave the activation snapshot.
    pub fn complete(&self, id: &str) -> Result<Reminder> {
        self.set_completed(id, true)
    }

    pub fn uncomplete(&self, id: &str) -> Result<Reminder> {
        self.set_completed(id, false)
    }

    /// Delete a reminder. Returns `false` if it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn stats(&self) -> Result<ReminderStats> {
        let all = self.list(&ReminderFilter::default())?;
        Ok(ReminderStats::from_reminders(&all))
    }

    fn set_flag(&self, id: &str, column: &str) -> Result<()> {
        let changed = self.conn()?.execute(
            &format!("UPDATE reminders SET {column} = 1, updated_at = ?2 WHERE id = ?1"),
            params![id, to_sql_time(Utc::now())],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(id.to_string()).into());
        }
        Ok(())
    }
}

fn snapshot_error(err: CoreError, to: fn(String) -> SnapshotError) -> SnapshotError {
    match err {
        CoreError::Database(DatabaseError::NotFound(id)) => SnapshotError::NotFound(id),
        other => to(other.to_string()),
    }
}

#[async_trait]
impl SnapshotProvider for ReminderDb {
    async fn active_reminders(&self) -> std::result::Result<Vec<Reminder>, SnapshotError> {
        self.list(&ReminderFilter::active())
            .map_err(|e| snapshot_error(e, SnapshotError::FetchFailed))
    }

    async fn mark_notified(&self, id: &str) -> std::result::Result<(), SnapshotError> {
        self.set_flag(id, "notified")
            .map_err(|e| snapshot_error(e, SnapshotError::Storage))
    }

    async fn mark_time_activated(&self, id: &str) -> std::result::Result<(), SnapshotError> {
        self.set_flag(id, "time_activated")
            .map_err(|e| snapshot_error(e, SnapshotError::Storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::Duration;

    fn db() -> ReminderDb {
        ReminderDb::open_memory().unwrap()
    }

    fn shop() -> NewReminder {
        NewReminder::at_location(
            "Buy milk",
            Location::new(40.7128, -74.0060).with_name("Corner shop"),
            150.0,
        )
        .with_category("shopping")
    }

    #[test]
    fn ids_have_millis_and_base36_suffix() {
        let now = Utc::now();
        let id = generate_id(now);
        let (millis, suffix) = id.split_once('-').unwrap();
        assert_eq!(millis, now.timestamp_millis().to_string());
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn create_and_get_roundtrip() {
        let db = db();
        let created = db.create(shop().with_description("2 liters")).unwrap();
        let stored = db.get(&created.id).unwrap().unwrap();
        assert_eq!(stored.title, "Buy milk");
        assert_eq!(stored.description, "2 liters");
        assert_eq!(stored.category, "shopping");
        assert_eq!(stored.radius_m, 150.0);
        let location = stored.location.unwrap();
        assert_eq!(location.latitude, 40.7128);
        assert_eq!(location.name.as_deref(), Some("Corner shop"));
        assert!(location.address.is_none());
        assert_eq!(stored.created_at, created.created_at);
        assert!(!stored.notified && !stored.time_activated && !stored.completed);
    }

    #[test]
    fn create_preserves_scheduled_time_exactly() {
        let db = db();
        let at = Utc::now() + Duration::minutes(10);
        let created = db.create(NewReminder::at_time("Call mom", at)).unwrap();
        let stored = db.get(&created.id).unwrap().unwrap();
        assert_eq!(stored.scheduled_time, Some(at));
        assert!(stored.location.is_none());
    }

    #[test]
    fn create_rejects_past_schedule_and_malformed() {
        let db = db();
        let past = NewReminder::at_time("Late", Utc::now() - Duration::seconds(1));
        assert!(matches!(
            db.create(past),
            Err(CoreError::Validation(ValidationError::ScheduledInPast { .. }))
        ));

        let mut no_radius = shop();
        no_radius.radius_m = 0.0;
        assert!(matches!(
            db.create(no_radius),
            Err(CoreError::Validation(ValidationError::MissingTrigger { .. }))
        ));

        let bad_coords = NewReminder::at_location("x", Location::new(91.0, 0.0), 10.0);
        assert!(db.create(bad_coords).is_err());
        assert!(db.list(&ReminderFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn get_missing_is_none() {
        assert!(db().get("nope").unwrap().is_none());
    }

    #[test]
    fn list_filters_and_keeps_creation_order() {
        let db = db();
        let a = db.create(shop()).unwrap();
        let b = db
            .create(NewReminder::at_time("Standup", Utc::now() + Duration::hours(1)).with_category("work"))
            .unwrap();
        let c = db.create(shop().with_category("work")).unwrap();
        db.complete(&c.id).unwrap();

        let all: Vec<_> = db
            .list(&ReminderFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(all, vec![a.id.clone(), b.id.clone(), c.id.clone()]);

        let work = db
            .list(&ReminderFilter {
                category: Some("work".into()),
                ..ReminderFilter::default()
            })
            .unwrap();
        assert_eq!(work.len(), 2);

        let active_work = db
            .list(&ReminderFilter {
                category: Some("work".into()),
                completed: Some(false),
                activation: None,
            })
            .unwrap();
        assert_eq!(active_work.len(), 1);
        assert_eq!(active_work[0].id, b.id);

        let timed = db
            .list(&ReminderFilter {
                activation: Some(ActivationType::Time),
                ..ReminderFilter::default()
            })
            .unwrap();
        assert_eq!(timed.len(), 1);
    }

    #[test]
    fn complete_and_uncomplete_toggle_timestamp() {
        let db = db();
        let r = db.create(shop()).unwrap();
        let done = db.complete(&r.id).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());
        assert!(done.updated_at >= r.updated_at);

        let undone = db.uncomplete(&r.id).unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());

        assert!(matches!(
            db.complete("missing"),
            Err(CoreError::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[test]
    fn update_replaces_fields() {
        let db = db();
        let mut r = db.create(shop()).unwrap();
        r.title = "Buy oat milk".into();
        r.radius_m = 300.0;
        r.activation = ActivationType::Both;
        r.scheduled_time = Some(Utc::now() + Duration::hours(2));
        let updated = db.update(&r).unwrap();
        assert_eq!(updated.title, "Buy oat milk");
        assert_eq!(updated.radius_m, 300.0);
        assert_eq!(updated.activation, ActivationType::Both);

        r.scheduled_time = None;
        assert!(db.update(&r).is_err());

        r.id = "missing".into();
        r.scheduled_time = Some(Utc::now());
        assert!(matches!(
            db.update(&r),
            Err(CoreError::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[test]
    fn delete_reports_existence() {
        let db = db();
        let r = db.create(shop()).unwrap();
        assert!(db.delete(&r.id).unwrap());
        assert!(!db.delete(&r.id).unwrap());
        assert!(db.get(&r.id).unwrap().is_none());
    }

    #[test]
    fn stats_count_categories_and_activation() {
        let db = db();
        db.create(shop()).unwrap();
        let done = db.create(shop()).unwrap();
        db.create(NewReminder::at_time("Pills", Utc::now() + Duration::hours(8)).with_category("health"))
            .unwrap();
        db.complete(&done.id).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.by_category.get("shopping"), Some(&2));
        assert_eq!(stats.by_category.get("health"), Some(&1));
        assert_eq!(stats.by_activation.get("location"), Some(&2));
        assert_eq!(stats.by_activation.get("time"), Some(&1));
    }

    #[tokio::test]
    async fn snapshot_excludes_completed_and_marks_flags() {
        let db = db();
        let live = db.create(shop()).unwrap();
        let done = db.create(shop()).unwrap();
        db.complete(&done.id).unwrap();

        let active = db.active_reminders().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, live.id);

        db.mark_notified(&live.id).await.unwrap();
        db.mark_time_activated(&live.id).await.unwrap();
        let stored = db.get(&live.id).unwrap().unwrap();
        assert!(stored.notified);
        assert!(stored.time_activated);

        assert!(matches!(
            db.mark_notified("missing").await,
            Err(SnapshotError::NotFound(_))
        ));
    }

    #[test]
    fn open_at_persists_between_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remindme.db");
        let id = {
            let db = ReminderDb::open_at(&path).unwrap();
            db.create(shop()).unwrap().id
        };
        let reopened = ReminderDb::open_at(&path).unwrap();
        assert!(reopened.get(&id).unwrap().is_some());
    }
}
