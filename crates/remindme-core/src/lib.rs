//! # RemindMe Core Library
//!
//! This library provides the core logic for RemindMe, a reminder tool whose
//! reminders fire when the user reaches a place, when a scheduled time
//! arrives, or both. Everything is available through the `remindme` CLI,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Geo**: Haversine distance, radius checks and distance formatting
//! - **Position**: Sensor abstraction with one-shot reads, cancellable watch
//!   feeds and retry with backoff
//! - **Activation Engine**: Owned state machine that evaluates samples and
//!   clock ticks and fires each reminder at most once per session
//! - **Storage**: SQLite reminder store and TOML-based configuration
//! - **Delivery**: Sinks that show fired reminders to the user
//!
//! ## Key Components
//!
//! - [`ActivationEngine`]: Core activation state machine
//! - [`ReminderDb`]: Reminder persistence and active snapshot
//! - [`Config`]: Application configuration management
//! - [`PositionSource`]: Trait for location sensors
//! - [`DeliverySink`]: Trait for notification surfaces

pub mod activation;
pub mod delivery;
pub mod error;
pub mod events;
pub mod geo;
pub mod position;
pub mod reminder;
pub mod storage;

pub use activation::{
    ActivationEngine, Collaborators, DeliverySink, EngineConfig, EngineError, EngineState,
    Permission, PermissionBroker, SnapshotProvider,
};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Event, FireTrigger, StopReason};
pub use geo::{distance_meters, format_distance, is_within_radius, Location};
pub use position::{PositionError, PositionSample, PositionSource, RetryPolicy};
pub use reminder::{ActivationType, NewReminder, Reminder, ReminderFilter, ReminderStats};
pub use storage::{Config, ReminderDb};
