//! Reminder activation: decides when a reminder fires and hands it to
//! delivery.

mod config;
mod engine;
mod memory;
mod session;
mod traits;

pub use config::EngineConfig;
pub use engine::{ActivationEngine, EngineState};
pub use memory::InMemorySnapshot;
pub use traits::{
    Collaborators, DeliveryCapabilities, DeliveryError, DeliverySink, Permission,
    PermissionBroker, SnapshotError, SnapshotProvider,
};

use thiserror::Error;

use crate::position::PositionError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Notification permission was not granted ({0:?})")]
    NotificationPermissionDenied(Permission),

    #[error("Position sensor failed: {0}")]
    Sensor(#[from] PositionError),
}
